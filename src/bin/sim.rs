//! SRQ 시뮬레이터 - Selective-Repeat ARQ
//!
//! 손실/손상/지연이 있는 채널 위에서 송신자 A와 수신자 B를 이산 사건
//! 시뮬레이션으로 실행하고 통계를 출력한다.
//!
//! 사용법:
//!   cargo run --release --bin sr-sim -- [OPTIONS]
//!
//! 예시:
//!   # 20% 손실 + 20% 손상, 100개 메시지
//!   cargo run --release --bin sr-sim -- --messages 100 --loss 0.2 --corrupt 0.2

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use srq::{Config, Simulator};

/// 시뮬레이터 실행 설정
struct SimArgs {
    trace: u8,
    config: Config,
}

impl Default for SimArgs {
    fn default() -> Self {
        Self {
            trace: 1,
            config: Config::default(),
        }
    }
}

fn parse_args() -> SimArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut config = SimArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--messages" | "-n" => {
                if i + 1 < args.len() {
                    config.config.messages = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--loss" | "-l" => {
                if i + 1 < args.len() {
                    config.config.loss_prob = args[i + 1].parse().expect("유효한 확률 필요");
                    i += 1;
                }
            }
            "--corrupt" | "-c" => {
                if i + 1 < args.len() {
                    config.config.corrupt_prob = args[i + 1].parse().expect("유효한 확률 필요");
                    i += 1;
                }
            }
            "--interval" | "-t" => {
                if i + 1 < args.len() {
                    config.config.avg_msg_interval =
                        args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--seed" | "-s" => {
                if i + 1 < args.len() {
                    config.config.seed = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--trace" | "-v" => {
                if i + 1 < args.len() {
                    config.trace = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"SRQ Simulator - Selective-Repeat ARQ 이산 사건 시뮬레이터

윈도우 6, 시퀀스 공간 13, 타임아웃 24틱
- 패킷별 개별 ACK + 단일 재전송 타이머
- 수신 측 순서 뒤바뀐 패킷 버퍼링 후 순서대로 전달

사용법:
  cargo run --release --bin sr-sim -- [OPTIONS]

옵션:
  -n, --messages <N>      생성할 메시지 수 (기본: 20)
  -l, --loss <PROB>       패킷 손실 확률 0.0~1.0 (기본: 0.0)
  -c, --corrupt <PROB>    패킷 손상 확률 0.0~1.0 (기본: 0.0)
  -t, --interval <TICKS>  메시지 평균 도착 간격 (기본: 10.0)
  -s, --seed <N>          난수 시드 (기본: 1234)
  -v, --trace <LEVEL>     로그 상세도 0=warn 1=info 2=debug 3=trace (기본: 1)
  -h, --help              이 도움말 출력

예시:
  # 손실 없는 기본 실행
  cargo run --release --bin sr-sim

  # 불안정 네트워크 + 상세 로그
  cargo run --release --bin sr-sim -- -n 50 -l 0.2 -c 0.2 -v 3
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

/// `--trace` 값을 로그 레벨로 변환
fn log_level(trace: u8) -> Level {
    match trace {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sim_args = parse_args();

    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(sim_args.trace))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let report = Simulator::new(sim_args.config)?.run();
    let stats = &report.stats;

    info!("Simulation complete at t={:.1}", report.final_time);
    info!(
        "  Messages: {} submitted, {} accepted, {} delivered",
        stats.sender.messages_submitted,
        report.accepted.len(),
        report.delivered.len()
    );
    info!(
        "  Sender: {} sent, {} resent, {} timeouts, {} new acks, {} corrupted acks",
        stats.sender.packets_sent,
        stats.sender.packets_resent,
        stats.sender.timeouts,
        stats.sender.new_acks,
        stats.sender.corrupted_acks
    );
    info!(
        "  Receiver: {} received, {} corrupted, {} duplicate, {} out of window",
        stats.receiver.packets_received,
        stats.receiver.corrupted_packets,
        stats.receiver.duplicate_packets,
        stats.receiver.out_of_window_packets
    );
    info!(
        "  Channel: {} offered, {} lost ({:.1}%), {} corrupted",
        stats.channel.offered,
        stats.channel.lost,
        stats.channel.loss_rate() * 100.0,
        stats.channel.corrupted
    );
    info!("  Retransmit ratio: {:.2}", stats.retransmit_ratio());

    if !report.delivered_in_order() {
        warn!("delivered payloads diverge from submitted order");
    } else if !report.is_complete() {
        warn!(
            "{} accepted messages still undelivered when the run ended",
            report.accepted.len() - report.delivered.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_levels() {
        assert_eq!(log_level(0), Level::WARN);
        assert_eq!(log_level(1), Level::INFO);
        assert_eq!(log_level(2), Level::DEBUG);
        assert_eq!(log_level(3), Level::TRACE);
        assert_eq!(log_level(9), Level::TRACE);
        assert_eq!(log_level(SimArgs::default().trace), Level::INFO);
    }
}
