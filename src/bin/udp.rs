//! SRQ UDP 데모 - Selective-Repeat ARQ
//!
//! 송신 노드와 수신 노드를 루프백 UDP 소켓 위에서 실행하고 전달된 메시지와
//! 통계를 출력한다. 손실/손상은 송신 측에서 주입한다.
//!
//! 사용법:
//!   cargo run --release --bin sr-udp -- [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin sr-udp -- --messages 40 --corrupt 0.1

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use srq::{Config, ReceiverNode, SenderNode, Simulator, SubmitOutcome};

/// 데모 설정
struct DemoConfig {
    bind_addr: SocketAddr,
    timeout: Duration,
    config: Config,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            timeout: Duration::from_secs(30),
            config: Config::default(),
        }
    }
}

fn parse_args() -> DemoConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = DemoConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
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
            "--tick-ms" => {
                if i + 1 < args.len() {
                    config.config.tick_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--timeout" => {
                if i + 1 < args.len() {
                    let secs: u64 = args[i + 1].parse().expect("유효한 숫자 필요");
                    config.timeout = Duration::from_secs(secs);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"SRQ UDP Demo - Selective-Repeat ARQ 루프백 전송

사용법:
  cargo run --release --bin sr-udp -- [OPTIONS]

옵션:
  -b, --bind <ADDR>       바인드 주소 (기본: 127.0.0.1:0)
  -n, --messages <N>      전송할 메시지 수 (기본: 20)
  -l, --loss <PROB>       송신 측 패킷 손실 확률 (기본: 0.0)
  -c, --corrupt <PROB>    송신 측 패킷 손상 확률 (기본: 0.0)
  --tick-ms <MS>          1틱의 실제 시간 (기본: 5)
  --timeout <SECS>        수신 대기 제한 시간 (기본: 30)
  -h, --help              이 도움말 출력
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let demo = parse_args();
    let messages = demo.config.messages;

    // ACK 경로는 장애 없이 (ACK 손실 시 송신자가 멈출 수 있음)
    let receiver_config = Config {
        loss_prob: 0.0,
        corrupt_prob: 0.0,
        ..demo.config.clone()
    };

    let receiver_socket = UdpSocket::bind(demo.bind_addr).await?;
    let receiver_addr = receiver_socket.local_addr()?;
    let (receiver, mut deliveries) = ReceiverNode::start(&receiver_config, receiver_socket)?;

    let sender_socket = UdpSocket::bind(demo.bind_addr).await?;
    let sender = SenderNode::start(&demo.config, sender_socket, receiver_addr)?;

    info!("SRQ UDP demo: {} messages, A {} -> B {}", messages, sender.local_addr(), receiver_addr);
    let start = Instant::now();

    let producer = async {
        for i in 0..messages {
            loop {
                match sender.submit(Simulator::message_for(i)).await? {
                    SubmitOutcome::Sent { seqnum } => {
                        info!("A: message {} sent as seq {}", i, seqnum);
                        break;
                    }
                    SubmitOutcome::WindowFull => {
                        tokio::time::sleep(Duration::from_millis(demo.config.tick_ms)).await;
                    }
                }
            }
        }
        Ok::<_, srq::Error>(())
    };

    let consumer = async {
        let mut received = 0;
        while received < messages {
            match deliveries.recv().await {
                Some(payload) => {
                    info!("B: delivered {}", String::from_utf8_lossy(&payload));
                    received += 1;
                }
                None => break,
            }
        }
        received
    };

    let received = match tokio::time::timeout(demo.timeout, async {
        let (produced, received) = tokio::join!(producer, consumer);
        produced.map(|_| received)
    })
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            warn!("timed out after {:?}", demo.timeout);
            receiver.stats().messages_delivered as usize
        }
    };

    let elapsed = start.elapsed();
    let sender_stats = sender.stats();
    let channel_stats = sender.channel_stats();
    let receiver_stats = receiver.stats();

    info!("Transfer complete!");
    info!("  Time: {:.2}s", elapsed.as_secs_f64());
    info!("  Delivered: {}/{}", received, messages);
    info!(
        "  Sender: {} sent, {} resent, {} timeouts, {} window full",
        sender_stats.packets_sent,
        sender_stats.packets_resent,
        sender_stats.timeouts,
        sender_stats.window_full
    );
    info!(
        "  Receiver: {} received, {} corrupted, {} acks sent",
        receiver_stats.packets_received, receiver_stats.corrupted_packets, receiver_stats.acks_sent
    );
    info!(
        "  Channel: {} lost, {} corrupted of {} offered",
        channel_stats.lost, channel_stats.corrupted, channel_stats.offered
    );

    sender.stop().await?;
    receiver.stop().await?;
    Ok(())
}
