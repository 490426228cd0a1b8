//! 실행 설정
//!
//! 프로토콜 상수(`WINDOW_SIZE`, `SEQ_SPACE`, `TIMEOUT`)는 컴파일 타임 상수이며
//! 여기서는 채널/시뮬레이션/노드 실행 파라미터만 다룬다.

use crate::{Error, Result};

/// 시뮬레이션 및 노드 실행 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 애플리케이션 계층에서 생성할 메시지 수
    pub messages: usize,

    /// 패킷 손실 확률 (0.0 ~ 1.0)
    pub loss_prob: f64,

    /// 패킷 손상 확률 (0.0 ~ 1.0)
    pub corrupt_prob: f64,

    /// 애플리케이션 메시지 평균 도착 간격 (틱)
    pub avg_msg_interval: f64,

    /// 난수 시드 (재현 가능한 실행용)
    pub seed: u64,

    /// 마지막 메시지 이후 잔여 이벤트 처리 허용 시간 (틱)
    pub drain_ticks: f64,

    /// UDP 노드 모드에서 1틱에 해당하는 실제 시간 (밀리초)
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            messages: 20,
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            avg_msg_interval: 10.0,
            seed: 1234,
            drain_ticks: 1000.0,
            tick_ms: 5, // 타임아웃 24틱 = 120ms
        }
    }
}

impl Config {
    /// 손실/손상 없는 채널
    pub fn lossless() -> Self {
        Self::default()
    }

    /// 불안정한 네트워크용 설정
    pub fn unstable_network() -> Self {
        Self {
            messages: 50,
            loss_prob: 0.2,
            corrupt_prob: 0.2,
            avg_msg_interval: 50.0,
            seed: 1234,
            drain_ticks: 5000.0,
            tick_ms: 5,
        }
    }

    /// 설정 값 검증
    pub fn validate(&self) -> Result<()> {
        check_probability("loss_prob", self.loss_prob)?;
        check_probability("corrupt_prob", self.corrupt_prob)?;

        if !(self.avg_msg_interval > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "avg_msg_interval must be positive, got {}",
                self.avg_msg_interval
            )));
        }
        if self.drain_ticks < 0.0 || self.drain_ticks.is_nan() {
            return Err(Error::InvalidConfig(format!(
                "drain_ticks must not be negative, got {}",
                self.drain_ticks
            )));
        }
        if self.tick_ms == 0 {
            return Err(Error::InvalidConfig("tick_ms must be at least 1".into()));
        }
        Ok(())
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidProbability { name, value })
    }
}
