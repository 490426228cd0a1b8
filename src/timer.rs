//! 재전송 타이머 수명 관리
//!
//! 엔티티당 하나의 타이머. 실제 시계는 스케줄러가 소유하고, 여기서는
//! 실행 여부만 추적해 start/stop 호출이 항상 일관되도록 한다.
//! 재시작할 때마다 고정 타임아웃을 사용하며 back-off는 없다.

use tracing::trace;

use crate::link::{EntityId, Link};
use crate::TIMEOUT;

/// 단일 재전송 타이머 핸들
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    entity: EntityId,
    duration: f64,
    running: bool,
}

impl RetransmitTimer {
    /// 고정 타임아웃 [`TIMEOUT`]을 사용하는 타이머
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            duration: TIMEOUT,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// 실행 중이 아닐 때만 시작
    pub fn ensure_running<L: Link>(&mut self, link: &mut L) {
        if !self.running {
            link.start_timer(self.entity, self.duration);
            self.running = true;
            trace!("timer {} started ({} ticks)", self.entity, self.duration);
        }
    }

    /// 0부터 다시 시작
    pub fn restart<L: Link>(&mut self, link: &mut L) {
        if self.running {
            link.stop_timer(self.entity);
        }
        link.start_timer(self.entity, self.duration);
        self.running = true;
        trace!("timer {} restarted ({} ticks)", self.entity, self.duration);
    }

    pub fn stop<L: Link>(&mut self, link: &mut L) {
        if self.running {
            link.stop_timer(self.entity);
            self.running = false;
            trace!("timer {} stopped", self.entity);
        }
    }

    /// 스케줄러가 타이머 만료를 알림 (이미 멈춘 상태가 됨)
    pub fn expired(&mut self) {
        self.running = false;
    }
}
