//! 외부 협력자 인터페이스
//!
//! 상태 머신은 채널, 타이머, 애플리케이션 계층을 직접 알지 못하고 [`Link`]를
//! 통해서만 접근한다. 시뮬레이터, UDP 노드, 테스트용 [`Transcript`]가 이를 구현한다.

use std::fmt;

use crate::packet::{Packet, Payload};

/// 엔티티 식별자 (A: 송신자, B: 수신자)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    A,
    B,
}

impl EntityId {
    /// 채널 반대편 엔티티
    pub fn peer(self) -> Self {
        match self {
            EntityId::A => EntityId::B,
            EntityId::B => EntityId::A,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            EntityId::A => 0,
            EntityId::B => 1,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::A => write!(f, "A"),
            EntityId::B => write!(f, "B"),
        }
    }
}

/// 스케줄러/채널이 엔티티에 제공하는 기능
pub trait Link {
    /// 채널로 패킷 전달 (fire-and-forget)
    fn send_to_channel(&mut self, from: EntityId, packet: Packet);

    /// 순서대로 조립된 페이로드를 애플리케이션 계층에 전달
    fn deliver_to_application(&mut self, at: EntityId, payload: Payload);

    /// 엔티티의 타이머 시작 (엔티티당 하나)
    fn start_timer(&mut self, entity: EntityId, duration: f64);

    /// 엔티티의 타이머 정지
    fn stop_timer(&mut self, entity: EntityId);

    /// 스케줄러 시계 (틱)
    fn now(&self) -> f64;
}

/// [`Transcript`]가 기록하는 호출
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Sent(EntityId, Packet),
    Delivered(EntityId, Payload),
    TimerStarted(EntityId, f64),
    TimerStopped(EntityId),
}

/// 모든 호출을 순서대로 기록하는 Link
///
/// 시간은 [`Transcript::advance`]로만 흐른다.
#[derive(Debug, Default)]
pub struct Transcript {
    events: Vec<LinkEvent>,
    clock: f64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ticks: f64) {
        self.clock += ticks;
    }

    pub fn events(&self) -> &[LinkEvent] {
        &self.events
    }

    /// 기록된 이벤트를 꺼내고 비움
    pub fn drain(&mut self) -> Vec<LinkEvent> {
        std::mem::take(&mut self.events)
    }

    /// 채널로 보낸 패킷
    pub fn sent(&self) -> Vec<&Packet> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LinkEvent::Sent(_, p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// 애플리케이션에 전달된 페이로드
    pub fn delivered(&self) -> Vec<&Payload> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LinkEvent::Delivered(_, p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

impl Link for Transcript {
    fn send_to_channel(&mut self, from: EntityId, packet: Packet) {
        self.events.push(LinkEvent::Sent(from, packet));
    }

    fn deliver_to_application(&mut self, at: EntityId, payload: Payload) {
        self.events.push(LinkEvent::Delivered(at, payload));
    }

    fn start_timer(&mut self, entity: EntityId, duration: f64) {
        self.events.push(LinkEvent::TimerStarted(entity, duration));
    }

    fn stop_timer(&mut self, entity: EntityId) {
        self.events.push(LinkEvent::TimerStopped(entity));
    }

    fn now(&self) -> f64 {
        self.clock
    }
}
