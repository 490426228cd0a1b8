//! 스케줄러 콜백 표면
//!
//! 스케줄러(시뮬레이터, UDP 노드)는 엔티티 ID와 함께 이 콜백만 호출한다.
//! 콜백은 한 번에 하나씩 끝까지 실행되며 서로 겹치지 않는다.

use tracing::warn;

use crate::link::{EntityId, Link};
use crate::packet::{Message, Packet};
use crate::receiver::{PacketOutcome, Receiver};
use crate::sender::{AckOutcome, Sender, SubmitOutcome};
use crate::{Error, Result};

/// 채널 패킷 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A가 ACK를 처리함
    Ack(AckOutcome),

    /// B가 데이터 패킷을 처리함
    Data(PacketOutcome),
}

/// 송신자 A와 수신자 B
///
/// 두 엔티티는 상태를 공유하지 않는다. 채널을 지나는 패킷만이 유일한 접점.
#[derive(Debug, Default)]
pub struct Endpoints {
    sender: Sender,
    receiver: Receiver,
}

impl Endpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔티티 초기화 (다른 콜백보다 먼저 한 번)
    pub fn init(&mut self, entity: EntityId) {
        match entity {
            EntityId::A => self.sender.reset(),
            EntityId::B => self.receiver.reset(),
        }
    }

    /// 애플리케이션 계층에서 메시지 도착
    pub fn on_application_send<L: Link>(
        &mut self,
        entity: EntityId,
        message: &Message,
        link: &mut L,
    ) -> Result<SubmitOutcome> {
        match entity {
            EntityId::A => Ok(self.sender.submit(message, link)),
            EntityId::B => Err(Error::Unsupported {
                entity,
                operation: "application send",
            }),
        }
    }

    /// 채널에서 패킷 도착
    pub fn on_channel_packet<L: Link>(
        &mut self,
        entity: EntityId,
        packet: &Packet,
        link: &mut L,
    ) -> Outcome {
        match entity {
            EntityId::A => Outcome::Ack(self.sender.on_ack(packet, link)),
            EntityId::B => Outcome::Data(self.receiver.on_packet(packet, link)),
        }
    }

    /// 타이머 만료
    ///
    /// 재전송한 시퀀스 번호 목록을 반환
    pub fn on_timer_fired<L: Link>(&mut self, entity: EntityId, link: &mut L) -> Result<Vec<usize>> {
        match entity {
            EntityId::A => Ok(self.sender.on_timeout(link)),
            EntityId::B => {
                warn!("B: timer fired but receiver never arms a timer");
                Err(Error::Unsupported {
                    entity,
                    operation: "timer",
                })
            }
        }
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }
}
