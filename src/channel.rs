//! 채널 장애 모델
//!
//! 패킷 손실과 손상만 주입한다. 재정렬은 하지 않는다 (도착 순서는 스케줄러가
//! 보장). 손상은 헤더나 페이로드 일부를 덮어쓰고 체크섬은 그대로 둔다.
//!
//! | 확률   | 손상 방식                  |
//! |--------|----------------------------|
//! | 0.75   | 첫 페이로드 바이트 → `'Z'` |
//! | 0.125  | seqnum → 999999            |
//! | 0.125  | acknum → 999999            |

use rand::Rng;

use crate::packet::Packet;
use crate::stats::ChannelStats;
use crate::Config;

/// 손상 시 페이로드에 덮어쓰는 바이트
pub const CORRUPT_MARKER: u8 = b'Z';

/// 손상 시 헤더 필드에 덮어쓰는 값
pub const CORRUPT_FIELD: i32 = 999_999;

/// 채널 통과 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transit {
    Lost,
    Corrupted(Packet),
    Intact(Packet),
}

impl Transit {
    /// 도착하는 패킷 (손실이면 None)
    pub fn into_packet(self) -> Option<Packet> {
        match self {
            Transit::Lost => None,
            Transit::Corrupted(p) | Transit::Intact(p) => Some(p),
        }
    }
}

/// 손실/손상 확률
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelModel {
    pub loss_prob: f64,
    pub corrupt_prob: f64,
}

impl ChannelModel {
    pub fn new(loss_prob: f64, corrupt_prob: f64) -> Self {
        Self {
            loss_prob,
            corrupt_prob,
        }
    }

    /// 장애 없는 채널
    pub fn perfect() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.loss_prob, config.corrupt_prob)
    }

    /// 패킷 하나를 채널에 통과시키고 통계 기록
    pub fn transmit<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        packet: Packet,
        stats: &mut ChannelStats,
    ) -> Transit {
        stats.offered += 1;

        if rng.gen::<f64>() < self.loss_prob {
            stats.lost += 1;
            return Transit::Lost;
        }

        stats.delivered += 1;
        if rng.gen::<f64>() < self.corrupt_prob {
            stats.corrupted += 1;
            return Transit::Corrupted(corrupt(rng, &packet));
        }

        Transit::Intact(packet)
    }
}

impl Default for ChannelModel {
    fn default() -> Self {
        Self::perfect()
    }
}

/// 패킷 일부를 덮어쓴 사본 (체크섬 유지)
pub fn corrupt<R: Rng + ?Sized>(rng: &mut R, packet: &Packet) -> Packet {
    let mut seqnum = packet.seqnum();
    let mut acknum = packet.acknum();
    let mut payload = *packet.payload();

    let x: f64 = rng.gen();
    if x < 0.75 {
        payload[0] = CORRUPT_MARKER;
    } else if x < 0.875 {
        seqnum = CORRUPT_FIELD;
    } else {
        acknum = Some(CORRUPT_FIELD);
    }

    Packet::from_raw_parts(seqnum, acknum, packet.checksum(), payload)
}
