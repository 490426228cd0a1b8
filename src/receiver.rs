//! 수신자 (엔티티 B)
//!
//! - 수신 윈도우 `[expected, expected + WINDOW_SIZE)` 안의 패킷 버퍼링
//! - 패킷마다 개별 ACK 전송
//! - `expected`부터 연속된 구간을 순서대로 애플리케이션에 전달
//! - 손상/윈도우 밖 패킷에는 `expected - 1`에 대한 ACK 재전송
//!
//! 수신자는 데이터를 만들지 않으므로 타이머가 없다.

use tracing::debug;

use crate::checksum::is_corrupted;
use crate::link::{EntityId, Link};
use crate::packet::Packet;
use crate::stats::ReceiverStats;
use crate::window::{self, SeqSlots};
use crate::SEQ_SPACE;

/// 데이터 패킷 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// 체크섬 불일치, 폐기
    Corrupted,

    /// 새로 버퍼링됨, `delivered`개 메시지 전달
    Accepted { seqnum: usize, delivered: usize },

    /// 이미 버퍼링된 번호, ACK만 다시 보냄
    Duplicate { seqnum: usize },

    /// 수신 윈도우 밖 (이미 전달된 오래된 중복 등)
    OutOfWindow { seqnum: i32 },
}

/// 수신자 상태 머신
#[derive(Debug)]
pub struct Receiver {
    /// 애플리케이션이 기다리는 다음 번호
    expected: usize,

    /// 번호별 수신 여부
    received: [bool; SEQ_SPACE],

    /// 순서 대기 중인 패킷
    buffer: SeqSlots<Packet>,

    stats: ReceiverStats,
}

impl Receiver {
    pub const ENTITY: EntityId = EntityId::B;

    pub fn new() -> Self {
        Self {
            expected: 0,
            received: [false; SEQ_SPACE],
            buffer: SeqSlots::new(),
            stats: ReceiverStats::default(),
        }
    }

    /// 초기 상태로 되돌림
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 채널에서 도착한 데이터 패킷 처리
    pub fn on_packet<L: Link>(&mut self, packet: &Packet, link: &mut L) -> PacketOutcome {
        if is_corrupted(packet) {
            self.stats.corrupted_packets += 1;
            debug!("B: corrupted packet, resend ACK {}", self.last_in_order());
            self.send_ack(self.last_in_order(), link);
            return PacketOutcome::Corrupted;
        }
        self.stats.packets_received += 1;

        let seqnum = match window::seq_index(packet.seqnum())
            .filter(|&s| window::is_in_window(self.expected, s))
        {
            Some(s) => s,
            None => {
                self.stats.out_of_window_packets += 1;
                debug!(
                    "B: packet {} outside receive window (expected={}), resend ACK {}",
                    packet.seqnum(),
                    self.expected,
                    self.last_in_order()
                );
                self.send_ack(self.last_in_order(), link);
                return PacketOutcome::OutOfWindow {
                    seqnum: packet.seqnum(),
                };
            }
        };

        let fresh = !self.received[seqnum];
        if fresh {
            self.received[seqnum] = true;
            self.buffer.insert(seqnum, packet.clone());
            debug!("B: packet {} received and buffered", seqnum);
        } else {
            self.stats.duplicate_packets += 1;
            debug!("B: duplicate packet {}, already buffered", seqnum);
        }

        self.send_ack(seqnum, link);
        let delivered = self.deliver_in_order(link);

        if fresh {
            PacketOutcome::Accepted { seqnum, delivered }
        } else {
            PacketOutcome::Duplicate { seqnum }
        }
    }

    /// `expected`부터 연속으로 수신된 패킷 전달
    fn deliver_in_order<L: Link>(&mut self, link: &mut L) -> usize {
        let mut delivered = 0;
        while self.received[self.expected] {
            if let Some(packet) = self.buffer.take(self.expected) {
                debug!("B: delivering packet {} to application", self.expected);
                link.deliver_to_application(Self::ENTITY, *packet.payload());
                self.stats.messages_delivered += 1;
                delivered += 1;
            }
            self.received[self.expected] = false;
            self.expected = window::next(self.expected);
        }
        delivered
    }

    fn send_ack<L: Link>(&mut self, acknum: usize, link: &mut L) {
        link.send_to_channel(Self::ENTITY, Packet::ack(acknum));
        self.stats.acks_sent += 1;
    }

    /// 마지막으로 순서대로 받은 번호 (`expected - 1`, wrap 포함)
    pub fn last_in_order(&self) -> usize {
        window::prev(self.expected)
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_buffered(&self, seqnum: usize) -> bool {
        self.received[seqnum % SEQ_SPACE]
    }

    /// 순서 대기 중인 패킷 수
    pub fn pending(&self) -> usize {
        self.buffer.occupied()
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{LinkEvent, Transcript};
    use crate::{PAYLOAD_SIZE, WINDOW_SIZE};

    fn data(seqnum: usize) -> Packet {
        Packet::data(seqnum, [b'a' + seqnum as u8; PAYLOAD_SIZE])
    }

    fn acks(link: &Transcript) -> Vec<Option<i32>> {
        link.sent().iter().map(|p| p.acknum()).collect()
    }

    #[test]
    fn test_in_order_packet_is_delivered_and_acked() {
        let mut link = Transcript::new();
        let mut receiver = Receiver::new();

        let outcome = receiver.on_packet(&data(0), &mut link);
        assert_eq!(outcome, PacketOutcome::Accepted { seqnum: 0, delivered: 1 });
        assert_eq!(receiver.expected(), 1);
        assert_eq!(
            link.events()[1],
            LinkEvent::Delivered(EntityId::B, [b'a'; PAYLOAD_SIZE])
        );

        let ack = link.sent()[0];
        assert_eq!(ack.acknum(), Some(0));
        assert!(!is_corrupted(ack));
    }

    #[test]
    fn test_reordered_pair_is_delivered_in_order() {
        let mut link = Transcript::new();
        let mut receiver = Receiver::new();

        assert_eq!(
            receiver.on_packet(&data(1), &mut link),
            PacketOutcome::Accepted { seqnum: 1, delivered: 0 }
        );
        assert!(link.delivered().is_empty());
        assert_eq!(acks(&link), vec![Some(1)]);
        assert_eq!(receiver.expected(), 0);

        assert_eq!(
            receiver.on_packet(&data(0), &mut link),
            PacketOutcome::Accepted { seqnum: 0, delivered: 2 }
        );
        assert_eq!(acks(&link), vec![Some(1), Some(0)]);
        assert_eq!(
            link.delivered(),
            vec![&[b'a'; PAYLOAD_SIZE], &[b'b'; PAYLOAD_SIZE]]
        );
        assert_eq!(receiver.expected(), 2);
        assert_eq!(receiver.pending(), 0);
    }

    #[test]
    fn test_corrupted_packet_resends_last_ack() {
        let mut link = Transcript::new();
        let mut receiver = Receiver::new();
        receiver.on_packet(&data(0), &mut link);
        receiver.on_packet(&data(1), &mut link);
        link.drain();

        let good = data(2);
        let mut payload = *good.payload();
        payload[3] ^= 0x01;
        let bad = Packet::from_raw_parts(good.seqnum(), good.acknum(), good.checksum(), payload);
        assert!(is_corrupted(&bad));

        assert_eq!(receiver.on_packet(&bad, &mut link), PacketOutcome::Corrupted);
        assert_eq!(acks(&link), vec![Some(1)]);
        assert_eq!(receiver.expected(), 2);
        assert!(!receiver.is_buffered(2));
        assert_eq!(receiver.stats().corrupted_packets, 1);
    }

    #[test]
    fn test_corrupted_packet_at_start_acks_last_seq() {
        let mut link = Transcript::new();
        let mut receiver = Receiver::new();
        let bad = Packet::from_raw_parts(0, None, 0, [b'z'; PAYLOAD_SIZE]);

        receiver.on_packet(&bad, &mut link);
        assert_eq!(acks(&link), vec![Some(SEQ_SPACE as i32 - 1)]);
    }

    #[test]
    fn test_overwritten_seqnum_resends_last_ack() {
        let mut link = Transcript::new();
        let mut receiver = Receiver::new();
        receiver.on_packet(&data(0), &mut link);
        link.drain();

        // 채널이 seqnum만 덮어쓴 패킷: 체크섬 불일치
        let good = data(1);
        let tampered = Packet::from_raw_parts(999_999, good.acknum(), good.checksum(), *good.payload());
        assert_eq!(receiver.on_packet(&tampered, &mut link), PacketOutcome::Corrupted);
        assert_eq!(acks(&link), vec![Some(0)]);
        link.drain();

        // 체크섬까지 맞는 범위 밖 seqnum
        let unsealed = Packet::from_raw_parts(999_999, None, 0, *good.payload());
        let sealed = Packet::from_raw_parts(
            999_999,
            None,
            crate::checksum::compute_checksum(&unsealed),
            *good.payload(),
        );
        assert!(!is_corrupted(&sealed));
        assert_eq!(
            receiver.on_packet(&sealed, &mut link),
            PacketOutcome::OutOfWindow { seqnum: 999_999 }
        );
        assert_eq!(acks(&link), vec![Some(0)]);
        assert!(link.delivered().is_empty());
        assert_eq!(receiver.expected(), 1);
    }

    #[test]
    fn test_old_duplicate_is_not_redelivered() {
        let mut link = Transcript::new();
        let mut receiver = Receiver::new();
        receiver.on_packet(&data(0), &mut link);
        receiver.on_packet(&data(1), &mut link);
        link.drain();

        assert_eq!(
            receiver.on_packet(&data(0), &mut link),
            PacketOutcome::OutOfWindow { seqnum: 0 }
        );
        assert!(link.delivered().is_empty());
        assert_eq!(acks(&link), vec![Some(1)]);
        assert_eq!(receiver.stats().out_of_window_packets, 1);
    }

    #[test]
    fn test_buffered_duplicate_is_reacked_once_stored() {
        let mut link = Transcript::new();
        let mut receiver = Receiver::new();
        receiver.on_packet(&data(3), &mut link);

        assert_eq!(
            receiver.on_packet(&data(3), &mut link),
            PacketOutcome::Duplicate { seqnum: 3 }
        );
        assert_eq!(acks(&link), vec![Some(3), Some(3)]);
        assert_eq!(receiver.pending(), 1);
        assert_eq!(receiver.stats().duplicate_packets, 1);
    }

    #[test]
    fn test_packet_beyond_window_is_rejected() {
        let mut link = Transcript::new();
        let mut receiver = Receiver::new();

        assert_eq!(
            receiver.on_packet(&data(WINDOW_SIZE), &mut link),
            PacketOutcome::OutOfWindow { seqnum: WINDOW_SIZE as i32 }
        );
        assert!(!receiver.is_buffered(WINDOW_SIZE));
    }

    #[test]
    fn test_window_permutation_delivers_in_order_across_wrap() {
        let mut link = Transcript::new();
        let mut receiver = Receiver::new();

        // expected를 10으로 이동
        for seq in 0..10 {
            receiver.on_packet(&data(seq), &mut link);
        }
        link.drain();

        // 윈도우 {10, 11, 12, 0, 1, 2}를 뒤섞인 순서로
        for seq in [12, 0, 11, 2, 1, 10] {
            receiver.on_packet(&data(seq), &mut link);
        }

        let delivered: Vec<u8> = link.delivered().iter().map(|p| p[0]).collect();
        let expected: Vec<u8> = [10usize, 11, 12, 0, 1, 2]
            .iter()
            .map(|&s| b'a' + s as u8)
            .collect();
        assert_eq!(delivered, expected);
        assert_eq!(receiver.expected(), 3);
        assert_eq!(receiver.stats().messages_delivered, 16);
    }
}
