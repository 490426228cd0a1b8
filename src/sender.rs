//! 송신자 (엔티티 A)
//!
//! - 고정 크기 윈도우 안에서 데이터 패킷 전송
//! - 패킷 단위 개별 ACK (누적 아님), base가 확인될 때만 윈도우 이동
//! - 단일 타이머, 만료 시 윈도우 내 미확인 패킷 전체 재전송
//!
//! 상태:
//!
//! ```text
//!   base              next_seq
//!    │                   │
//! ───┼───────────────────┼──────────▶ seq (mod SEQ_SPACE)
//!    │<─── count 개 ────▶│
//! ```
//!
//! `count == 0`이면 idle (타이머 정지), 아니면 active (타이머 실행 중).

use tracing::debug;

use crate::checksum::is_corrupted;
use crate::link::{EntityId, Link};
use crate::packet::{Message, Packet};
use crate::stats::SenderStats;
use crate::timer::RetransmitTimer;
use crate::window::{self, SeqSlots};
use crate::{SEQ_SPACE, WINDOW_SIZE};

/// 메시지 제출 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 전송됨
    Sent { seqnum: usize },

    /// 윈도우가 가득 차 메시지가 버려짐 (큐잉/재시도 없음)
    WindowFull,
}

/// ACK 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// 체크섬 불일치, 무시
    Corrupted,

    /// 윈도우 밖이거나 유효하지 않은 번호, 무시
    Stale { acknum: Option<i32> },

    /// 이미 확인된 번호
    Duplicate { seqnum: usize },

    /// 새로 확인됨, `slid`만큼 윈도우 이동
    Acked { seqnum: usize, slid: usize },
}

/// 송신자 상태 머신
#[derive(Debug)]
pub struct Sender {
    /// 가장 오래된 미확인 번호 (윈도우 시작)
    base: usize,

    /// 다음에 할당할 번호
    next_seq: usize,

    /// 윈도우 점유 수
    count: usize,

    /// 확인 대기 중인 패킷
    buffer: SeqSlots<Packet>,

    /// 번호별 확인 여부
    acked: [bool; SEQ_SPACE],

    /// 번호별 만료 예정 시각 (정보용)
    due: SeqSlots<f64>,

    timer: RetransmitTimer,

    stats: SenderStats,
}

impl Sender {
    pub const ENTITY: EntityId = EntityId::A;

    /// 새 송신자 생성 (시퀀스 번호 0부터 시작)
    pub fn new() -> Self {
        Self {
            base: 0,
            next_seq: 0,
            count: 0,
            buffer: SeqSlots::new(),
            acked: [false; SEQ_SPACE],
            due: SeqSlots::new(),
            timer: RetransmitTimer::new(Self::ENTITY),
            stats: SenderStats::default(),
        }
    }

    /// 초기 상태로 되돌림
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 애플리케이션 메시지 전송
    pub fn submit<L: Link>(&mut self, message: &Message, link: &mut L) -> SubmitOutcome {
        self.stats.messages_submitted += 1;

        if self.count >= WINDOW_SIZE {
            self.stats.window_full += 1;
            debug!("A: send window is full, message dropped (base={})", self.base);
            return SubmitOutcome::WindowFull;
        }

        let seqnum = self.next_seq;
        let packet = Packet::data(seqnum, message.data);

        self.buffer.insert(seqnum, packet.clone());
        self.acked[seqnum] = false;
        self.due.insert(seqnum, link.now() + self.timer.duration());

        debug!("A: sending packet {}", seqnum);
        link.send_to_channel(Self::ENTITY, packet);
        self.stats.packets_sent += 1;

        self.count += 1;
        self.next_seq = window::next(self.next_seq);
        self.timer.ensure_running(link);

        self.debug_check();
        SubmitOutcome::Sent { seqnum }
    }

    /// 채널에서 도착한 ACK 처리
    pub fn on_ack<L: Link>(&mut self, packet: &Packet, link: &mut L) -> AckOutcome {
        if is_corrupted(packet) {
            self.stats.corrupted_acks += 1;
            debug!("A: corrupted ACK received, ignored");
            return AckOutcome::Corrupted;
        }
        self.stats.acks_received += 1;

        let seqnum = match packet
            .acknum()
            .and_then(window::seq_index)
            .filter(|&s| self.is_outstanding(s))
        {
            Some(s) => s,
            None => {
                self.stats.stale_acks += 1;
                debug!("A: ACK {:?} outside window, ignored", packet.acknum());
                return AckOutcome::Stale {
                    acknum: packet.acknum(),
                };
            }
        };

        if self.acked[seqnum] {
            self.stats.duplicate_acks += 1;
            debug!("A: duplicate ACK {}", seqnum);
            return AckOutcome::Duplicate { seqnum };
        }

        self.acked[seqnum] = true;
        self.stats.new_acks += 1;
        debug!("A: ACK {} is new", seqnum);

        let mut slid = 0;
        while self.count > 0 && self.acked[self.base] {
            self.acked[self.base] = false;
            self.buffer.take(self.base);
            self.due.take(self.base);
            self.base = window::next(self.base);
            self.count -= 1;
            slid += 1;
        }
        if slid > 0 {
            debug!("A: window slid by {}, base={}", slid, self.base);
        }

        if self.count > 0 {
            self.timer.restart(link);
        } else {
            self.timer.stop(link);
        }

        self.debug_check();
        AckOutcome::Acked { seqnum, slid }
    }

    /// 타이머 만료 처리
    ///
    /// 윈도우 내 미확인 패킷 전체를 재전송하고 재전송한 번호를 반환
    pub fn on_timeout<L: Link>(&mut self, link: &mut L) -> Vec<usize> {
        self.timer.expired();
        self.stats.timeouts += 1;

        let now = link.now();
        let mut resent = Vec::new();

        for i in 0..self.count {
            let seqnum = (self.base + i) % SEQ_SPACE;
            if self.acked[seqnum] {
                continue;
            }
            if let Some(packet) = self.buffer.get(seqnum) {
                debug!("A: timeout, resending packet {}", seqnum);
                link.send_to_channel(Self::ENTITY, packet.clone());
                self.due.insert(seqnum, now + self.timer.duration());
                resent.push(seqnum);
            }
        }
        self.stats.packets_resent += resent.len() as u64;

        if !resent.is_empty() {
            self.timer.ensure_running(link);
        }

        resent
    }

    /// 윈도우를 점유 중인 번호인지 (`[base, base + count)`)
    fn is_outstanding(&self, seqnum: usize) -> bool {
        window::is_in_window(self.base, seqnum) && window::offset(self.base, seqnum) < self.count
    }

    fn debug_check(&self) {
        debug_assert!(self.count <= WINDOW_SIZE);
        debug_assert_eq!(window::offset(self.base, self.next_seq), self.count);
        debug_assert_eq!(self.buffer.occupied(), self.count);
        debug_assert_eq!(self.timer.is_running(), self.count > 0);
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn next_seq(&self) -> usize {
        self.next_seq
    }

    /// 확인 대기 중인 패킷 수
    pub fn in_flight(&self) -> usize {
        self.count
    }

    pub fn is_idle(&self) -> bool {
        self.count == 0
    }

    pub fn is_acked(&self, seqnum: usize) -> bool {
        self.acked[seqnum % SEQ_SPACE]
    }

    pub fn buffered(&self, seqnum: usize) -> Option<&Packet> {
        self.buffer.get(seqnum)
    }

    /// 번호별 만료 예정 시각
    pub fn due_time(&self, seqnum: usize) -> Option<f64> {
        self.due.get(seqnum).copied()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }
}

impl Default for Sender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{LinkEvent, Transcript};
    use crate::PAYLOAD_SIZE;

    fn msg(i: u8) -> Message {
        Message::filled(b'a' + i % 26)
    }

    fn fill(sender: &mut Sender, link: &mut Transcript, n: u8) {
        for i in 0..n {
            assert!(matches!(sender.submit(&msg(i), link), SubmitOutcome::Sent { .. }));
        }
    }

    fn ack(sender: &mut Sender, link: &mut Transcript, seqnum: usize) -> AckOutcome {
        sender.on_ack(&Packet::ack(seqnum), link)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let sender = Sender::new();
        assert_eq!(sender.base(), 0);
        assert_eq!(sender.next_seq(), 0);
        assert!(sender.is_idle());
        assert!(!sender.is_timer_running());
    }

    #[test]
    fn test_submit_sends_and_starts_timer_once() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();

        assert_eq!(sender.submit(&msg(0), &mut link), SubmitOutcome::Sent { seqnum: 0 });
        assert_eq!(sender.submit(&msg(1), &mut link), SubmitOutcome::Sent { seqnum: 1 });

        let events = link.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], LinkEvent::Sent(EntityId::A, p) if p.seqnum() == 0));
        assert_eq!(events[1], LinkEvent::TimerStarted(EntityId::A, 24.0));
        assert!(matches!(&events[2], LinkEvent::Sent(EntityId::A, p) if p.seqnum() == 1));

        let sent = link.sent();
        assert_eq!(sent[0].acknum(), None);
        assert_eq!(sent[0].payload(), &[b'a'; PAYLOAD_SIZE]);
        assert!(!is_corrupted(sent[0]));
    }

    #[test]
    fn test_full_window_rejects_seventh_submit() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();
        fill(&mut sender, &mut link, WINDOW_SIZE as u8);

        assert_eq!(sender.in_flight(), WINDOW_SIZE);
        assert_eq!(sender.submit(&msg(6), &mut link), SubmitOutcome::WindowFull);
        assert_eq!(sender.stats().window_full, 1);
        assert_eq!(link.sent().len(), WINDOW_SIZE);

        // base 확인 후 다시 받아들임
        ack(&mut sender, &mut link, 0);
        assert_eq!(sender.submit(&msg(7), &mut link), SubmitOutcome::Sent { seqnum: 6 });
    }

    #[test]
    fn test_non_base_ack_does_not_slide() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();
        fill(&mut sender, &mut link, 4);

        assert_eq!(ack(&mut sender, &mut link, 2), AckOutcome::Acked { seqnum: 2, slid: 0 });
        assert_eq!(ack(&mut sender, &mut link, 1), AckOutcome::Acked { seqnum: 1, slid: 0 });
        assert_eq!(sender.base(), 0);
        assert_eq!(sender.in_flight(), 4);
        assert!(sender.is_acked(2));

        assert_eq!(ack(&mut sender, &mut link, 0), AckOutcome::Acked { seqnum: 0, slid: 3 });
        assert_eq!(sender.base(), 3);
        assert_eq!(sender.in_flight(), 1);
        assert!(!sender.is_acked(2));
        assert!(sender.buffered(0).is_none());
        assert!(sender.buffered(3).is_some());
    }

    #[test]
    fn test_timeout_resends_only_unacked() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();
        fill(&mut sender, &mut link, 5);
        ack(&mut sender, &mut link, 0);
        ack(&mut sender, &mut link, 1);
        ack(&mut sender, &mut link, 3);
        link.drain();

        let resent = sender.on_timeout(&mut link);
        assert_eq!(resent, vec![2, 4]);

        let seqs: Vec<i32> = link.sent().iter().map(|p| p.seqnum()).collect();
        assert_eq!(seqs, vec![2, 4]);
        assert_eq!(link.events().last(), Some(&LinkEvent::TimerStarted(EntityId::A, 24.0)));
        assert_eq!(sender.stats().packets_resent, 2);
        assert!(sender.is_timer_running());
    }

    #[test]
    fn test_timeout_when_idle_keeps_timer_stopped() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();

        assert!(sender.on_timeout(&mut link).is_empty());
        assert!(link.events().is_empty());
        assert!(!sender.is_timer_running());
    }

    #[test]
    fn test_timer_restarts_then_stops_when_window_empties() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();
        fill(&mut sender, &mut link, 2);
        link.drain();

        ack(&mut sender, &mut link, 0);
        assert_eq!(
            link.drain(),
            vec![
                LinkEvent::TimerStopped(EntityId::A),
                LinkEvent::TimerStarted(EntityId::A, 24.0),
            ]
        );

        ack(&mut sender, &mut link, 1);
        assert_eq!(link.drain(), vec![LinkEvent::TimerStopped(EntityId::A)]);
        assert!(sender.is_idle());
        assert!(!sender.is_timer_running());
    }

    #[test]
    fn test_duplicate_and_stale_acks_are_noops() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();
        fill(&mut sender, &mut link, 3);
        ack(&mut sender, &mut link, 2);
        link.drain();

        assert_eq!(ack(&mut sender, &mut link, 2), AckOutcome::Duplicate { seqnum: 2 });
        assert_eq!(ack(&mut sender, &mut link, 7), AckOutcome::Stale { acknum: Some(7) });
        assert!(link.events().is_empty());

        ack(&mut sender, &mut link, 0);
        // 0은 이미 윈도우 밖
        assert_eq!(ack(&mut sender, &mut link, 0), AckOutcome::Stale { acknum: Some(0) });
        assert_eq!(ack(&mut sender, &mut link, SEQ_SPACE - 1), AckOutcome::Stale {
            acknum: Some(SEQ_SPACE as i32 - 1)
        });

        let stats = sender.stats();
        assert_eq!(stats.duplicate_acks, 1);
        assert_eq!(stats.stale_acks, 3);
        assert_eq!(stats.new_acks, 2);
    }

    #[test]
    fn test_corrupted_ack_is_ignored() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();
        fill(&mut sender, &mut link, 1);
        link.drain();

        let good = Packet::ack(0);
        let bad = Packet::from_raw_parts(good.seqnum(), good.acknum(), good.checksum() + 1, *good.payload());

        assert_eq!(sender.on_ack(&bad, &mut link), AckOutcome::Corrupted);
        assert_eq!(sender.in_flight(), 1);
        assert!(link.events().is_empty());
        assert_eq!(sender.stats().corrupted_acks, 1);
    }

    #[test]
    fn test_sequence_numbers_wrap() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();

        for i in 0..(2 * SEQ_SPACE) {
            let expected = i % SEQ_SPACE;
            assert_eq!(
                sender.submit(&msg(i as u8), &mut link),
                SubmitOutcome::Sent { seqnum: expected }
            );
            assert_eq!(
                ack(&mut sender, &mut link, expected),
                AckOutcome::Acked { seqnum: expected, slid: 1 }
            );
        }
        assert_eq!(sender.base(), 0);
        assert!(sender.is_idle());
    }

    #[test]
    fn test_due_time_follows_clock() {
        let mut link = Transcript::new();
        let mut sender = Sender::new();

        link.advance(10.0);
        sender.submit(&msg(0), &mut link);
        assert_eq!(sender.due_time(0), Some(34.0));

        link.advance(24.0);
        sender.on_timeout(&mut link);
        assert_eq!(sender.due_time(0), Some(58.0));

        ack(&mut sender, &mut link, 0);
        assert_eq!(sender.due_time(0), None);
    }
}
