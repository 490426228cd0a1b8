//! 전송 통계
//!
//! 모든 채널 상황(손상, 손실, 중복, 윈도우 초과)은 에러 대신 여기 카운터로 남는다.

/// 송신자(A) 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// 애플리케이션이 요청한 메시지 수
    pub messages_submitted: u64,

    /// 윈도우가 가득 차 버려진 메시지 수
    pub window_full: u64,

    /// 최초 전송한 데이터 패킷 수
    pub packets_sent: u64,

    /// 재전송한 데이터 패킷 수
    pub packets_resent: u64,

    /// 타이머 만료 횟수
    pub timeouts: u64,

    /// 손상되지 않은 ACK 수신 수
    pub acks_received: u64,

    /// 새로 확인된 ACK 수
    pub new_acks: u64,

    /// 이미 확인된 번호의 중복 ACK 수
    pub duplicate_acks: u64,

    /// 윈도우 밖 번호의 ACK 수
    pub stale_acks: u64,

    /// 손상된 ACK 수
    pub corrupted_acks: u64,
}

/// 수신자(B) 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// 손상되지 않은 패킷 수신 수
    pub packets_received: u64,

    /// 손상된 패킷 수
    pub corrupted_packets: u64,

    /// 이미 버퍼링된 번호의 중복 패킷 수
    pub duplicate_packets: u64,

    /// 수신 윈도우 밖 패킷 수
    pub out_of_window_packets: u64,

    /// 보낸 ACK 수
    pub acks_sent: u64,

    /// 애플리케이션에 전달한 메시지 수
    pub messages_delivered: u64,
}

/// 채널 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// 채널에 들어온 패킷 수
    pub offered: u64,

    /// 손실된 패킷 수
    pub lost: u64,

    /// 손상된 패킷 수
    pub corrupted: u64,

    /// 반대편에 도착한 패킷 수 (손상 포함)
    pub delivered: u64,
}

impl ChannelStats {
    /// 손실률
    pub fn loss_rate(&self) -> f64 {
        if self.offered == 0 {
            return 0.0;
        }
        self.lost as f64 / self.offered as f64
    }
}

/// 전체 전송 통계
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransferStats {
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
    pub channel: ChannelStats,

    /// 경과 시간 (틱)
    pub elapsed: f64,
}

impl TransferStats {
    /// 재전송 비율 (재전송 / 전체 데이터 전송)
    pub fn retransmit_ratio(&self) -> f64 {
        let total = self.sender.packets_sent + self.sender.packets_resent;
        if total == 0 {
            return 0.0;
        }
        self.sender.packets_resent as f64 / total as f64
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.1} ticks | Submitted: {} (window full: {}) | Sent: {} + {} resent | \
             ACKs: {} new / {} dup / {} corrupt | Received: {} (corrupt {}, dup {}, outside {}) | \
             Delivered: {} | Channel loss: {:.2}%",
            self.elapsed,
            self.sender.messages_submitted,
            self.sender.window_full,
            self.sender.packets_sent,
            self.sender.packets_resent,
            self.sender.new_acks,
            self.sender.duplicate_acks,
            self.sender.corrupted_acks,
            self.receiver.packets_received,
            self.receiver.corrupted_packets,
            self.receiver.duplicate_packets,
            self.receiver.out_of_window_packets,
            self.receiver.messages_delivered,
            self.channel.loss_rate() * 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratios_on_empty_stats() {
        let stats = TransferStats::default();
        assert_eq!(stats.retransmit_ratio(), 0.0);
        assert_eq!(stats.channel.loss_rate(), 0.0);
    }

    #[test]
    fn test_summary_mentions_counters() {
        let mut stats = TransferStats::default();
        stats.sender.packets_sent = 3;
        stats.sender.packets_resent = 1;
        stats.receiver.messages_delivered = 3;
        stats.channel.offered = 4;
        stats.channel.lost = 1;

        assert_eq!(stats.retransmit_ratio(), 0.25);
        let summary = stats.summary();
        assert!(summary.contains("Sent: 3 + 1 resent"));
        assert!(summary.contains("Delivered: 3"));
        assert!(summary.contains("Channel loss: 25.00%"));
    }
}
