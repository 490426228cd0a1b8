//! # SRQ (Selective-Repeat ARQ)
//!
//! 손실/손상/지연이 있는 단방향 채널 위에서 순서 보장 신뢰 전송을 제공하는
//! Selective-Repeat 스타일 ARQ 코어
//!
//! ## 핵심 특징
//! - **개별 ACK**: 패킷 단위 선택적 확인 응답 (누적 ACK 아님)
//! - **원형 시퀀스 공간**: `SEQ_SPACE` 모듈로 윈도우 산술
//! - **단일 타이머**: 송신자당 하나의 재전송 타이머, 만료 시 미확인 패킷 전체 재전송
//! - **수신 버퍼링**: 윈도우 내 순서 뒤바뀐 패킷을 버퍼링 후 연속 구간 전달
//! - **이벤트 구동**: 채널/타이머/애플리케이션은 [`Link`] 인터페이스로 분리
//!
//! ## 구성
//! - [`checksum`], [`window`]: 상태 없는 순수 함수
//! - [`sender`], [`receiver`]: 엔티티 A/B 상태 머신
//! - [`protocol`]: 스케줄러가 호출하는 콜백 표면
//! - [`simulator`], [`net`]: 이산 사건 시뮬레이터와 UDP 노드 드라이버

pub mod channel;
pub mod checksum;
pub mod config;
pub mod error;
pub mod link;
pub mod net;
pub mod packet;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod simulator;
pub mod stats;
pub mod timer;
pub mod window;

pub use channel::{ChannelModel, Transit};
pub use checksum::{compute_checksum, is_corrupted};
pub use config::Config;
pub use error::{Error, Result};
pub use link::{EntityId, Link, LinkEvent, Transcript};
pub use net::{ReceiverNode, SenderNode};
pub use packet::{Message, Packet, Payload};
pub use protocol::{Endpoints, Outcome};
pub use receiver::{PacketOutcome, Receiver};
pub use sender::{AckOutcome, Sender, SubmitOutcome};
pub use simulator::{SimReport, Simulator};
pub use stats::{ChannelStats, ReceiverStats, SenderStats, TransferStats};
pub use window::is_in_window;

/// 송신 윈도우 크기 (동시에 확인 대기 가능한 최대 패킷 수)
pub const WINDOW_SIZE: usize = 6;

/// 시퀀스 공간 크기 (시퀀스 번호는 `0..SEQ_SPACE`)
pub const SEQ_SPACE: usize = 13;

/// 왕복 시간 (시뮬레이션 틱)
pub const RTT: f64 = 16.0;

/// 재전송 타임아웃 (RTT × 1.5 = 24 틱)
pub const TIMEOUT: f64 = RTT * 1.5;

/// 메시지/패킷 페이로드 크기 (바이트)
pub const PAYLOAD_SIZE: usize = 20;

/// 사용하지 않는 헤더 필드 값 (와이어 상의 빈 acknum)
pub const NOT_IN_USE: i32 = -1;

// 수신자가 새 전송과 이전 윈도우의 중복을 구분하려면 필요
const _: () = assert!(SEQ_SPACE >= WINDOW_SIZE + 1);
