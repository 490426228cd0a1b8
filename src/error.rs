//! 에러 타입 정의
//!
//! 손상/손실/중복/윈도우 초과 같은 채널 상황은 에러가 아니라 정상 동작이므로
//! 여기에 포함되지 않는다. 결과 enum과 통계 카운터로만 드러난다.

use thiserror::Error;

use crate::link::EntityId;

/// SRQ 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("유효하지 않은 패킷 길이: expected {expected}, got {got}")]
    InvalidPacketLength { expected: usize, got: usize },

    #[error("유효하지 않은 확률 값: {name}={value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("유효하지 않은 설정: {0}")]
    InvalidConfig(String),

    #[error("엔티티 {entity}는 {operation}을(를) 지원하지 않음 (단방향 전송)")]
    Unsupported {
        entity: EntityId,
        operation: &'static str,
    },

    #[error("채널 에러")]
    ChannelError,

    #[error("연결 종료")]
    ConnectionClosed,
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
