//! 패킷과 메시지 정의
//!
//! 와이어 레이아웃은 고정 크기 (가변 길이 필드 없음):
//!
//! ```text
//! seqnum(i32) | acknum(i32, 미사용 시 -1) | checksum(i32) | payload([u8; 20])
//! ```
//!
//! 총 [`PACKET_WIRE_LEN`] = 32 바이트, bincode 기본 설정 (little-endian)

use serde::{Deserialize, Serialize};

use crate::checksum::compute_checksum;
use crate::{Error, Result, NOT_IN_USE, PAYLOAD_SIZE};

/// 고정 크기 페이로드
pub type Payload = [u8; PAYLOAD_SIZE];

/// 직렬화된 패킷 크기 (바이트)
pub const PACKET_WIRE_LEN: usize = 4 + 4 + 4 + PAYLOAD_SIZE;

/// ACK 패킷의 페이로드 채움 문자
pub const ACK_FILL: u8 = b'0';

/// 애플리케이션 계층 메시지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub data: Payload,
}

impl Message {
    /// 같은 바이트로 채운 메시지
    pub fn filled(byte: u8) -> Self {
        Self {
            data: [byte; PAYLOAD_SIZE],
        }
    }
}

/// 프로토콜 패킷 (데이터 또는 ACK)
///
/// 생성 후 변경 불가. 체크섬은 생성 시 계산되며, 채널에서 도착한 패킷은
/// [`Packet::from_raw_parts`]로 저장된 체크섬을 그대로 보존한다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WirePacket", into = "WirePacket")]
pub struct Packet {
    seqnum: i32,
    acknum: Option<i32>,
    checksum: i32,
    payload: Payload,
}

impl Packet {
    /// 데이터 패킷 생성 (acknum 미사용)
    pub fn data(seqnum: usize, payload: Payload) -> Self {
        Self::sealed(seqnum as i32, None, payload)
    }

    /// ACK 패킷 생성
    ///
    /// seqnum은 사용하지 않으므로 0, 페이로드는 `'0'`으로 채운다.
    pub fn ack(acknum: usize) -> Self {
        Self::sealed(0, Some(acknum as i32), [ACK_FILL; PAYLOAD_SIZE])
    }

    fn sealed(seqnum: i32, acknum: Option<i32>, payload: Payload) -> Self {
        let mut packet = Self {
            seqnum,
            acknum,
            checksum: 0,
            payload,
        };
        packet.checksum = compute_checksum(&packet);
        packet
    }

    /// 필드를 그대로 사용해 패킷 구성 (체크섬 재계산 없음)
    ///
    /// 와이어에서 읽은 패킷이나 채널에서 변조된 패킷을 표현할 때 사용
    pub fn from_raw_parts(seqnum: i32, acknum: Option<i32>, checksum: i32, payload: Payload) -> Self {
        Self {
            seqnum,
            acknum,
            checksum,
            payload,
        }
    }

    pub fn seqnum(&self) -> i32 {
        self.seqnum
    }

    pub fn acknum(&self) -> Option<i32> {
        self.acknum
    }

    pub fn checksum(&self) -> i32 {
        self.checksum
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// 바이트로 직렬화
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// 바이트에서 역직렬화
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PACKET_WIRE_LEN {
            return Err(Error::InvalidPacketLength {
                expected: PACKET_WIRE_LEN,
                got: bytes.len(),
            });
        }
        Ok(bincode::deserialize(bytes)?)
    }
}

/// 와이어 표현 (빈 acknum은 -1)
#[derive(Clone, Serialize, Deserialize)]
struct WirePacket {
    seqnum: i32,
    acknum: i32,
    checksum: i32,
    payload: Payload,
}

impl From<Packet> for WirePacket {
    fn from(packet: Packet) -> Self {
        Self {
            seqnum: packet.seqnum,
            acknum: packet.acknum.unwrap_or(NOT_IN_USE),
            checksum: packet.checksum,
            payload: packet.payload,
        }
    }
}

impl From<WirePacket> for Packet {
    fn from(wire: WirePacket) -> Self {
        Self {
            seqnum: wire.seqnum,
            acknum: (wire.acknum != NOT_IN_USE).then_some(wire.acknum),
            checksum: wire.checksum,
            payload: wire.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_length_is_fixed() {
        let data = Packet::data(7, [b'x'; PAYLOAD_SIZE]);
        let ack = Packet::ack(12);

        assert_eq!(data.to_bytes().unwrap().len(), PACKET_WIRE_LEN);
        assert_eq!(ack.to_bytes().unwrap().len(), PACKET_WIRE_LEN);
    }

    #[test]
    fn test_absent_acknum_encoded_as_not_in_use() {
        let packet = Packet::data(3, [1u8; PAYLOAD_SIZE]);
        let bytes = packet.to_bytes().unwrap();

        assert_eq!(&bytes[4..8], &NOT_IN_USE.to_le_bytes());

        let restored = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(restored.acknum(), None);
        assert_eq!(restored, packet);
    }

    #[test]
    fn test_ack_layout() {
        let ack = Packet::ack(5);
        assert_eq!(ack.seqnum(), 0);
        assert_eq!(ack.acknum(), Some(5));
        assert!(ack.payload().iter().all(|&b| b == ACK_FILL));
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let mut bytes = Packet::ack(1).to_bytes().unwrap();
        bytes.pop();
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(Error::InvalidPacketLength { expected: PACKET_WIRE_LEN, got: 31 })
        ));
    }
}
