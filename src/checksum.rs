//! 가산 체크섬과 손상 검출
//!
//! `seqnum + acknum + Σ payload` 의 단순 합. 충돌 저항성이 없는 약한 검사로,
//! 바이트 순서가 바뀌거나 증감이 상쇄되는 손상은 검출하지 못한다.

use crate::packet::Packet;
use crate::NOT_IN_USE;

/// 패킷 체크섬 계산 (정수 오버플로는 wrap)
pub fn compute_checksum(packet: &Packet) -> i32 {
    let acknum = packet.acknum().unwrap_or(NOT_IN_USE);
    packet
        .payload()
        .iter()
        .fold(packet.seqnum().wrapping_add(acknum), |sum, &b| {
            sum.wrapping_add(i32::from(b))
        })
}

/// 저장된 체크섬이 재계산 값과 다르면 손상
pub fn is_corrupted(packet: &Packet) -> bool {
    packet.checksum() != compute_checksum(packet)
}
