//! 원형 시퀀스 공간 산술과 슬롯 버퍼
//!
//! 모든 시퀀스 번호는 `0..SEQ_SPACE` 범위. 윈도우는 `base`부터 시작하는
//! `WINDOW_SIZE`개의 연속 번호 (모듈로 `SEQ_SPACE`).

use crate::{SEQ_SPACE, WINDOW_SIZE};

/// `seqnum`이 `base`에서 시작하는 윈도우 안에 있는지 확인
///
/// `base + WINDOW_SIZE - 1`이 시퀀스 공간을 넘어가면 wrap 구간으로 판정한다.
pub fn is_in_window(base: usize, seqnum: usize) -> bool {
    let last = (base + WINDOW_SIZE - 1) % SEQ_SPACE;
    if base <= last {
        seqnum >= base && seqnum < base + WINDOW_SIZE
    } else {
        seqnum >= base || seqnum < (base + WINDOW_SIZE) % SEQ_SPACE
    }
}

/// `base`에서 `seqnum`까지의 전진 거리
pub fn offset(base: usize, seqnum: usize) -> usize {
    (seqnum + SEQ_SPACE - base) % SEQ_SPACE
}

/// 다음 시퀀스 번호
pub fn next(seqnum: usize) -> usize {
    (seqnum + 1) % SEQ_SPACE
}

/// 이전 시퀀스 번호 (0의 이전은 `SEQ_SPACE - 1`)
pub fn prev(seqnum: usize) -> usize {
    if seqnum == 0 {
        SEQ_SPACE - 1
    } else {
        seqnum - 1
    }
}

/// 와이어 값을 시퀀스 번호로 변환 (범위 밖이면 None)
pub fn seq_index(raw: i32) -> Option<usize> {
    usize::try_from(raw).ok().filter(|&s| s < SEQ_SPACE)
}

/// 시퀀스 번호로 인덱싱되는 고정 크기 슬롯 버퍼
///
/// 슬롯은 해제되지 않고 논리적으로 비워진다.
#[derive(Debug, Clone)]
pub struct SeqSlots<T> {
    slots: [Option<T>; SEQ_SPACE],
}

impl<T> SeqSlots<T> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    pub fn get(&self, seqnum: usize) -> Option<&T> {
        self.slots[seqnum % SEQ_SPACE].as_ref()
    }

    pub fn insert(&mut self, seqnum: usize, value: T) -> Option<T> {
        self.slots[seqnum % SEQ_SPACE].replace(value)
    }

    pub fn take(&mut self, seqnum: usize) -> Option<T> {
        self.slots[seqnum % SEQ_SPACE].take()
    }

    /// 사용 중인 슬롯 수
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl<T> Default for SeqSlots<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_members(base: usize) -> Vec<usize> {
        (0..SEQ_SPACE).filter(|&s| is_in_window(base, s)).collect()
    }

    #[test]
    fn test_window_without_wrap() {
        assert_eq!(window_members(0), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(window_members(7), vec![7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_window_with_wrap() {
        assert_eq!(window_members(10), vec![0, 1, 2, 10, 11, 12]);
        assert_eq!(window_members(8), vec![0, 8, 9, 10, 11, 12]);
        assert_eq!(window_members(12), vec![0, 1, 2, 3, 4, 12]);
    }

    #[test]
    fn test_window_matches_offset_for_all_pairs() {
        for base in 0..SEQ_SPACE {
            for seq in 0..SEQ_SPACE {
                let expected = offset(base, seq) < WINDOW_SIZE;
                assert_eq!(is_in_window(base, seq), expected, "base={base} seq={seq}");
            }
            assert_eq!(window_members(base).len(), WINDOW_SIZE);
        }
    }

    #[test]
    fn test_next_prev_wrap() {
        assert_eq!(next(SEQ_SPACE - 1), 0);
        assert_eq!(prev(0), SEQ_SPACE - 1);
        assert_eq!(prev(next(5)), 5);
    }

    #[test]
    fn test_seq_index_bounds() {
        assert_eq!(seq_index(0), Some(0));
        assert_eq!(seq_index(12), Some(12));
        assert_eq!(seq_index(13), None);
        assert_eq!(seq_index(-1), None);
        assert_eq!(seq_index(999_999), None);
    }

    #[test]
    fn test_slots_insert_take() {
        let mut slots: SeqSlots<u32> = SeqSlots::new();
        assert!(slots.insert(3, 30).is_none());
        assert_eq!(slots.occupied(), 1);
        assert_eq!(slots.get(3 + SEQ_SPACE), Some(&30));
        assert_eq!(slots.take(3), Some(30));
        assert!(slots.get(3).is_none());
        assert_eq!(slots.occupied(), 0);
    }
}
