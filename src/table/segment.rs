//! 分段 - 一个锁保护的桶切片与占用位图

use crate::table::entry::{Chain, FlowEntry};

/// 占用位图：每桶一位，置位当且仅当桶头非空
#[derive(Debug)]
pub(crate) struct OccupancyMask {
    words: Vec<u64>,
    len: usize,
}

impl OccupancyMask {
    pub fn new(len: usize) -> Self {
        OccupancyMask {
            words: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len, "位图索引越界: {}", index);
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    pub fn clear(&mut self, index: usize) {
        debug_assert!(index < self.len, "位图索引越界: {}", index);
        self.words[index / 64] &= !(1u64 << (index % 64));
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "位图索引越界: {}", index);
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// 从 `start`（含）起查找下一个置位
    pub fn first_set_from(&self, start: usize) -> Option<usize> {
        if start >= self.len {
            return None;
        }
        let mut word_idx = start / 64;
        // 首字屏蔽 start 之前的位
        let mut word = self.words[word_idx] & (!0u64 << (start % 64));
        loop {
            if word != 0 {
                let index = word_idx * 64 + word.trailing_zeros() as usize;
                return (index < self.len).then_some(index);
            }
            word_idx += 1;
            if word_idx >= self.words.len() {
                return None;
            }
            word = self.words[word_idx];
        }
    }
}

/// 一个独立可锁的桶存储分段
pub(crate) struct Segment {
    pub buckets: Vec<Chain>,
    pub mask: OccupancyMask,
}

impl Segment {
    pub fn new(nbuckets: usize) -> Self {
        let mut buckets = Vec::with_capacity(nbuckets);
        buckets.resize_with(nbuckets, || None);
        Segment {
            buckets,
            mask: OccupancyMask::new(nbuckets),
        }
    }

    /// 从指定桶中摘除所有被判定淘汰的条目
    ///
    /// 摘下的条目移入 `freed`，幸存者按原插入顺序重新成链；
    /// 链空时清占用位。释放 `freed` 里的引用是调用方解锁之后
    /// 的事，这里只做结构性摘链。
    pub fn sweep_bucket<F>(&mut self, slot: usize, mut doomed: F, freed: &mut Vec<Box<FlowEntry>>)
    where
        F: FnMut(&FlowEntry) -> bool,
    {
        if self.buckets[slot].is_none() {
            // 置位却无条目说明链已损坏
            crate::log_error!("占用位置位但桶 {} 为空", slot);
            debug_assert!(!self.mask.get(slot), "占用位与桶头不一致");
            self.mask.clear(slot);
            return;
        }

        let mut rest = self.buckets[slot].take();
        let mut kept: Vec<Box<FlowEntry>> = Vec::new();
        while let Some(mut entry) = rest {
            rest = entry.next.take();
            if doomed(&entry) {
                freed.push(entry);
            } else {
                kept.push(entry);
            }
        }

        // 逆序回链，保持原插入顺序
        let mut rebuilt: Chain = None;
        for mut entry in kept.into_iter().rev() {
            entry.next = rebuilt;
            rebuilt = Some(entry);
        }

        if rebuilt.is_none() {
            self.mask.clear(slot);
        }
        self.buckets[slot] = rebuilt;
    }
}
