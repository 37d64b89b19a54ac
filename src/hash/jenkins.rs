//! one-at-a-time 风格的 32 位混合哈希
//!
//! 同时用于桶定位和链表遍历时的快速预比较。确定性输入产生
//! 确定性输出；不要求与任何既有实现的位模式兼容，只要求
//! 良好的雪崩性。

/// 对字序列计算 32 位哈希，`initval` 为置换偏移（盐）
pub fn jenkins_hash32(words: &[u32], initval: u32) -> u32 {
    let mut hash: u32 = initval;

    for &word in words {
        for byte in word.to_le_bytes() {
            hash = hash.wrapping_add(byte as u32);
            hash = hash.wrapping_add(hash << 10);
            hash ^= hash >> 6;
        }
    }

    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let words = [0x0a00_0001, 0x0a00_0002, 0x1234_5678];
        assert_eq!(jenkins_hash32(&words, 7), jenkins_hash32(&words, 7));
    }

    #[test]
    fn test_initval_changes_hash() {
        let words = [1, 2, 3];
        assert_ne!(jenkins_hash32(&words, 0), jenkins_hash32(&words, 1));
    }

    #[test]
    fn test_single_bit_avalanche() {
        // 单比特翻转应改变大量输出位
        let base = jenkins_hash32(&[0, 0, 0], 0);
        let flipped = jenkins_hash32(&[1, 0, 0], 0);
        let diff = (base ^ flipped).count_ones();
        assert!(diff >= 8, "雪崩不足: 仅 {} 位变化", diff);
    }

    #[test]
    fn test_word_order_matters() {
        assert_ne!(
            jenkins_hash32(&[1, 2, 3], 0),
            jenkins_hash32(&[3, 2, 1], 0)
        );
    }
}
