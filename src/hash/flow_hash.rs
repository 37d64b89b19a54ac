//! 流哈希器 - 键字序列编组与模式相关的盐偏移

use crate::{
    hash::jenkins::jenkins_hash32,
    types::{FlowKey, KeyWords},
};
use ahash::RandomState;
use once_cell::sync::Lazy;

/// 进程级随机盐，抵御构造性哈希洪泛
static FLOW_SALT: Lazy<u32> = Lazy::new(|| RandomState::new().hash_one(0x9e37_79b9u64) as u32);

/// 流哈希器
///
/// 全元组模式：端口 + 双地址参与哈希，盐作为置换偏移。
/// 目的-only 模式：省略端口与源地址，偏移为 `盐 + 协议号`，
/// 保证共享同一目的地址的不同协议落入不同桶。
#[derive(Debug, Clone, Copy)]
pub struct FlowHasher {
    salt: u32,
    hash_all: bool,
}

impl FlowHasher {
    pub fn new(hash_all: bool) -> Self {
        FlowHasher {
            salt: *FLOW_SALT,
            hash_all,
        }
    }

    /// 指定盐构造，测试用
    pub fn with_salt(salt: u32, hash_all: bool) -> Self {
        FlowHasher { salt, hash_all }
    }

    pub fn hash_all(&self) -> bool {
        self.hash_all
    }

    /// 编组流键的规范字序列
    pub fn key_words(&self, key: &FlowKey) -> KeyWords {
        match *key {
            FlowKey::V4 {
                saddr,
                daddr,
                sport,
                dport,
                ..
            } => {
                let mut words = [0u32; 3];
                words[2] = u32::from(daddr);
                if self.hash_all {
                    words[0] = ports_word(sport, dport);
                    words[1] = u32::from(saddr);
                }
                KeyWords::V4(words)
            }
            FlowKey::V6 {
                saddr,
                daddr,
                sport,
                dport,
                ..
            } => {
                let mut words = [0u32; 9];
                words[1..5].copy_from_slice(&addr6_words(daddr));
                if self.hash_all {
                    words[0] = ports_word(sport, dport);
                    words[5..9].copy_from_slice(&addr6_words(saddr));
                }
                KeyWords::V6(words)
            }
        }
    }

    /// 计算键字序列的 32 位哈希
    ///
    /// 0 是"非活动条目"哨兵，计算结果为 0 时重映射到 1。
    pub fn hash(&self, key: &FlowKey, words: &KeyWords) -> u32 {
        let offset = if self.hash_all {
            self.salt
        } else {
            self.salt.wrapping_add(key.proto().as_u8() as u32)
        };
        let hash = jenkins_hash32(words.as_slice(), offset);
        if hash == 0 {
            1
        } else {
            hash
        }
    }

    /// 一步完成编组与哈希
    pub fn hash_key(&self, key: &FlowKey) -> (KeyWords, u32) {
        let words = self.key_words(key);
        let hash = self.hash(key, &words);
        (words, hash)
    }
}

fn ports_word(sport: u16, dport: u16) -> u32 {
    ((sport as u32) << 16) | dport as u32
}

fn addr6_words(addr: std::net::Ipv6Addr) -> [u32; 4] {
    let octets = addr.octets();
    let mut words = [0u32; 4];
    for (i, chunk) in octets.chunks_exact(4).enumerate() {
        words[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}
