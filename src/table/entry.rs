//! 流条目 - 缓存的解析结果与桶内碰撞链

use crate::{
    pool::PoolPermit,
    types::{FlowFlags, KeyWords, LinkLayer, Protocol, Route},
};
use std::sync::Arc;

/// 桶内碰撞链：所有权内联的单链表，结构性修改仅在分段锁内进行
pub(crate) type Chain = Option<Box<FlowEntry>>;

/// 缓存的流条目
///
/// 对路由与链路层句柄各持一个强引用，在插入时获取，仅在条目
/// 已从链上摘除之后（且不持有分段锁时）随条目销毁一并释放。
pub(crate) struct FlowEntry {
    /// 计算哈希；0 为"非活动条目"哨兵，一律视为过期
    pub hash: u32,
    pub proto: Protocol,
    pub flags: FlowFlags,
    /// 转发表实例标识
    pub fib: u32,
    /// 最近访问时刻（uptime 秒）
    pub last_access: u32,
    pub key: KeyWords,
    pub route: Arc<dyn Route>,
    pub link: Arc<dyn LinkLayer>,
    /// 池配额，条目销毁时自动归还
    pub _permit: PoolPermit,
    pub next: Chain,
}

impl FlowEntry {
    /// 空闲时长（秒）
    pub fn idle_secs(&self, now: u32) -> u32 {
        now.saturating_sub(self.last_access)
    }
}

/// 查找命中返回的流快照
///
/// 在分段锁内克隆两个强引用后按值返回，调用方拿到的生命周期
/// 与缓存条目本身解耦（条目随时可能被清扫）。
#[derive(Clone)]
pub struct CachedFlow {
    /// 流哈希，可直接用作报文的 flow id
    pub hash: u32,
    pub route: Arc<dyn Route>,
    pub link: Arc<dyn LinkLayer>,
}

impl std::fmt::Debug for CachedFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFlow")
            .field("hash", &format_args!("{:#010x}", self.hash))
            .field("route_up", &self.route.is_up())
            .field("link_valid", &self.link.is_valid())
            .finish()
    }
}
