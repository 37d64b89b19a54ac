//! 核心类型定义 - 流键、标志位与外部协作者接口

use std::{
    fmt,
    net::{Ipv4Addr, Ipv6Addr},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Instant,
};

/// 流所属的传输协议类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
    /// 无端口协议，仅按目的地址缓存
    Other,
}

impl Protocol {
    /// 协议对应的标志位（无端口协议没有类别位）
    pub fn to_flags(self) -> FlowFlags {
        match self {
            Protocol::Tcp => FlowFlags::TCP,
            Protocol::Udp => FlowFlags::UDP,
            Protocol::Sctp => FlowFlags::SCTP,
            Protocol::Other => FlowFlags::empty(),
        }
    }

    /// 从标志位还原协议类别
    pub fn from_flags(flags: FlowFlags) -> Self {
        if flags.contains(FlowFlags::TCP) {
            Protocol::Tcp
        } else if flags.contains(FlowFlags::SCTP) {
            Protocol::Sctp
        } else if flags.contains(FlowFlags::UDP) {
            Protocol::Udp
        } else {
            Protocol::Other
        }
    }

    /// 参与目的-only 哈希偏移的协议编号
    pub fn as_u8(self) -> u8 {
        match self {
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Sctp => 132,
            Protocol::Other => 0,
        }
    }
}

/// 流标志位集合
///
/// 低位为命中状态位（观测到的 TCP 握手/挥手历史），高位为
/// 条目属性位。按位集合运算实现，避免 transmute。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowFlags(u16);

impl FlowFlags {
    /// 观测到 SYN
    pub const SYN: FlowFlags = FlowFlags(1 << 0);
    /// 观测到 ACK
    pub const ACK: FlowFlags = FlowFlags(1 << 1);
    /// 观测到 FIN
    pub const FIN: FlowFlags = FlowFlags(1 << 2);
    /// 观测到 RST
    pub const RST: FlowFlags = FlowFlags(1 << 3);
    /// TCP 流
    pub const TCP: FlowFlags = FlowFlags(1 << 4);
    /// UDP 流
    pub const UDP: FlowFlags = FlowFlags(1 << 5);
    /// SCTP 流
    pub const SCTP: FlowFlags = FlowFlags(1 << 6);
    /// IPv6 地址族
    pub const IPV6: FlowFlags = FlowFlags(1 << 7);
    /// 强制过期标记（全元组模式下观测到 RST/FIN 时设置）
    pub const STALE: FlowFlags = FlowFlags(1 << 8);
    /// 本次查找禁止未命中时自动解析
    pub const NO_AUTO: FlowFlags = FlowFlags(1 << 9);

    /// 空标志集
    pub const fn empty() -> Self {
        FlowFlags(0)
    }

    /// 是否包含给定全部标志
    pub const fn contains(self, other: FlowFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// 是否与给定标志有交集
    pub const fn intersects(self, other: FlowFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// 合并标志（命中时把新观测状态并入条目）
    pub fn insert(&mut self, other: FlowFlags) {
        self.0 |= other.0;
    }

    /// 两个标志集的交集
    pub const fn intersection(self, other: FlowFlags) -> FlowFlags {
        FlowFlags(self.0 & other.0)
    }

    /// 原始位值
    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl std::ops::BitOr for FlowFlags {
    type Output = FlowFlags;

    fn bitor(self, rhs: FlowFlags) -> FlowFlags {
        FlowFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for FlowFlags {
    fn bitor_assign(&mut self, rhs: FlowFlags) {
        self.0 |= rhs.0;
    }
}

/// 归一化流键
///
/// 键提取器（外部协作者）从报文解析得到。缓存内部按键的
/// 规范字序列（IPv4 为 3 个字，IPv6 为 9 个字）进行哈希与比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKey {
    V4 {
        proto: Protocol,
        saddr: Ipv4Addr,
        daddr: Ipv4Addr,
        sport: u16,
        dport: u16,
    },
    V6 {
        proto: Protocol,
        saddr: Ipv6Addr,
        daddr: Ipv6Addr,
        sport: u16,
        dport: u16,
    },
}

impl FlowKey {
    /// 构造 IPv4 流键
    pub fn v4(proto: Protocol, saddr: Ipv4Addr, daddr: Ipv4Addr, sport: u16, dport: u16) -> Self {
        FlowKey::V4 {
            proto,
            saddr,
            daddr,
            sport,
            dport,
        }
    }

    /// 构造 IPv6 流键
    pub fn v6(proto: Protocol, saddr: Ipv6Addr, daddr: Ipv6Addr, sport: u16, dport: u16) -> Self {
        FlowKey::V6 {
            proto,
            saddr,
            daddr,
            sport,
            dport,
        }
    }

    pub fn proto(&self) -> Protocol {
        match *self {
            FlowKey::V4 { proto, .. } | FlowKey::V6 { proto, .. } => proto,
        }
    }

    pub fn is_v6(&self) -> bool {
        matches!(self, FlowKey::V6 { .. })
    }

    pub fn sport(&self) -> u16 {
        match *self {
            FlowKey::V4 { sport, .. } | FlowKey::V6 { sport, .. } => sport,
        }
    }

    pub fn dport(&self) -> u16 {
        match *self {
            FlowKey::V4 { dport, .. } | FlowKey::V6 { dport, .. } => dport,
        }
    }
}

/// 流键的规范字序列
///
/// IPv4: `[端口字, 源地址, 目的地址]`；
/// IPv6: `[端口字, 目的地址 x4, 源地址 x4]`。
/// 目的-only 模式下端口字与源地址字全为零。
/// 相等性即逐字比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWords {
    V4([u32; 3]),
    V6([u32; 9]),
}

impl KeyWords {
    pub fn as_slice(&self) -> &[u32] {
        match self {
            KeyWords::V4(w) => w,
            KeyWords::V6(w) => w,
        }
    }

    /// 端口字（高 16 位源端口，低 16 位目的端口）
    pub fn ports_word(&self) -> u32 {
        self.as_slice()[0]
    }
}

impl fmt::Display for KeyWords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = self.as_slice();
        for (i, w) in words.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:08x}", w)?;
        }
        Ok(())
    }
}

/// 路由句柄 - 路由解析协作者拥有的不透明对象
///
/// 条目通过 `Arc` 持有强引用，驱逐时随条目销毁一并释放。
pub trait Route: Send + Sync {
    /// 路由当前是否可用
    fn is_up(&self) -> bool;

    /// 是否主机路由（主机路由失效即条目过期）
    fn is_host_route(&self) -> bool;

    /// 路由挂接的网络接口
    fn interface(&self) -> Option<Arc<dyn Interface>>;
}

/// 网络接口查询接口
pub trait Interface: Send + Sync {
    /// 链路是否处于 up 状态
    fn is_link_up(&self) -> bool;

    /// 回环接口不缓存
    fn is_loopback(&self) -> bool;

    /// 点对点接口不缓存
    fn is_point_to_point(&self) -> bool;
}

/// 链路层条目句柄（邻居解析结果）
pub trait LinkLayer: Send + Sync {
    /// 链路层条目是否仍然有效
    fn is_valid(&self) -> bool;
}

/// 路由与链路层解析协作者
///
/// 未命中慢路径的全部外部工作：路由表查找与邻居解析。
/// 网关路由向网关地址解析链路层是解析器自身的职责。
pub trait FlowResolver: Send + Sync {
    /// 按目的地址与 FIB 查找路由；无路由时返回 `None`
    fn resolve_route(&self, key: &FlowKey, fib: u32) -> Option<Arc<dyn Route>>;

    /// 为路由解析链路层条目；失败时返回 `None`
    fn resolve_link(&self, route: &Arc<dyn Route>, key: &FlowKey) -> Option<Arc<dyn LinkLayer>>;
}

/// 单调时钟 - 所有空闲时间计算的秒级时间源
pub trait Clock: Send + Sync {
    /// 自进程/系统启动以来的秒数
    fn uptime(&self) -> u32;
}

/// 真实单调时钟
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn uptime(&self) -> u32 {
        self.start.elapsed().as_secs() as u32
    }
}

/// 可手动推进的时钟，测试专用
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub fn new(start: u32) -> Self {
        ManualClock {
            now: AtomicU32::new(start),
        }
    }

    /// 推进若干秒
    pub fn advance(&self, secs: u32) {
        self.now.fetch_add(secs, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn uptime(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}
