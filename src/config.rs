//! 流表配置 - 表尺寸、分片模式与空闲超时默认值

use crate::error::FlowError;

/// SYN-only 流的默认空闲超时（秒）
pub const SYN_IDLE: u32 = 300;
/// UDP/无连接状态流的默认空闲超时（秒）
pub const UDP_IDLE: u32 = 300;
/// FIN-wait 流的默认空闲超时（秒）
pub const FIN_WAIT_IDLE: u32 = 600;
/// 已建立 TCP 连接的默认空闲超时（秒）
pub const TCP_IDLE: u32 = 24 * 3600;

/// 目的-only 表的统一空闲超时（秒）：纯缓存语义，不用久留
pub const DEST_ONLY_IDLE: u32 = 30;
/// 表满压力下收缩到的最小空闲超时（秒）
pub const PRESSURE_IDLE: u32 = 5;

/// 分片模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// 单一桶数组，条带锁保护；调用方不保证 CPU 局部性（接收侧）
    Shared,
    /// 每工作线程一个完整分片，互不干扰；调用方保证同一流
    /// 始终在同一线程处理（发送侧）
    Private { shards: usize },
}

/// 流表配置
#[derive(Debug, Clone)]
pub struct FlowTableConfig {
    /// 每分片桶数。无需是 2 的幂（索引用取模），但 2 的幂
    /// 对缓存更友好
    pub size: usize,
    /// 条目池硬上限，超出后非阻塞分配立即失败
    pub max_flows: usize,
    /// 分片模式
    pub mode: TableMode,
    /// 全元组键控（端口 + 双地址）。false 时仅按目的地址键控
    pub hash_all: bool,
    /// 整表开关，关闭后所有查找立即未命中
    pub enabled: bool,
    /// 四档空闲超时（秒）
    pub syn_idle: u32,
    pub udp_idle: u32,
    pub fin_wait_idle: u32,
    pub tcp_idle: u32,
}

impl Default for FlowTableConfig {
    fn default() -> Self {
        FlowTableConfig {
            size: 2048,
            max_flows: 8192,
            mode: TableMode::Shared,
            hash_all: true,
            enabled: true,
            syn_idle: SYN_IDLE,
            udp_idle: UDP_IDLE,
            fin_wait_idle: FIN_WAIT_IDLE,
            tcp_idle: TCP_IDLE,
        }
    }
}

impl FlowTableConfig {
    /// 目的-only 表：仅按目的地址键控，所有超时统一为 30 秒
    pub fn dest_only() -> Self {
        FlowTableConfig {
            hash_all: false,
            syn_idle: DEST_ONLY_IDLE,
            udp_idle: DEST_ONLY_IDLE,
            fin_wait_idle: DEST_ONLY_IDLE,
            tcp_idle: DEST_ONLY_IDLE,
            ..Default::default()
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.size < 256 {
            return Err(FlowError::InvalidConfig {
                reason: format!("size 至少为 256，当前为 {}", self.size),
            });
        }
        if self.max_flows == 0 {
            return Err(FlowError::InvalidConfig {
                reason: "max_flows 不能为 0".into(),
            });
        }
        if let TableMode::Private { shards } = self.mode {
            if shards == 0 {
                return Err(FlowError::InvalidConfig {
                    reason: "私有模式分片数不能为 0".into(),
                });
            }
        }
        if !self.size.is_power_of_two() {
            crate::log_warn!("表尺寸 {} 不是 2 的幂，对缓存不友好", self.size);
        }
        Ok(())
    }
}
