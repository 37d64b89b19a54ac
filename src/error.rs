//! 统一错误处理 - 流表所有可能的错误类型与恢复语义

/// 流表操作可能发生的错误
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// 缓存未命中：表禁用、协议不支持、解析失败等，一律走慢路径
    #[error("缓存未命中，需走完整解析路径")]
    NotFound,

    /// 插入竞争失败或真实键冲突：另一条查找已缓存了该流
    #[error("条目已存在 (hash: {hash:#010x})")]
    AlreadyExists { hash: u32 },

    /// 条目池已达上限，非阻塞分配立即失败
    #[error("条目池已满，无法分配 (上限: {max}, 当前: {current})")]
    ResourceExhausted { max: usize, current: usize },

    /// 无效配置
    #[error("无效配置: {reason}")]
    InvalidConfig { reason: String },
}

impl FlowError {
    /// 是否应作为普通缓存未命中对待（绝不按错误记日志）
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound | Self::ResourceExhausted { .. })
    }

    /// 是否可由调用方就地恢复
    ///
    /// `AlreadyExists` 的恢复方式是沿用调用方自己已完成的解析结果，
    /// 绝不向原始请求上报失败。
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidConfig { .. })
    }

    /// 是否由并发竞争引起
    pub fn is_race(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
