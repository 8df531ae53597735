//! 统一错误类型定义.
//!
//! 所有 Tao crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Tao 框架统一错误类型
#[derive(Debug, Error)]
pub enum TaoError {
    /// 无效参数 (打开编码器时的配置错误)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 前置条件被破坏 (上游模块缺陷, 不可恢复)
    #[error("前置条件被破坏: {0}")]
    InvariantViolation(String),
}

/// Tao 框架统一 Result 类型
pub type TaoResult<T> = Result<T, TaoError>;
