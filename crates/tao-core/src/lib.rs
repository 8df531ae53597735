//! # tao-core
//!
//! Tao 多媒体框架核心库, 提供基础类型定义、错误处理和比特流读写.
//!
//! 本 crate 对标 FFmpeg 的 libavutil, 为编码器提供底层基础设施.

pub mod bitreader;
pub mod bitwriter;
pub mod error;
pub mod rational;

// 重导出常用类型
pub use error::{TaoError, TaoResult};
pub use rational::Rational;
