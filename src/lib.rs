//! # tao-wmv2
//!
//! 纯 Rust 实现的 WMV2 (Windows Media Video 8) 码流编码器.
//!
//! 负责序列头、图像头和宏块层的比特写出; 运动估计、变换量化和码率控制
//! 由调用方完成, VLC 码表与系数熵编码以 trait 形式注入.
//!
//! # 快速开始
//!
//! ```rust
//! use tao_wmv2::codec::encoders::wmv2::{SequenceHeader, Wmv2Config};
//! use tao_wmv2::core::Rational;
//!
//! let header = SequenceHeader::new(
//!     Rational::new(30000, 1001),
//!     800_000,
//!     &Wmv2Config::default(),
//! )
//! .unwrap();
//! assert_eq!(header.to_extradata().unwrap(), vec![0xEB, 0x0D, 0xB4, 0x80]);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `tao-core` | 错误类型、比特流读写、有理数 |
//! | `tao-codec` | 编码参数、数据包与 WMV2 编码器 |

/// 核心类型与工具 (对标 libavutil)
pub use tao_core as core;

/// 编解码器 (对标 libavcodec)
pub use tao_codec as codec;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
