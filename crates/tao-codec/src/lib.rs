//! # tao-codec
//!
//! Tao 多媒体框架编解码器库, 提供 Packet/参数抽象与 WMV2 视频编码器.
//!
//! 本 crate 对标 FFmpeg 的 libavcodec.
//!
//! ## 使用示例
//!
//! ```rust
//! use tao_codec::encoders::wmv2::{SequenceHeader, Wmv2Config};
//! use tao_core::Rational;
//!
//! let header =
//!     SequenceHeader::new(Rational::new(25, 1), 1_000_000, &Wmv2Config::default()).unwrap();
//! assert_eq!(header.to_extradata().unwrap().len(), 4);
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod encoders;
pub mod frame;
pub mod packet;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::{CodecParameters, CodecParamsType, VideoCodecParams};
pub use encoders::wmv2::Wmv2Encoder;
pub use frame::PictureType;
pub use packet::Packet;
