//! 压缩数据包 (Packet).
//!
//! 对标 FFmpeg 的 `AVPacket`, 表示编码器输出的一帧压缩数据.
//! 时间戳以帧为单位, 时间基为帧率的倒数.

use bytes::Bytes;
use tao_core::Rational;

use crate::frame::PictureType;

/// 压缩数据包
#[derive(Debug, Clone)]
pub struct Packet {
    /// 压缩数据
    pub data: Bytes,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 数据包时长 (以 time_base 为单位)
    pub duration: i64,
    /// 时间基
    pub time_base: Rational,
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 图像类型
    pub picture_type: PictureType,
}

impl Packet {
    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
