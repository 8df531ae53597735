//! 编解码器参数.
//!
//! 对标 FFmpeg 的 `AVCodecParameters`, 描述编码器打开时的配置.

use tao_core::Rational;

use crate::codec_id::CodecId;

/// 编解码器参数
#[derive(Debug, Clone)]
pub struct CodecParameters {
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 额外数据 (序列头), 编码器打开后写入
    pub extra_data: Vec<u8>,
    /// 码率 (bits/s)
    pub bit_rate: u64,
    /// 媒体类型特定参数
    pub params: CodecParamsType,
}

/// 媒体类型特定参数
#[derive(Debug, Clone)]
pub enum CodecParamsType {
    /// 视频参数
    Video(VideoCodecParams),
    /// 无特定参数
    None,
}

/// 视频编解码器参数
#[derive(Debug, Clone)]
pub struct VideoCodecParams {
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 帧率
    pub frame_rate: Rational,
}

impl CodecParameters {
    /// 创建视频流参数
    pub fn video(
        codec_id: CodecId,
        width: u32,
        height: u32,
        frame_rate: Rational,
        bit_rate: u64,
    ) -> Self {
        Self {
            codec_id,
            extra_data: Vec::new(),
            bit_rate,
            params: CodecParamsType::Video(VideoCodecParams {
                width,
                height,
                frame_rate,
            }),
        }
    }

    /// 获取视频参数 (如果是视频流)
    pub fn video_params(&self) -> Option<&VideoCodecParams> {
        match &self.params {
            CodecParamsType::Video(v) => Some(v),
            CodecParamsType::None => None,
        }
    }
}
