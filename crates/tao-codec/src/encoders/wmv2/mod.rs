//! WMV2 (Windows Media Video 8) 视频编码器.
//!
//! 只负责码流语法层: 序列头、图像头和宏块层的比特写出.
//! 运动估计、DCT/量化、码率控制由调用方完成, VLC 码表内容与系数熵编码
//! 通过 [`VlcTableProvider`] 和 [`CoefficientCoder`] 注入.
//!
//! 单帧编码流程:
//! 1. [`Wmv2Encoder::begin_picture`] 写出图像头并重置邻域状态
//! 2. 按光栅顺序对每个宏块调用 [`Wmv2Encoder::encode_macroblock`]
//! 3. [`Wmv2Encoder::finish_picture`] 字节对齐并输出数据包
//!
//! 宏块编码出错后本帧码流不可再用, 之后的宏块与结束调用都会失败,
//! 需调用 [`Wmv2Encoder::abandon_picture`].

pub mod coded_block;
pub mod config;
pub mod grammar;
pub mod macroblock;
pub mod motion;
pub mod picture;
pub mod sequence;
pub mod sink;
pub mod slice;
pub mod stats;
pub mod vlc;


pub use config::Wmv2Config;
pub use macroblock::{
    BlockContext, CodedBlockPattern, CoefficientBlock, CoefficientCoder, MacroblockEncoder,
    MacroblockMode, MacroblockNeighbors, MacroblockResidual,
};
pub use motion::MotionVector;
pub use picture::{EscapeLengthState, PictureContext, PicturePlan, encode_picture_header};
pub use sequence::SequenceHeader;
pub use sink::BitSink;
pub use slice::SliceLayout;
pub use stats::BitStatistics;
pub use vlc::{VlcCode, VlcTable, VlcTableProvider};

use bytes::Bytes;
use log::debug;
use tao_core::bitwriter::BitWriter;
use tao_core::{Rational, TaoError, TaoResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::PictureType;
use crate::packet::Packet;

/// 宏块边长 (像素)
pub const MACROBLOCK_SIZE: u32 = 16;

/// 每个宏块预留的输出缓冲 (字节)
const BYTES_PER_MACROBLOCK_HINT: usize = 32;

/// 进行中的图像
#[derive(Debug, Clone, Copy)]
struct PictureProgress {
    /// 下一个应编码的宏块 (光栅序号)
    next_macroblock: u32,
    /// 宏块编码出错, 已写出的比特不可再用
    failed: bool,
}

impl PictureProgress {
    fn ensure_usable(&self) -> TaoResult<()> {
        if self.failed {
            return Err(TaoError::InvariantViolation(format!(
                "宏块 #{} 编码失败, 需先放弃本帧",
                self.next_macroblock
            )));
        }
        Ok(())
    }
}

/// WMV2 编码器
pub struct Wmv2Encoder {
    /// 流级配置
    config: Wmv2Config,
    /// 序列头
    sequence: SequenceHeader,
    /// 序列头字节 (4 字节)
    extra_data: Vec<u8>,
    /// 宏块列数
    mb_width: u32,
    /// 宏块行数
    mb_height: u32,
    /// slice 布局
    slices: SliceLayout,
    /// 输出时间基 (帧率倒数)
    time_base: Rational,
    /// VLC 码表
    tables: Box<dyn VlcTableProvider>,
    /// 系数熵编码器
    coefficients: Box<dyn CoefficientCoder>,
    /// 当前帧的比特流
    writer: BitWriter,
    /// 当前帧的图像级状态
    picture: PictureContext,
    /// 宏块邻域状态
    neighbors: MacroblockNeighbors,
    /// 进行中的图像, 为 None 表示空闲
    progress: Option<PictureProgress>,
    /// 已输出的帧数
    picture_number: u64,
}

impl Wmv2Encoder {
    /// 打开编码器
    ///
    /// 校验流参数、生成序列头并写回 `params.extra_data`.
    pub fn open(
        params: &mut CodecParameters,
        config: Wmv2Config,
        tables: Box<dyn VlcTableProvider>,
        coefficients: Box<dyn CoefficientCoder>,
    ) -> TaoResult<Self> {
        if params.codec_id != CodecId::Wmv2 {
            return Err(TaoError::InvalidArgument(format!(
                "WMV2 编码器不支持 {}",
                params.codec_id
            )));
        }
        let (width, height, frame_rate) = params
            .video_params()
            .map(|v| (v.width, v.height, v.frame_rate))
            .ok_or_else(|| TaoError::InvalidArgument("WMV2 编码器需要视频参数".into()))?;
        if width == 0 || height == 0 {
            return Err(TaoError::InvalidArgument(format!(
                "WMV2: 无效图像尺寸 {}x{}",
                width, height
            )));
        }

        let mb_width = width.div_ceil(MACROBLOCK_SIZE);
        let mb_height = height.div_ceil(MACROBLOCK_SIZE);

        let sequence = SequenceHeader::new(frame_rate, params.bit_rate, &config)?;
        let extra_data = sequence.to_extradata()?;
        let slices = SliceLayout::new(sequence.slice_height(mb_height));
        params.extra_data = extra_data.clone();

        debug!(
            "打开 WMV2 编码器: {}x{} ({}x{} 宏块), {} fps, slice_height={}",
            width,
            height,
            mb_width,
            mb_height,
            frame_rate,
            slices.slice_height(),
        );

        Ok(Self {
            config,
            sequence,
            extra_data,
            mb_width,
            mb_height,
            slices,
            time_base: frame_rate.invert(),
            tables,
            coefficients,
            writer: BitWriter::new(),
            picture: PictureContext::default(),
            neighbors: MacroblockNeighbors::new(mb_width, mb_height),
            progress: None,
            picture_number: 0,
        })
    }

    /// 开始一帧: 写出图像头
    pub fn begin_picture(&mut self, plan: &PicturePlan) -> TaoResult<()> {
        if self.progress.is_some() {
            return Err(TaoError::InvariantViolation(
                "上一帧尚未完成或放弃".into(),
            ));
        }

        let capacity = self.macroblock_count() as usize * BYTES_PER_MACROBLOCK_HINT;
        let mut writer = BitWriter::try_with_capacity(capacity)?;
        encode_picture_header(&mut writer, &self.config, plan, &mut self.picture)?;

        self.writer = writer;
        self.neighbors.reset();
        self.progress = Some(PictureProgress {
            next_macroblock: 0,
            failed: false,
        });
        Ok(())
    }

    /// 按光栅顺序编码下一个宏块
    pub fn encode_macroblock(&mut self, mb: &MacroblockResidual) -> TaoResult<()> {
        let progress = self
            .progress
            .as_mut()
            .ok_or_else(|| TaoError::InvariantViolation("没有进行中的图像".into()))?;
        progress.ensure_usable()?;

        let expected_x = progress.next_macroblock % self.mb_width;
        let expected_y = progress.next_macroblock / self.mb_width;
        if expected_y >= self.mb_height {
            return Err(TaoError::InvariantViolation(format!(
                "本帧 {} 个宏块已全部编码",
                self.mb_width * self.mb_height
            )));
        }
        if (mb.mb_x, mb.mb_y) != (expected_x, expected_y) {
            return Err(TaoError::InvariantViolation(format!(
                "宏块顺序错误: 期望 ({}, {}), 实际 ({}, {})",
                expected_x, expected_y, mb.mb_x, mb.mb_y
            )));
        }

        let mut encoder = MacroblockEncoder {
            tables: self.tables.as_ref(),
            coefficients: self.coefficients.as_mut(),
            slices: self.slices,
        };
        if let Err(e) = encoder.encode(
            &mut self.writer,
            &mut self.picture,
            &mut self.neighbors,
            mb,
        ) {
            progress.failed = true;
            return Err(e);
        }
        progress.next_macroblock += 1;
        Ok(())
    }

    /// 结束一帧: 字节对齐并输出数据包
    pub fn finish_picture(&mut self) -> TaoResult<Packet> {
        let progress = self
            .progress
            .ok_or_else(|| TaoError::InvariantViolation("没有进行中的图像".into()))?;
        progress.ensure_usable()?;
        if progress.next_macroblock != self.macroblock_count() {
            return Err(TaoError::InvariantViolation(format!(
                "图像未完成: 已编码 {}/{} 个宏块",
                progress.next_macroblock,
                self.macroblock_count()
            )));
        }

        self.writer.align_to_byte();
        let data = self.writer.take();
        let stats = self.picture.stats;
        let picture_type = self.picture.picture_type;
        debug!(
            "WMV2 帧 #{} ({}): {} 字节, header={} misc={} mv={} i_tex={} p_tex={}",
            self.picture_number,
            picture_type,
            data.len(),
            stats.header_bits,
            stats.misc_bits,
            stats.mv_bits,
            stats.i_tex_bits,
            stats.p_tex_bits,
        );

        let packet = Packet {
            data: Bytes::from(data),
            pts: self.picture_number as i64,
            duration: 1,
            time_base: self.time_base,
            is_keyframe: picture_type == PictureType::I,
            picture_type,
        };
        self.picture_number += 1;
        self.progress = None;
        Ok(packet)
    }

    /// 放弃当前帧, 丢弃已写出的比特
    pub fn abandon_picture(&mut self) {
        if let Some(progress) = self.progress.take() {
            debug!(
                "放弃 WMV2 帧 #{}: 已编码 {} 个宏块",
                self.picture_number, progress.next_macroblock
            );
        }
        self.writer = BitWriter::new();
    }

    /// 序列头字节
    pub fn extra_data(&self) -> &[u8] {
        &self.extra_data
    }

    /// 序列头字段
    pub fn sequence_header(&self) -> &SequenceHeader {
        &self.sequence
    }

    /// 流级配置
    pub fn config(&self) -> &Wmv2Config {
        &self.config
    }

    /// 宏块列数
    pub fn mb_width(&self) -> u32 {
        self.mb_width
    }

    /// 宏块行数
    pub fn mb_height(&self) -> u32 {
        self.mb_height
    }

    /// 每帧宏块总数
    pub fn macroblock_count(&self) -> u32 {
        self.mb_width * self.mb_height
    }

    /// slice 布局
    pub fn slice_layout(&self) -> SliceLayout {
        self.slices
    }

    /// 当前 (或最近一帧) 的图像级状态
    pub fn picture_context(&self) -> &PictureContext {
        &self.picture
    }

    /// 是否有进行中的图像
    pub fn is_picture_in_progress(&self) -> bool {
        self.progress.is_some()
    }

    /// 已输出的帧数
    pub fn picture_number(&self) -> u64 {
        self.picture_number
    }
}
