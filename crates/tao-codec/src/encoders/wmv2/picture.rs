//! WMV2 图像头编码与图像级状态.
//!
//! 每帧开始时由码率控制给出图像类型与量化步长, 本模块据此写出图像头,
//! 并重置供宏块编码使用的派生状态 (码表索引、转义长度计数等).

use log::debug;
use tao_core::{TaoError, TaoResult};

use super::config::Wmv2Config;
use super::grammar::{HeaderField, grammar_for, write_fields};
use super::sink::BitSink;
use super::stats::BitStatistics;
use super::vlc::select_cbp_table;
use crate::frame::PictureType;

/// 量化步长上限 (5 位)
pub const MAX_QSCALE: u8 = 31;

/// 不跳过任何宏块的跳过类型
pub const SKIP_TYPE_NONE: u8 = 0;

/// 转义码长度状态
///
/// 第三类转义码的 level/run 长度在一帧内首次出现时写出, 之后沿用,
/// 因此每帧开头清零, 在帧内各宏块之间传递.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscapeLengthState {
    /// level 字段长度 (0 表示尚未确定)
    pub level_length: u8,
    /// run 字段长度 (0 表示尚未确定)
    pub run_length: u8,
}

impl EscapeLengthState {
    /// 清零
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 码率控制给出的单帧编码计划
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PicturePlan {
    /// 图像类型 (仅 I/P)
    pub picture_type: PictureType,
    /// 量化步长 (1..=31)
    pub qscale: u8,
    /// 亮度 RL 表索引 (0..=2), P 帧色度沿用该值
    pub rl_table_index: u8,
    /// 色度 RL 表索引 (0..=2), 仅 I 帧单独写出
    pub rl_chroma_table_index: u8,
}

impl PicturePlan {
    /// 创建编码计划, RL 表索引默认为 0
    pub fn new(picture_type: PictureType, qscale: u8) -> Self {
        Self {
            picture_type,
            qscale,
            rl_table_index: 0,
            rl_chroma_table_index: 0,
        }
    }

    /// I 帧
    pub fn intra(qscale: u8) -> Self {
        Self::new(PictureType::I, qscale)
    }

    /// P 帧
    pub fn inter(qscale: u8) -> Self {
        Self::new(PictureType::P, qscale)
    }

    /// 校验前置条件
    pub fn validate(&self) -> TaoResult<()> {
        if !matches!(self.picture_type, PictureType::I | PictureType::P) {
            return Err(TaoError::InvariantViolation(format!(
                "WMV2 不支持图像类型 {:?}",
                self.picture_type
            )));
        }
        if self.qscale == 0 || self.qscale > MAX_QSCALE {
            return Err(TaoError::InvariantViolation(format!(
                "量化步长 {} 超出 1..={}",
                self.qscale, MAX_QSCALE
            )));
        }
        if self.rl_table_index > 2 || self.rl_chroma_table_index > 2 {
            return Err(TaoError::InvariantViolation(format!(
                "RL 表索引超出 0..=2: luma={}, chroma={}",
                self.rl_table_index, self.rl_chroma_table_index
            )));
        }
        Ok(())
    }
}

/// 图像级编码状态
///
/// 在图像头编码时建立, 贯穿本帧所有宏块的编码, 帧结束后丢弃.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PictureContext {
    pub picture_type: PictureType,
    pub qscale: u8,
    /// DC 表索引
    pub dc_table_index: u8,
    /// 运动向量表索引 (仅 P 帧)
    pub mv_table_index: u8,
    /// 亮度 RL 表索引
    pub rl_table_index: u8,
    /// 色度 RL 表索引
    pub rl_chroma_table_index: u8,
    /// 逐宏块 RL 表 (本编码器始终关闭)
    pub per_mb_rl_table: bool,
    /// 跳过类型 (本编码器不跳过宏块)
    pub skip_type: u8,
    /// 头部写出的 cbp 选择子
    pub cbp_index: u8,
    /// 派生的 P 帧宏块表索引
    pub cbp_table_index: u8,
    /// 本帧是否使用更精细运动精度
    pub mspel: bool,
    /// 逐宏块 ABT (本编码器始终关闭)
    pub per_mb_abt: bool,
    /// 整帧 ABT 类型
    pub abt_type: u8,
    /// J 类型提示
    pub j_type: bool,
    /// Inter 帧中 Intra 宏块是否写出预测方向 (保留功能, 始终关闭)
    pub inter_intra_pred: bool,
    /// 转义码长度状态
    pub escape: EscapeLengthState,
    /// 当前宏块是否位于 slice 首行
    pub first_slice_line: bool,
    /// 码率统计
    pub stats: BitStatistics,
}

impl PictureContext {
    /// 按编码计划重置全部派生状态
    pub fn reset(&mut self, plan: &PicturePlan) {
        *self = Self {
            picture_type: plan.picture_type,
            qscale: plan.qscale,
            dc_table_index: 1,
            mv_table_index: 1,
            rl_table_index: plan.rl_table_index,
            rl_chroma_table_index: plan.rl_chroma_table_index,
            first_slice_line: true,
            ..Self::default()
        };
    }

    /// 是否为 I 帧
    pub fn is_intra(&self) -> bool {
        self.picture_type == PictureType::I
    }

    /// 字段在码流中的取值
    pub fn field_value(&self, field: HeaderField) -> u32 {
        match field {
            HeaderField::PictureType => (self.picture_type as u32).saturating_sub(1),
            HeaderField::Marker => 0,
            HeaderField::QuantScale => u32::from(self.qscale),
            HeaderField::JType => u32::from(self.j_type),
            HeaderField::PerMbRlTable => u32::from(self.per_mb_rl_table),
            HeaderField::RlChromaTable => u32::from(self.rl_chroma_table_index),
            HeaderField::RlTable => u32::from(self.rl_table_index),
            HeaderField::DcTable => u32::from(self.dc_table_index),
            HeaderField::SkipType => u32::from(self.skip_type),
            HeaderField::CbpIndex => u32::from(self.cbp_index),
            HeaderField::Mspel => u32::from(self.mspel),
            HeaderField::AbtPerPicture => u32::from(!self.per_mb_abt),
            HeaderField::AbtType => u32::from(self.abt_type),
            HeaderField::MvTable => u32::from(self.mv_table_index),
        }
    }
}

/// 编码图像头
///
/// 重置 `ctx` 的派生状态并按图像类型对应的语法表写出头部.
/// 图像头前不需要字节对齐.
pub fn encode_picture_header(
    sink: &mut dyn BitSink,
    config: &Wmv2Config,
    plan: &PicturePlan,
    ctx: &mut PictureContext,
) -> TaoResult<()> {
    plan.validate()?;
    let grammar = grammar_for(plan.picture_type)?;
    let start = sink.bits_written();

    ctx.reset(plan);
    if plan.picture_type == PictureType::P {
        ctx.skip_type = SKIP_TYPE_NONE;
        ctx.cbp_index = 0;
        ctx.cbp_table_index = select_cbp_table(ctx.qscale, ctx.cbp_index)?;
        if !ctx.per_mb_rl_table {
            // P 帧色度 RL 表总是跟随亮度
            ctx.rl_chroma_table_index = ctx.rl_table_index;
        }
    }

    write_fields(sink, grammar, config, ctx)?;
    ctx.escape.reset();
    ctx.stats.start(sink.bits_written());
    ctx.stats.header_bits = (sink.bits_written() - start) as u64;

    debug!(
        "WMV2 图像头: type={:?}, qscale={}, rl={}/{}, cbp_table={}, {} 位",
        ctx.picture_type,
        ctx.qscale,
        ctx.rl_table_index,
        ctx.rl_chroma_table_index,
        ctx.cbp_table_index,
        ctx.stats.header_bits,
    );
    Ok(())
}
