//! WMV2 宏块编码.
//!
//! 每个宏块依次写出:
//! 1. 宏块模式/CBP 码字 (Inter 取 P 帧宏块表后半部分, Intra 视图像类型选表)
//! 2. Inter: 运动向量差分; Intra: "无 AC 预测" 位和可选的预测方向
//! 3. 6 个块的系数 (交给外部系数编码器)
//!
//! Intra 宏块的亮度 CBP 位先与邻域预测值异或再编码.

use bitflags::bitflags;
use log::trace;
use tao_core::{TaoError, TaoResult};

use super::coded_block::CodedBlockGrid;
use super::motion::{MotionVector, MotionVectorGrid, encode_motion};
use super::picture::{EscapeLengthState, PictureContext};
use super::sink::BitSink;
use super::slice::SliceLayout;
use super::vlc::{INTER_CBP_OFFSET, VlcTable, VlcTableProvider, put_vlc};
use crate::frame::PictureType;

/// 每个宏块的块数 (4 亮度 + 2 色度)
pub const BLOCKS_PER_MACROBLOCK: usize = 6;

/// 亮度块数
pub const LUMA_BLOCKS: usize = 4;

/// 块内系数个数
pub const COEFFICIENTS_PER_BLOCK: usize = 64;

bitflags! {
    /// 宏块 CBP, 块 i 对应第 5-i 位
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CodedBlockPattern: u8 {
        const Y0 = 1 << 5;
        const Y1 = 1 << 4;
        const Y2 = 1 << 3;
        const Y3 = 1 << 2;
        const CB = 1 << 1;
        const CR = 1 << 0;
    }
}

impl CodedBlockPattern {
    /// 第 `index` 个块 (0..6) 对应的位
    pub fn block(index: usize) -> Self {
        debug_assert!(index < BLOCKS_PER_MACROBLOCK);
        Self::from_bits_retain(1 << (5 - index))
    }
}

/// 量化后的 8x8 系数块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefficientBlock {
    /// 系数 (按扫描顺序)
    pub coefficients: [i16; COEFFICIENTS_PER_BLOCK],
    /// 最后一个非零系数的扫描位置, -1 表示全零
    pub last_index: i32,
}

impl CoefficientBlock {
    /// 全零块
    pub fn empty() -> Self {
        Self {
            coefficients: [0; COEFFICIENTS_PER_BLOCK],
            last_index: -1,
        }
    }

    /// 由系数和最后非零位置创建
    pub fn new(coefficients: [i16; COEFFICIENTS_PER_BLOCK], last_index: i32) -> Self {
        Self {
            coefficients,
            last_index,
        }
    }

    /// 由系数推算最后非零位置
    pub fn from_coefficients(coefficients: [i16; COEFFICIENTS_PER_BLOCK]) -> Self {
        let last_index = coefficients
            .iter()
            .rposition(|&c| c != 0)
            .map_or(-1, |pos| pos as i32);
        Self::new(coefficients, last_index)
    }

    fn validate(&self, index: usize) -> TaoResult<()> {
        if !(-1..COEFFICIENTS_PER_BLOCK as i32).contains(&self.last_index) {
            return Err(TaoError::InvariantViolation(format!(
                "块 {} 的 last_index={} 超出 -1..=63",
                index, self.last_index
            )));
        }
        Ok(())
    }
}

/// 宏块预测模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroblockMode {
    /// 帧内
    Intra,
    /// 帧间, 携带运动估计得到的运动向量
    Inter { motion_vector: MotionVector },
}

/// 单个宏块的残差与运动数据
#[derive(Debug, Clone)]
pub struct MacroblockResidual {
    pub mb_x: u32,
    pub mb_y: u32,
    pub mode: MacroblockMode,
    /// Y0, Y1, Y2, Y3, Cb, Cr
    pub blocks: [CoefficientBlock; BLOCKS_PER_MACROBLOCK],
}

impl MacroblockResidual {
    /// 全零残差的宏块
    pub fn empty(mb_x: u32, mb_y: u32, mode: MacroblockMode) -> Self {
        Self {
            mb_x,
            mb_y,
            mode,
            blocks: std::array::from_fn(|_| CoefficientBlock::empty()),
        }
    }

    /// 是否为帧内宏块
    pub fn is_intra(&self) -> bool {
        self.mode == MacroblockMode::Intra
    }
}

/// 传给系数编码器的块上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    pub mb_x: u32,
    pub mb_y: u32,
    /// 块序号 (0..4 亮度, 4..6 色度)
    pub block_index: usize,
    /// 所属宏块是否为帧内
    pub intra: bool,
    pub picture_type: PictureType,
    pub qscale: u8,
    pub dc_table_index: u8,
    /// 本块使用的 RL 表 (亮度/色度已选好)
    pub rl_table_index: u8,
    pub first_slice_line: bool,
}

/// 系数熵编码器 (DC/AC run-level 与转义码)
pub trait CoefficientCoder: Send {
    /// 编码一个块
    fn encode_block(
        &mut self,
        sink: &mut dyn BitSink,
        block: &CoefficientBlock,
        ctx: &BlockContext,
        escape: &mut EscapeLengthState,
    ) -> TaoResult<()>;
}

/// 宏块间的邻域预测状态, 由单趟图像编码独占, 每帧开头清零
#[derive(Debug, Clone)]
pub struct MacroblockNeighbors {
    mb_width: u32,
    mb_height: u32,
    /// Intra 亮度块编码标志
    pub coded_blocks: CodedBlockGrid,
    /// 运动向量
    pub motion: MotionVectorGrid,
}

impl MacroblockNeighbors {
    /// 按宏块网格尺寸创建
    pub fn new(mb_width: u32, mb_height: u32) -> Self {
        Self {
            mb_width,
            mb_height,
            coded_blocks: CodedBlockGrid::new(mb_width, mb_height),
            motion: MotionVectorGrid::new(mb_width, mb_height),
        }
    }

    /// 清零
    pub fn reset(&mut self) {
        self.coded_blocks.reset();
        self.motion.reset();
    }

    /// 宏块坐标是否在网格内
    pub fn contains(&self, mb_x: u32, mb_y: u32) -> bool {
        mb_x < self.mb_width && mb_y < self.mb_height
    }
}

/// Inter 宏块 CBP: 块内存在任意非零系数即置位
pub fn inter_cbp(blocks: &[CoefficientBlock; BLOCKS_PER_MACROBLOCK]) -> CodedBlockPattern {
    let mut cbp = CodedBlockPattern::empty();
    for (i, block) in blocks.iter().enumerate() {
        if block.last_index >= 0 {
            cbp |= CodedBlockPattern::block(i);
        }
    }
    cbp
}

/// Intra 宏块 CBP
///
/// Intra 块的 DC 单独编码, 只有存在 AC 系数 (last_index >= 1) 才置位.
/// 返回 (实际 CBP, 亮度位经邻域预测异或后的 coded_cbp), 并把实际亮度位写回网格.
pub fn intra_cbp(
    blocks: &[CoefficientBlock; BLOCKS_PER_MACROBLOCK],
    grid: &mut CodedBlockGrid,
    mb_x: u32,
    mb_y: u32,
) -> (CodedBlockPattern, CodedBlockPattern) {
    let mut cbp = CodedBlockPattern::empty();
    let mut coded_cbp = CodedBlockPattern::empty();
    for (i, block) in blocks.iter().enumerate() {
        let mut val = block.last_index >= 1;
        if val {
            cbp |= CodedBlockPattern::block(i);
        }
        if i < LUMA_BLOCKS {
            let pred = grid.predict_and_store(mb_x, mb_y, i, val);
            val ^= pred;
        }
        if val {
            coded_cbp |= CodedBlockPattern::block(i);
        }
    }
    (cbp, coded_cbp)
}

/// 宏块编码器
///
/// 持有外部协作者 (码表、系数编码器) 和 slice 布局,
/// 图像级状态与邻域状态在每次调用时以独占引用传入.
pub struct MacroblockEncoder<'a> {
    pub tables: &'a dyn VlcTableProvider,
    pub coefficients: &'a mut dyn CoefficientCoder,
    pub slices: SliceLayout,
}

impl MacroblockEncoder<'_> {
    /// 编码一个宏块
    pub fn encode(
        &mut self,
        sink: &mut dyn BitSink,
        ctx: &mut PictureContext,
        neighbors: &mut MacroblockNeighbors,
        mb: &MacroblockResidual,
    ) -> TaoResult<()> {
        self.validate(ctx, neighbors, mb)?;

        if self
            .slices
            .update_first_line(mb.mb_x, mb.mb_y, &mut ctx.first_slice_line)
        {
            trace!("slice 开始于宏块行 {}", mb.mb_y);
        }

        match mb.mode {
            MacroblockMode::Inter { motion_vector } => {
                self.encode_inter_header(sink, ctx, neighbors, mb, motion_vector)?;
            }
            MacroblockMode::Intra => {
                self.encode_intra_header(sink, ctx, neighbors, mb)?;
            }
        }

        let intra = mb.is_intra();
        for (i, block) in mb.blocks.iter().enumerate() {
            let block_ctx = BlockContext {
                mb_x: mb.mb_x,
                mb_y: mb.mb_y,
                block_index: i,
                intra,
                picture_type: ctx.picture_type,
                qscale: ctx.qscale,
                dc_table_index: ctx.dc_table_index,
                rl_table_index: if i < LUMA_BLOCKS {
                    ctx.rl_table_index
                } else {
                    ctx.rl_chroma_table_index
                },
                first_slice_line: ctx.first_slice_line,
            };
            self.coefficients
                .encode_block(sink, block, &block_ctx, &mut ctx.escape)?;
        }

        let tex_bits = ctx.stats.take_diff(sink.bits_written());
        if intra {
            ctx.stats.i_tex_bits += tex_bits;
        } else {
            ctx.stats.p_tex_bits += tex_bits;
        }
        Ok(())
    }

    fn validate(
        &self,
        ctx: &PictureContext,
        neighbors: &MacroblockNeighbors,
        mb: &MacroblockResidual,
    ) -> TaoResult<()> {
        if !neighbors.contains(mb.mb_x, mb.mb_y) {
            return Err(TaoError::InvariantViolation(format!(
                "宏块 ({}, {}) 超出图像范围",
                mb.mb_x, mb.mb_y
            )));
        }
        if !mb.is_intra() && ctx.is_intra() {
            return Err(TaoError::InvariantViolation(format!(
                "I 帧中出现 Inter 宏块 ({}, {})",
                mb.mb_x, mb.mb_y
            )));
        }
        for (i, block) in mb.blocks.iter().enumerate() {
            block.validate(i)?;
        }
        Ok(())
    }

    fn encode_inter_header(
        &mut self,
        sink: &mut dyn BitSink,
        ctx: &mut PictureContext,
        neighbors: &mut MacroblockNeighbors,
        mb: &MacroblockResidual,
        motion_vector: MotionVector,
    ) -> TaoResult<()> {
        let cbp = inter_cbp(&mb.blocks);
        put_vlc(
            sink,
            self.tables,
            VlcTable::InterMacroblock(ctx.cbp_table_index),
            u32::from(cbp.bits()) + INTER_CBP_OFFSET,
        )?;
        ctx.stats.misc_bits += ctx.stats.take_diff(sink.bits_written());

        let pred = neighbors
            .motion
            .predict(mb.mb_x, mb.mb_y, ctx.first_slice_line);
        let dx = i32::from(motion_vector.x) - i32::from(pred.x);
        let dy = i32::from(motion_vector.y) - i32::from(pred.y);
        encode_motion(sink, self.tables, ctx.mv_table_index, dx, dy)?;
        neighbors.motion.store(mb.mb_x, mb.mb_y, motion_vector);
        ctx.stats.mv_bits += ctx.stats.take_diff(sink.bits_written());

        trace!(
            "MB({},{}) inter cbp={:06b} mv=({},{}) pred=({},{})",
            mb.mb_x, mb.mb_y, cbp.bits(), motion_vector.x, motion_vector.y, pred.x, pred.y,
        );
        Ok(())
    }

    fn encode_intra_header(
        &mut self,
        sink: &mut dyn BitSink,
        ctx: &mut PictureContext,
        neighbors: &mut MacroblockNeighbors,
        mb: &MacroblockResidual,
    ) -> TaoResult<()> {
        let (cbp, coded_cbp) = intra_cbp(
            &mb.blocks,
            &mut neighbors.coded_blocks,
            mb.mb_x,
            mb.mb_y,
        );

        if ctx.is_intra() {
            put_vlc(
                sink,
                self.tables,
                VlcTable::IntraMacroblock,
                u32::from(coded_cbp.bits()),
            )?;
        } else {
            put_vlc(
                sink,
                self.tables,
                VlcTable::InterMacroblock(ctx.cbp_table_index),
                u32::from(cbp.bits()),
            )?;
        }
        // 不使用 AC 预测
        sink.put_bits(0, 1);
        if ctx.inter_intra_pred {
            // 固定方向 0
            put_vlc(sink, self.tables, VlcTable::InterIntraDirection, 0)?;
        }
        neighbors.motion.store(mb.mb_x, mb.mb_y, MotionVector::ZERO);
        ctx.stats.misc_bits += ctx.stats.take_diff(sink.bits_written());

        trace!(
            "MB({},{}) intra cbp={:06b} coded_cbp={:06b}",
            mb.mb_x,
            mb.mb_y,
            cbp.bits(),
            coded_cbp.bits(),
        );
        Ok(())
    }
}
