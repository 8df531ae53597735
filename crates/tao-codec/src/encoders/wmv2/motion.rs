//! 运动向量预测与编码.
//!
//! 预测沿用 H.263 的 1MV 规则: slice 首行只看左邻 (行首为 0),
//! 其余位置取左 (A)、上 (B)、右上 (C) 三者逐分量中值, 图像外的邻居视为 0.
//! 差分经取模包装后作为 12 位符号查运动向量表, 查不到时写转义码加 6+6 位定长值.

use log::trace;
use tao_core::{TaoError, TaoResult};

use super::sink::BitSink;
use super::vlc::{MV_ESCAPE_SYMBOL, VlcTable, VlcTableProvider, put_code, put_vlc};

/// 运动向量 (半像素单位)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionVector {
    pub x: i16,
    pub y: i16,
}

impl MotionVector {
    /// 零向量
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// 创建运动向量
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// 三值取中
pub fn median(a: i16, b: i16, c: i16) -> i16 {
    if a > b {
        if b > c {
            b
        } else if a > c {
            c
        } else {
            a
        }
    } else if b < c {
        b
    } else if a < c {
        c
    } else {
        a
    }
}

/// 逐宏块运动向量网格
///
/// 左、右各留一列, 上方留一行恒为零的边界. Intra 宏块记录零向量.
#[derive(Debug, Clone)]
pub struct MotionVectorGrid {
    mb_width: u32,
    mb_height: u32,
    stride: usize,
    mvs: Vec<MotionVector>,
}

impl MotionVectorGrid {
    /// 按宏块网格尺寸创建
    pub fn new(mb_width: u32, mb_height: u32) -> Self {
        let stride = mb_width as usize + 2;
        Self {
            mb_width,
            mb_height,
            stride,
            mvs: vec![MotionVector::ZERO; stride * (mb_height as usize + 1)],
        }
    }

    /// 新图像开始时清零
    pub fn reset(&mut self) {
        self.mvs.fill(MotionVector::ZERO);
    }

    fn index(&self, mb_x: u32, mb_y: u32) -> usize {
        debug_assert!(mb_x < self.mb_width && mb_y < self.mb_height);
        (mb_y as usize + 1) * self.stride + mb_x as usize + 1
    }

    /// 预测当前宏块的运动向量
    pub fn predict(&self, mb_x: u32, mb_y: u32, first_slice_line: bool) -> MotionVector {
        let xy = self.index(mb_x, mb_y);
        let a = self.mvs[xy - 1];

        // slice 首行没有可用的上方邻居
        if first_slice_line {
            return if mb_x == 0 { MotionVector::ZERO } else { a };
        }

        let b = self.mvs[xy - self.stride];
        let c = self.mvs[xy - self.stride + 1];
        MotionVector {
            x: median(a.x, b.x, c.x),
            y: median(a.y, b.y, c.y),
        }
    }

    /// 记录当前宏块的运动向量
    pub fn store(&mut self, mb_x: u32, mb_y: u32, mv: MotionVector) {
        let xy = self.index(mb_x, mb_y);
        self.mvs[xy] = mv;
    }
}

/// 取模包装后的 6 位分量 (0..64)
fn wrap_component(value: i32) -> TaoResult<u32> {
    let wrapped = if value <= -64 {
        value + 64
    } else if value >= 64 {
        value - 64
    } else {
        value
    };
    let biased = wrapped + 32;
    if !(0..64).contains(&biased) {
        return Err(TaoError::InvariantViolation(format!(
            "运动向量差分 {} 超出可编码范围",
            value
        )));
    }
    Ok(biased as u32)
}

/// 编码运动向量差分
pub fn encode_motion(
    sink: &mut dyn BitSink,
    tables: &dyn VlcTableProvider,
    mv_table_index: u8,
    dx: i32,
    dy: i32,
) -> TaoResult<()> {
    let mx = wrap_component(dx)?;
    let my = wrap_component(dy)?;
    let table = VlcTable::MotionVector(mv_table_index);

    let symbol = (mx << 6) | my;
    if let Some(vlc) = tables.lookup(table, symbol) {
        put_code(sink, table, symbol, vlc)?;
    } else {
        trace!("MV 转义: dx={}, dy={}", dx, dy);
        put_vlc(sink, tables, table, MV_ESCAPE_SYMBOL)?;
        sink.put_bits(mx, 6);
        sink.put_bits(my, 6);
    }
    Ok(())
}
