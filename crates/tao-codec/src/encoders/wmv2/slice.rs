//! slice 划分.
//!
//! WMV2 的 slice 由整行宏块组成, 高度来自序列头 (宏块行数 / slice_code).
//! 码流中没有 slice 起始码, slice 只影响 "slice 首行" 标志, 进而影响运动向量预测.

/// slice 布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceLayout {
    /// slice 高度 (宏块行), 0 表示没有任何行开启 slice
    slice_height: u32,
}

impl SliceLayout {
    /// 创建 slice 布局
    pub fn new(slice_height: u32) -> Self {
        Self { slice_height }
    }

    /// slice 高度 (宏块行)
    pub fn slice_height(&self) -> u32 {
        self.slice_height
    }

    /// 该宏块行是否开启新的 slice
    ///
    /// slice 高度为 0 (slice_code 大于宏块行数) 时任何行都不是 slice 首行,
    /// 第 0 行的运动向量预测也使用 (恒为 0 的) 上方邻居.
    pub fn starts_slice(&self, mb_y: u32) -> bool {
        self.slice_height > 0 && mb_y % self.slice_height == 0
    }

    /// 更新 slice 首行标志
    ///
    /// 只在每行第一个宏块处重新判定, 行内其余宏块沿用行首的结果.
    /// 返回该宏块是否开启了新的 slice.
    pub fn update_first_line(&self, mb_x: u32, mb_y: u32, first_slice_line: &mut bool) -> bool {
        if mb_x != 0 {
            return false;
        }
        *first_slice_line = self.starts_slice(mb_y);
        *first_slice_line
    }
}
