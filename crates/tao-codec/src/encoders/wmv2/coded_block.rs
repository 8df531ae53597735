//! Intra 宏块亮度块 "是否编码" 标志的邻域预测.
//!
//! 以 8x8 块为单位的稠密网格, 上方和左侧各留一圈恒为 0 的边界.
//! 预测规则 (B C / A X):
//! - B == C 时取 A (左)
//! - 否则取 C (上)

/// 亮度块编码标志网格
#[derive(Debug, Clone)]
pub struct CodedBlockGrid {
    /// 宏块列数
    mb_width: u32,
    /// 宏块行数
    mb_height: u32,
    /// 每行块数 (含左边界)
    stride: usize,
    /// 标志数组 (含边界)
    flags: Vec<bool>,
}

impl CodedBlockGrid {
    /// 按宏块网格尺寸创建
    pub fn new(mb_width: u32, mb_height: u32) -> Self {
        let stride = mb_width as usize * 2 + 1;
        let rows = mb_height as usize * 2 + 1;
        Self {
            mb_width,
            mb_height,
            stride,
            flags: vec![false; stride * rows],
        }
    }

    /// 新图像开始时清零
    pub fn reset(&mut self) {
        self.flags.fill(false);
    }

    /// 宏块 (mb_x, mb_y) 中亮度块 `block` (0..4) 的下标
    fn index(&self, mb_x: u32, mb_y: u32, block: usize) -> usize {
        debug_assert!(mb_x < self.mb_width && mb_y < self.mb_height && block < 4);
        let x = 1 + mb_x as usize * 2 + (block & 1);
        let y = 1 + mb_y as usize * 2 + (block >> 1);
        y * self.stride + x
    }

    /// 由左、左上、上三个邻块预测当前块的编码标志
    pub fn predict(&self, mb_x: u32, mb_y: u32, block: usize) -> bool {
        let xy = self.index(mb_x, mb_y, block);
        let a = self.flags[xy - 1];
        let b = self.flags[xy - 1 - self.stride];
        let c = self.flags[xy - self.stride];
        if b == c { a } else { c }
    }

    /// 记录当前块的实际编码标志
    pub fn store(&mut self, mb_x: u32, mb_y: u32, block: usize, coded: bool) {
        let xy = self.index(mb_x, mb_y, block);
        self.flags[xy] = coded;
    }

    /// 先预测再记录, 返回预测值
    pub fn predict_and_store(&mut self, mb_x: u32, mb_y: u32, block: usize, coded: bool) -> bool {
        let pred = self.predict(mb_x, mb_y, block);
        self.store(mb_x, mb_y, block, coded);
        pred
    }
}
