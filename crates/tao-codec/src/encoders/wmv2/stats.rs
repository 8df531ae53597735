//! 单帧码率统计.
//!
//! 按写出位置的差值把每帧的位数归入头部、宏块模式、运动向量和纹理几类,
//! 供码率控制参考.

/// 单帧码率统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitStatistics {
    /// 图像头位数
    pub header_bits: u64,
    /// 宏块模式/CBP 等杂项位数
    pub misc_bits: u64,
    /// 运动向量位数
    pub mv_bits: u64,
    /// Intra 宏块系数位数
    pub i_tex_bits: u64,
    /// Inter 宏块系数位数
    pub p_tex_bits: u64,
    /// 上次结算时的写出位置
    last_position: usize,
}

impl BitStatistics {
    /// 从给定写出位置开始计数
    pub(super) fn start(&mut self, position: usize) {
        self.last_position = position;
    }

    /// 返回自上次结算以来写出的位数, 并推进结算位置
    pub(super) fn take_diff(&mut self, position: usize) -> u64 {
        let diff = position.saturating_sub(self.last_position);
        self.last_position = position;
        diff as u64
    }

    /// 宏块部分的总位数
    pub fn macroblock_bits(&self) -> u64 {
        self.misc_bits + self.mv_bits + self.i_tex_bits + self.p_tex_bits
    }

    /// 全帧总位数
    pub fn total_bits(&self) -> u64 {
        self.header_bits + self.macroblock_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_diff_advances() {
        let mut stats = BitStatistics::default();
        stats.start(10);
        assert_eq!(stats.take_diff(17), 7);
        assert_eq!(stats.take_diff(17), 0);
        assert_eq!(stats.take_diff(40), 23);
    }

    #[test]
    fn test_totals() {
        let stats = BitStatistics {
            header_bits: 18,
            misc_bits: 5,
            mv_bits: 3,
            i_tex_bits: 100,
            p_tex_bits: 7,
            ..Default::default()
        };
        assert_eq!(stats.macroblock_bits(), 115);
        assert_eq!(stats.total_bits(), 133);
    }
}
