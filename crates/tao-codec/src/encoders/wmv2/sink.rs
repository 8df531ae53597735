//! 比特输出端抽象.
//!
//! WMV2 编码核心只决定写入哪些符号以及顺序, 具体的位缓冲由 `BitSink` 提供.

use tao_core::bitwriter::BitWriter;

/// 按 MSB first 追加定长字段的位输出端
pub trait BitSink {
    /// 追加 `width` 位 (1..=32), 取 `value` 的低 `width` 位
    fn put_bits(&mut self, value: u32, width: u32);

    /// 用 0 填充到字节边界
    fn align_to_byte(&mut self);

    /// 已写入的总位数 (用于码率统计)
    fn bits_written(&self) -> usize;

    /// 写入 1 位布尔标志
    fn put_flag(&mut self, flag: bool) {
        self.put_bits(u32::from(flag), 1);
    }
}

impl BitSink for BitWriter {
    fn put_bits(&mut self, value: u32, width: u32) {
        self.write_bits(value, width);
    }

    fn align_to_byte(&mut self) {
        BitWriter::align_to_byte(self);
    }

    fn bits_written(&self) -> usize {
        BitWriter::bits_written(self)
    }
}
