//! 比特流写入器.
//!
//! 提供向字节缓冲区按位写入数据的能力, 是压缩编码器的基础设施.
//!
//! 按大端位序写入 (MSB first), 与 BitReader 对应.

use crate::{TaoError, TaoResult};

/// 比特流写入器
///
/// 向字节缓冲区按位写入数据, 使用大端位序 (MSB first).
///
/// # 示例
/// ```
/// use tao_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b11101, 5);
/// bw.write_bits(0b110, 3);
/// bw.write_bits(0b01010101, 8);
/// let data = bw.finish();
/// assert_eq!(data, vec![0b11101110, 0b01010101]);
/// ```
#[derive(Debug)]
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            current_byte: 0,
            bit_count: 0,
        }
    }

    /// 以指定容量创建比特流写入器
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            current_byte: 0,
            bit_count: 0,
        }
    }

    /// 以指定容量创建比特流写入器, 分配失败时返回 `OutOfMemory`
    ///
    /// 用于编码器初始化阶段 (如 extradata), 分配失败属于致命错误.
    pub fn try_with_capacity(capacity: usize) -> TaoResult<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity).map_err(|e| {
            TaoError::OutOfMemory(format!("比特流缓冲区 {} 字节: {}", capacity, e))
        })?;
        Ok(Self {
            data,
            current_byte: 0,
            bit_count: 0,
        })
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 是否位于字节边界
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_count == 0
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) {
        self.current_byte = (self.current_byte << 1) | (bit & 1) as u8;
        self.bit_count += 1;
        if self.bit_count >= 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入 N 个位 (最多 32 位)
    ///
    /// 值的低 N 位被写入, 高位在前 (大端).
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);

        let mut remaining = n;
        while remaining > 0 {
            let available = 8 - self.bit_count as u32;
            let to_write = remaining.min(available);

            // 提取要写入的位
            let shift = remaining - to_write;
            let mask = (1u32 << to_write) - 1;
            let bits = ((value >> shift) & mask) as u8;

            if to_write >= 8 {
                // 整字节写入 (bit_count 必定为 0)
                self.current_byte = bits;
            } else {
                self.current_byte = (self.current_byte << to_write) | bits;
            }
            self.bit_count += to_write as u8;

            if self.bit_count >= 8 {
                self.data.push(self.current_byte);
                self.current_byte = 0;
                self.bit_count = 0;
            }

            remaining -= to_write;
        }
    }

    /// 对齐到字节边界 (用 0 填充)
    pub fn align_to_byte(&mut self) {
        if self.bit_count > 0 {
            let pad = 8 - self.bit_count;
            self.current_byte <<= pad;
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 完成写入, 返回字节数据
    ///
    /// 如果当前不在字节边界, 自动用 0 填充.
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }

    /// 取出已写入的数据并复位写入器, 便于逐帧复用同一个写入器
    pub fn take(&mut self) -> Vec<u8> {
        self.align_to_byte();
        std::mem::take(&mut self.data)
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitreader::BitReader;

    #[test]
    fn test_write_bits_basic() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b1011, 4);
        bw.write_bits(0b0001, 4);
        assert_eq!(bw.finish(), vec![0b10110001]);
    }

    #[test]
    fn test_write_bits_32_bit() {
        let mut bw = BitWriter::new();
        bw.write_bits(0xFF00FF00, 32);
        assert_eq!(bw.finish(), vec![0xFF, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn test_write_bits_unaligned_32_bit() {
        let mut bw = BitWriter::new();
        bw.write_bit(1);
        bw.write_bits(0x8000_0001, 32);
        assert_eq!(bw.bits_written(), 33);
        assert_eq!(bw.finish(), vec![0xC0, 0x00, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn test_write_zero_width_is_noop() {
        let mut bw = BitWriter::new();
        bw.write_bits(0xFFFF, 0);
        assert_eq!(bw.bits_written(), 0);
        assert!(bw.is_byte_aligned());
    }

    #[test]
    fn test_align_to_byte() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b101, 3);
        assert!(!bw.is_byte_aligned());
        bw.align_to_byte();
        bw.write_bits(0xFF, 8);
        assert_eq!(bw.finish(), vec![0b10100000, 0xFF]);
    }

    #[test]
    fn test_take_resets_writer() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b1, 1);
        assert_eq!(bw.take(), vec![0x80]);
        assert_eq!(bw.bits_written(), 0);
        bw.write_bits(0xAB, 8);
        assert_eq!(bw.take(), vec![0xAB]);
    }

    #[test]
    fn test_try_with_capacity() {
        let bw = BitWriter::try_with_capacity(4).unwrap();
        assert_eq!(bw.bits_written(), 0);
        assert!(matches!(
            BitWriter::try_with_capacity(usize::MAX),
            Err(TaoError::OutOfMemory(_))
        ));
    }

    #[test]
    fn test_read_write_roundtrip_bits() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b10110, 5);
        bw.write_bits(0xFF, 8);
        bw.write_bits(0, 3);
        let data = bw.finish();

        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(5).unwrap(), 0b10110);
        assert_eq!(br.read_bits(8).unwrap(), 0xFF);
        assert_eq!(br.read_bits(3).unwrap(), 0);
    }
}
