//! WMV2 序列头 (extradata).
//!
//! 固定 4 字节, 码流开始前写入一次. 位布局 (MSB first):
//!
//! | 字段 | 位数 |
//! |------|------|
//! | frame_rate_code | 5 |
//! | bit_rate_code (kbps, 上限 2047) | 11 |
//! | mspel_bit | 1 |
//! | loop_filter | 1 |
//! | abt_flag | 1 |
//! | j_type_bit | 1 |
//! | top_left_mv_flag | 1 |
//! | per_mb_rl_bit | 1 |
//! | slice_code | 3 |
//!
//! 共 25 位, 剩余 7 位补 0.

use log::debug;
use serde::Serialize;
use tao_core::bitwriter::BitWriter;
use tao_core::{Rational, TaoError, TaoResult};

use super::config::Wmv2Config;
use super::sink::BitSink;

/// 序列头字节数
pub const EXTRADATA_SIZE: usize = 4;

/// 码率编码上限 (11 位)
pub const MAX_BIT_RATE_CODE: u16 = 2047;

/// 帧率编码上限 (5 位)
const MAX_FRAME_RATE_CODE: u32 = 31;

/// 序列头字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceHeader {
    /// 整数帧率 (向下取整, 29.97 -> 29)
    pub frame_rate_code: u8,
    /// 码率 (kbps, 1 kbps = 1024 bit/s)
    pub bit_rate_code: u16,
    /// 流级特性开关
    pub flags: Wmv2Config,
}

impl SequenceHeader {
    /// 由帧率、码率和特性开关生成序列头
    pub fn new(frame_rate: Rational, bit_rate: u64, flags: &Wmv2Config) -> TaoResult<Self> {
        flags.validate()?;
        Ok(Self {
            frame_rate_code: frame_rate_code(frame_rate)?,
            bit_rate_code: bit_rate_code(bit_rate),
            flags: flags.clone(),
        })
    }

    /// 写入序列头字段 (25 位, 不做字节对齐)
    pub fn write(&self, sink: &mut dyn BitSink) {
        sink.put_bits(u32::from(self.frame_rate_code), 5);
        sink.put_bits(u32::from(self.bit_rate_code), 11);
        sink.put_flag(self.flags.mspel_bit);
        sink.put_flag(self.flags.loop_filter);
        sink.put_flag(self.flags.abt_flag);
        sink.put_flag(self.flags.j_type_bit);
        sink.put_flag(self.flags.top_left_mv_flag);
        sink.put_flag(self.flags.per_mb_rl_bit);
        sink.put_bits(u32::from(self.flags.slice_code), 3);
    }

    /// 生成 4 字节 extradata
    ///
    /// 缓冲区分配失败返回 `OutOfMemory`, 调用方应放弃初始化.
    pub fn to_extradata(&self) -> TaoResult<Vec<u8>> {
        let mut bw = BitWriter::try_with_capacity(EXTRADATA_SIZE)?;
        self.write(&mut bw);
        let mut data = bw.finish();
        data.resize(EXTRADATA_SIZE, 0);
        debug!(
            "WMV2 序列头: fps_code={}, kbps={}, loop_filter={}, slice_code={}, 字节={:02X?}",
            self.frame_rate_code,
            self.bit_rate_code,
            self.flags.loop_filter,
            self.flags.slice_code,
            data,
        );
        Ok(data)
    }

    /// slice 高度 (宏块行数), slice_code 大于宏块行数时为 0
    pub fn slice_height(&self, mb_height: u32) -> u32 {
        mb_height / u32::from(self.flags.slice_code)
    }
}

/// 帧率编码: 分子 / 分母向下取整, 必须能放入 5 位
pub fn frame_rate_code(frame_rate: Rational) -> TaoResult<u8> {
    let code = frame_rate.whole_part().ok_or_else(|| {
        TaoError::InvalidArgument(format!("WMV2: 无效帧率 {}", frame_rate))
    })?;
    if code > MAX_FRAME_RATE_CODE {
        return Err(TaoError::InvalidArgument(format!(
            "WMV2: 帧率 {} 超出序列头可表示范围 (最大 {} fps)",
            frame_rate, MAX_FRAME_RATE_CODE
        )));
    }
    Ok(code as u8)
}

/// 码率编码: `min(bit_rate / 1024, 2047)`
pub fn bit_rate_code(bit_rate: u64) -> u16 {
    (bit_rate / 1024).min(u64::from(MAX_BIT_RATE_CODE)) as u16
}
