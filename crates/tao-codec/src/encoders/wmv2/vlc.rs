//! VLC 码表查询服务与小型定长码.
//!
//! 码表内容由外部 `VlcTableProvider` 提供 (本模块不构造码表),
//! 这里只负责选表、查询与写入, 以及 WMV2 头部使用的三值码和 CBP 表选择映射.

use std::fmt;

use tao_core::{TaoError, TaoResult};

use super::sink::BitSink;

/// 单个码字的最大长度 (位)
pub const MAX_CODE_LENGTH: u32 = 32;

/// 运动向量码表中的转义符号 (其后跟 6+6 位定长 MV)
pub const MV_ESCAPE_SYMBOL: u32 = 4096;

/// P 帧宏块表中 Inter CBP 符号的偏移 (表的后半部分)
pub const INTER_CBP_OFFSET: u32 = 64;

/// 单个变长码字
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlcCode {
    /// 码字 (低 `len` 位有效)
    pub code: u32,
    /// 码长 (位)
    pub len: u32,
}

impl VlcCode {
    /// 创建码字
    pub const fn new(code: u32, len: u32) -> Self {
        Self { code, len }
    }
}

/// 码表标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VlcTable {
    /// I 帧宏块表, 符号为预测后的 coded_cbp (0..64)
    IntraMacroblock,
    /// P 帧宏块表 (索引 0..=2), 符号 0..64 为 Intra CBP, 64..128 为 Inter CBP
    InterMacroblock(u8),
    /// 运动向量表 (索引 0..=1), 符号为 `(mx << 6) | my` 或 `MV_ESCAPE_SYMBOL`
    MotionVector(u8),
    /// Inter 帧内 Intra 宏块的预测方向表
    InterIntraDirection,
}

impl fmt::Display for VlcTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntraMacroblock => write!(f, "mb_i"),
            Self::InterMacroblock(idx) => write!(f, "mb_inter[{idx}]"),
            Self::MotionVector(idx) => write!(f, "mv[{idx}]"),
            Self::InterIntraDirection => write!(f, "inter_intra"),
        }
    }
}

/// VLC 码表提供者
///
/// 给定码表与符号, 返回码字; 表中不存在的符号返回 `None`.
pub trait VlcTableProvider: Send {
    /// 查询码字
    fn lookup(&self, table: VlcTable, symbol: u32) -> Option<VlcCode>;
}

/// 查询并写入一个必须存在的码字
///
/// 码表缺少该符号说明码表提供者有缺陷, 按前置条件破坏处理.
pub fn put_vlc(
    sink: &mut dyn BitSink,
    tables: &dyn VlcTableProvider,
    table: VlcTable,
    symbol: u32,
) -> TaoResult<()> {
    let vlc = tables.lookup(table, symbol).ok_or_else(|| {
        TaoError::InvariantViolation(format!("VLC 表 {} 缺少符号 {}", table, symbol))
    })?;
    put_code(sink, table, symbol, vlc)
}

/// 写入码表提供者返回的码字, 码长须在 1..=32 内
pub fn put_code(
    sink: &mut dyn BitSink,
    table: VlcTable,
    symbol: u32,
    vlc: VlcCode,
) -> TaoResult<()> {
    if vlc.len == 0 || vlc.len > MAX_CODE_LENGTH {
        return Err(TaoError::InvariantViolation(format!(
            "VLC 表 {} 符号 {} 的码长 {} 超出 1..={}",
            table, symbol, vlc.len, MAX_CODE_LENGTH
        )));
    }
    sink.put_bits(vlc.code, vlc.len);
    Ok(())
}

/// 写入三值码: 0 -> `0`, 1 -> `10`, 2 -> `11`
pub fn put_ternary(sink: &mut dyn BitSink, value: u8) -> TaoResult<()> {
    match value {
        0 => sink.put_bits(0, 1),
        1 | 2 => sink.put_bits(0b10 | u32::from(value - 1), 2),
        _ => {
            return Err(TaoError::InvariantViolation(format!(
                "三值码取值 {} 超出 0..=2",
                value
            )));
        }
    }
    Ok(())
}

/// CBP 表选择映射, 行由量化步长区间决定, 列为头部中的 cbp 选择子
const CBP_TABLE_MAP: [[u8; 3]; 3] = [[0, 2, 1], [1, 0, 2], [2, 1, 0]];

/// 根据量化步长和 cbp 选择子确定 P 帧宏块表索引
pub fn select_cbp_table(qscale: u8, cbp_index: u8) -> TaoResult<u8> {
    if cbp_index > 2 {
        return Err(TaoError::InvariantViolation(format!(
            "cbp 选择子 {} 超出 0..=2",
            cbp_index
        )));
    }
    let row = usize::from(qscale > 10) + usize::from(qscale > 20);
    Ok(CBP_TABLE_MAP[row][cbp_index as usize])
}
