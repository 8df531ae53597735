//! 图像头语法表.
//!
//! 图像头的字段顺序、编码方式以及出现条件以数据形式描述,
//! 编码端按表写出, 解析端按同一张表读回. 条件只依赖流级开关和已写出的字段.

use tao_core::{TaoError, TaoResult};

use super::config::Wmv2Config;
use super::picture::PictureContext;
use super::sink::BitSink;
use super::vlc::put_ternary;
use crate::frame::PictureType;

/// 图像头字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    /// 图像类型 (类型序号 - 1)
    PictureType,
    /// I 帧保留的 7 位标记 (全 0)
    Marker,
    /// 量化步长
    QuantScale,
    /// J 类型提示
    JType,
    /// 逐宏块 RL 表开关
    PerMbRlTable,
    /// 色度 RL 表索引
    RlChromaTable,
    /// 亮度 RL 表索引
    RlTable,
    /// DC 表索引
    DcTable,
    /// 跳过类型
    SkipType,
    /// CBP 表选择子
    CbpIndex,
    /// 更精细运动精度 (mspel)
    Mspel,
    /// ABT 类型整帧统一 (写出 `!per_mb_abt`)
    AbtPerPicture,
    /// 整帧 ABT 类型
    AbtType,
    /// 运动向量表索引
    MvTable,
}

/// 字段编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCoding {
    /// 定长位
    Bits(u32),
    /// 三值码 (0/10/11)
    Ternary,
}

/// 流级开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFlag {
    JTypeBit,
    PerMbRlBit,
    MspelBit,
    AbtFlag,
}

impl StreamFlag {
    fn is_set(self, config: &Wmv2Config) -> bool {
        match self {
            Self::JTypeBit => config.j_type_bit,
            Self::PerMbRlBit => config.per_mb_rl_bit,
            Self::MspelBit => config.mspel_bit,
            Self::AbtFlag => config.abt_flag,
        }
    }
}

/// 字段出现条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// 总是出现
    Always,
    /// 对应流级开关打开时出现
    Stream(StreamFlag),
    /// RL 表按帧选择 (未启用逐宏块 RL 表) 时出现
    RlTablesPerPicture,
    /// 启用 ABT 且 ABT 类型整帧统一时出现
    AbtTypePerPicture,
}

impl Presence {
    /// 根据流级开关和已确定的图像字段判断是否出现
    pub fn holds(self, config: &Wmv2Config, ctx: &PictureContext) -> bool {
        match self {
            Self::Always => true,
            Self::Stream(flag) => flag.is_set(config),
            Self::RlTablesPerPicture => !ctx.per_mb_rl_table,
            Self::AbtTypePerPicture => config.abt_flag && !ctx.per_mb_abt,
        }
    }
}

/// 语法表中的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: HeaderField,
    pub coding: FieldCoding,
    pub presence: Presence,
}

const fn spec(field: HeaderField, coding: FieldCoding, presence: Presence) -> FieldSpec {
    FieldSpec {
        field,
        coding,
        presence,
    }
}

use FieldCoding::{Bits, Ternary};
use HeaderField as F;
use Presence::{AbtTypePerPicture, Always, RlTablesPerPicture, Stream};

/// I 帧图像头
pub const INTRA_GRAMMAR: &[FieldSpec] = &[
    spec(F::PictureType, Bits(1), Always),
    spec(F::Marker, Bits(7), Always),
    spec(F::QuantScale, Bits(5), Always),
    spec(F::JType, Bits(1), Stream(StreamFlag::JTypeBit)),
    spec(F::PerMbRlTable, Bits(1), Stream(StreamFlag::PerMbRlBit)),
    spec(F::RlChromaTable, Ternary, RlTablesPerPicture),
    spec(F::RlTable, Ternary, RlTablesPerPicture),
    spec(F::DcTable, Bits(1), Always),
];

/// P 帧图像头
pub const INTER_GRAMMAR: &[FieldSpec] = &[
    spec(F::PictureType, Bits(1), Always),
    spec(F::QuantScale, Bits(5), Always),
    spec(F::SkipType, Bits(2), Always),
    spec(F::CbpIndex, Ternary, Always),
    spec(F::Mspel, Bits(1), Stream(StreamFlag::MspelBit)),
    spec(F::AbtPerPicture, Bits(1), Stream(StreamFlag::AbtFlag)),
    spec(F::AbtType, Ternary, AbtTypePerPicture),
    spec(F::PerMbRlTable, Bits(1), Stream(StreamFlag::PerMbRlBit)),
    spec(F::RlTable, Ternary, RlTablesPerPicture),
    spec(F::DcTable, Bits(1), Always),
    spec(F::MvTable, Bits(1), Always),
];

/// 按图像类型选择语法表
pub fn grammar_for(picture_type: PictureType) -> TaoResult<&'static [FieldSpec]> {
    match picture_type {
        PictureType::I => Ok(INTRA_GRAMMAR),
        PictureType::P => Ok(INTER_GRAMMAR),
        other => Err(TaoError::InvariantViolation(format!(
            "WMV2 不支持图像类型 {:?}",
            other
        ))),
    }
}

/// 按语法表写出图像头字段
pub fn write_fields(
    sink: &mut dyn BitSink,
    grammar: &[FieldSpec],
    config: &Wmv2Config,
    ctx: &PictureContext,
) -> TaoResult<()> {
    for item in grammar {
        if !item.presence.holds(config, ctx) {
            continue;
        }
        let value = ctx.field_value(item.field);
        match item.coding {
            Bits(width) => sink.put_bits(value, width),
            Ternary => put_ternary(sink, value as u8)?,
        }
    }
    Ok(())
}
