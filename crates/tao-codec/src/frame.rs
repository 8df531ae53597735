//! 图像类型.

use std::fmt;

use serde::Serialize;

/// 图片类型
///
/// 判别值即码流中使用的序号, 图像头写出 `序号 - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum PictureType {
    /// 未指定
    #[default]
    None = 0,
    /// I 帧 (关键帧, 帧内编码)
    I = 1,
    /// P 帧 (前向预测)
    P = 2,
    /// B 帧 (双向预测)
    B = 3,
}

impl PictureType {
    /// 码流序号
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// 单字母名称
    pub const fn letter(self) -> char {
        match self {
            Self::None => '?',
            Self::I => 'I',
            Self::P => 'P',
            Self::B => 'B',
        }
    }
}

impl fmt::Display for PictureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
