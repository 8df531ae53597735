//! 有理数类型, 用于帧率与时间基.
//!
//! 对标 FFmpeg 的 `AVRational`.

use std::fmt;
use std::str::FromStr;

use crate::error::TaoError;

/// 有理数, 由分子和分母组成
///
/// 例如: 帧率 30000/1001 表示 29.97fps, 其倒数 1001/30000 即逐帧时间基.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 转换为 f64 浮点数, 分母为 0 时返回 `f64::NAN`
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }

    /// 正有理数的整数部分 (向下取整), 非正或无效时返回 None
    pub const fn whole_part(self) -> Option<u32> {
        if self.num <= 0 || self.den <= 0 {
            return None;
        }
        Some((self.num / self.den) as u32)
    }

    /// 求倒数
    pub const fn invert(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for Rational {
    type Err = TaoError;

    /// 解析 "30000/1001" 或 "25"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TaoError::InvalidArgument(format!("无法解析有理数 '{}'", s));
        let (num, den) = match s.split_once('/') {
            Some((num, den)) => (num.trim(), den.trim()),
            None => (s.trim(), "1"),
        };
        let num = num.parse::<i32>().map_err(|_| invalid())?;
        let den = den.parse::<i32>().map_err(|_| invalid())?;
        if den == 0 {
            return Err(invalid());
        }
        Ok(Self::new(num, den))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_to_float() {
        let r = Rational::new(1, 4);
        assert!((r.to_f64() - 0.25).abs() < f64::EPSILON);
        assert!(Rational::new(1, 0).to_f64().is_nan());
    }

    #[test]
    fn test_whole_part_floors() {
        assert_eq!(Rational::new(30000, 1001).whole_part(), Some(29));
        assert_eq!(Rational::new(25, 1).whole_part(), Some(25));
        assert_eq!(Rational::new(1, 2).whole_part(), Some(0));
        assert_eq!(Rational::new(-25, 1).whole_part(), None);
        assert_eq!(Rational::new(25, 0).whole_part(), None);
    }

    #[test]
    fn test_rational_display() {
        let r = Rational::new(30000, 1001);
        assert_eq!(format!("{r}"), "30000/1001");
    }

    #[test]
    fn test_rational_reciprocal() {
        let r = Rational::new(30000, 1001).invert();
        assert_eq!(r, Rational::new(1001, 30000));
    }

    #[test]
    fn test_parse() {
        assert_eq!("30000/1001".parse::<Rational>().unwrap(), Rational::new(30000, 1001));
        assert_eq!(" 25 ".parse::<Rational>().unwrap(), Rational::new(25, 1));
        assert!("25/0".parse::<Rational>().is_err());
        assert!("abc".parse::<Rational>().is_err());
    }
}
