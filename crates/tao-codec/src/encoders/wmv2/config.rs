//! WMV2 流级特性开关.
//!
//! 这些开关在打开编码器时确定, 写入 4 字节序列头后在整个码流生命周期内不变.
//! 本编码器并不使用其中的全部能力 (例如逐宏块 RL 表、逐宏块 ABT),
//! 但解码器必须根据这些开关解析条件字段, 因此保留为可配置项并使用固定默认值.

use serde::{Deserialize, Serialize};
use tao_core::{TaoError, TaoResult};

/// 序列头中 slice 数编码的最大值 (3 位)
pub const MAX_SLICE_CODE: u8 = 7;

/// WMV2 编码器特性开关
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wmv2Config {
    /// 允许逐帧切换更精细的运动精度 (mspel)
    pub mspel_bit: bool,
    /// 环路滤波
    pub loop_filter: bool,
    /// 自适应块变换 (ABT)
    pub abt_flag: bool,
    /// I 帧携带 J 类型提示位
    pub j_type_bit: bool,
    /// 左上方运动向量预测提示
    pub top_left_mv_flag: bool,
    /// 允许逐宏块选择 RL 表
    pub per_mb_rl_bit: bool,
    /// slice 数编码 (1..=7), slice 高度 = 宏块行数 / slice_code
    pub slice_code: u8,
}

impl Default for Wmv2Config {
    fn default() -> Self {
        Self {
            mspel_bit: true,
            loop_filter: false,
            abt_flag: true,
            j_type_bit: true,
            top_left_mv_flag: false,
            per_mb_rl_bit: true,
            slice_code: 1,
        }
    }
}

impl Wmv2Config {
    /// 校验配置
    pub fn validate(&self) -> TaoResult<()> {
        if self.slice_code == 0 || self.slice_code > MAX_SLICE_CODE {
            return Err(TaoError::InvalidArgument(format!(
                "WMV2: slice_code={} 超出 1..={}",
                self.slice_code, MAX_SLICE_CODE
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let cfg = Wmv2Config::default();
        assert!(cfg.mspel_bit);
        assert!(!cfg.loop_filter);
        assert!(cfg.abt_flag);
        assert!(cfg.j_type_bit);
        assert!(!cfg.top_left_mv_flag);
        assert!(cfg.per_mb_rl_bit);
        assert_eq!(cfg.slice_code, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_slice_code_range() {
        for code in [0u8, 8, 255] {
            let cfg = Wmv2Config {
                slice_code: code,
                ..Default::default()
            };
            assert!(matches!(cfg.validate(), Err(TaoError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: Wmv2Config =
            serde_json::from_str(r#"{ "loop_filter": true, "slice_code": 3 }"#).unwrap();
        assert!(cfg.loop_filter);
        assert_eq!(cfg.slice_code, 3);
        assert!(cfg.abt_flag);
        assert!(cfg.per_mb_rl_bit);
    }
}
