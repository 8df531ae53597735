//! 命令行参数解析辅助.

use tao_codec::PictureType;
use tao_codec::encoders::wmv2::PicturePlan;
use tao_core::{TaoError, TaoResult};

/// 解析尺寸字符串 (如 "352x288")
pub(crate) fn parse_size(s: &str) -> TaoResult<(u32, u32)> {
    let invalid = || TaoError::InvalidArgument(format!("无法解析尺寸 '{s}', 期望 WxH"));
    let (w, h) = s.split_once('x').ok_or_else(invalid)?;
    let w = w.trim().parse().map_err(|_| invalid())?;
    let h = h.trim().parse().map_err(|_| invalid())?;
    Ok((w, h))
}

/// 解析图像序列 (如 "I:8,P:12", 可选 RL 表 "I:8:2:1")
///
/// 每项为 `类型:量化步长[:亮度RL表[:色度RL表]]`.
pub(crate) fn parse_pictures(s: &str) -> TaoResult<Vec<PicturePlan>> {
    s.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(parse_picture)
        .collect()
}

fn parse_picture(item: &str) -> TaoResult<PicturePlan> {
    let invalid = || TaoError::InvalidArgument(format!("无法解析图像描述 '{item}'"));
    let mut parts = item.trim().split(':');

    let picture_type = match parts.next().map(str::trim) {
        Some("I" | "i") => PictureType::I,
        Some("P" | "p") => PictureType::P,
        _ => return Err(invalid()),
    };
    let mut next_number = |required: bool| -> TaoResult<Option<u8>> {
        match parts.next() {
            Some(v) => v.trim().parse().map(Some).map_err(|_| invalid()),
            None if required => Err(invalid()),
            None => Ok(None),
        }
    };

    let qscale = next_number(true)?.unwrap_or_default();
    let mut plan = PicturePlan::new(picture_type, qscale);
    if let Some(rl) = next_number(false)? {
        plan.rl_table_index = rl;
        plan.rl_chroma_table_index = rl;
    }
    if let Some(rl_chroma) = next_number(false)? {
        plan.rl_chroma_table_index = rl_chroma;
    }
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(plan)
}
