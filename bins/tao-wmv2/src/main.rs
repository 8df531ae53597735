//! tao-wmv2 - WMV2 码流头部布局探测工具
//!
//! 按给定的流参数生成 4 字节序列头, 并逐帧写出图像头,
//! 打印各自的字节与位串, 便于与其他编码器的输出对照.

mod args;
mod logging;

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process;

use tao_codec::PictureType;
use tao_codec::encoders::wmv2::{
    PictureContext, PicturePlan, SequenceHeader, Wmv2Config, encode_picture_header,
};
use tao_core::bitreader::BitReader;
use tao_core::bitwriter::BitWriter;
use tao_core::{Rational, TaoError, TaoResult};

use args::{parse_pictures, parse_size};

#[derive(Parser, Debug)]
#[command(name = "tao-wmv2", version, about = "WMV2 序列头与图像头布局探测工具")]
struct Cli {
    /// 帧率 (如 "25" 或 "30000/1001")
    #[arg(short = 'r', long = "rate", default_value = "30000/1001")]
    rate: String,

    /// 码率 (bits/s)
    #[arg(short = 'b', long = "bitrate", default_value_t = 800_000)]
    bitrate: u64,

    /// 图像尺寸 (如 "352x288")
    #[arg(short = 's', long = "size", default_value = "352x288")]
    size: String,

    /// 启用环路滤波
    #[arg(long)]
    loop_filter: bool,

    /// slice 数编码 (1..=7), 覆盖配置文件中的值
    #[arg(long)]
    slices: Option<u8>,

    /// JSON 格式的流级配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 图像序列, 每项为 类型:量化步长[:亮度RL表[:色度RL表]]
    #[arg(long, default_value = "I:8,P:12")]
    pictures: String,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeReport {
    width: u32,
    height: u32,
    mb_width: u32,
    mb_height: u32,
    slice_height: u32,
    extradata: String,
    sequence: SequenceHeader,
    pictures: Vec<PictureReport>,
}

/// 单帧图像头
#[derive(Serialize)]
struct PictureReport {
    index: usize,
    picture_type: PictureType,
    qscale: u8,
    rl_table_index: u8,
    rl_chroma_table_index: u8,
    cbp_table_index: u8,
    header_bits: u64,
    bits: String,
}

fn main() {
    let cli = Cli::parse();
    logging::init("tao-wmv2", cli.verbose);

    let report = match probe(&cli) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("错误: {e}");
            process::exit(1);
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("错误: JSON 序列化失败: {e}");
                process::exit(1);
            }
        }
    } else {
        print_report(&report);
    }
}

fn load_config(cli: &Cli) -> TaoResult<Wmv2Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text).map_err(|e| {
                TaoError::InvalidArgument(format!("配置文件 {} 无效: {e}", path.display()))
            })?
        }
        None => Wmv2Config::default(),
    };
    if cli.loop_filter {
        config.loop_filter = true;
    }
    if let Some(slices) = cli.slices {
        config.slice_code = slices;
    }
    Ok(config)
}

fn probe(cli: &Cli) -> TaoResult<ProbeReport> {
    let config = load_config(cli)?;
    let frame_rate: Rational = cli.rate.parse()?;
    let (width, height) = parse_size(&cli.size)?;
    if width == 0 || height == 0 {
        return Err(TaoError::InvalidArgument(format!(
            "无效图像尺寸 {width}x{height}"
        )));
    }
    let plans = parse_pictures(&cli.pictures)?;

    let sequence = SequenceHeader::new(frame_rate, cli.bitrate, &config)?;
    let extradata = sequence.to_extradata()?;
    let mb_width = width.div_ceil(16);
    let mb_height = height.div_ceil(16);
    log::info!(
        "序列: {width}x{height}, {:.3} fps, {} bit/s, {} 帧",
        frame_rate.to_f64(),
        cli.bitrate,
        plans.len()
    );

    let pictures = plans
        .iter()
        .enumerate()
        .map(|(index, plan)| probe_picture(index, &config, plan))
        .collect::<TaoResult<Vec<_>>>()?;

    Ok(ProbeReport {
        width,
        height,
        mb_width,
        mb_height,
        slice_height: sequence.slice_height(mb_height),
        extradata: hex(&extradata),
        sequence,
        pictures,
    })
}

fn probe_picture(index: usize, config: &Wmv2Config, plan: &PicturePlan) -> TaoResult<PictureReport> {
    let mut bw = BitWriter::new();
    let mut ctx = PictureContext::default();
    encode_picture_header(&mut bw, config, plan, &mut ctx)?;
    let bit_count = bw.bits_written();
    let data = bw.finish();

    Ok(PictureReport {
        index,
        picture_type: ctx.picture_type,
        qscale: ctx.qscale,
        rl_table_index: ctx.rl_table_index,
        rl_chroma_table_index: ctx.rl_chroma_table_index,
        cbp_table_index: ctx.cbp_table_index,
        header_bits: ctx.stats.header_bits,
        bits: bit_string(&data, bit_count)?,
    })
}

/// 把前 `count` 位展开为 "0"/"1" 字符串
fn bit_string(data: &[u8], count: usize) -> TaoResult<String> {
    let mut br = BitReader::new(data);
    let mut s = String::with_capacity(count);
    for _ in 0..count {
        s.push(if br.read_bit()? == 1 { '1' } else { '0' });
    }
    Ok(s)
}

fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_report(report: &ProbeReport) {
    println!(
        "图像: {}x{} ({}x{} 宏块)",
        report.width, report.height, report.mb_width, report.mb_height
    );
    println!("extradata: {}", report.extradata);
    println!(
        "  fps_code={} kbps={} mspel={} loop_filter={} abt={} j_type={} top_left_mv={} per_mb_rl={} slice_code={}",
        report.sequence.frame_rate_code,
        report.sequence.bit_rate_code,
        u8::from(report.sequence.flags.mspel_bit),
        u8::from(report.sequence.flags.loop_filter),
        u8::from(report.sequence.flags.abt_flag),
        u8::from(report.sequence.flags.j_type_bit),
        u8::from(report.sequence.flags.top_left_mv_flag),
        u8::from(report.sequence.flags.per_mb_rl_bit),
        report.sequence.flags.slice_code,
    );
    println!("slice 高度: {} 宏块行", report.slice_height);
    for pic in &report.pictures {
        println!(
            "#{:<3} {} q={:<2} rl={}/{} cbp_table={} {:>2} 位: {}",
            pic.index,
            pic.picture_type,
            pic.qscale,
            pic.rl_table_index,
            pic.rl_chroma_table_index,
            pic.cbp_table_index,
            pic.header_bits,
            pic.bits,
        );
    }
}
