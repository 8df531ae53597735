//! WMV2 编码往返集成测试.
//!
//! 用定长码表和逐值写出的系数编码器驱动完整编码流程:
//! 残差/运动向量 → Wmv2Encoder → Packet → 按同一语法与预测规则解析
//! 验证解析结果与输入完全一致, 且每帧字节对齐.

use tao_wmv2::codec::encoders::wmv2::coded_block::CodedBlockGrid;
use tao_wmv2::codec::encoders::wmv2::grammar::{
    FieldCoding, HeaderField, INTER_GRAMMAR, INTRA_GRAMMAR,
};
use tao_wmv2::codec::encoders::wmv2::motion::MotionVectorGrid;
use tao_wmv2::codec::encoders::wmv2::{
    BitSink, BlockContext, CoefficientBlock, CoefficientCoder, EscapeLengthState,
    MacroblockMode, MacroblockResidual, MotionVector, PictureContext, PicturePlan,
    SliceLayout, VlcCode, VlcTable, VlcTableProvider, Wmv2Config, Wmv2Encoder,
};
use tao_wmv2::codec::{CodecId, CodecParameters, Packet, PictureType};
use tao_wmv2::core::bitreader::BitReader;
use tao_wmv2::core::{Rational, TaoResult};

// ============================================================
// 协作者
// ============================================================

/// 码字即符号本身的定长码表
struct FixedLengthTables;

impl VlcTableProvider for FixedLengthTables {
    fn lookup(&self, table: VlcTable, symbol: u32) -> Option<VlcCode> {
        match table {
            VlcTable::IntraMacroblock if symbol < 64 => Some(VlcCode::new(symbol, 6)),
            VlcTable::InterMacroblock(_) if symbol < 128 => Some(VlcCode::new(symbol, 7)),
            VlcTable::MotionVector(_) if symbol < 4096 => Some(VlcCode::new(symbol, 12)),
            _ => None,
        }
    }
}

/// 写出 7 位系数个数, 再逐个写出 16 位系数
struct LiteralCoefficients;

impl CoefficientCoder for LiteralCoefficients {
    fn encode_block(
        &mut self,
        sink: &mut dyn BitSink,
        block: &CoefficientBlock,
        _ctx: &BlockContext,
        _escape: &mut EscapeLengthState,
    ) -> TaoResult<()> {
        let count = (block.last_index + 1) as usize;
        sink.put_bits(count as u32, 7);
        for &c in &block.coefficients[..count] {
            sink.put_bits(u32::from(c as u16), 16);
        }
        Ok(())
    }
}

// ============================================================
// 辅助函数
// ============================================================

/// 线性同余伪随机序列
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0 >> 8
    }

    fn range(&mut self, lo: i32, hi: i32) -> i32 {
        lo + (self.next() % (hi - lo + 1) as u32) as i32
    }
}

fn random_block(rng: &mut Lcg) -> CoefficientBlock {
    let last = rng.range(-1, 9);
    let mut coefficients = [0i16; 64];
    for k in 0..=last.max(-1) {
        coefficients[k as usize] = rng.range(-50, 50) as i16;
    }
    if last >= 0 {
        let magnitude = rng.range(1, 40) as i16;
        coefficients[last as usize] = if rng.next() % 2 == 0 {
            magnitude
        } else {
            -magnitude
        };
    }
    CoefficientBlock::from_coefficients(coefficients)
}

fn random_macroblock(rng: &mut Lcg, mb_x: u32, mb_y: u32, mode: MacroblockMode) -> MacroblockResidual {
    MacroblockResidual {
        mb_x,
        mb_y,
        mode,
        blocks: std::array::from_fn(|_| random_block(rng)),
    }
}

fn open_encoder(width: u32, height: u32, config: Wmv2Config) -> Wmv2Encoder {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut params = CodecParameters::video(
        CodecId::Wmv2,
        width,
        height,
        Rational::new(25, 1),
        1_000_000,
    );
    Wmv2Encoder::open(
        &mut params,
        config,
        Box::new(FixedLengthTables),
        Box::new(LiteralCoefficients),
    )
    .unwrap()
}

fn encode_picture(encoder: &mut Wmv2Encoder, plan: &PicturePlan, mbs: &[MacroblockResidual]) -> Packet {
    encoder.begin_picture(plan).unwrap();
    for mb in mbs {
        encoder.encode_macroblock(mb).unwrap();
    }
    encoder.finish_picture().unwrap()
}

// ============================================================
// 参考解析器
// ============================================================

#[derive(Debug, PartialEq)]
struct DecodedMacroblock {
    mode: MacroblockMode,
    cbp: u32,
    blocks: Vec<CoefficientBlock>,
}

fn read_ternary(br: &mut BitReader) -> u32 {
    if br.read_bit().unwrap() == 0 {
        0
    } else {
        1 + br.read_bit().unwrap()
    }
}

/// 按语法表解析图像头, 返回 (图像类型, 量化步长)
fn parse_picture_header(br: &mut BitReader, config: &Wmv2Config) -> (PictureType, u32) {
    let (picture_type, grammar) = if br.peek_bits(1).unwrap() == 0 {
        (PictureType::I, INTRA_GRAMMAR)
    } else {
        (PictureType::P, INTER_GRAMMAR)
    };
    let mut ctx = PictureContext::default();
    let mut qscale = 0;
    for item in grammar {
        if !item.presence.holds(config, &ctx) {
            continue;
        }
        let value = match item.coding {
            FieldCoding::Bits(width) => br.read_bits(width).unwrap(),
            FieldCoding::Ternary => read_ternary(br),
        };
        match item.field {
            HeaderField::QuantScale => qscale = value,
            HeaderField::PerMbRlTable => ctx.per_mb_rl_table = value != 0,
            HeaderField::AbtPerPicture => ctx.per_mb_abt = value == 0,
            _ => {}
        }
    }
    (picture_type, qscale)
}

fn read_block(br: &mut BitReader) -> CoefficientBlock {
    let count = br.read_bits(7).unwrap() as usize;
    let mut coefficients = [0i16; 64];
    for c in coefficients.iter_mut().take(count) {
        *c = br.read_bits(16).unwrap() as u16 as i16;
    }
    CoefficientBlock::new(coefficients, count as i32 - 1)
}

fn decode_picture(
    data: &[u8],
    config: &Wmv2Config,
    mb_width: u32,
    mb_height: u32,
    slices: SliceLayout,
) -> (PictureType, u32, Vec<DecodedMacroblock>) {
    let mut br = BitReader::new(data);
    let (picture_type, qscale) = parse_picture_header(&mut br, config);
    let mut coded = CodedBlockGrid::new(mb_width, mb_height);
    let mut mvs = MotionVectorGrid::new(mb_width, mb_height);
    let mut first_slice_line = true;
    let mut out = Vec::new();

    for mb_y in 0..mb_height {
        for mb_x in 0..mb_width {
            slices.update_first_line(mb_x, mb_y, &mut first_slice_line);
            let (mode, cbp) = if picture_type == PictureType::I {
                let coded_cbp = br.read_bits(6).unwrap();
                assert!(!br.read_flag().unwrap(), "AC 预测位");
                let mut cbp = coded_cbp;
                for i in 0..4 {
                    let bit = (coded_cbp >> (5 - i)) & 1 == 1;
                    let val = bit ^ coded.predict(mb_x, mb_y, i);
                    coded.store(mb_x, mb_y, i, val);
                    cbp = (cbp & !(1 << (5 - i))) | (u32::from(val) << (5 - i));
                }
                (MacroblockMode::Intra, cbp)
            } else {
                let symbol = br.read_bits(7).unwrap();
                if symbol >= 64 {
                    let diff = br.read_bits(12).unwrap();
                    let pred = mvs.predict(mb_x, mb_y, first_slice_line);
                    let mv = MotionVector::new(
                        pred.x + (diff >> 6) as i16 - 32,
                        pred.y + (diff & 63) as i16 - 32,
                    );
                    mvs.store(mb_x, mb_y, mv);
                    (MacroblockMode::Inter { motion_vector: mv }, symbol - 64)
                } else {
                    assert!(!br.read_flag().unwrap(), "AC 预测位");
                    mvs.store(mb_x, mb_y, MotionVector::ZERO);
                    (MacroblockMode::Intra, symbol)
                }
            };
            let blocks = (0..6).map(|_| read_block(&mut br)).collect();
            out.push(DecodedMacroblock { mode, cbp, blocks });
        }
    }
    assert!(br.bits_left() < 8, "帧尾只允许字节对齐填充");
    (picture_type, qscale, out)
}

fn expected_cbp(mb: &MacroblockResidual) -> u32 {
    let threshold = if mb.is_intra() { 1 } else { 0 };
    mb.blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| block.last_index >= threshold)
        .fold(0, |cbp, (i, _)| cbp | (1 << (5 - i)))
}

fn assert_round_trip(decoded: &[DecodedMacroblock], input: &[MacroblockResidual]) {
    assert_eq!(decoded.len(), input.len());
    for (got, want) in decoded.iter().zip(input) {
        assert_eq!(got.mode, want.mode, "MB({},{})", want.mb_x, want.mb_y);
        assert_eq!(got.cbp, expected_cbp(want), "MB({},{})", want.mb_x, want.mb_y);
        assert_eq!(got.blocks.as_slice(), want.blocks.as_slice());
    }
}

// ============================================================
// 测试
// ============================================================

#[test]
fn test_intra_then_inter_round_trip() {
    let config = Wmv2Config::default();
    let mut encoder = open_encoder(64, 48, config.clone());
    let (mb_width, mb_height) = (encoder.mb_width(), encoder.mb_height());
    assert_eq!((mb_width, mb_height), (4, 3));
    let mut rng = Lcg(2024);

    let intra: Vec<_> = (0..mb_height)
        .flat_map(|y| (0..mb_width).map(move |x| (x, y)))
        .map(|(x, y)| random_macroblock(&mut rng, x, y, MacroblockMode::Intra))
        .collect();
    let packet = encode_picture(&mut encoder, &PicturePlan::intra(6), &intra);
    assert!(packet.is_keyframe);
    let (picture_type, qscale, decoded) =
        decode_picture(&packet.data, &config, mb_width, mb_height, encoder.slice_layout());
    assert_eq!((picture_type, qscale), (PictureType::I, 6));
    assert_round_trip(&decoded, &intra);

    let inter: Vec<_> = (0..mb_height)
        .flat_map(|y| (0..mb_width).map(move |x| (x, y)))
        .enumerate()
        .map(|(i, (x, y))| {
            let mode = if i % 3 == 2 {
                MacroblockMode::Intra
            } else {
                MacroblockMode::Inter {
                    motion_vector: MotionVector::new(
                        rng.range(-8, 8) as i16,
                        rng.range(-8, 8) as i16,
                    ),
                }
            };
            random_macroblock(&mut rng, x, y, mode)
        })
        .collect();
    let packet = encode_picture(&mut encoder, &PicturePlan::inter(22), &inter);
    assert!(!packet.is_keyframe);
    assert_eq!(packet.pts, 1);
    let (picture_type, qscale, decoded) =
        decode_picture(&packet.data, &config, mb_width, mb_height, encoder.slice_layout());
    assert_eq!((picture_type, qscale), (PictureType::P, 22));
    assert_round_trip(&decoded, &inter);
}

#[test]
fn test_round_trip_with_multiple_slices_and_minimal_flags() {
    let config = Wmv2Config {
        mspel_bit: false,
        abt_flag: false,
        j_type_bit: false,
        per_mb_rl_bit: false,
        slice_code: 3,
        ..Default::default()
    };
    let mut encoder = open_encoder(48, 96, config.clone());
    assert_eq!(encoder.slice_layout().slice_height(), 2);
    let mut rng = Lcg(7);

    for (n, plan) in [PicturePlan::intra(3), PicturePlan::inter(11), PicturePlan::inter(30)]
        .iter()
        .enumerate()
    {
        let mbs: Vec<_> = (0..encoder.mb_height())
            .flat_map(|y| (0..encoder.mb_width()).map(move |x| (x, y)))
            .map(|(x, y)| {
                let mode = if plan.picture_type == PictureType::I {
                    MacroblockMode::Intra
                } else {
                    MacroblockMode::Inter {
                        motion_vector: MotionVector::new(
                            rng.range(-6, 6) as i16,
                            rng.range(-6, 6) as i16,
                        ),
                    }
                };
                random_macroblock(&mut rng, x, y, mode)
            })
            .collect();
        let packet = encode_picture(&mut encoder, plan, &mbs);
        assert_eq!(packet.pts, n as i64);
        let (_, qscale, decoded) = decode_picture(
            &packet.data,
            &config,
            encoder.mb_width(),
            encoder.mb_height(),
            encoder.slice_layout(),
        );
        assert_eq!(qscale, u32::from(plan.qscale));
        assert_round_trip(&decoded, &mbs);
    }
}

#[test]
fn test_statistics_cover_every_bit() {
    let mut encoder = open_encoder(32, 32, Wmv2Config::default());
    let mut rng = Lcg(99);
    let mbs: Vec<_> = (0..2)
        .flat_map(|y| (0..2).map(move |x| (x, y)))
        .map(|(x, y)| {
            random_macroblock(
                &mut rng,
                x,
                y,
                MacroblockMode::Inter {
                    motion_vector: MotionVector::new(1, -1),
                },
            )
        })
        .collect();
    let packet = encode_picture(&mut encoder, &PicturePlan::inter(4), &mbs);
    let stats = encoder.picture_context().stats;
    assert_eq!(stats.i_tex_bits, 0);
    assert_eq!(stats.mv_bits, 4 * 12);
    assert_eq!(stats.misc_bits, 4 * 7);
    assert_eq!(packet.size(), stats.total_bits().div_ceil(8) as usize);
}

#[test]
fn test_json_config_drives_extradata() {
    let config: Wmv2Config =
        serde_json::from_str(r#"{ "loop_filter": true, "slice_code": 3 }"#).unwrap();
    assert!(config.mspel_bit);
    assert!(config.loop_filter);
    assert_eq!(config.slice_code, 3);

    let mut params = CodecParameters::video(
        CodecId::Wmv2,
        352,
        288,
        Rational::new(30000, 1001),
        800_000,
    );
    let encoder = Wmv2Encoder::open(
        &mut params,
        config,
        Box::new(FixedLengthTables),
        Box::new(LiteralCoefficients),
    )
    .unwrap();
    // 11101 01100001101 1 1 1 1 0 1 011
    assert_eq!(params.extra_data, vec![0xEB, 0x0D, 0xF5, 0x80]);
    assert_eq!(encoder.slice_layout().slice_height(), 6);
    assert_eq!(encoder.sequence_header().frame_rate_code, 29);
    assert!(encoder.config().loop_filter);
}

#[test]
fn test_facade_version() {
    assert!(!tao_wmv2::version().is_empty());
}
