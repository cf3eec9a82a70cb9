// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Decoder pipeline: container parsing, sequential entropy decoding with
//! inverse DC prediction, block-parallel dequantization and IDCT, plane
//! reassembly and color conversion.

use crate::bit_reader::BitReader;
use crate::block::{self, CoeffBlock, ComponentLayout, SampleBlock};
use crate::color;
use crate::container;
use crate::dct;
use crate::error::{Error, Result};
use crate::huffman::{self, HuffmanDecoder, TableClass};
use crate::image::{Image, Plane};
use crate::quant::QuantTable;
use crate::util::tracing_wrappers::*;
use crate::zigzag;
use crate::BLOCK_SIZE;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Largest DC magnitude category an 8-bit baseline scan can produce.
const MAX_DC_CATEGORY: u8 = 11;

/// Reads one block of quantized coefficients, folding the running DC
/// predictor.
fn decode_block(
    br: &mut BitReader,
    dc_decoder: &HuffmanDecoder,
    ac_decoder: &HuffmanDecoder,
    prev_dc: &mut i32,
) -> Result<CoeffBlock> {
    let mut seq = [0i32; BLOCK_SIZE];
    let category = dc_decoder.decode(br)?;
    if category > MAX_DC_CATEGORY {
        return Err(Error::InvalidScanData("DC category out of range"));
    }
    let diff = huffman::extend_sign(br.read(category as usize)?, category);
    *prev_dc += diff;
    seq[0] = *prev_dc;

    let mut k = 1;
    while k < BLOCK_SIZE {
        let run_size = ac_decoder.decode(br)?;
        let run = (run_size >> 4) as usize;
        let category = run_size & 0x0F;
        if category == 0 {
            if run == 0 {
                // End of block; remaining coefficients stay zero.
                break;
            }
            if run != 15 {
                return Err(Error::InvalidScanData("zero AC size with nonzero run"));
            }
            k += 16;
            continue;
        }
        k += run;
        if k >= BLOCK_SIZE {
            return Err(Error::InvalidScanData("coefficient run past block end"));
        }
        seq[k] = huffman::extend_sign(br.read(category as usize)?, category);
        k += 1;
    }
    Ok(seq)
}

/// Dequantize + IDCT for every block of one component; blocks carry no
/// shared state once their coefficients are known, so this stage fans out.
fn reconstruct_component(
    blocks: &[CoeffBlock],
    quant: &QuantTable,
    layout: &ComponentLayout,
) -> Result<Plane> {
    #[cfg(feature = "parallel")]
    let iter = blocks.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = blocks.iter();
    let spatial: Vec<SampleBlock> = iter
        .map(|seq| {
            let mut quantized = [0i32; BLOCK_SIZE];
            zigzag::zigzag_inverse(seq, &mut quantized)?;
            let mut coeffs = [0.0f32; BLOCK_SIZE];
            quant.dequantize(&quantized, &mut coeffs);
            let mut samples = [0.0f32; BLOCK_SIZE];
            dct::inverse_dct(&coeffs, &mut samples)?;
            Ok(samples)
        })
        .collect::<Result<_>>()?;
    block::assemble_plane(&spatial, layout.blocks_wide, layout.blocks_high)
}

fn validate_samplings(samplings: &[(usize, usize)]) -> Result<()> {
    let all_flat = samplings.iter().all(|&s| s == (1, 1));
    let luma_420 = samplings.len() == 3
        && samplings[0] == (2, 2)
        && samplings[1] == (1, 1)
        && samplings[2] == (1, 1);
    if !all_flat && !luma_420 {
        return Err(Error::Unsupported("sampling factor combination"));
    }
    Ok(())
}

/// Decodes a baseline JFIF stream into an RGBA image.
///
/// The tables declared in DQT/DHT drive dequantization and entropy
/// decoding; nothing is re-derived from a quality setting. Failures never
/// return a partial image.
pub fn decode(data: &[u8]) -> Result<Image> {
    let parsed = container::parse(data)?;
    let frame = &parsed.frame;
    info!(
        "decoding {}x{} with {} components",
        frame.size.0,
        frame.size.1,
        frame.components.len()
    );

    let samplings: Vec<(usize, usize)> = frame
        .components
        .iter()
        .map(|c| (c.h_samp as usize, c.v_samp as usize))
        .collect();
    validate_samplings(&samplings)?;
    let geometry = block::mcu_geometry(frame.size, &samplings);

    // Scan components select the entropy tables; match them up with the
    // frame components by id.
    let mut decoders = Vec::with_capacity(frame.components.len());
    let mut quant_tables = Vec::with_capacity(frame.components.len());
    for component in &frame.components {
        let scan = parsed
            .scan
            .iter()
            .find(|s| s.component_id == component.id)
            .ok_or(Error::InvalidSegment("scan component without frame match"))?;
        decoders.push((
            HuffmanDecoder::build(parsed.huffman_table(TableClass::Dc, scan.dc_index)?)?,
            HuffmanDecoder::build(parsed.huffman_table(TableClass::Ac, scan.ac_index)?)?,
        ));
        quant_tables.push(parsed.quant_table(component.quant_index)?.clone());
    }

    // Entropy decoding is sequential: the bit cursor and the DC predictors
    // thread through every block in MCU order.
    let mut br = BitReader::new(parsed.scan_data);
    let mut coeff_blocks: Vec<Vec<CoeffBlock>> = geometry
        .components
        .iter()
        .map(|layout| vec![[0i32; BLOCK_SIZE]; layout.num_blocks()])
        .collect();
    let mut prev_dc = vec![0i32; frame.components.len()];
    for mcu_y in 0..geometry.mcus_y {
        for mcu_x in 0..geometry.mcus_x {
            for (c, layout) in geometry.components.iter().enumerate() {
                for by in 0..layout.v_samp {
                    for bx in 0..layout.h_samp {
                        let (dc_decoder, ac_decoder) = &decoders[c];
                        let seq = decode_block(&mut br, dc_decoder, ac_decoder, &mut prev_dc[c])?;
                        coeff_blocks[c][layout.block_index(mcu_x, mcu_y, bx, by)] = seq;
                    }
                }
            }
        }
    }

    // With all coefficients known, reconstruction is block-parallel again.
    let mut planes = Vec::with_capacity(frame.components.len());
    for (c, layout) in geometry.components.iter().enumerate() {
        let mut plane = reconstruct_component(&coeff_blocks[c], &quant_tables[c], layout)?;
        let subsampled = layout.h_samp < geometry.components[0].h_samp;
        if subsampled {
            plane = block::upsample_2x(&plane)?;
        }
        planes.push(block::crop_plane(&plane, frame.size)?);
    }

    match planes.as_slice() {
        [y] => color::from_luma(y),
        [y, cb, cr] => color::from_planes(y, cb, cr),
        _ => Err(Error::Unsupported("component counts other than 1 or 3")),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bit_writer::BitWriter;
    use crate::huffman::{HuffmanEncoder, HuffmanTable};

    fn write_flat_block(encoder_dc: &HuffmanEncoder, encoder_ac: &HuffmanEncoder, bw: &mut BitWriter, diff: i32) {
        let category = huffman::category(diff);
        encoder_dc.encode(category, bw).unwrap();
        bw.write(huffman::magnitude_bits(diff, category), category as usize);
        // End of block: all ACs are zero.
        encoder_ac.encode(0x00, bw).unwrap();
    }

    #[test]
    fn dc_prediction_accumulates_differences() {
        let dc_table = HuffmanTable::standard(TableClass::Dc, false);
        let ac_table = HuffmanTable::standard(TableClass::Ac, false);
        let encoder_dc = HuffmanEncoder::build(&dc_table).unwrap();
        let encoder_ac = HuffmanEncoder::build(&ac_table).unwrap();
        let mut bw = BitWriter::new();
        for diff in [5, -3, 0] {
            write_flat_block(&encoder_dc, &encoder_ac, &mut bw, diff);
        }
        let bytes = bw.finish();

        let dc_decoder = HuffmanDecoder::build(&dc_table).unwrap();
        let ac_decoder = HuffmanDecoder::build(&ac_table).unwrap();
        let mut br = BitReader::new(&bytes);
        let mut prev_dc = 0;
        let mut dcs = Vec::new();
        for _ in 0..3 {
            let block = decode_block(&mut br, &dc_decoder, &ac_decoder, &mut prev_dc).unwrap();
            dcs.push(block[0]);
            assert!(block[1..].iter().all(|&v| v == 0));
        }
        assert_eq!(dcs, vec![5, 2, 2]);
    }

    #[test]
    fn truncated_block_reports_entropy_starvation() {
        let dc_table = HuffmanTable::standard(TableClass::Dc, false);
        let ac_table = HuffmanTable::standard(TableClass::Ac, false);
        let dc_decoder = HuffmanDecoder::build(&dc_table).unwrap();
        let ac_decoder = HuffmanDecoder::build(&ac_table).unwrap();
        // A lone DC symbol with no AC data behind it.
        let mut br = BitReader::new(&[0b0000_0000]);
        let mut prev_dc = 0;
        assert!(matches!(
            decode_block(&mut br, &dc_decoder, &ac_decoder, &mut prev_dc),
            Err(Error::TruncatedEntropyStream)
        ));
    }

    #[test]
    fn unsupported_sampling_combinations_are_rejected() {
        assert!(validate_samplings(&[(1, 1)]).is_ok());
        assert!(validate_samplings(&[(1, 1); 3]).is_ok());
        assert!(validate_samplings(&[(2, 2), (1, 1), (1, 1)]).is_ok());
        assert!(matches!(
            validate_samplings(&[(2, 1), (1, 1), (1, 1)]),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            validate_samplings(&[(4, 4), (1, 1), (1, 1)]),
            Err(Error::Unsupported(_))
        ));
    }
}
