// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Encoder pipeline: color conversion, block sampling, per-block transform
//! and quantization, entropy coding with DC prediction, container framing.

use crate::api::{ChromaSampling, ColorSpace, EncodeOptions, EncodedJpeg, TableSource};
use crate::bit_writer::BitWriter;
use crate::block::{self, CoeffBlock, McuGeometry, SampleBlock};
use crate::color;
use crate::container::{self, FrameComponent, ScanComponent};
use crate::dct;
use crate::error::{Error, Result};
use crate::huffman::{self, FrequencyCounter, HuffmanEncoder, HuffmanTable, TableClass};
use crate::image::{Image, Plane};
use crate::quant::QuantTable;
use crate::util::tracing_wrappers::*;
use crate::zigzag;
use crate::BLOCK_SIZE;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

fn report(on_progress: &mut Option<&mut dyn FnMut(u32)>, percent: u32) {
    if let Some(callback) = on_progress.as_mut() {
        callback(percent);
    }
}

fn samplings(color_space: ColorSpace, sampling: ChromaSampling) -> Vec<(usize, usize)> {
    match (color_space, sampling) {
        (ColorSpace::Grayscale, _) => vec![(1, 1)],
        (ColorSpace::Rgb, ChromaSampling::Cs444) => vec![(1, 1); 3],
        (ColorSpace::Rgb, ChromaSampling::Cs420) => vec![(2, 2), (1, 1), (1, 1)],
    }
}

fn frame_components(color_space: ColorSpace, sampling: ChromaSampling) -> Vec<FrameComponent> {
    let samplings = samplings(color_space, sampling);
    samplings
        .iter()
        .enumerate()
        .map(|(i, &(h, v))| FrameComponent {
            id: i as u8 + 1,
            h_samp: h as u8,
            v_samp: v as u8,
            quant_index: (i > 0) as u8,
        })
        .collect()
}

fn scan_components(num_components: usize) -> Vec<ScanComponent> {
    (0..num_components)
        .map(|i| ScanComponent {
            component_id: i as u8 + 1,
            dc_index: (i > 0) as u8,
            ac_index: (i > 0) as u8,
        })
        .collect()
}

/// DCT + quantization + zigzag for every block of one component. Blocks are
/// independent here, so this stage fans out; the output stays in block
/// raster order regardless of completion order.
fn transform_component(
    blocks: &[SampleBlock],
    quant: &QuantTable,
    fast_mode: bool,
) -> Result<Vec<CoeffBlock>> {
    #[cfg(feature = "parallel")]
    let iter = blocks.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = blocks.iter();
    iter.map(|samples| {
        let mut coeffs = [0.0f32; BLOCK_SIZE];
        if fast_mode {
            dct::forward_dct_fast(samples, &mut coeffs)?;
        } else {
            dct::forward_dct(samples, &mut coeffs)?;
        }
        let mut quantized = [0i32; BLOCK_SIZE];
        quant.quantize(&coeffs, &mut quantized);
        let mut seq = [0i32; BLOCK_SIZE];
        zigzag::zigzag_forward(&quantized, &mut seq)?;
        Ok(seq)
    })
    .collect()
}

/// Consumer of the entropy symbol stream; one implementation counts
/// frequencies, the other writes bits.
trait SymbolSink {
    fn dc(&mut self, chroma: bool, diff: i32) -> Result<()>;
    fn ac(&mut self, chroma: bool, run: u8, value: i32) -> Result<()>;
}

/// Walks all blocks in MCU-interleaved order, folding the per-component DC
/// predictor over the sequence. This stage is inherently sequential: both
/// the predictor and the output bit position carry state across blocks.
fn scan_symbols(
    geometry: &McuGeometry,
    blocks: &[Vec<CoeffBlock>],
    sink: &mut impl SymbolSink,
) -> Result<()> {
    let mut prev_dc = vec![0i32; blocks.len()];
    for mcu_y in 0..geometry.mcus_y {
        for mcu_x in 0..geometry.mcus_x {
            for (c, layout) in geometry.components.iter().enumerate() {
                let chroma = c > 0;
                for by in 0..layout.v_samp {
                    for bx in 0..layout.h_samp {
                        let seq = &blocks[c][layout.block_index(mcu_x, mcu_y, bx, by)];
                        let diff = seq[0] - prev_dc[c];
                        prev_dc[c] = seq[0];
                        sink.dc(chroma, diff)?;
                        for (run, value) in zigzag::run_length_encode(&seq[1..]) {
                            sink.ac(chroma, run, value)?;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

#[derive(Default)]
struct CounterSink {
    dc: [FrequencyCounter; 2],
    ac: [FrequencyCounter; 2],
}

impl SymbolSink for CounterSink {
    fn dc(&mut self, chroma: bool, diff: i32) -> Result<()> {
        self.dc[chroma as usize].count(huffman::category(diff));
        Ok(())
    }

    fn ac(&mut self, chroma: bool, run: u8, value: i32) -> Result<()> {
        let symbol = (run << 4) | huffman::category(value);
        self.ac[chroma as usize].count(symbol);
        Ok(())
    }
}

struct WriterSink {
    dc: [Option<HuffmanEncoder>; 2],
    ac: [Option<HuffmanEncoder>; 2],
    writer: BitWriter,
}

impl WriterSink {
    fn build(tables: &[HuffmanTable]) -> Result<WriterSink> {
        let mut dc = [None, None];
        let mut ac = [None, None];
        for table in tables {
            let slot = table.index as usize;
            if slot > 1 {
                return Err(Error::InvalidHuffmanTable("table id out of range"));
            }
            let encoder = Some(HuffmanEncoder::build(table)?);
            match table.class {
                TableClass::Dc => dc[slot] = encoder,
                TableClass::Ac => ac[slot] = encoder,
            }
        }
        Ok(WriterSink {
            dc,
            ac,
            writer: BitWriter::new(),
        })
    }

    fn encoder(encoders: &[Option<HuffmanEncoder>; 2], class: TableClass, chroma: bool) -> Result<&HuffmanEncoder> {
        encoders[chroma as usize]
            .as_ref()
            .ok_or(Error::MissingHuffmanTable(class as u8, chroma as u8))
    }
}

impl SymbolSink for WriterSink {
    fn dc(&mut self, chroma: bool, diff: i32) -> Result<()> {
        let encoder = Self::encoder(&self.dc, TableClass::Dc, chroma)?;
        let category = huffman::category(diff);
        encoder.encode(category, &mut self.writer)?;
        self.writer
            .write(huffman::magnitude_bits(diff, category), category as usize);
        Ok(())
    }

    fn ac(&mut self, chroma: bool, run: u8, value: i32) -> Result<()> {
        let encoder = Self::encoder(&self.ac, TableClass::Ac, chroma)?;
        let category = huffman::category(value);
        encoder.encode((run << 4) | category, &mut self.writer)?;
        self.writer
            .write(huffman::magnitude_bits(value, category), category as usize);
        Ok(())
    }
}

fn entropy_tables(
    source: TableSource,
    num_components: usize,
    geometry: &McuGeometry,
    blocks: &[Vec<CoeffBlock>],
) -> Result<Vec<HuffmanTable>> {
    let chroma_tables = num_components > 1;
    match source {
        TableSource::Standard => {
            let mut tables = vec![
                HuffmanTable::standard(TableClass::Dc, false),
                HuffmanTable::standard(TableClass::Ac, false),
            ];
            if chroma_tables {
                tables.push(HuffmanTable::standard(TableClass::Dc, true));
                tables.push(HuffmanTable::standard(TableClass::Ac, true));
            }
            Ok(tables)
        }
        TableSource::Optimized => {
            let mut counter = CounterSink::default();
            scan_symbols(geometry, blocks, &mut counter)?;
            let mut tables = vec![
                HuffmanTable::from_frequencies(TableClass::Dc, 0, &counter.dc[0])?,
                HuffmanTable::from_frequencies(TableClass::Ac, 0, &counter.ac[0])?,
            ];
            if chroma_tables {
                tables.push(HuffmanTable::from_frequencies(
                    TableClass::Dc,
                    1,
                    &counter.dc[1],
                )?);
                tables.push(HuffmanTable::from_frequencies(
                    TableClass::Ac,
                    1,
                    &counter.ac[1],
                )?);
            }
            Ok(tables)
        }
    }
}

/// Encodes an image into a baseline JFIF stream.
pub fn encode(image: &Image, mut options: EncodeOptions) -> Result<EncodedJpeg> {
    // Quantization table derivation also validates the quality range, so
    // nothing below starts before the options are known to be good.
    let luma_quant = QuantTable::for_quality(options.quality, false)?;
    let chroma_quant = QuantTable::for_quality(options.quality, true)?;
    // Frame dimensions are 16-bit fields in SOF0.
    if image.width() > u16::MAX as usize || image.height() > u16::MAX as usize {
        return Err(Error::InvalidImageSize(image.width(), image.height()));
    }
    report(&mut options.on_progress, 0);
    info!(
        "encoding {}x{} at quality {}",
        image.width(),
        image.height(),
        options.quality
    );

    let planes: Vec<Plane> = match options.color_space {
        ColorSpace::Grayscale => vec![color::to_luma(image)?],
        ColorSpace::Rgb => color::to_planes(image)?.into(),
    };
    report(&mut options.on_progress, 20);

    let geometry = block::mcu_geometry(image.size(), &samplings(options.color_space, options.sampling));
    let mut sample_blocks: Vec<Vec<SampleBlock>> = Vec::with_capacity(planes.len());
    for (c, plane) in planes.iter().enumerate() {
        let subsampled;
        let plane = if c > 0 && options.sampling == ChromaSampling::Cs420 {
            subsampled = block::downsample_2x(plane)?;
            &subsampled
        } else {
            plane
        };
        let padded = block::pad_plane(plane, geometry.components[c].plane_size())?;
        sample_blocks.push(block::split_into_blocks(&padded)?);
    }
    report(&mut options.on_progress, 30);

    let coeff_blocks: Vec<Vec<CoeffBlock>> = sample_blocks
        .iter()
        .enumerate()
        .map(|(c, blocks)| {
            let quant = if c == 0 { &luma_quant } else { &chroma_quant };
            transform_component(blocks, quant, options.fast_mode)
        })
        .collect::<Result<_>>()?;
    report(&mut options.on_progress, 50);

    let tables = entropy_tables(options.tables, planes.len(), &geometry, &coeff_blocks)?;
    report(&mut options.on_progress, 70);

    let mut sink = WriterSink::build(&tables)?;
    scan_symbols(&geometry, &coeff_blocks, &mut sink)?;
    let scan_bytes = sink.writer.finish();
    report(&mut options.on_progress, 90);

    let mut bytes = Vec::new();
    container::write_soi(&mut bytes);
    container::write_app0(&mut bytes);
    container::write_dqt(&mut bytes, &luma_quant);
    if planes.len() > 1 {
        container::write_dqt(&mut bytes, &chroma_quant);
    }
    container::write_sof0(
        &mut bytes,
        image.size(),
        &frame_components(options.color_space, options.sampling),
    );
    for table in &tables {
        container::write_dht(&mut bytes, table);
    }
    container::write_sos(&mut bytes, &scan_components(planes.len()));
    bytes.extend_from_slice(&scan_bytes);
    container::write_eoi(&mut bytes);
    report(&mut options.on_progress, 100);

    Ok(EncodedJpeg {
        bytes,
        width: image.width(),
        height: image.height(),
        quality: options.quality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_image(width: usize, height: usize, value: u8) -> Image {
        Image::new(
            (width, height),
            4,
            (0..width * height)
                .flat_map(|_| [value, value, value, 255])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn uniform_midgray_block_is_a_lone_end_of_block() {
        let samples = [128.0f32; BLOCK_SIZE];
        let quant = QuantTable::for_quality(75, false).unwrap();
        let blocks = transform_component(&[samples], &quant, false).unwrap();
        assert_eq!(blocks[0][0], 0);
        assert_eq!(zigzag::run_length_encode(&blocks[0][1..]), vec![(0, 0)]);
    }

    #[test]
    fn progress_hits_every_milestone() {
        let image = gray_image(16, 16, 90);
        let mut milestones = Vec::new();
        let mut callback = |percent| milestones.push(percent);
        let options = EncodeOptions {
            on_progress: Some(&mut callback),
            ..EncodeOptions::new()
        };
        encode(&image, options).unwrap();
        assert_eq!(milestones, vec![0, 20, 30, 50, 70, 90, 100]);
    }

    #[test]
    fn stream_is_framed_by_soi_and_eoi() {
        let image = gray_image(8, 8, 128);
        let encoded = encode(&image, EncodeOptions::new()).unwrap();
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&encoded.bytes[encoded.bytes.len() - 2..], &[0xFF, 0xD9]);
        assert_eq!(encoded.width, 8);
        assert_eq!(encoded.height, 8);
        assert_eq!(encoded.quality, 75);
    }

    #[test]
    fn grayscale_stream_declares_one_component() {
        let image = gray_image(8, 8, 128);
        let options = EncodeOptions {
            color_space: ColorSpace::Grayscale,
            ..EncodeOptions::new()
        };
        let encoded = encode(&image, options).unwrap();
        let parsed = container::parse(&encoded.bytes).unwrap();
        assert_eq!(parsed.frame.components.len(), 1);
        assert_eq!(parsed.quant_tables.len(), 1);
        assert_eq!(parsed.huffman_tables.len(), 2);
    }

    #[test]
    fn invalid_quality_is_rejected_before_any_work() {
        let image = gray_image(8, 8, 128);
        let mut called = false;
        let mut callback = |_| called = true;
        let options = EncodeOptions {
            quality: 0,
            on_progress: Some(&mut callback),
            ..EncodeOptions::new()
        };
        assert!(matches!(
            encode(&image, options),
            Err(Error::InvalidQuality(0))
        ));
        assert!(!called);
    }

    #[test]
    fn dc_prediction_crosses_blocks_within_a_component() {
        // Two horizontally adjacent flat blocks with different levels; the
        // second DC symbol must encode only the difference.
        let mut data = Vec::new();
        for _ in 0..8 {
            data.extend(std::iter::repeat_n(64u8, 8 * 4));
            data.extend(std::iter::repeat_n(192u8, 8 * 4));
        }
        let image = Image::new((16, 8), 4, data).unwrap();
        let options = EncodeOptions {
            color_space: ColorSpace::Grayscale,
            ..EncodeOptions::new()
        };
        let encoded = encode(&image, options).unwrap();
        // Encoding twice is deterministic.
        let options = EncodeOptions {
            color_space: ColorSpace::Grayscale,
            ..EncodeOptions::new()
        };
        assert_eq!(encoded.bytes, encode(&image, options).unwrap().bytes);
    }
}
