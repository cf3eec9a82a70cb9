// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Canonical Huffman tables for DC and AC entropy coding.
//!
//! Tables are kept in the DHT wire representation, a count of codes per
//! length plus the symbol values in code order, whether they come from the
//! standard Annex K.3 sets or from a frequency scan of the actual image.
//! Encode and decode both derive their lookup structures from that
//! representation, so a decoder never needs side information beyond the
//! DHT markers.

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::error::{Error, Result};
use crate::util::tracing_wrappers::*;

pub const MAX_CODE_LENGTH: usize = 16;

/// Code lengths during tree construction, before the 16-bit cap is applied.
const MAX_INTERMEDIATE_LENGTH: usize = 32;

/// Symbol count plus one reserved slot used during table construction.
const NUM_SYMBOLS: usize = 257;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableClass {
    Dc = 0,
    Ac = 1,
}

/// Magnitude category of a coefficient: 0 for 0, otherwise the number of
/// bits needed for |value|.
pub fn category(value: i32) -> u8 {
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

/// The "magnitude + sign" representation of a nonzero value: the value
/// itself if positive, value - 1 in the same bit width if negative.
pub fn magnitude_bits(value: i32, category: u8) -> u32 {
    if category == 0 {
        return 0;
    }
    let raw = if value > 0 { value } else { value - 1 };
    raw as u32 & ((1 << category) - 1)
}

/// Recovers a signed value from its magnitude bits (ITU-T T.81 Table F.1:
/// a clear high bit means the value is negative).
pub fn extend_sign(bits: u32, category: u8) -> i32 {
    if category == 0 {
        return 0;
    }
    let half = 1i32 << (category - 1);
    if (bits as i32) < half {
        bits as i32 - (1i32 << category) + 1
    } else {
        bits as i32
    }
}

const STD_DC_LUMA_COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
const STD_DC_LUMA_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

const STD_DC_CHROMA_COUNTS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
const STD_DC_CHROMA_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

const STD_AC_LUMA_COUNTS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D];
const STD_AC_LUMA_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61,
    0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52,
    0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x25,
    0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45,
    0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64,
    0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83,
    0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99,
    0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6,
    0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3,
    0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8,
    0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
];

const STD_AC_CHROMA_COUNTS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
const STD_AC_CHROMA_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61,
    0x71, 0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33,
    0x52, 0xF0, 0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34, 0xE1, 0x25, 0xF1, 0x17, 0x18,
    0x19, 0x1A, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44,
    0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63,
    0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A,
    0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97,
    0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4,
    0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA,
    0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7,
    0xE8, 0xE9, 0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
];

/// A canonical Huffman table in its DHT wire shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HuffmanTable {
    /// Table class (DC or AC).
    pub class: TableClass,
    /// Table slot (0 = luma, 1 = chroma).
    pub index: u8,
    /// Number of codes of each length 1..=16.
    pub counts: [u8; MAX_CODE_LENGTH],
    /// Symbol values in order of increasing code length.
    pub values: Vec<u8>,
}

impl HuffmanTable {
    /// The Annex K.3 table for the given class and component kind.
    pub fn standard(class: TableClass, chroma: bool) -> HuffmanTable {
        let (counts, values): (&[u8; 16], &[u8]) = match (class, chroma) {
            (TableClass::Dc, false) => (&STD_DC_LUMA_COUNTS, &STD_DC_LUMA_VALUES),
            (TableClass::Dc, true) => (&STD_DC_CHROMA_COUNTS, &STD_DC_CHROMA_VALUES),
            (TableClass::Ac, false) => (&STD_AC_LUMA_COUNTS, &STD_AC_LUMA_VALUES),
            (TableClass::Ac, true) => (&STD_AC_CHROMA_COUNTS, &STD_AC_CHROMA_VALUES),
        };
        HuffmanTable {
            class,
            index: chroma as u8,
            counts: *counts,
            values: values.to_vec(),
        }
    }

    /// Builds an optimal length-limited table from symbol frequencies
    /// gathered over the image (ITU-T T.81 section K.2).
    pub fn from_frequencies(
        class: TableClass,
        index: u8,
        counter: &FrequencyCounter,
    ) -> Result<HuffmanTable> {
        let mut freq = counter.counts;
        let lengths = generate_code_lengths(&mut freq)?;

        let mut counts = [0u8; MAX_CODE_LENGTH];
        let mut symbols_by_length: [Vec<u8>; MAX_CODE_LENGTH + 1] = Default::default();
        for (symbol, &length) in lengths.iter().enumerate().take(256) {
            if length > 0 {
                symbols_by_length[length as usize].push(symbol as u8);
                counts[length as usize - 1] += 1;
            }
        }
        let values: Vec<u8> = symbols_by_length.iter().flatten().copied().collect();
        debug!(
            "built {:?} table {} with {} symbols",
            class,
            index,
            values.len()
        );
        Ok(HuffmanTable {
            class,
            index,
            counts,
            values,
        })
    }

    pub fn num_codes(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }

    fn validate(&self) -> Result<()> {
        if self.num_codes() != self.values.len() {
            return Err(Error::InvalidHuffmanTable("code count does not match values"));
        }
        if self.values.len() > 256 {
            return Err(Error::InvalidHuffmanTable("more than 256 symbols"));
        }
        Ok(())
    }
}

/// Symbol frequency histogram for one table, first pass of two-pass
/// encoding.
#[derive(Clone)]
pub struct FrequencyCounter {
    counts: [i64; NUM_SYMBOLS],
}

impl Default for FrequencyCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyCounter {
    pub fn new() -> FrequencyCounter {
        FrequencyCounter {
            counts: [0; NUM_SYMBOLS],
        }
    }

    pub fn count(&mut self, symbol: u8) {
        self.counts[symbol as usize] += 1;
    }
}

/// Optimal code lengths for the collected frequencies.
///
/// Classic Huffman merging with an `others` chain per partial tree. The
/// reserved 257th symbol is given a count of one so no real symbol ends up
/// with an all-ones code, and lengths beyond 16 bits are folded back by
/// splitting a shorter code (section K.2 of the standard).
fn generate_code_lengths(freq: &mut [i64; NUM_SYMBOLS]) -> Result<[u8; NUM_SYMBOLS]> {
    let mut codesize = [0usize; NUM_SYMBOLS];
    let mut others = [-1i32; NUM_SYMBOLS];
    freq[256] = 1;

    loop {
        // The two least frequent remaining trees; ties go to the larger
        // symbol so the reserved one merges first.
        let mut c1: i32 = -1;
        let mut v1 = i64::MAX;
        for (i, &f) in freq.iter().enumerate() {
            if f > 0 && f <= v1 {
                v1 = f;
                c1 = i as i32;
            }
        }
        let mut c2: i32 = -1;
        let mut v2 = i64::MAX;
        for (i, &f) in freq.iter().enumerate() {
            if f > 0 && f <= v2 && i as i32 != c1 {
                v2 = f;
                c2 = i as i32;
            }
        }
        if c2 < 0 {
            break;
        }
        let (c1, c2) = (c1 as usize, c2 as usize);

        freq[c1] += freq[c2];
        freq[c2] = 0;

        codesize[c1] += 1;
        let mut node = c1;
        while others[node] >= 0 {
            node = others[node] as usize;
            codesize[node] += 1;
        }
        others[node] = c2 as i32;
        codesize[c2] += 1;
        let mut node = c2;
        while others[node] >= 0 {
            node = others[node] as usize;
            codesize[node] += 1;
        }
    }

    // Signed counts: folding a level with an odd population briefly dips
    // below zero, exactly as in the reference algorithm.
    let mut bits = [0i32; MAX_INTERMEDIATE_LENGTH + 1];
    for &size in codesize.iter() {
        if size > 0 {
            bits[size.min(MAX_INTERMEDIATE_LENGTH)] += 1;
        }
    }

    // Fold lengths beyond 16 bits back into the tree: take two codes off the
    // deepest level and split one shorter code into a pair.
    for i in (MAX_CODE_LENGTH + 1..=MAX_INTERMEDIATE_LENGTH).rev() {
        while bits[i] > 0 {
            let mut j = i - 2;
            while j > 0 && bits[j] == 0 {
                j -= 1;
            }
            if j == 0 {
                return Err(Error::InvalidHuffmanTable("cannot limit code lengths"));
            }
            bits[i] -= 2;
            bits[i - 1] += 1;
            bits[j + 1] += 2;
            bits[j] -= 1;
        }
    }

    // Drop the reserved symbol from the deepest remaining level.
    let mut longest = MAX_CODE_LENGTH;
    while longest > 0 && bits[longest] == 0 {
        longest -= 1;
    }
    if longest > 0 {
        bits[longest] -= 1;
    }

    // Reassign lengths shortest-first in the original frequency order.
    let mut real_symbols: Vec<(usize, usize)> = codesize
        .iter()
        .enumerate()
        .take(256)
        .filter(|(_, &size)| size > 0)
        .map(|(symbol, &size)| (size, symbol))
        .collect();
    real_symbols.sort_unstable();

    let mut lengths = [0u8; NUM_SYMBOLS];
    let mut sym_iter = real_symbols.iter();
    for (len, &count) in bits.iter().enumerate().take(MAX_CODE_LENGTH + 1).skip(1) {
        for _ in 0..count {
            if let Some(&(_, symbol)) = sym_iter.next() {
                lengths[symbol] = len as u8;
            }
        }
    }
    Ok(lengths)
}

/// Encode-side lookup: symbol to (code, length).
pub struct HuffmanEncoder {
    codes: [(u16, u8); 256],
}

impl HuffmanEncoder {
    pub fn build(table: &HuffmanTable) -> Result<HuffmanEncoder> {
        table.validate()?;
        let mut codes = [(0u16, 0u8); 256];
        let mut code: u32 = 0;
        let mut next_value = table.values.iter();
        for length in 1..=MAX_CODE_LENGTH {
            for _ in 0..table.counts[length - 1] {
                if code >= (1 << length) {
                    return Err(Error::InvalidHuffmanTable("code space exhausted"));
                }
                let symbol = *next_value.next().ok_or(Error::InvalidHuffmanTable(
                    "code count does not match values",
                ))?;
                codes[symbol as usize] = (code as u16, length as u8);
                code += 1;
            }
            code <<= 1;
        }
        Ok(HuffmanEncoder { codes })
    }

    /// Writes the code for `symbol`.
    pub fn encode(&self, symbol: u8, bw: &mut BitWriter) -> Result<()> {
        let (code, length) = self.codes[symbol as usize];
        if length == 0 {
            return Err(Error::InvalidHuffmanTable("symbol has no code"));
        }
        bw.write(code as u32, length as usize);
        Ok(())
    }
}

/// Decode-side lookup built from the same DHT representation, using the
/// per-length first/last code arithmetic of T.81 Annex F.
pub struct HuffmanDecoder {
    min_code: [i32; MAX_CODE_LENGTH + 1],
    max_code: [i32; MAX_CODE_LENGTH + 1],
    val_offset: [i32; MAX_CODE_LENGTH + 1],
    values: Vec<u8>,
}

impl HuffmanDecoder {
    pub fn build(table: &HuffmanTable) -> Result<HuffmanDecoder> {
        table.validate()?;
        let mut min_code = [0i32; MAX_CODE_LENGTH + 1];
        let mut max_code = [-1i32; MAX_CODE_LENGTH + 1];
        let mut val_offset = [0i32; MAX_CODE_LENGTH + 1];
        let mut code: i32 = 0;
        let mut k: i32 = 0;
        for length in 1..=MAX_CODE_LENGTH {
            let count = table.counts[length - 1] as i32;
            if count > 0 {
                if code + count > (1 << length) {
                    return Err(Error::InvalidHuffmanTable("code space exhausted"));
                }
                val_offset[length] = k - code;
                min_code[length] = code;
                max_code[length] = code + count - 1;
                k += count;
                code += count;
            }
            code <<= 1;
        }
        Ok(HuffmanDecoder {
            min_code,
            max_code,
            val_offset,
            values: table.values.clone(),
        })
    }

    /// Consumes bits until a complete code matches and returns its symbol.
    pub fn decode(&self, br: &mut BitReader) -> Result<u8> {
        let mut code = br.read_bit()? as i32;
        for length in 1..=MAX_CODE_LENGTH {
            if code <= self.max_code[length] {
                debug_assert!(code >= self.min_code[length]);
                let index = (self.val_offset[length] + code) as usize;
                return Ok(self.values[index]);
            }
            if length == MAX_CODE_LENGTH {
                break;
            }
            code = (code << 1) | br.read_bit()? as i32;
        }
        Err(Error::InvalidHuffmanCode)
    }
}
