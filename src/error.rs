// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid image: {0}x{1} with {2} channels does not match a {3}-byte buffer")]
    InvalidImage(usize, usize, usize, usize),
    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(usize, usize),
    #[error("Invalid channel count: {0}, expected 3 or 4")]
    InvalidChannelCount(usize),
    #[error("Invalid block: {0} samples, expected {expected}", expected = crate::BLOCK_SIZE)]
    InvalidBlock(usize),
    #[error("Invalid quality {0}, expected 1..=100")]
    InvalidQuality(u32),
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
    #[error("Invalid signature {0:02x}{1:02x}, expected ffd8")]
    NotAJpeg(u8, u8),
    #[error("File ended before EOI")]
    IncompleteContainer,
    #[error("Entropy-coded data ended in the middle of a symbol")]
    TruncatedEntropyStream,
    #[error("Unsupported sample precision: {0}")]
    UnsupportedPrecision(u8),
    #[error("Unsupported JPEG stream: {0}")]
    Unsupported(&'static str),
    #[error("Invalid marker segment: {0}")]
    InvalidSegment(&'static str),
    #[error("Invalid Huffman table: {0}")]
    InvalidHuffmanTable(&'static str),
    #[error("Invalid Huffman code")]
    InvalidHuffmanCode,
    #[error("Invalid entropy-coded data: {0}")]
    InvalidScanData(&'static str),
    #[error("Missing quantization table with id {0}")]
    MissingQuantTable(u8),
    #[error("Missing Huffman table of class {0} with id {1}")]
    MissingHuffmanTable(u8, u8),
}

pub type Result<T> = std::result::Result<T, Error>;
