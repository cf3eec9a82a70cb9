// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! JFIF marker segments: framing on encode, dispatching parser on decode.

use byteorder::{BigEndian, ByteOrder};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::error::{Error, Result};
use crate::huffman::{HuffmanTable, TableClass, MAX_CODE_LENGTH};
use crate::quant::QuantTable;
use crate::util::tracing_wrappers::*;
use crate::zigzag::ZIGZAG;
use crate::BLOCK_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum Marker {
    Sof0 = 0xC0,
    Dht = 0xC4,
    Soi = 0xD8,
    Eoi = 0xD9,
    Sos = 0xDA,
    Dqt = 0xDB,
    Dri = 0xDD,
    App0 = 0xE0,
    Com = 0xFE,
}

/// One frame component as declared in SOF0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameComponent {
    pub id: u8,
    pub h_samp: u8,
    pub v_samp: u8,
    pub quant_index: u8,
}

#[derive(Clone, Debug)]
pub struct FrameHeader {
    pub size: (usize, usize),
    pub components: Vec<FrameComponent>,
}

/// One scan component as declared in SOS: which entropy tables it uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanComponent {
    pub component_id: u8,
    pub dc_index: u8,
    pub ac_index: u8,
}

/// Everything the decoder needs out of the container: headers, the tables
/// declared by DQT/DHT (authoritative over any advisory quality value), and
/// the raw entropy-coded scan bytes.
#[derive(Debug)]
pub struct ParsedJpeg<'a> {
    pub frame: FrameHeader,
    pub quant_tables: Vec<QuantTable>,
    pub huffman_tables: Vec<HuffmanTable>,
    pub scan: Vec<ScanComponent>,
    pub scan_data: &'a [u8],
}

impl ParsedJpeg<'_> {
    pub fn quant_table(&self, index: u8) -> Result<&QuantTable> {
        self.quant_tables
            .iter()
            .rev()
            .find(|t| t.index == index)
            .ok_or(Error::MissingQuantTable(index))
    }

    pub fn huffman_table(&self, class: TableClass, index: u8) -> Result<&HuffmanTable> {
        self.huffman_tables
            .iter()
            .rev()
            .find(|t| t.class == class && t.index == index)
            .ok_or(Error::MissingHuffmanTable(class as u8, index))
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, value);
    out.extend_from_slice(&buf);
}

fn push_marker(out: &mut Vec<u8>, marker: Marker) {
    out.push(0xFF);
    out.push(marker as u8);
}

pub fn write_soi(out: &mut Vec<u8>) {
    push_marker(out, Marker::Soi);
}

pub fn write_eoi(out: &mut Vec<u8>) {
    push_marker(out, Marker::Eoi);
}

/// JFIF APP0: identifier, version 1.1, aspect 1:1, no thumbnail.
pub fn write_app0(out: &mut Vec<u8>) {
    push_marker(out, Marker::App0);
    push_u16(out, 16);
    out.extend_from_slice(b"JFIF\0");
    push_u16(out, 0x0101);
    out.push(0x00);
    push_u16(out, 1);
    push_u16(out, 1);
    out.push(0x00);
    out.push(0x00);
}

/// One 8-bit quantization table; entries go out in zigzag order.
pub fn write_dqt(out: &mut Vec<u8>, table: &QuantTable) {
    push_marker(out, Marker::Dqt);
    push_u16(out, 2 + 1 + BLOCK_SIZE as u16);
    out.push(table.index);
    for &pos in ZIGZAG.iter() {
        out.push(table.values[pos] as u8);
    }
}

pub fn write_sof0(out: &mut Vec<u8>, size: (usize, usize), components: &[FrameComponent]) {
    push_marker(out, Marker::Sof0);
    push_u16(out, 8 + 3 * components.len() as u16);
    out.push(8); // sample precision
    push_u16(out, size.1 as u16);
    push_u16(out, size.0 as u16);
    out.push(components.len() as u8);
    for c in components {
        out.push(c.id);
        out.push((c.h_samp << 4) | c.v_samp);
        out.push(c.quant_index);
    }
}

pub fn write_dht(out: &mut Vec<u8>, table: &HuffmanTable) {
    push_marker(out, Marker::Dht);
    push_u16(out, 2 + 1 + MAX_CODE_LENGTH as u16 + table.values.len() as u16);
    out.push(((table.class as u8) << 4) | table.index);
    out.extend_from_slice(&table.counts);
    out.extend_from_slice(&table.values);
}

/// Baseline scan header: full spectral range, no successive approximation.
pub fn write_sos(out: &mut Vec<u8>, components: &[ScanComponent]) {
    push_marker(out, Marker::Sos);
    push_u16(out, 6 + 2 * components.len() as u16);
    out.push(components.len() as u8);
    for c in components {
        out.push(c.component_id);
        out.push((c.dc_index << 4) | c.ac_index);
    }
    out.push(0x00);
    out.push(0x3F);
    out.push(0x00);
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn u8(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or(Error::IncompleteContainer)?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16> {
        if self.pos + 2 > self.data.len() {
            return Err(Error::IncompleteContainer);
        }
        let v = BigEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(v)
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(Error::IncompleteContainer);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

fn parse_dqt(cursor: &mut Cursor, tables: &mut Vec<QuantTable>) -> Result<()> {
    let length = cursor.u16()? as usize;
    let mut remaining = length
        .checked_sub(2)
        .ok_or(Error::InvalidSegment("DQT length too short"))?;
    while remaining > 0 {
        let pq_tq = cursor.u8()?;
        if pq_tq >> 4 != 0 {
            return Err(Error::Unsupported("16-bit quantization tables"));
        }
        let index = pq_tq & 0x0F;
        if index > 3 {
            return Err(Error::InvalidSegment("DQT table id out of range"));
        }
        if remaining < 1 + BLOCK_SIZE {
            return Err(Error::InvalidSegment("DQT length does not match tables"));
        }
        let raw = cursor.bytes(BLOCK_SIZE)?;
        let mut values = [0u16; BLOCK_SIZE];
        for (i, &b) in raw.iter().enumerate() {
            values[ZIGZAG[i]] = b as u16;
        }
        tables.push(QuantTable::from_values(index, values));
        remaining -= 1 + BLOCK_SIZE;
    }
    Ok(())
}

fn parse_dht(cursor: &mut Cursor, tables: &mut Vec<HuffmanTable>) -> Result<()> {
    let length = cursor.u16()? as usize;
    let mut remaining = length
        .checked_sub(2)
        .ok_or(Error::InvalidSegment("DHT length too short"))?;
    while remaining > 0 {
        let tc_th = cursor.u8()?;
        let class = match tc_th >> 4 {
            0 => TableClass::Dc,
            1 => TableClass::Ac,
            _ => return Err(Error::InvalidSegment("DHT table class out of range")),
        };
        let index = tc_th & 0x0F;
        if index > 3 {
            return Err(Error::InvalidSegment("DHT table id out of range"));
        }
        if remaining < 1 + MAX_CODE_LENGTH {
            return Err(Error::InvalidSegment("DHT length does not match tables"));
        }
        let mut counts = [0u8; MAX_CODE_LENGTH];
        counts.copy_from_slice(cursor.bytes(MAX_CODE_LENGTH)?);
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if remaining < 1 + MAX_CODE_LENGTH + total {
            return Err(Error::InvalidSegment("DHT length does not match tables"));
        }
        let values = cursor.bytes(total)?.to_vec();
        tables.push(HuffmanTable {
            class,
            index,
            counts,
            values,
        });
        remaining -= 1 + MAX_CODE_LENGTH + total;
    }
    Ok(())
}

fn parse_sof0(cursor: &mut Cursor) -> Result<FrameHeader> {
    let length = cursor.u16()? as usize;
    let precision = cursor.u8()?;
    if precision != 8 {
        return Err(Error::UnsupportedPrecision(precision));
    }
    let height = cursor.u16()? as usize;
    let width = cursor.u16()? as usize;
    if width == 0 || height == 0 {
        return Err(Error::InvalidImageSize(width, height));
    }
    let num_components = cursor.u8()? as usize;
    if num_components != 1 && num_components != 3 {
        return Err(Error::Unsupported("component counts other than 1 or 3"));
    }
    if length != 8 + 3 * num_components {
        return Err(Error::InvalidSegment("SOF0 length does not match components"));
    }
    let mut components = Vec::with_capacity(num_components);
    for _ in 0..num_components {
        let id = cursor.u8()?;
        let hv = cursor.u8()?;
        let quant_index = cursor.u8()?;
        components.push(FrameComponent {
            id,
            h_samp: hv >> 4,
            v_samp: hv & 0x0F,
            quant_index,
        });
    }
    Ok(FrameHeader {
        size: (width, height),
        components,
    })
}

fn parse_sos(cursor: &mut Cursor) -> Result<Vec<ScanComponent>> {
    let length = cursor.u16()? as usize;
    let num_components = cursor.u8()? as usize;
    if length != 6 + 2 * num_components {
        return Err(Error::InvalidSegment("SOS length does not match components"));
    }
    let mut components = Vec::with_capacity(num_components);
    for _ in 0..num_components {
        let component_id = cursor.u8()?;
        let tables = cursor.u8()?;
        components.push(ScanComponent {
            component_id,
            dc_index: tables >> 4,
            ac_index: tables & 0x0F,
        });
    }
    let ss = cursor.u8()?;
    let se = cursor.u8()?;
    let ah_al = cursor.u8()?;
    if ss != 0 || se != 0x3F || ah_al != 0 {
        return Err(Error::Unsupported("non-baseline spectral selection"));
    }
    Ok(components)
}

/// Length of the entropy-coded data starting at `data`: everything up to the
/// first 0xFF that is not a stuffing escape or a fill byte.
fn scan_data_len(data: &[u8]) -> Result<usize> {
    let mut pos = 0;
    while pos < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        match data.get(pos + 1) {
            Some(0x00) => pos += 2,
            Some(0xFF) => pos += 1,
            Some(0xD0..=0xD7) => return Err(Error::Unsupported("restart markers")),
            Some(_) => return Ok(pos),
            None => break,
        }
    }
    Err(Error::IncompleteContainer)
}

/// Reads the marker sequence of a baseline JPEG stream.
///
/// SOI must come first; unknown markers are skipped over using their length
/// field; EOI ends the parse. Anything that cuts the stream short is an
/// [`Error::IncompleteContainer`].
pub fn parse(data: &[u8]) -> Result<ParsedJpeg> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != Marker::Soi as u8 {
        let b0 = data.first().copied().unwrap_or(0);
        let b1 = data.get(1).copied().unwrap_or(0);
        return Err(Error::NotAJpeg(b0, b1));
    }
    let mut cursor = Cursor { data, pos: 2 };
    let mut frame: Option<FrameHeader> = None;
    let mut quant_tables = Vec::new();
    let mut huffman_tables = Vec::new();
    let mut scan: Option<(Vec<ScanComponent>, &[u8])> = None;

    loop {
        if cursor.u8()? != 0xFF {
            return Err(Error::InvalidSegment("expected a marker"));
        }
        let mut byte = cursor.u8()?;
        // Markers may be padded with extra fill bytes.
        while byte == 0xFF {
            byte = cursor.u8()?;
        }
        trace!("marker ff{:02x}", byte);
        match Marker::from_u8(byte) {
            Some(Marker::Eoi) => break,
            Some(Marker::Soi) => return Err(Error::InvalidSegment("SOI after start")),
            Some(Marker::Sof0) => {
                if frame.is_some() {
                    return Err(Error::Unsupported("multiple frames"));
                }
                frame = Some(parse_sof0(&mut cursor)?);
            }
            Some(Marker::Dqt) => parse_dqt(&mut cursor, &mut quant_tables)?,
            Some(Marker::Dht) => parse_dht(&mut cursor, &mut huffman_tables)?,
            Some(Marker::Dri) => {
                let length = cursor.u16()? as usize;
                if length != 4 {
                    return Err(Error::InvalidSegment("DRI length"));
                }
                if cursor.u16()? != 0 {
                    return Err(Error::Unsupported("restart intervals"));
                }
            }
            Some(Marker::Sos) => {
                if frame.is_none() {
                    return Err(Error::InvalidSegment("SOS before SOF0"));
                }
                if scan.is_some() {
                    return Err(Error::Unsupported("multiple scans"));
                }
                let components = parse_sos(&mut cursor)?;
                let len = scan_data_len(&data[cursor.pos..])?;
                let scan_data = cursor.bytes(len)?;
                scan = Some((components, scan_data));
            }
            Some(Marker::App0) | Some(Marker::Com) => {
                let length = cursor.u16()? as usize;
                cursor.bytes(
                    length
                        .checked_sub(2)
                        .ok_or(Error::InvalidSegment("segment length too short"))?,
                )?;
            }
            None => match byte {
                // Other SOF flavors describe frames this decoder cannot
                // reconstruct; skipping them would silently drop the image.
                0xC1..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                    return Err(Error::Unsupported("non-baseline frame"));
                }
                // TEM and stray restart markers carry no payload.
                0x01 | 0xD0..=0xD7 => {}
                _ => {
                    let length = cursor.u16()? as usize;
                    warn!("skipping marker ff{:02x} ({} bytes)", byte, length);
                    cursor.bytes(
                        length
                            .checked_sub(2)
                            .ok_or(Error::InvalidSegment("segment length too short"))?,
                    )?;
                }
            },
        }
    }

    let (scan, scan_data) = scan.ok_or(Error::InvalidSegment("no scan before EOI"))?;
    let frame = frame.ok_or(Error::InvalidSegment("missing SOF0"))?;
    if scan.len() != frame.components.len() {
        return Err(Error::Unsupported("partial component scans"));
    }
    Ok(ParsedJpeg {
        frame,
        quant_tables,
        huffman_tables,
        scan,
        scan_data,
    })
}
