// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use jpeg_baseline::api::{ChromaSampling, ColorSpace, EncodeOptions, TableSource};
use jpeg_baseline::color::rgb_to_ycbcr;
use jpeg_baseline::decode::decode;
use jpeg_baseline::encode::encode;
use jpeg_baseline::error::Error;
use jpeg_baseline::image::Image;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

/// A smooth color gradient with optional pixel noise.
fn test_image(width: usize, height: usize, noise: u8) -> Image {
    let mut rng = XorShiftRng::seed_from_u64(0x6a70_6567);
    let mut data = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            let b = ((x + y) * 255 / (width + height)) as u8;
            let jitter = |v: u8, rng: &mut XorShiftRng| {
                if noise == 0 {
                    v
                } else {
                    let delta = rng.random_range(-(noise as i32)..=noise as i32);
                    (v as i32 + delta).clamp(0, 255) as u8
                }
            };
            data.push(jitter(r, &mut rng));
            data.push(jitter(g, &mut rng));
            data.push(jitter(b, &mut rng));
            data.push(255);
        }
    }
    Image::new((width, height), 4, data).unwrap()
}

/// Mean absolute error over the RGB channels.
fn mean_abs_error(a: &Image, b: &Image) -> f64 {
    assert_eq!(a.size(), b.size());
    let (width, height) = a.size();
    let mut total = 0.0f64;
    for y in 0..height {
        for x in 0..width {
            let pa = a.pixel(x, y);
            let pb = b.pixel(x, y);
            for c in 0..3 {
                total += (pa[c] as f64 - pb[c] as f64).abs();
            }
        }
    }
    total / (width * height * 3) as f64
}

#[test]
fn high_quality_round_trip_is_faithful() {
    let image = test_image(64, 64, 8);
    let options = EncodeOptions {
        quality: 95,
        ..EncodeOptions::new()
    };
    let encoded = encode(&image, options).unwrap();
    let decoded = decode(&encoded.bytes).unwrap();
    assert_eq!(decoded.size(), image.size());
    assert_eq!(decoded.channels(), 4);
    let mae = mean_abs_error(&image, &decoded);
    assert!(mae < 10.0, "mean absolute error {mae}");
}

#[test]
fn subsampled_round_trip_is_faithful_on_smooth_content() {
    let image = test_image(64, 48, 0);
    let options = EncodeOptions {
        quality: 90,
        sampling: ChromaSampling::Cs420,
        ..EncodeOptions::new()
    };
    let encoded = encode(&image, options).unwrap();
    let decoded = decode(&encoded.bytes).unwrap();
    assert_eq!(decoded.size(), image.size());
    let mae = mean_abs_error(&image, &decoded);
    assert!(mae < 10.0, "mean absolute error {mae}");
}

#[test]
fn non_multiple_of_8_dimensions_survive() {
    for (width, height) in [(67, 45), (1, 1), (8, 17), (31, 8)] {
        let image = test_image(width, height, 0);
        let options = EncodeOptions {
            quality: 90,
            ..EncodeOptions::new()
        };
        let encoded = encode(&image, options).unwrap();
        assert_eq!((encoded.width, encoded.height), (width, height));
        let decoded = decode(&encoded.bytes).unwrap();
        assert_eq!(decoded.size(), (width, height));
        let mae = mean_abs_error(&image, &decoded);
        assert!(mae < 10.0, "{width}x{height}: mean absolute error {mae}");
    }
}

#[test]
fn subsampled_odd_dimensions_survive() {
    let image = test_image(37, 23, 0);
    let options = EncodeOptions {
        quality: 90,
        sampling: ChromaSampling::Cs420,
        ..EncodeOptions::new()
    };
    let encoded = encode(&image, options).unwrap();
    let decoded = decode(&encoded.bytes).unwrap();
    assert_eq!(decoded.size(), (37, 23));
    let mae = mean_abs_error(&image, &decoded);
    assert!(mae < 12.0, "mean absolute error {mae}");
}

#[test]
fn three_channel_input_encodes_too() {
    let rgba = test_image(16, 16, 0);
    let rgb_data: Vec<u8> = rgba
        .data()
        .chunks(4)
        .flat_map(|px| px[..3].to_vec())
        .collect();
    let rgb = Image::new((16, 16), 3, rgb_data).unwrap();
    let encoded = encode(&rgb, EncodeOptions::new()).unwrap();
    let decoded = decode(&encoded.bytes).unwrap();
    assert_eq!(decoded.size(), (16, 16));
    assert!(mean_abs_error(&rgba, &decoded) < 10.0);
}

#[test]
fn grayscale_round_trip() {
    let image = test_image(40, 40, 0);
    let options = EncodeOptions {
        quality: 90,
        color_space: ColorSpace::Grayscale,
        ..EncodeOptions::new()
    };
    let encoded = encode(&image, options).unwrap();
    let decoded = decode(&encoded.bytes).unwrap();
    assert_eq!(decoded.size(), (40, 40));
    let mut total = 0.0f64;
    for y in 0..40 {
        for x in 0..40 {
            let px = decoded.pixel(x, y);
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            let orig = image.pixel(x, y);
            let (luma, _, _) = rgb_to_ycbcr(orig[0] as f32, orig[1] as f32, orig[2] as f32);
            total += (px[0] as f64 - luma as f64).abs();
        }
    }
    assert!(total / (40.0 * 40.0) < 6.0);
}

#[test]
fn alpha_is_dropped_and_comes_back_opaque() {
    let mut image = test_image(16, 16, 0);
    let mut data = image.data().to_vec();
    for px in data.chunks_mut(4) {
        px[3] = 17;
    }
    image = Image::new((16, 16), 4, data).unwrap();
    let encoded = encode(&image, EncodeOptions::new()).unwrap();
    let decoded = decode(&encoded.bytes).unwrap();
    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(decoded.pixel(x, y)[3], 255);
        }
    }
}

#[test]
fn optimized_tables_decode_identically_and_pack_tighter() {
    let image = test_image(96, 96, 10);
    let standard = encode(
        &image,
        EncodeOptions {
            quality: 85,
            tables: TableSource::Standard,
            ..EncodeOptions::new()
        },
    )
    .unwrap();
    let optimized = encode(
        &image,
        EncodeOptions {
            quality: 85,
            tables: TableSource::Optimized,
            ..EncodeOptions::new()
        },
    )
    .unwrap();
    // Same coefficients, different entropy tables: pixel output matches.
    let from_standard = decode(&standard.bytes).unwrap();
    let from_optimized = decode(&optimized.bytes).unwrap();
    assert_eq!(from_standard.data(), from_optimized.data());
    // A table fitted to the image never packs worse than the fixed one.
    assert!(
        optimized.bytes.len() <= standard.bytes.len(),
        "{} > {}",
        optimized.bytes.len(),
        standard.bytes.len()
    );
}

#[test]
fn fast_mode_round_trips_flat_images_cleanly() {
    let image = Image::new((24, 24), 4, vec![128; 24 * 24 * 4]).unwrap();
    let options = EncodeOptions {
        fast_mode: true,
        ..EncodeOptions::new()
    };
    let encoded = encode(&image, options).unwrap();
    let decoded = decode(&encoded.bytes).unwrap();
    let mae = mean_abs_error(&image, &decoded);
    assert!(mae < 2.0, "mean absolute error {mae}");
}

#[test]
fn lower_quality_means_fewer_bytes() {
    let image = test_image(64, 64, 10);
    let small = encode(
        &image,
        EncodeOptions {
            quality: 10,
            ..EncodeOptions::new()
        },
    )
    .unwrap();
    let large = encode(
        &image,
        EncodeOptions {
            quality: 95,
            ..EncodeOptions::new()
        },
    )
    .unwrap();
    assert!(small.bytes.len() < large.bytes.len());
}

#[test]
fn container_has_the_jfif_marker_shape() {
    let image = test_image(32, 32, 0);
    let encoded = encode(&image, EncodeOptions::new()).unwrap();
    let bytes = &encoded.bytes;
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    // APP0 with the JFIF identifier comes right after SOI.
    assert_eq!(&bytes[2..4], &[0xFF, 0xE0]);
    assert_eq!(&bytes[6..11], b"JFIF\0");

    // Count marker segments in the header (everything before the scan).
    let sos = bytes
        .windows(2)
        .position(|w| w == [0xFF, 0xDA])
        .expect("no SOS marker");
    let header = &bytes[..sos];
    let count = |marker: u8| {
        header
            .windows(2)
            .filter(|w| w[0] == 0xFF && w[1] == marker)
            .count()
    };
    assert_eq!(count(0xDB), 2, "two quantization tables");
    assert_eq!(count(0xC4), 4, "four Huffman tables");
    assert_eq!(count(0xC0), 1, "one frame header");
    // Each DQT segment is 67 bytes long: length, id, 64 entries.
    let dqt = header.windows(2).position(|w| w == [0xFF, 0xDB]).unwrap();
    assert_eq!(&header[dqt + 2..dqt + 4], &[0x00, 67]);
}

#[test]
fn non_jpeg_input_is_rejected_up_front() {
    assert!(matches!(
        decode(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]),
        Err(Error::NotAJpeg(0x89, b'P'))
    ));
    assert!(matches!(decode(&[]), Err(Error::NotAJpeg(0, 0))));
    assert!(matches!(decode(&[0xFF]), Err(Error::NotAJpeg(0xFF, 0))));
}

#[test]
fn truncated_container_is_rejected() {
    let image = test_image(16, 16, 0);
    let encoded = encode(&image, EncodeOptions::new()).unwrap();
    for keep in [4, 20, encoded.bytes.len() / 2] {
        assert!(
            matches!(
                decode(&encoded.bytes[..keep]),
                Err(Error::IncompleteContainer)
            ),
            "kept {keep} bytes"
        );
    }
}

#[test]
fn truncated_scan_is_entropy_starvation() {
    let image = test_image(64, 64, 10);
    let encoded = encode(&image, EncodeOptions::new()).unwrap();
    let sos = encoded
        .bytes
        .windows(2)
        .position(|w| w == [0xFF, 0xDA])
        .unwrap();
    // SOS segment for three components is 12 bytes after the marker.
    let scan_start = sos + 2 + 12;
    let mut bytes = encoded.bytes[..scan_start + 6].to_vec();
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    assert!(matches!(
        decode(&bytes),
        Err(Error::TruncatedEntropyStream)
    ));
}
