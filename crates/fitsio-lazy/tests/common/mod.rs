//! Hand-built FITS files for the integration tests.
//!
//! Cards are written as raw 80-byte records so tests can also produce
//! files that break the standard in controlled ways.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const BLOCK: usize = 2880;
pub const CARD: usize = 80;

/// A fixed-format card: keyword, `= `, value right-justified to column 30.
pub fn kv(keyword: &str, value: impl ToString) -> String {
    format!("{keyword:<8}= {:>20}", value.to_string())
}

/// A fixed-format string card.
pub fn kv_str(keyword: &str, value: &str) -> String {
    format!("{keyword:<8}= '{value:<8}'")
}

/// Serialize cards plus END, padded with spaces to whole blocks.
pub fn header_bytes(cards: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    for card in cards.iter().map(String::as_str).chain(std::iter::once("END")) {
        let mut raw = [b' '; CARD];
        raw[..card.len()].copy_from_slice(card.as_bytes());
        out.extend_from_slice(&raw);
    }
    pad(&mut out, b' ');
    out
}

pub fn pad(bytes: &mut Vec<u8>, fill: u8) {
    let padded = bytes.len().div_ceil(BLOCK) * BLOCK;
    bytes.resize(padded, fill);
}

pub fn f64_data(values: &[f64]) -> Vec<u8> {
    let mut out: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    pad(&mut out, 0);
    out
}

pub fn i16_data(values: &[i16]) -> Vec<u8> {
    let mut out: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    pad(&mut out, 0);
    out
}

/// Image axis cards. `naxes` is in FITS order, NAXIS1 first.
fn axis_cards(bitpix: i64, naxes: &[usize]) -> Vec<String> {
    let mut cards = vec![kv("BITPIX", bitpix), kv("NAXIS", naxes.len())];
    for (i, n) in naxes.iter().enumerate() {
        cards.push(kv(&format!("NAXIS{}", i + 1), n));
    }
    cards
}

/// A primary HDU holding a float64 image.
pub fn primary_f64(naxes: &[usize], values: &[f64], extra: &[String]) -> Vec<u8> {
    let mut cards = vec![kv("SIMPLE", "T")];
    cards.extend(axis_cards(-64, naxes));
    cards.extend_from_slice(extra);
    let mut out = header_bytes(&cards);
    out.extend(f64_data(values));
    out
}

/// A primary HDU with no data, as in front of a multi-extension file.
pub fn empty_primary() -> Vec<u8> {
    header_bytes(&[kv("SIMPLE", "T"), kv("BITPIX", 8), kv("NAXIS", 0), kv("EXTEND", "T")])
}

/// An IMAGE extension holding int16 values.
pub fn image_ext_i16(extname: &str, naxes: &[usize], values: &[i16], extra: &[String]) -> Vec<u8> {
    let mut cards = vec![kv_str("XTENSION", "IMAGE")];
    cards.extend(axis_cards(16, naxes));
    cards.push(kv("PCOUNT", 0));
    cards.push(kv("GCOUNT", 1));
    cards.push(kv_str("EXTNAME", extname));
    cards.extend_from_slice(extra);
    let mut out = header_bytes(&cards);
    out.extend(i16_data(values));
    out
}

/// A one-column BINTABLE extension with two 32-bit integer rows.
pub fn bintable_ext(extname: &str) -> Vec<u8> {
    let cards = vec![
        kv_str("XTENSION", "BINTABLE"),
        kv("BITPIX", 8),
        kv("NAXIS", 2),
        kv("NAXIS1", 4),
        kv("NAXIS2", 2),
        kv("PCOUNT", 0),
        kv("GCOUNT", 1),
        kv("TFIELDS", 1),
        kv_str("TTYPE1", "COUNTS"),
        kv_str("TFORM1", "J"),
        kv_str("EXTNAME", extname),
    ];
    let mut out = header_bytes(&cards);
    let mut data: Vec<u8> = [7i32, 9].iter().flat_map(|v| v.to_be_bytes()).collect();
    pad(&mut data, 0);
    out.extend(data);
    out
}

/// The 128x128 test image: value at row `r`, column `c` is `r * 128 + c`, halved.
pub fn ramp_128() -> Vec<f64> {
    (0..128 * 128).map(|i| i as f64 * 0.5).collect()
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Directory holding `efz.fits`, a 128x128 float64 primary image.
pub fn ramp_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let bytes = primary_f64(
        &[128, 128],
        &ramp_128(),
        &[kv("EXPTIME", 12.5), kv_str("OBJECT", "Sun")],
    );
    write(dir.path(), "efz.fits", &bytes);
    dir
}

/// `multi.fits`: empty primary, IMAGE extension `SCI` (3x2 int16 with
/// BSCALE/BZERO), BINTABLE `EVENTS`.
pub fn multi_ext_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = empty_primary();
    bytes.extend(image_ext_i16(
        "SCI",
        &[3, 2],
        &[1, 2, 3, 4, 5, 6],
        &[kv("BSCALE", 2.0), kv("BZERO", 10.0)],
    ));
    bytes.extend(bintable_ext("EVENTS"));
    write(dir.path(), "multi.fits", &bytes);
    dir
}
