//! File access: how headers and arrays are actually pulled off disk.
//!
//! A [`ReadFits`] implementation opens the file, does one read and lets the
//! handle go before returning. Caching is not its concern; see
//! [`crate::LazyFitsLoader`].

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use fitsio_pure::block::padded_byte_len;
use fitsio_pure::header::parse_header_blocks;
use fitsio_pure::image::{image_dimensions, read_image_data};
use fitsio_pure::{BLOCK_SIZE, CARD_SIZE};
use memmap2::MmapOptions;
use tracing::{debug, warn};

use crate::array::FitsArray;
use crate::error::{Error, Result};
use crate::header::{card_extname, fix_header_bytes, is_end_card, Header};
use crate::reference::HduSelector;

/// The result of a data read.
#[derive(Debug, Clone)]
pub struct ArrayRead {
    pub array: FitsArray,
    /// Header of the same HDU, present when it was asked for.
    pub header: Option<Header>,
}

/// A file-format backend for [`crate::LazyFitsLoader`].
///
/// Implementations must not hold the file open once a call returns, on
/// success or on error.
pub trait ReadFits {
    /// Read only the header of the selected HDU.
    fn read_header(&self, path: &Path, target: &HduSelector) -> Result<Header>;

    /// Read the selected HDU's array. When `with_header` is set, also return
    /// its header, taken while the file is open.
    fn read_array(&self, path: &Path, target: &HduSelector, with_header: bool)
        -> Result<ArrayRead>;
}

impl<R: ReadFits + ?Sized> ReadFits for &R {
    fn read_header(&self, path: &Path, target: &HduSelector) -> Result<Header> {
        (**self).read_header(path, target)
    }

    fn read_array(
        &self,
        path: &Path,
        target: &HduSelector,
        with_header: bool,
    ) -> Result<ArrayRead> {
        (**self).read_array(path, target, with_header)
    }
}

/// Reads FITS files with `fitsio-pure`.
///
/// Header reads walk the file header by header, seeking over data units, so
/// only the header blocks up to the target are read. Array reads map the file
/// copy-on-write, decode the target HDU into an owned array and unmap it.
/// Both repair non-conformant header cards before parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PureFitsReader;

impl ReadFits for PureFitsReader {
    fn read_header(&self, path: &Path, target: &HduSelector) -> Result<Header> {
        debug!(path = %path.display(), %target, "reading FITS header");
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = BufReader::new(file);

        let mut index = 0;
        loop {
            let Some(mut raw) = next_raw_header(&mut reader, path, index == 0)? else {
                return Err(Error::TargetNotFound {
                    path: path.to_path_buf(),
                    target: target.clone(),
                });
            };
            report_fixes(path, fix_header_bytes(&mut raw));
            let cards = parse_header_blocks(&raw).map_err(|e| Error::malformed(path, e))?;
            let header = Header::from_cards(cards);
            if target.matches(index, header.extname()) {
                return Ok(header);
            }

            let data_len = header
                .data_byte_len()
                .ok_or_else(|| Error::malformed(path, "cannot determine data unit size"))?;
            let skip = padded_len(data_len)
                .and_then(|n| i64::try_from(n).ok())
                .ok_or_else(|| Error::malformed(path, "data unit too large"))?;
            reader.seek_relative(skip).map_err(|e| Error::io(path, e))?;
            index += 1;
        }
    }

    fn read_array(
        &self,
        path: &Path,
        target: &HduSelector,
        with_header: bool,
    ) -> Result<ArrayRead> {
        debug!(path = %path.display(), %target, with_header, "reading FITS array");
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        // SAFETY: the mapping is private copy-on-write, so header fix-ups never
        // reach the file. It lives only until the HDU is decoded into owned
        // memory. Truncating the file from another process while it is mapped
        // can raise SIGBUS on Unix; files are assumed not to change under a read.
        let mut map =
            unsafe { MmapOptions::new().map_copy(&file) }.map_err(|e| Error::io(path, e))?;
        drop(file);
        report_fixes(path, fix_all_headers(&mut map));

        let fits = fitsio_pure::hdu::parse_fits(&map).map_err(|e| Error::malformed(path, e))?;
        let hdu = fits
            .iter()
            .enumerate()
            .find(|(i, hdu)| target.matches(*i, card_extname(&hdu.cards)))
            .map(|(_, hdu)| hdu)
            .ok_or_else(|| Error::TargetNotFound {
                path: path.to_path_buf(),
                target: target.clone(),
            })?;

        let mut shape = image_dimensions(hdu).map_err(|_| Error::NotAnImage {
            path: path.to_path_buf(),
            target: target.clone(),
        })?;
        shape.reverse();
        let data = read_image_data(&map, hdu).map_err(|e| Error::malformed(path, e))?;
        let array =
            FitsArray::from_image_data(data, &shape).map_err(|e| Error::malformed(path, e))?;

        Ok(ArrayRead {
            array,
            header: with_header.then(|| Header::from_cards(hdu.cards.clone())),
        })
    }
}

/// Read the raw blocks of the next header, up to and including the block
/// holding END. Returns `None` at end of file.
///
/// A truncated header is an error for the first HDU and treated as end of
/// file afterwards, matching how trailing junk after the last HDU is ignored.
fn next_raw_header<R: Read>(reader: &mut R, path: &Path, first: bool) -> Result<Option<Vec<u8>>> {
    let mut raw = Vec::new();
    let mut block = [0u8; BLOCK_SIZE];
    loop {
        match read_block(reader, &mut block) {
            Ok(true) => {}
            Ok(false) if raw.is_empty() && !first => return Ok(None),
            Ok(false) if first => {
                return Err(Error::malformed(path, "file ends before the header is complete"))
            }
            Ok(false) => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        }
        raw.extend_from_slice(&block);
        if block.chunks_exact(CARD_SIZE).any(is_end_card) {
            return Ok(Some(raw));
        }
    }
}

/// Fill `block` completely. `Ok(false)` means the stream ended first.
fn read_block<R: Read>(reader: &mut R, block: &mut [u8; BLOCK_SIZE]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < BLOCK_SIZE {
        match reader.read(&mut block[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Repair every header in an in-memory FITS file. Stops quietly at the
/// first header that cannot be delimited; the parser reports it.
fn fix_all_headers(bytes: &mut [u8]) -> usize {
    let mut fixed = 0;
    let mut offset = 0;
    while offset + BLOCK_SIZE <= bytes.len() {
        let Some(header_len) = raw_header_len(&bytes[offset..]) else {
            break;
        };
        let raw = &mut bytes[offset..offset + header_len];
        fixed += fix_header_bytes(raw);
        let Ok(cards) = parse_header_blocks(raw) else {
            break;
        };
        let Some(data_len) = Header::from_cards(cards).data_byte_len() else {
            break;
        };
        let Some(next) = padded_len(data_len).and_then(|n| offset.checked_add(header_len + n))
        else {
            break;
        };
        offset = next;
    }
    fixed
}

/// Length in bytes of the header at the start of `bytes`, in whole blocks.
fn raw_header_len(bytes: &[u8]) -> Option<usize> {
    bytes
        .chunks_exact(BLOCK_SIZE)
        .position(|block| block.chunks_exact(CARD_SIZE).any(is_end_card))
        .map(|i| (i + 1) * BLOCK_SIZE)
}

/// Data unit length rounded up to whole blocks, if it fits in memory.
fn padded_len(len: u64) -> Option<usize> {
    let len = usize::try_from(len).ok()?;
    len.checked_add(BLOCK_SIZE)?;
    Some(padded_byte_len(len))
}

fn report_fixes(path: &Path, fixed: usize) {
    if fixed > 0 {
        warn!(path = %path.display(), cards = fixed, "fixed non-conformant FITS header cards");
    }
}
