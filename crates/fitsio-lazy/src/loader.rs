//! The lazy, caching wrapper around one external array reference.

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::SliceInfoElem;
use once_cell::unsync::OnceCell;
use tracing::trace;

use crate::array::FitsArray;
use crate::error::Result;
use crate::header::Header;
use crate::reader::{PureFitsReader, ReadFits};
use crate::reference::{ElementType, ExternalArrayReference};

/// Resolves an [`ExternalArrayReference`] to FITS data on first use.
///
/// Constructing a loader, formatting it, and asking for its shape, dtype or
/// absolute path never touch the disk. The header and the array are each read
/// at most once and then kept for the lifetime of the loader. Reading the
/// array also caches the header when it has not been read yet.
///
/// The caches are single-threaded cells: a loader can be moved between
/// threads but not shared by them.
#[derive(Debug)]
pub struct LazyFitsLoader<R = PureFitsReader> {
    reference: ExternalArrayReference,
    base_path: Option<PathBuf>,
    shape: Vec<usize>,
    dtype: ElementType,
    reader: R,
    header: OnceCell<Header>,
    array: OnceCell<FitsArray>,
}

impl LazyFitsLoader<PureFitsReader> {
    /// Wrap `reference`. With a `base_path`, the reference's file URI is
    /// taken relative to it; without one it is used as is.
    pub fn new(reference: ExternalArrayReference, base_path: Option<PathBuf>) -> Result<Self> {
        Self::with_reader(reference, base_path, PureFitsReader)
    }
}

impl<R: ReadFits> LazyFitsLoader<R> {
    /// Like [`LazyFitsLoader::new`], reading files through `reader`.
    pub fn with_reader(
        reference: ExternalArrayReference,
        base_path: Option<PathBuf>,
        reader: R,
    ) -> Result<Self> {
        reference.validate()?;
        Ok(LazyFitsLoader {
            shape: reference.shape().to_vec(),
            dtype: reference.element_type(),
            base_path: base_path.filter(|p| !p.as_os_str().is_empty()),
            reference,
            reader,
            header: OnceCell::new(),
            array: OnceCell::new(),
        })
    }

    /// Declared shape, slowest axis first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Declared element type.
    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    /// The reference this loader was built from.
    pub fn reference(&self) -> &ExternalArrayReference {
        &self.reference
    }

    /// Directory relative file URIs are resolved against, if any.
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// The path that reads will open. An absolute file URI wins over the base path.
    pub fn absolute_uri(&self) -> PathBuf {
        match &self.base_path {
            Some(base) => base.join(self.reference.file_uri()),
            None => PathBuf::from(self.reference.file_uri()),
        }
    }

    /// Whether the header is cached. Never reads.
    pub fn is_header_loaded(&self) -> bool {
        self.header.get().is_some()
    }

    /// Whether the array is cached. Never reads.
    pub fn is_array_loaded(&self) -> bool {
        self.array.get().is_some()
    }

    /// The target HDU's header, read on first access.
    pub fn header(&self) -> Result<&Header> {
        self.header.get_or_try_init(|| {
            let path = self.absolute_uri();
            let header = self.reader.read_header(&path, self.reference.target())?;
            trace!(path = %path.display(), "cached FITS header");
            Ok(header)
        })
    }

    /// The target HDU's array, read on first access.
    pub fn array(&self) -> Result<&FitsArray> {
        self.array.get_or_try_init(|| {
            let path = self.absolute_uri();
            let want_header = !self.is_header_loaded();
            let read = self
                .reader
                .read_array(&path, self.reference.target(), want_header)?;
            if let Some(header) = read.header {
                // Never replaces a header that is already cached.
                if self.header.set(header).is_ok() {
                    trace!(path = %path.display(), "cached FITS header from array read");
                }
            }
            trace!(path = %path.display(), shape = ?read.array.shape(), "cached FITS array");
            Ok(read.array)
        })
    }

    /// An independent copy of the whole array.
    pub fn as_plain_array(&self) -> Result<FitsArray> {
        self.array().cloned()
    }

    /// Copy out part of the array.
    ///
    /// The full array is read and cached first; only the copy is partial.
    pub fn slice(&self, info: &[SliceInfoElem]) -> Result<FitsArray> {
        self.array()?.slice(info)
    }

    /// Same text as `Display`.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

/// Before the array is read: a summary with the stored file URI, declared
/// shape and dtype. Afterwards: the array itself, with none of those.
impl<R> fmt::Display for LazyFitsLoader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.array.get() {
            Some(array) => fmt::Display::fmt(array, f),
            None => write!(
                f,
                "<FITS array (unloaded) in {} shape: {} dtype: {}>",
                self.reference.file_uri(),
                ShapeText(&self.shape),
                self.dtype
            ),
        }
    }
}

/// Tuple-style shape: `(128, 128)`, `(5,)`, `()`.
struct ShapeText<'a>(&'a [usize]);

impl fmt::Display for ShapeText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [] => f.write_str("()"),
            [n] => write!(f, "({n},)"),
            dims => {
                f.write_str("(")?;
                for (i, n) in dims.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{n}")?;
                }
                f.write_str(")")
            }
        }
    }
}
