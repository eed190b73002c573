//! Lazy access to arrays stored in external FITS files.
//!
//! A dataset assembled from thousands of exposures is described by
//! [`ExternalArrayReference`]s: a file, an HDU, a declared shape and element
//! type. Wrapping each one in a [`LazyFitsLoader`] costs nothing up front;
//! a file is opened only when its header or array is first asked for, and
//! what was read is cached for the life of the loader.
//!
//! ```no_run
//! use fitsio_lazy::{ElementType, ExternalArrayReference, LazyFitsLoader};
//! use fitsio_lazy::ndarray::s;
//!
//! let reference = ExternalArrayReference::new("a.fits", 0usize, ElementType::Float64, [128, 128]);
//! let loader = LazyFitsLoader::new(reference, Some("/data".into()))?;
//! assert_eq!(loader.absolute_uri(), std::path::Path::new("/data/a.fits"));
//!
//! let exptime = loader.header()?.get_f64("EXPTIME");
//! let corner = loader.slice(s![0..10, 0..10].as_ref())?;
//! # let _ = (exptime, corner);
//! # Ok::<(), fitsio_lazy::Error>(())
//! ```
//!
//! FITS decoding itself is done by `fitsio-pure`.

pub mod array;
pub mod error;
pub mod header;
pub mod loader;
pub mod reader;
pub mod reference;

pub use array::{ArrayElement, FitsArray};
pub use error::{Error, Result};
pub use header::{Card, Header, Value};
pub use loader::LazyFitsLoader;
pub use reader::{ArrayRead, PureFitsReader, ReadFits};
pub use reference::{ElementType, ExternalArrayReference, HduSelector};

pub use ndarray;
