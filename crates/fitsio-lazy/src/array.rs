//! Owned image arrays tagged by their stored element type.

use std::fmt;

use fitsio_pure::image::ImageData;
use ndarray::{ArrayD, ArrayViewD, IxDyn, ShapeError, SliceInfoElem};

use crate::error::{Error, Result};
use crate::reference::ElementType;

/// An in-memory n-dimensional image, shaped slowest axis first.
///
/// Values are the ones stored in the file: BSCALE/BZERO are never applied.
#[derive(Debug, Clone, PartialEq)]
pub enum FitsArray {
    U8(ArrayD<u8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

macro_rules! with_array {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            FitsArray::U8($a) => $body,
            FitsArray::I16($a) => $body,
            FitsArray::I32($a) => $body,
            FitsArray::I64($a) => $body,
            FitsArray::F32($a) => $body,
            FitsArray::F64($a) => $body,
        }
    };
}

macro_rules! map_array {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            FitsArray::U8($a) => FitsArray::U8($body),
            FitsArray::I16($a) => FitsArray::I16($body),
            FitsArray::I32($a) => FitsArray::I32($body),
            FitsArray::I64($a) => FitsArray::I64($body),
            FitsArray::F32($a) => FitsArray::F32($body),
            FitsArray::F64($a) => FitsArray::F64($body),
        }
    };
}

impl FitsArray {
    /// Shape decoded pixels. An empty `shape` (NAXIS = 0) yields a
    /// zero-length 1-D array.
    pub(crate) fn from_image_data(
        data: ImageData,
        shape: &[usize],
    ) -> std::result::Result<Self, ShapeError> {
        let dim = if shape.is_empty() {
            IxDyn(&[0])
        } else {
            IxDyn(shape)
        };
        Ok(match data {
            ImageData::U8(v) => FitsArray::U8(ArrayD::from_shape_vec(dim, v)?),
            ImageData::I16(v) => FitsArray::I16(ArrayD::from_shape_vec(dim, v)?),
            ImageData::I32(v) => FitsArray::I32(ArrayD::from_shape_vec(dim, v)?),
            ImageData::I64(v) => FitsArray::I64(ArrayD::from_shape_vec(dim, v)?),
            ImageData::F32(v) => FitsArray::F32(ArrayD::from_shape_vec(dim, v)?),
            ImageData::F64(v) => FitsArray::F64(ArrayD::from_shape_vec(dim, v)?),
        })
    }

    /// The element type actually read, which may differ from the declared one.
    pub fn element_type(&self) -> ElementType {
        match self {
            FitsArray::U8(_) => ElementType::UInt8,
            FitsArray::I16(_) => ElementType::Int16,
            FitsArray::I32(_) => ElementType::Int32,
            FitsArray::I64(_) => ElementType::Int64,
            FitsArray::F32(_) => ElementType::Float32,
            FitsArray::F64(_) => ElementType::Float64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        with_array!(self, a => a.ndim())
    }

    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow as a typed view when the stored type is `T`.
    pub fn view<T: ArrayElement>(&self) -> Option<ArrayViewD<'_, T>> {
        T::view(self)
    }

    /// Unwrap into a typed array, or give `self` back on a type mismatch.
    pub fn into_array<T: ArrayElement>(self) -> std::result::Result<ArrayD<T>, Self> {
        T::unwrap_array(self)
    }

    /// Copy out a sub-region using ndarray slicing semantics.
    ///
    /// Trailing axes not named in `info` are taken whole. Selections that do
    /// not fit the array are errors rather than panics.
    pub fn slice(&self, info: &[SliceInfoElem]) -> Result<FitsArray> {
        let info = checked_slice(self.shape(), info)?;
        Ok(map_array!(self, a => a.slice(info.as_slice()).to_owned()))
    }
}

impl fmt::Display for FitsArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_array!(self, a => fmt::Display::fmt(a, f))
    }
}

/// Rust element types a [`FitsArray`] can hold.
pub trait ArrayElement: Clone + 'static {
    const ELEMENT_TYPE: ElementType;

    fn view(array: &FitsArray) -> Option<ArrayViewD<'_, Self>>;

    fn unwrap_array(array: FitsArray) -> std::result::Result<ArrayD<Self>, FitsArray>;
}

macro_rules! impl_array_element {
    ($t:ty, $variant:ident, $element:ident) => {
        impl ArrayElement for $t {
            const ELEMENT_TYPE: ElementType = ElementType::$element;

            fn view(array: &FitsArray) -> Option<ArrayViewD<'_, Self>> {
                match array {
                    FitsArray::$variant(a) => Some(a.view()),
                    _ => None,
                }
            }

            fn unwrap_array(array: FitsArray) -> std::result::Result<ArrayD<Self>, FitsArray> {
                match array {
                    FitsArray::$variant(a) => Ok(a),
                    other => Err(other),
                }
            }
        }

        impl From<ArrayD<$t>> for FitsArray {
            fn from(a: ArrayD<$t>) -> Self {
                FitsArray::$variant(a)
            }
        }
    };
}

impl_array_element!(u8, U8, UInt8);
impl_array_element!(i16, I16, Int16);
impl_array_element!(i32, I32, Int32);
impl_array_element!(i64, I64, Int64);
impl_array_element!(f32, F32, Float32);
impl_array_element!(f64, F64, Float64);

/// Validate `info` against `shape` and pad it with full slices for any axes
/// it leaves out.
fn checked_slice(shape: &[usize], info: &[SliceInfoElem]) -> Result<Vec<SliceInfoElem>> {
    let indexed = info
        .iter()
        .filter(|e| !matches!(e, SliceInfoElem::NewAxis))
        .count();
    if indexed > shape.len() {
        return Err(Error::InvalidSlice {
            reason: format!(
                "{indexed} indices given for an array with {} dimensions",
                shape.len()
            ),
        });
    }

    let mut axis = 0;
    for elem in info {
        match *elem {
            SliceInfoElem::NewAxis => continue,
            SliceInfoElem::Index(i) => {
                let len = shape[axis];
                if !resolve(i, len).is_some_and(|i| i < len) {
                    return Err(Error::InvalidSlice {
                        reason: format!("index {i} out of bounds for axis {axis} of length {len}"),
                    });
                }
            }
            SliceInfoElem::Slice { start, end, step } => {
                let len = shape[axis];
                if step == 0 {
                    return Err(Error::InvalidSlice {
                        reason: format!("zero step on axis {axis}"),
                    });
                }
                let start_ok = resolve(start, len).is_some_and(|s| s <= len);
                let end_ok = end.map_or(true, |e| resolve(e, len).is_some_and(|e| e <= len));
                if !start_ok || !end_ok {
                    return Err(Error::InvalidSlice {
                        reason: format!(
                            "range {start}..{} out of bounds for axis {axis} of length {len}",
                            end.map(|e| e.to_string()).unwrap_or_default()
                        ),
                    });
                }
            }
        }
        axis += 1;
    }

    let mut padded = info.to_vec();
    padded.extend((indexed..shape.len()).map(|_| SliceInfoElem::Slice {
        start: 0,
        end: None,
        step: 1,
    }));
    Ok(padded)
}

/// Resolve a possibly negative index against an axis length.
fn resolve(index: isize, len: usize) -> Option<usize> {
    if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        Some(index as usize)
    }
}
