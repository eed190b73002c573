//! Lightweight pointers to arrays stored inside external FITS files.
//!
//! An [`ExternalArrayReference`] names a file, the HDU within it and the
//! shape and element type the array is declared to have. None of this is
//! checked against the file: it is what the producer of the reference
//! asserted, and stays that way until someone reads the data.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The pixel type of a FITS image, as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum ElementType {
    UInt8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ElementType {
    /// The canonical lower-case name, e.g. `float64`.
    pub fn name(self) -> &'static str {
        match self {
            ElementType::UInt8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        }
    }

    /// Convert to the FITS BITPIX value.
    pub fn to_bitpix(self) -> i64 {
        match self {
            ElementType::UInt8 => 8,
            ElementType::Int16 => 16,
            ElementType::Int32 => 32,
            ElementType::Int64 => 64,
            ElementType::Float32 => -32,
            ElementType::Float64 => -64,
        }
    }

    /// Convert from a FITS BITPIX value.
    pub fn from_bitpix(bitpix: i64) -> Option<Self> {
        match bitpix {
            8 => Some(ElementType::UInt8),
            16 => Some(ElementType::Int16),
            32 => Some(ElementType::Int32),
            64 => Some(ElementType::Int64),
            -32 => Some(ElementType::Float32),
            -64 => Some(ElementType::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = Error;

    /// Accepts NumPy-style names (`float64`) and type codes with an optional
    /// byte-order prefix (`>f8`, `<i2`, `u1`).
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let code = lowered.trim_start_matches(['>', '<', '=', '|']);
        match code {
            "uint8" | "u1" => Ok(ElementType::UInt8),
            "int16" | "i2" => Ok(ElementType::Int16),
            "int32" | "i4" => Ok(ElementType::Int32),
            "int64" | "i8" => Ok(ElementType::Int64),
            "float32" | "f4" => Ok(ElementType::Float32),
            "float64" | "f8" => Ok(ElementType::Float64),
            _ => Err(Error::UnknownElementType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ElementType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ElementType> for String {
    fn from(t: ElementType) -> Self {
        t.name().to_string()
    }
}

/// Identifies one HDU within a FITS file, by position or by EXTNAME.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum HduSelector {
    /// Zero-based HDU position; 0 is the primary HDU.
    Index(usize),
    /// EXTNAME of an extension, compared case-insensitively.
    Name(String),
}

impl HduSelector {
    /// Whether the HDU at `index` with the given EXTNAME is the one selected.
    pub fn matches(&self, index: usize, extname: Option<&str>) -> bool {
        match self {
            HduSelector::Index(i) => *i == index,
            HduSelector::Name(name) => extname
                .map(|e| e.trim().eq_ignore_ascii_case(name.trim()))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for HduSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HduSelector::Index(i) => write!(f, "index {i}"),
            HduSelector::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl From<usize> for HduSelector {
    fn from(index: usize) -> Self {
        HduSelector::Index(index)
    }
}

impl From<&str> for HduSelector {
    fn from(name: &str) -> Self {
        HduSelector::Name(name.to_string())
    }
}

impl From<String> for HduSelector {
    fn from(name: String) -> Self {
        HduSelector::Name(name)
    }
}

/// Where one array lives, without reading it.
///
/// Field names on the wire follow the ASDF `external-array` schema:
/// `fileuri`, `target`, `datatype`, `shape`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExternalArrayReference {
    #[cfg_attr(feature = "serde", serde(rename = "fileuri"))]
    file_uri: String,
    target: HduSelector,
    #[cfg_attr(feature = "serde", serde(rename = "datatype"))]
    element_type: ElementType,
    shape: Vec<usize>,
}

impl ExternalArrayReference {
    pub fn new(
        file_uri: impl Into<String>,
        target: impl Into<HduSelector>,
        element_type: ElementType,
        shape: impl Into<Vec<usize>>,
    ) -> Self {
        ExternalArrayReference {
            file_uri: file_uri.into(),
            target: target.into(),
            element_type,
            shape: shape.into(),
        }
    }

    /// The file path as stored: absolute, or relative to some base directory.
    pub fn file_uri(&self) -> &str {
        &self.file_uri
    }

    pub fn target(&self) -> &HduSelector {
        &self.target
    }

    /// Declared element type; not verified against the file.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Declared shape, slowest axis first; not verified against the file.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Best-effort structural check. Does not touch the file.
    pub fn validate(&self) -> Result<()> {
        if self.file_uri.trim().is_empty() {
            return Err(Error::InvalidReference {
                reason: "empty file URI".to_string(),
            });
        }
        if let HduSelector::Name(name) = &self.target {
            if name.trim().is_empty() {
                return Err(Error::InvalidReference {
                    reason: "empty HDU name".to_string(),
                });
            }
        }
        Ok(())
    }
}
