use std::{fmt::Display, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub trait NBytes {
    fn nbytes(&self) -> usize;

    fn nbits(&self) -> usize {
        self.nbytes() * 8
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum IntSize {
    b8,
    b16,
    b32,
    b64,
}

impl TryFrom<usize> for IntSize {
    type Error = InvalidDataType;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(Self::b8),
            16 => Ok(Self::b16),
            32 => Ok(Self::b32),
            64 => Ok(Self::b64),
            _ => Err(InvalidDataType::BadWidth("int", value)),
        }
    }
}

impl NBytes for IntSize {
    fn nbytes(&self) -> usize {
        match self {
            Self::b8 => 1,
            Self::b16 => 2,
            Self::b32 => 4,
            Self::b64 => 8,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum FloatSize {
    b16,
    b32,
    b64,
}

impl TryFrom<usize> for FloatSize {
    type Error = InvalidDataType;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            16 => Ok(Self::b16),
            32 => Ok(Self::b32),
            64 => Ok(Self::b64),
            _ => Err(InvalidDataType::BadWidth("float", value)),
        }
    }
}

impl NBytes for FloatSize {
    fn nbytes(&self) -> usize {
        match self {
            Self::b16 => 2,
            Self::b32 => 4,
            Self::b64 => 8,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ComplexSize {
    b64,
    b128,
}

impl TryFrom<usize> for ComplexSize {
    type Error = InvalidDataType;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            64 => Ok(Self::b64),
            128 => Ok(Self::b128),
            _ => Err(InvalidDataType::BadWidth("complex", value)),
        }
    }
}

impl NBytes for ComplexSize {
    fn nbytes(&self) -> usize {
        match self {
            Self::b64 => 8,
            Self::b128 => 16,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidDataType {
    #[error("{1} is not a valid {0} width")]
    BadWidth(&'static str, usize),
    #[error("Raw width {0} is not a multiple of 8")]
    RawNotBytes(usize),
    #[error("Unknown data type `{0}`")]
    Unknown(String),
}

/// Primitive element type of a dataset, or of one field of a compound type.
///
/// Serialized as a short string: `bool`, `int32`, `uint8`, `float32`,
/// `complex128`, `r16` (raw bits) or `s10` (fixed-length byte string).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int(IntSize),
    UInt(IntSize),
    Float(FloatSize),
    Complex(ComplexSize),
    Raw(usize),
    /// Fixed number of bytes, e.g. numpy's `|S10`.
    FixedString(usize),
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl NBytes for DataType {
    fn nbytes(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Int(s) | Self::UInt(s) => s.nbytes(),
            Self::Float(s) => s.nbytes(),
            Self::Complex(s) => s.nbytes(),
            Self::Raw(s) => *s / 8,
            Self::FixedString(n) => *n,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nbits = self.nbits();
        let s = match self {
            Self::Bool => "bool".into(),
            Self::Int(_s) => format!("int{nbits}"),
            Self::UInt(_s) => format!("uint{nbits}"),
            Self::Float(_s) => format!("float{nbits}"),
            Self::Complex(_s) => format!("complex{nbits}"),
            Self::Raw(_s) => format!("r{nbits}"),
            Self::FixedString(n) => format!("s{n}"),
        };
        write!(f, "{}", s)
    }
}

fn split_str_num(s: &str) -> Result<(&str, Option<usize>), InvalidDataType> {
    if let Some(idx) = s.find(|c: char| c.is_ascii_digit()) {
        let n = s[idx..]
            .parse()
            .map_err(|_| InvalidDataType::Unknown(s.to_owned()))?;
        Ok((&s[0..idx], Some(n)))
    } else {
        Ok((s, None))
    }
}

impl FromStr for DataType {
    type Err = InvalidDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, nbits) = split_str_num(s)?;
        match (prefix, nbits) {
            ("bool", None) => Ok(Self::Bool),
            ("int", Some(n)) => Ok(Self::Int(n.try_into()?)),
            ("uint", Some(n)) => Ok(Self::UInt(n.try_into()?)),
            ("float", Some(n)) => Ok(Self::Float(n.try_into()?)),
            ("complex", Some(n)) => Ok(Self::Complex(n.try_into()?)),
            ("r", Some(n)) => {
                if n % 8 == 0 {
                    Ok(Self::Raw(n))
                } else {
                    Err(InvalidDataType::RawNotBytes(n))
                }
            }
            ("s", Some(n)) => Ok(Self::FixedString(n)),
            _ => Err(InvalidDataType::Unknown(s.to_owned())),
        }
    }
}
