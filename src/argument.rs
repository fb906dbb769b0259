//! The raw indexing argument a caller hands to a dataset read or write.
//!
//! [IndexArg] is the explicit form of the heterogeneous expressions accepted
//! by `dset[...]`-style access: ellipsis, empty tuple, integer, slice,
//! index list, boolean mask, field name, or a tuple of those.
//! Constructing one never fails; whether it makes sense for a given dataset
//! is decided by [crate::parse::parse].
use std::{
    fmt::Display,
    ops::{Range, RangeFrom, RangeFull, RangeTo},
    str::FromStr,
};

use itertools::Itertools;
use serde_json::Value;
use thiserror::Error;

use crate::variant_from_data;

/// `start:stop:step`, any part of which may be omitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SliceArg {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl SliceArg {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }
}

impl From<Range<i64>> for SliceArg {
    fn from(r: Range<i64>) -> Self {
        Self::new(Some(r.start), Some(r.end), None)
    }
}

impl From<RangeFrom<i64>> for SliceArg {
    fn from(r: RangeFrom<i64>) -> Self {
        Self::new(Some(r.start), None, None)
    }
}

impl From<RangeTo<i64>> for SliceArg {
    fn from(r: RangeTo<i64>) -> Self {
        Self::new(None, Some(r.end), None)
    }
}

impl From<RangeFull> for SliceArg {
    fn from(_: RangeFull) -> Self {
        Self::default()
    }
}

impl Display for SliceArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let part = |p: Option<i64>| p.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{}:{}", part(self.start), part(self.stop))?;
        if let Some(s) = self.step {
            write!(f, ":{}", s)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexArg {
    Ellipsis,
    EmptyTuple,
    Int(i64),
    Slice(SliceArg),
    IndexList(Vec<i64>),
    Mask(Vec<bool>),
    Field(String),
    /// The null value; never a valid index.
    None,
    Tuple(Vec<IndexArg>),
    /// Anything else (e.g. a mapping), named by its type.
    Unsupported(String),
}

variant_from_data!(IndexArg, Int, i64);
variant_from_data!(IndexArg, Slice, SliceArg);
variant_from_data!(IndexArg, IndexList, Vec<i64>);
variant_from_data!(IndexArg, Mask, Vec<bool>);
variant_from_data!(IndexArg, Field, String);
variant_from_data!(IndexArg, Tuple, Vec<IndexArg>);

impl From<&str> for IndexArg {
    fn from(s: &str) -> Self {
        Self::Field(s.to_owned())
    }
}

impl From<()> for IndexArg {
    fn from(_: ()) -> Self {
        Self::EmptyTuple
    }
}

impl From<Range<i64>> for IndexArg {
    fn from(r: Range<i64>) -> Self {
        Self::Slice(r.into())
    }
}

impl From<RangeFrom<i64>> for IndexArg {
    fn from(r: RangeFrom<i64>) -> Self {
        Self::Slice(r.into())
    }
}

impl From<RangeTo<i64>> for IndexArg {
    fn from(r: RangeTo<i64>) -> Self {
        Self::Slice(r.into())
    }
}

impl From<RangeFull> for IndexArg {
    fn from(r: RangeFull) -> Self {
        Self::Slice(r.into())
    }
}

impl IndexArg {
    /// Whether an ellipsis appears, bare or as a tuple member.
    pub fn has_ellipsis(&self) -> bool {
        match self {
            Self::Ellipsis => true,
            Self::Tuple(items) => items.iter().any(|i| matches!(i, Self::Ellipsis)),
            _ => false,
        }
    }

    fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(n) if n.is_f64() => "float",
            Value::Number(_) => "integer",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "mapping",
        }
    }

    fn slice_from_object(map: &serde_json::Map<String, Value>) -> Option<SliceArg> {
        if map.is_empty() || map.keys().any(|k| !matches!(k.as_str(), "start" | "stop" | "step")) {
            return None;
        }
        let mut out = SliceArg::default();
        for (k, v) in map.iter() {
            let part = match v {
                Value::Null => None,
                other => Some(other.as_i64()?),
            };
            match k.as_str() {
                "start" => out.start = part,
                "stop" => out.stop = part,
                _ => out.step = part,
            }
        }
        Some(out)
    }
}

/// JSON form of an indexing argument, as received from a remote caller.
///
/// `"..."` and `"()"` are the ellipsis and empty tuple, other strings are
/// field names and `{"start":..,"stop":..,"step":..}` is a slice.
/// An array is always a tuple (`[]` being the empty tuple); index lists and
/// masks are arrays of integers or booleans inside it, so `[[1,2,5]]` is the
/// index list `[1,2,5]` and `[1,2,5]` is three point indices.
impl From<&Value> for IndexArg {
    fn from(value: &Value) -> Self {
        match value {
            Value::Array(items) if items.is_empty() => Self::EmptyTuple,
            Value::Array(items) => Self::Tuple(items.iter().map(Self::from_member).collect()),
            other => Self::from_scalar(other),
        }
    }
}

impl IndexArg {
    fn from_member(value: &Value) -> Self {
        match value {
            Value::Array(items) => {
                if !items.is_empty() && items.iter().all(Value::is_boolean) {
                    Self::Mask(items.iter().filter_map(Value::as_bool).collect())
                } else if items.iter().all(Value::is_i64) {
                    Self::IndexList(items.iter().filter_map(Value::as_i64).collect())
                } else {
                    // rejected by the parser as a nested tuple
                    Self::Tuple(items.iter().map(Self::from_member).collect())
                }
            }
            other => Self::from_scalar(other),
        }
    }

    fn from_scalar(value: &Value) -> Self {
        match value {
            Value::Null => Self::None,
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Unsupported(Self::type_name(value).into()),
            },
            Value::String(s) => match s.as_str() {
                "..." => Self::Ellipsis,
                "()" => Self::EmptyTuple,
                _ => Self::Field(s.clone()),
            },
            Value::Object(map) => match Self::slice_from_object(map) {
                Some(sl) => Self::Slice(sl),
                None => Self::Unsupported(Self::type_name(value).into()),
            },
            Value::Bool(_) | Value::Array(_) => Self::Unsupported(Self::type_name(value).into()),
        }
    }
}

fn write_item(item: &IndexArg, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match item {
        IndexArg::Ellipsis => f.write_str("..."),
        IndexArg::EmptyTuple => f.write_str("()"),
        IndexArg::Int(i) => write!(f, "{}", i),
        IndexArg::Slice(s) => write!(f, "{}", s),
        IndexArg::IndexList(v) => write!(f, "[{}]", v.iter().join(",")),
        IndexArg::Mask(m) => write!(
            f,
            "[{}]",
            m.iter()
                .map(|b| if *b { "True" } else { "False" })
                .join(",")
        ),
        IndexArg::Field(s) if s.contains('\'') => write!(f, "\"{}\"", s),
        IndexArg::Field(s) => write!(f, "'{}'", s),
        IndexArg::None => f.write_str("None"),
        IndexArg::Tuple(items) => {
            for (idx, it) in items.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write_item(it, f)?;
            }
            if items.len() == 1 {
                f.write_str(",")?;
            }
            Ok(())
        }
        IndexArg::Unsupported(t) => write!(f, "<{}>", t),
    }
}

/// numpy-style text, e.g. `1, 2:4, [0,3]` or `'field'`.
impl Display for IndexArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_item(self, f)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not parse `{text}` as an index: {reason}")]
pub struct ArgumentSyntaxError {
    pub text: String,
    pub reason: &'static str,
}

impl ArgumentSyntaxError {
    fn new(text: &str, reason: &'static str) -> Self {
        Self {
            text: text.to_owned(),
            reason,
        }
    }
}

/// Split on commas which are not inside brackets or quotes.
fn split_top_level(s: &str) -> Result<Vec<&str>, ArgumentSyntaxError> {
    let mut parts = Vec::default();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => (),
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ArgumentSyntaxError::new(s, "unbalanced brackets"))?
            }
            (None, ',') if depth == 0 => {
                parts.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => (),
        }
    }
    if depth != 0 || quote.is_some() {
        return Err(ArgumentSyntaxError::new(s, "unterminated bracket or quote"));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

fn parse_int(s: &str, whole: &str) -> Result<i64, ArgumentSyntaxError> {
    s.trim()
        .parse()
        .map_err(|_| ArgumentSyntaxError::new(whole, "expected an integer"))
}

fn parse_item(s: &str) -> Result<IndexArg, ArgumentSyntaxError> {
    let t = s.trim();
    if t.is_empty() {
        return Err(ArgumentSyntaxError::new(s, "empty index"));
    }
    if t == "..." {
        return Ok(IndexArg::Ellipsis);
    }
    if t == "()" {
        return Ok(IndexArg::EmptyTuple);
    }
    if t == "None" {
        return Ok(IndexArg::None);
    }
    if let Some(q) = t.chars().next().filter(|c| *c == '\'' || *c == '"') {
        return match t[1..].strip_suffix(q) {
            Some(name) if !name.contains(q) => Ok(IndexArg::Field(name.to_owned())),
            _ => Err(ArgumentSyntaxError::new(s, "badly quoted field name")),
        };
    }
    if let Some(inner) = t.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| ArgumentSyntaxError::new(s, "unterminated list"))?
            .trim();
        if inner.is_empty() {
            return Ok(IndexArg::IndexList(Vec::default()));
        }
        let items: Vec<&str> = inner.split(',').map(str::trim).collect();
        if items.iter().all(|i| *i == "True" || *i == "False") {
            return Ok(IndexArg::Mask(items.iter().map(|i| *i == "True").collect()));
        }
        return items
            .iter()
            .map(|i| parse_int(i, s))
            .collect::<Result<Vec<_>, _>>()
            .map(IndexArg::IndexList);
    }
    if t.contains(':') {
        let parts: Vec<&str> = t.split(':').collect();
        if parts.len() > 3 {
            return Err(ArgumentSyntaxError::new(s, "too many `:` in slice"));
        }
        let mut bounds = [None; 3];
        for (b, p) in bounds.iter_mut().zip(parts.iter()) {
            if !p.trim().is_empty() {
                *b = Some(parse_int(p, s)?);
            }
        }
        return Ok(IndexArg::Slice(SliceArg::new(bounds[0], bounds[1], bounds[2])));
    }
    parse_int(t, s).map(IndexArg::Int)
}

impl FromStr for IndexArg {
    type Err = ArgumentSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_top_level(s)?;
        if parts.len() == 1 {
            return parse_item(parts[0]);
        }
        let mut items = Vec::with_capacity(parts.len());
        for (idx, p) in parts.iter().enumerate() {
            // a single trailing comma makes a 1-tuple
            if idx == parts.len() - 1 && p.trim().is_empty() {
                break;
            }
            match parse_item(p)? {
                IndexArg::EmptyTuple => {
                    return Err(ArgumentSyntaxError::new(s, "empty tuple inside a tuple"))
                }
                it => items.push(it),
            }
        }
        Ok(IndexArg::Tuple(items))
    }
}
