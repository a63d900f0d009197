//! Dot-notation get/set over a [`serde_json::Value`] record.
//!
//! Paths look like `"ssn"`, `"user.address.zip"` or `"orders[0].card_number"`.
//! A segment applied to an array is read as an index, so `"orders.0"` and
//! `"orders[0]"` address the same element.

use std::borrow::Cow;

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced by the path accessor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The path is empty or syntactically invalid.
    #[error("invalid attribute path '{0}'")]
    Invalid(String),

    /// The path runs through an array index that does not exist.
    #[error("cannot write attribute path '{0}': array index out of bounds")]
    Conflict(String),
}

/// Segments of a dot-notation attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// Navigate into an object property by name (or an array by numeric name).
    Key(String),
    /// Navigate into an array element.
    Index(usize),
}

impl PathSegment {
    fn key(&self) -> Cow<'_, str> {
        match self {
            PathSegment::Key(k) => Cow::Borrowed(k),
            PathSegment::Index(i) => Cow::Owned(i.to_string()),
        }
    }

    fn index(&self) -> Option<usize> {
        match self {
            PathSegment::Key(k) => k.parse().ok(),
            PathSegment::Index(i) => Some(*i),
        }
    }
}

/// Parse a dot-notation path into a list of [`PathSegment`]s.
///
/// `"orders[1].card_number"` → `[Key("orders"), Index(1), Key("card_number")]`.
fn parse_path(path: &str) -> Result<Vec<PathSegment>, PathError> {
    let invalid = || PathError::Invalid(path.to_owned());
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (name, mut rest) = match part.find('[') {
            Some(i) => part.split_at(i),
            None => (part, ""),
        };
        if name.is_empty() && rest.is_empty() {
            return Err(invalid());
        }
        if !name.is_empty() {
            segments.push(PathSegment::Key(name.to_owned()));
        }
        while let Some(open) = rest.strip_prefix('[') {
            let close = open.find(']').ok_or_else(invalid)?;
            let index = open[..close].parse().map_err(|_| invalid())?;
            segments.push(PathSegment::Index(index));
            rest = &open[close + 1..];
        }
        if !rest.is_empty() {
            return Err(invalid());
        }
    }
    Ok(segments)
}

/// Read the value at `path`, or `None` if any step along the path is missing.
///
/// An explicit JSON `null` at the end of the path is returned as `Some(Null)`.
/// Invalid paths read as missing.
pub fn get<'v>(record: &'v Value, path: &str) -> Option<&'v Value> {
    let segments = parse_path(path).ok()?;
    segments
        .iter()
        .try_fold(record, |current, segment| match current {
            Value::Object(map) => map.get(&*segment.key()),
            Value::Array(items) => segment.index().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Scalar values found in the middle of the path are replaced by objects.
///
/// # Errors
///
/// Returns [`PathError::Invalid`] for a malformed path and
/// [`PathError::Conflict`] when the path indexes past the end of an array.
pub fn set(record: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    let segments = parse_path(path)?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| PathError::Invalid(path.to_owned()))?;

    let mut current = record;
    for segment in parents {
        current = child_mut(current, segment, path)?;
    }

    match current {
        Value::Array(items) => {
            let slot = last
                .index()
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| PathError::Conflict(path.to_owned()))?;
            *slot = value;
        }
        Value::Object(map) => {
            map.insert(last.key().into_owned(), value);
        }
        other => {
            let mut map = Map::new();
            map.insert(last.key().into_owned(), value);
            *other = Value::Object(map);
        }
    }
    Ok(())
}

fn child_mut<'v>(
    current: &'v mut Value,
    segment: &PathSegment,
    path: &str,
) -> Result<&'v mut Value, PathError> {
    let conflict = || PathError::Conflict(path.to_owned());
    match current {
        Value::Array(items) => segment
            .index()
            .and_then(|i| items.get_mut(i))
            .ok_or_else(conflict),
        Value::Object(map) => Ok(map
            .entry(segment.key().into_owned())
            .or_insert_with(|| Value::Object(Map::new()))),
        other => {
            let key = segment.key().into_owned();
            let mut map = Map::new();
            map.insert(key.clone(), Value::Object(Map::new()));
            *other = Value::Object(map);
            other.get_mut(key.as_str()).ok_or_else(conflict)
        }
    }
}
