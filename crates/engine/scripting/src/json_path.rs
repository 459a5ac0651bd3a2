//! Dotted/bracketed path lookup in decoded JSON documents
//!
//! A path is a list of `.`-separated segments. Each segment is either a
//! member name (`name`) or a member name followed by an array index
//! (`name[2]`). Every segment looks up its member name first, so an empty
//! path or a bare `[0]` addresses the member with the empty name.
//!
//! Lookups never fall back to a default: a missing member, an index past the
//! end, or a value of the wrong kind is reported as
//! [`Error::MalformedPath`] naming the segment that failed.

use crate::{Error, PathFault, Result};
use serde_json::Value;

/// One parsed segment of a path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Source text of the segment, kept for diagnostics
    raw: String,
    /// Member name, possibly empty
    key: String,
    /// Array index applied after the member lookup
    index: Option<usize>,
}

impl Segment {
    fn parse(path: &str, raw: &str) -> Result<Self> {
        let Some(open) = raw.find('[') else {
            return Ok(Self {
                raw: raw.to_string(),
                key: raw.to_string(),
                index: None,
            });
        };

        let invalid = || Error::MalformedPath {
            path: path.to_string(),
            segment: raw.to_string(),
            fault: PathFault::InvalidIndex(raw[open..].to_string()),
        };

        let inner = raw[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
        if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let index = inner.parse::<usize>().map_err(|_| invalid())?;

        Ok(Self {
            raw: raw.to_string(),
            key: raw[..open].to_string(),
            index: Some(index),
        })
    }

    /// Member name of this segment
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Array index of this segment, if bracketed
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

/// A parsed path expression such as `a.b[2].c`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parse a path expression
    pub fn parse(path: &str) -> Result<Self> {
        let segments = path
            .split('.')
            .map(|raw| Segment::parse(path, raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: path.to_string(),
            segments,
        })
    }

    /// The expression this path was parsed from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk `root` along this path
    pub fn resolve<'a>(&self, root: &'a Value) -> Result<&'a Value> {
        let mut cursor = root;

        for segment in &self.segments {
            let fail = |fault: PathFault| Error::MalformedPath {
                path: self.source.clone(),
                segment: segment.raw.clone(),
                fault,
            };

            cursor = match cursor {
                Value::Object(map) => map
                    .get(&segment.key)
                    .ok_or_else(|| fail(PathFault::MissingKey(segment.key.clone())))?,
                other => return Err(fail(PathFault::NotAnObject(kind(other)))),
            };

            if let Some(index) = segment.index {
                cursor = match cursor {
                    Value::Array(items) => items.get(index).ok_or_else(|| {
                        fail(PathFault::IndexOutOfRange {
                            index,
                            len: items.len(),
                        })
                    })?,
                    other => return Err(fail(PathFault::NotAnArray(kind(other)))),
                };
            }
        }

        Ok(cursor)
    }
}

impl std::str::FromStr for JsonPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for JsonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Resolve `path` against `root` in one step
pub fn resolve<'a>(root: &'a Value, path: &str) -> Result<&'a Value> {
    JsonPath::parse(path)?.resolve(root)
}

/// Name of the JSON kind of a value, used in diagnostics
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
