//! Path expressions addressing a field inside an instance.
//!
//! Syntax: dot-separated field names with an optional leading dot, list
//! indices in brackets and quoted keys for dict entries that are not plain
//! identifiers:
//!
//! ```text
//! .user_assigned
//! properties.email_receivers[0].name
//! tags["cost.center"]
//! ```
//!
//! Paths are parsed once and resolved against a [`SchemaNode`] before any
//! instance is touched, so an unknown field fails fast.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::OperationError;
use crate::schema::{NodeKind, SchemaNode};

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object field or dict key.
    Field(String),
    /// List position.
    Index(usize),
}

/// Parsed path expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The empty path, addressing the node itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path expression.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::SchemaMismatch` for malformed expressions.
    pub fn parse(expr: &str) -> Result<Self, OperationError> {
        let malformed = |message: &str| OperationError::mismatch(expr, message);

        let mut segments = Vec::new();
        let chars: Vec<char> = expr.trim().chars().collect();
        let mut pos = 0;

        if chars.first() == Some(&'.') {
            pos = 1;
            if chars.len() == 1 {
                return Ok(Self::root());
            }
        }

        while pos < chars.len() {
            match chars[pos] {
                '[' => {
                    let (segment, next) = parse_bracket(&chars, pos + 1).ok_or_else(|| {
                        malformed("expected a list index or a quoted key inside '[]'")
                    })?;
                    segments.push(segment);
                    pos = next;
                }
                '.' => return Err(malformed("empty path segment")),
                _ => {
                    let end = chars[pos..]
                        .iter()
                        .position(|c| *c == '.' || *c == '[')
                        .map(|offset| pos + offset)
                        .unwrap_or(chars.len());
                    let name: String = chars[pos..end].iter().collect();
                    if name.chars().any(|c| c == ']' || c.is_whitespace()) {
                        return Err(malformed("invalid character in field name"));
                    }
                    segments.push(Segment::Field(name));
                    pos = end;
                }
            }

            // A segment is followed by the end, a '[' or a '.' and another name.
            if pos < chars.len() && chars[pos] == '.' {
                pos += 1;
                if pos == chars.len() {
                    return Err(malformed("trailing '.'"));
                }
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a segment, returning the extended path.
    pub fn join(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Resolve this path against `node`.
    ///
    /// Returns the path with field names canonicalized to client names (wire
    /// names are accepted in the expression) and the node it addresses.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::SchemaMismatch` when a segment does not exist
    /// in the schema or does not fit the node it is applied to.
    pub fn resolve<'s>(
        &self,
        node: &'s SchemaNode,
    ) -> Result<(FieldPath, &'s SchemaNode), OperationError> {
        let mut current = node;
        let mut canonical = FieldPath::root();

        for segment in &self.segments {
            let (next, step) = match (segment, current.kind()) {
                (Segment::Field(name), NodeKind::Object(_) | NodeKind::Identity(_)) => {
                    let (client_name, child) = current.child(name).ok_or_else(|| {
                        OperationError::mismatch(
                            canonical.join(segment.clone()).to_string(),
                            format!("no field '{}' in {} schema", name, current.type_name()),
                        )
                    })?;
                    (child, Segment::Field(client_name.to_string()))
                }
                (Segment::Field(key), NodeKind::Dict(element)) => {
                    (element.as_ref(), Segment::Field(key.clone()))
                }
                (Segment::Index(index), NodeKind::List(element)) => {
                    (element.as_ref(), Segment::Index(*index))
                }
                _ => {
                    return Err(OperationError::mismatch(
                        canonical.join(segment.clone()).to_string(),
                        format!("cannot address {} on a {} node", segment, current.type_name()),
                    ));
                }
            };
            canonical.segments.push(step);
            current = next;
        }

        Ok((canonical, current))
    }

    /// Look up the value this path addresses, if present.
    pub fn select<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                Segment::Field(name) => current.get(name.as_str()),
                Segment::Index(index) => current.get(*index),
            })
    }

    /// Mutable lookup that creates absent object and dict fields as empty
    /// containers of their schema type.
    ///
    /// The path should already be resolved against `node`.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::SchemaMismatch` when the instance does not
    /// have the shape the schema describes or a list index is out of range.
    pub fn select_mut<'v>(
        &self,
        node: &SchemaNode,
        value: &'v mut Value,
    ) -> Result<&'v mut Value, OperationError> {
        let mut current_node = node;
        let mut current = value;
        let mut walked = FieldPath::root();

        for segment in &self.segments {
            fill_empty(current_node, current);
            walked = walked.join(segment.clone());
            let shape = || {
                OperationError::mismatch(
                    walked.to_string(),
                    format!("instance does not match the {} schema", current_node.type_name()),
                )
            };

            match segment {
                Segment::Field(name) => {
                    let child = match current_node.kind() {
                        NodeKind::Dict(element) => element.as_ref(),
                        NodeKind::Object(_) | NodeKind::Identity(_) => current_node
                            .child(name)
                            .map(|(_, child)| child)
                            .ok_or_else(shape)?,
                        _ => return Err(shape()),
                    };
                    let map = current.as_object_mut().ok_or_else(shape)?;
                    current = map
                        .entry(name.clone())
                        .or_insert_with(|| child.empty_container().unwrap_or(Value::Null));
                    current_node = child;
                }
                Segment::Index(index) => {
                    let NodeKind::List(element) = current_node.kind() else {
                        return Err(shape());
                    };
                    current = current
                        .as_array_mut()
                        .and_then(|items| items.get_mut(*index))
                        .ok_or_else(shape)?;
                    current_node = element;
                }
            }
        }

        fill_empty(current_node, current);
        Ok(current)
    }
}

fn fill_empty(node: &SchemaNode, value: &mut Value) {
    if value.is_null() {
        if let Some(empty) = node.empty_container() {
            *value = empty;
        }
    }
}

/// Parse the inside of `[...]` starting just after the `[`.
///
/// Returns the segment and the position after the closing `]`. Quoted keys
/// may contain `]` and use `\` to escape the quote and the backslash.
fn parse_bracket(chars: &[char], start: usize) -> Option<(Segment, usize)> {
    let skip_spaces = |mut pos: usize| {
        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        pos
    };

    let mut pos = skip_spaces(start);
    let segment = match *chars.get(pos)? {
        quote @ ('"' | '\'') => {
            let mut key = String::new();
            pos += 1;
            loop {
                match *chars.get(pos)? {
                    '\\' => {
                        key.push(*chars.get(pos + 1)?);
                        pos += 2;
                    }
                    c if c == quote => {
                        pos += 1;
                        break;
                    }
                    c => {
                        key.push(c);
                        pos += 1;
                    }
                }
            }
            Segment::Field(key)
        }
        _ => {
            let close = start + chars[start..].iter().position(|c| *c == ']')?;
            let inner: String = chars[start..close].iter().collect();
            let index = inner.trim().parse::<usize>().ok()?;
            return Some((Segment::Index(index), close + 1));
        }
    };

    pos = skip_spaces(pos);
    (chars.get(pos) == Some(&']')).then_some((segment, pos + 1))
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) if is_plain_name(name) => write!(f, ".{}", name),
            Segment::Field(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "[\"{}\"]", escaped)
            }
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(".");
        }
        for segment in &self.segments {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
