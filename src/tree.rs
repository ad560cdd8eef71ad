// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Path based access to schema-less resource trees.
//!
//! Workload manifests and backing services are handled as plain
//! `serde_json::Value` trees. Every accessor that expects a field to exist
//! fails with [`Error::ShapeMismatch`] instead of panicking.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Split a dotted path such as `spec.template.spec.containers`.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn get<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |node, segment| node.as_object()?.get(segment.as_ref()))
}

pub fn get_mut<'a, S: AsRef<str>>(root: &'a mut Value, path: &[S]) -> Option<&'a mut Value> {
    path.iter().try_fold(root, |node, segment| {
        node.as_object_mut()?.get_mut(segment.as_ref())
    })
}

/// Like [`get`], but a missing field is an error.
pub fn get_required<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Result<&'a Value> {
    get(root, path).ok_or_else(|| Error::shape(join(path), "field not found"))
}

pub fn get_str<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a str> {
    get(root, path).and_then(Value::as_str)
}

/// Read a list, treating a missing field as empty.
pub fn get_list<S: AsRef<str>>(root: &Value, path: &[S]) -> Result<Vec<Value>> {
    match get(root, path) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(Error::shape(join(path), "expected a list")),
    }
}

/// Set `value` at `path`, creating intermediate maps as needed.
pub fn set<S: AsRef<str>>(root: &mut Value, path: &[S], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for (depth, segment) in parents.iter().enumerate() {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        let map = node
            .as_object_mut()
            .ok_or_else(|| Error::shape(join(&path[..depth]), "expected a map"))?;
        node = map
            .entry(segment.as_ref().to_string())
            .or_insert(Value::Null);
    }

    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    let map = node
        .as_object_mut()
        .ok_or_else(|| Error::shape(join(parents), "expected a map"))?;
    map.insert(last.as_ref().to_string(), value);
    Ok(())
}

/// Remove the field at `path`, returning it if present.
pub fn remove<S: AsRef<str>>(root: &mut Value, path: &[S]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    get_mut(root, parents)?
        .as_object_mut()?
        .remove(last.as_ref())
}

/// Build a tree holding only `value` at `path`.
pub fn nested<S: AsRef<str>>(path: &[S], value: Value) -> Value {
    path.iter().rev().fold(value, |acc, segment| {
        let mut map = Map::new();
        map.insert(segment.as_ref().to_string(), acc);
        Value::Object(map)
    })
}

/// Deep merge where lists are concatenated and scalars are overridden by `src`.
pub fn merge_append(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing) => merge_append(existing, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => dst.extend(src),
        (dst, src) => *dst = src,
    }
}

/// Deep merge where every non-map value in `src` replaces the one in `dst`.
pub fn merge_override(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing) => merge_override(existing, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (dst, src) => *dst = src,
    }
}

/// One step of a JSONPath-style field reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// The `{.status.credentials.user}` path form used by binding annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let inner = raw
            .trim()
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| Error::InvalidPath(raw.to_string()))?
            .trim();
        let inner = inner
            .strip_prefix('.')
            .ok_or_else(|| Error::InvalidPath(raw.to_string()))?;

        let mut segments = Vec::new();
        for part in inner.split('.') {
            let (field, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };
            if !field.is_empty() {
                segments.push(Segment::Field(field.to_string()));
            }
            while let Some(stripped) = rest.strip_prefix('[') {
                let end = stripped
                    .find(']')
                    .ok_or_else(|| Error::InvalidPath(raw.to_string()))?;
                let index = stripped[..end]
                    .parse::<usize>()
                    .map_err(|_| Error::InvalidPath(raw.to_string()))?;
                segments.push(Segment::Index(index));
                rest = &stripped[end + 1..];
            }
            if !rest.is_empty() {
                return Err(Error::InvalidPath(raw.to_string()));
            }
        }

        if segments.is_empty() {
            return Err(Error::InvalidPath(raw.to_string()));
        }
        Ok(JsonPath { segments })
    }

    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |node, segment| match segment {
                Segment::Field(name) => node.as_object()?.get(name),
                Segment::Index(i) => node.as_array()?.get(*i),
            })
    }

    pub fn get_required<'a>(&self, root: &'a Value) -> Result<&'a Value> {
        self.get(root)
            .ok_or_else(|| Error::shape(self.to_string(), "field not found"))
    }

    /// The last field name, used as default output name.
    pub fn last_field(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Index(_) => None,
        })
    }

    /// The field names of the path, or `None` when it indexes into a list.
    pub fn fields(&self) -> Option<Vec<String>> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Field(name) => Some(name.clone()),
                Segment::Index(_) => None,
            })
            .collect()
    }
}

impl std::fmt::Display for JsonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        write!(f, "}}")
    }
}

fn join<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}
