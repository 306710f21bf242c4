//! InfluxDB line protocol for a single temperature point.
//!
//! Lines have the shape `measurement,key=value,... field=value`. Tag keys
//! and values escape spaces and commas with a backslash; the measurement
//! and the field are written as given.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Ordered tag list. Insertion order is the order tags are written in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<(String, String)>);

impl TagSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn extend(&mut self, other: &TagSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> core::result::Result<Self, De::Error> {
        struct TagSetVisitor;

        impl<'de> Visitor<'de> for TagSetVisitor {
            type Value = TagSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string tags")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> core::result::Result<TagSet, A::Error> {
                let mut tags = TagSet::new();
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    tags.push(key, value);
                }
                Ok(tags)
            }
        }

        deserializer.deserialize_map(TagSetVisitor)
    }
}

/// One encoded point, without trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLine(String);

impl MetricLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Decodes a line with exactly one field and a float value.
    pub fn parse(line: &str) -> Result<ParsedLine> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(Error::InvalidLine("empty line"));
        }

        let parts = split_unescaped(line, ' ');
        let (head, field) = match parts.as_slice() {
            [head, field] => (*head, *field),
            [_] => return Err(Error::InvalidLine("missing field set")),
            _ => return Err(Error::InvalidLine("unexpected whitespace")),
        };

        let mut segments = split_unescaped(head, ',').into_iter();
        let measurement = match segments.next() {
            Some(measurement) if !measurement.is_empty() => measurement.to_string(),
            _ => return Err(Error::InvalidLine("missing measurement")),
        };

        let mut tags = TagSet::new();
        for segment in segments {
            let (key, value) = segment
                .split_once('=')
                .ok_or(Error::InvalidLine("tag without value"))?;
            if key.is_empty() || value.is_empty() {
                return Err(Error::InvalidLine("empty tag key or value"));
            }
            tags.push(unescape_tag(key), unescape_tag(value));
        }

        let (field_name, value) = field
            .split_once('=')
            .ok_or(Error::InvalidLine("field without value"))?;
        if field_name.is_empty() {
            return Err(Error::InvalidLine("empty field name"));
        }
        if value.contains(',') {
            return Err(Error::InvalidLine("more than one field"));
        }
        let value = value
            .parse::<f32>()
            .map_err(|_| Error::InvalidLine("field value is not a float"))?;

        Ok(ParsedLine {
            measurement,
            tags,
            field: field_name.to_string(),
            value,
        })
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MetricLine {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub measurement: String,
    pub tags: TagSet,
    pub field: String,
    pub value: f32,
}

/// Incremental builder for a [`MetricLine`].
#[derive(Debug, Clone)]
pub struct LineProtocolBuilder {
    buffer: String,
}

impl LineProtocolBuilder {
    pub fn new(measurement: &str) -> Self {
        Self {
            buffer: String::from(measurement),
        }
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.buffer.push(',');
        push_escaped(&mut self.buffer, key);
        self.buffer.push('=');
        push_escaped(&mut self.buffer, value);
        self
    }

    pub fn tags(self, tags: &TagSet) -> Self {
        tags.iter().fold(self, |builder, (key, value)| builder.tag(key, value))
    }

    pub fn field(mut self, name: &str, value: f32) -> MetricLine {
        use core::fmt::Write;

        self.buffer.push(' ');
        self.buffer.push_str(name);
        self.buffer.push('=');
        // Writing into a String cannot fail
        let _ = write!(self.buffer, "{value}");
        MetricLine(self.buffer)
    }

    pub fn build(measurement: &str, tags: &TagSet, field: &str, value: f32) -> MetricLine {
        Self::new(measurement).tags(tags).field(field, value)
    }
}

fn push_escaped(buffer: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            ' ' => buffer.push_str("\\ "),
            ',' => buffer.push_str("\\,"),
            c => buffer.push(c),
        }
    }
}

/// Escapes spaces and commas in a tag key or value.
pub fn escape_tag(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    push_escaped(&mut escaped, raw);
    escaped
}

/// Reverses [`escape_tag`]. Backslashes not followed by a space or a comma
/// are kept.
pub fn unescape_tag(escaped: &str) -> String {
    let mut raw = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next @ (' ' | ',')) = chars.peek() {
                raw.push(next);
                chars.next();
                continue;
            }
        }
        raw.push(c);
    }
    raw
}

fn split_unescaped(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (index, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(&input[start..index]);
            start = index + c.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}
