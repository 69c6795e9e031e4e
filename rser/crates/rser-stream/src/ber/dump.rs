//! Schema-less inspection
//!
//! [`dump`] parses any BER input into a tree of [`TlvNode`]s without knowing
//! the types that produced it; [`check`] only validates the framing. Both
//! stop at the first malformed TLV and report its offset and the child
//! indices leading to it, e.g. `#0/2/1`.

use std::fmt;

use super::codec;
use super::reader::{BerReader, End};
use super::tag::{self, Tag, TagClass};
use crate::config::StreamConfig;
use crate::error::{ErrorKind, Result, StreamError};

/// One parsed TLV
#[derive(Debug, Clone, PartialEq)]
pub struct TlvNode {
    /// Offset of the identifier
    pub offset: usize,
    pub tag: Tag,
    /// Derived class name carried by the identifier
    pub class_name: Option<String>,
    /// `None` for indefinite lengths
    pub length: Option<usize>,
    /// Content of primitive values
    pub content: Vec<u8>,
    pub children: Vec<TlvNode>,
}

impl TlvNode {
    /// Number of TLVs in this subtree
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TlvNode::count).sum::<usize>()
    }

    fn describe_content(&self) -> String {
        let universal = |number| self.tag.class == TagClass::Universal && self.tag.number == number;
        let application = |number| self.tag.class == TagClass::Application && self.tag.number == number;

        if universal(tag::INTEGER) || universal(tag::ENUMERATED) {
            if let Ok(value) = codec::decode_int(&self.content) {
                return value.to_string();
            }
        }
        if application(tag::OBJECT_REFERENCE) {
            if let Ok(index) = codec::decode_uint(&self.content) {
                return format!("-> object {}", index);
            }
        }
        if universal(tag::BOOLEAN) {
            if let Ok(value) = codec::decode_bool(&self.content) {
                return value.to_string();
            }
        }
        if universal(tag::REAL) {
            if let Ok(value) = codec::decode_real(&self.content) {
                return value.to_string();
            }
        }
        let textual = universal(tag::VISIBLE_STRING)
            || universal(tag::GENERAL_STRING)
            || application(tag::STRING_STORE);
        if textual {
            if let Ok(text) = std::str::from_utf8(&self.content) {
                return format!("{:?}", text);
            }
        }
        hex_preview(&self.content)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:06} {:indent$}", self.offset, "", indent = depth * 2)?;
        match &self.class_name {
            Some(name) => write!(f, "[APPLICATION class {}]", name)?,
            None => write!(f, "{}", self.tag)?,
        }
        if let Some(name) = self.tag.universal_name() {
            write!(f, " {}", name)?;
        }
        match self.length {
            Some(length) => write!(f, " len={}", length)?,
            None => write!(f, " len=indefinite")?,
        }
        if !self.tag.constructed && !self.content.is_empty() {
            write!(f, " {}", self.describe_content())?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.render(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for TlvNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

fn hex_preview(bytes: &[u8]) -> String {
    const SHOWN: usize = 16;
    let mut text: String = bytes
        .iter()
        .take(SHOWN)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if bytes.len() > SHOWN {
        text.push_str(" ...");
    }
    text
}

/// Parse every top-level TLV in `data`
pub fn dump(data: &[u8]) -> Result<Vec<TlvNode>> {
    dump_with_config(data, &StreamConfig::default())
}

pub fn dump_with_config(data: &[u8], config: &StreamConfig) -> Result<Vec<TlvNode>> {
    let mut walker = Walker::new(data, config);
    let mut nodes = Vec::new();
    while !walker.reader.is_exhausted() {
        walker.path.push(nodes.len());
        let node = walker.node()?;
        walker.path.pop();
        nodes.push(node);
    }
    Ok(nodes)
}

/// Validate framing only; returns the number of TLVs
pub fn check(data: &[u8]) -> Result<usize> {
    check_with_config(data, &StreamConfig::default())
}

pub fn check_with_config(data: &[u8], config: &StreamConfig) -> Result<usize> {
    let mut reader = BerReader::new(data);
    let mut count = 0;
    while !reader.is_exhausted() {
        let tlvs = reader
            .skip_value(config.max_depth, config.max_length)
            .map_err(|kind| StreamError::new(kind, reader.position(), format!("#{}", count)))?;
        count += tlvs;
    }
    Ok(count)
}

struct Walker<'a> {
    reader: BerReader<'a>,
    max_depth: usize,
    max_length: usize,
    path: Vec<usize>,
}

impl<'a> Walker<'a> {
    fn new(data: &'a [u8], config: &StreamConfig) -> Self {
        Self {
            reader: BerReader::new(data),
            max_depth: config.max_depth,
            max_length: config.max_length,
            path: Vec::new(),
        }
    }

    fn error(&self, kind: ErrorKind) -> StreamError {
        let path = self
            .path
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("/");
        StreamError::new(kind, self.reader.position(), format!("#{}", path))
    }

    fn node(&mut self) -> Result<TlvNode> {
        self.node_inner().map_err(|kind| self.error(kind))
    }

    fn node_inner(&mut self) -> std::result::Result<TlvNode, ErrorKind> {
        if self.path.len() > self.max_depth {
            return Err(ErrorKind::LimitExceeded("nesting too deep".to_string()));
        }
        let offset = self.reader.position();
        let (tag, class_name) = if self.reader.at_class_name() {
            let name = self.reader.read_class_name()?;
            (Tag::application(0).constructed(), Some(name))
        } else {
            (self.reader.read_tag()?, None)
        };
        if tag.is_end_of_contents() {
            return Err(ErrorKind::format("unexpected end-of-contents"));
        }

        let mut node = TlvNode {
            offset,
            tag,
            class_name,
            length: None,
            content: Vec::new(),
            children: Vec::new(),
        };

        if !tag.constructed {
            node.content = self.reader.read_primitive(self.max_length)?.to_vec();
            node.length = Some(node.content.len());
            return Ok(node);
        }

        let end = self.reader.begin_constructed(self.max_length)?;
        if let End::Offset(offset) = end {
            node.length = Some(offset - self.reader.position());
        }
        while !self.reader.at_end(end)? {
            // left in place on error so the report points at the failure
            self.path.push(node.children.len());
            let child = self.node_inner()?;
            self.path.pop();
            node.children.push(child);
        }
        self.reader.finish(end)?;
        Ok(node)
    }
}
