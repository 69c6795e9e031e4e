//! Buffered TLV writer

use std::io::Write;

use super::codec;
use super::tag::{self, Tag, INDEFINITE};
use crate::error::ErrorKind;

const FLUSH_THRESHOLD: usize = 16 * 1024;

/// Writes identifiers, lengths and contents to an `io::Write`
pub struct BerWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
    /// Bytes already handed to `inner`
    flushed: usize,
    scratch: Vec<u8>,
}

impl<W: Write> BerWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(FLUSH_THRESHOLD),
            flushed: 0,
            scratch: Vec::new(),
        }
    }

    /// Total bytes produced, buffered or not
    pub fn position(&self) -> usize {
        self.flushed + self.buffer.len()
    }

    fn spill(&mut self) -> Result<(), ErrorKind> {
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<(), ErrorKind> {
        self.inner.write_all(&self.buffer)?;
        self.flushed += self.buffer.len();
        self.buffer.clear();
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ErrorKind> {
        self.flush_buffer()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and return the sink
    pub fn into_inner(mut self) -> Result<W, ErrorKind> {
        self.flush()?;
        Ok(self.inner)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn write_tag(&mut self, tag: Tag) -> Result<(), ErrorKind> {
        tag.encode(&mut self.buffer);
        self.spill()
    }

    /// Identifier of an object of a derived class, with an indefinite length
    pub fn begin_class_name(&mut self, name: &str) -> Result<(), ErrorKind> {
        if tag::encode_class_name(name, &mut self.buffer).is_none() {
            return Err(ErrorKind::IllegalCall(format!(
                "class name {:?} cannot be written as a tag",
                name
            )));
        }
        self.buffer.push(INDEFINITE);
        self.spill()
    }

    /// Identifier plus indefinite length
    pub fn begin_constructed(&mut self, tag: Tag) -> Result<(), ErrorKind> {
        debug_assert!(tag.constructed);
        tag.encode(&mut self.buffer);
        self.buffer.push(INDEFINITE);
        self.spill()
    }

    pub fn end_of_contents(&mut self) -> Result<(), ErrorKind> {
        self.buffer.extend_from_slice(&[0, 0]);
        self.spill()
    }

    /// Identifier, definite length and contents
    pub fn write_primitive(&mut self, tag: Tag, content: &[u8]) -> Result<(), ErrorKind> {
        tag.encode(&mut self.buffer);
        tag::encode_length(content.len(), &mut self.buffer);
        self.buffer.extend_from_slice(content);
        self.spill()
    }

    fn write_scratch(&mut self, tag: Tag) -> Result<(), ErrorKind> {
        let content = std::mem::take(&mut self.scratch);
        let result = self.write_primitive(tag, &content);
        self.scratch = content;
        self.scratch.clear();
        result
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), ErrorKind> {
        self.scratch.clear();
        codec::encode_bool(value, &mut self.scratch);
        self.write_scratch(Tag::universal(tag::BOOLEAN))
    }

    pub fn write_int(&mut self, tag: Tag, value: i64) -> Result<(), ErrorKind> {
        self.scratch.clear();
        codec::encode_int(value, &mut self.scratch);
        self.write_scratch(tag)
    }

    pub fn write_uint(&mut self, tag: Tag, value: u64) -> Result<(), ErrorKind> {
        self.scratch.clear();
        codec::encode_uint(value, &mut self.scratch);
        self.write_scratch(tag)
    }

    pub fn write_real(&mut self, value: f64) -> Result<(), ErrorKind> {
        self.scratch.clear();
        codec::encode_real(value, &mut self.scratch);
        self.write_scratch(Tag::universal(tag::REAL))
    }

    pub fn write_null(&mut self) -> Result<(), ErrorKind> {
        self.write_primitive(Tag::universal(tag::NULL), &[])
    }
}
