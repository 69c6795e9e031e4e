//! TLV reader over an in-memory buffer

use std::borrow::Cow;

use super::tag::{Tag, TagClass, CLASS_NAME_IDENTIFIER, CONSTRUCTED, INDEFINITE, LONG_FORM};
use crate::error::ErrorKind;

/// A decoded length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Definite(usize),
    Indefinite,
}

/// Where a constructed value ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    /// At the next end-of-contents marker
    Marker,
    /// At this absolute offset
    Offset(usize),
}

pub struct BerReader<'a> {
    data: Cow<'a, [u8]>,
    pos: usize,
}

impl<'a> BerReader<'a> {
    pub fn new(data: impl Into<Cow<'a, [u8]>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn next_byte(&mut self) -> Result<u8, ErrorKind> {
        let byte = self.peek_byte().ok_or(ErrorKind::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_tag(&mut self) -> Result<Tag, ErrorKind> {
        let first = self.next_byte()?;
        let class = TagClass::from_identifier(first);
        let constructed = first & CONSTRUCTED != 0;
        let mut number = (first & LONG_FORM) as u32;
        if number == LONG_FORM as u32 {
            number = 0;
            loop {
                let byte = self.next_byte()?;
                number = number
                    .checked_mul(128)
                    .map(|n| n | (byte & 0x7F) as u32)
                    .ok_or_else(|| ErrorKind::Overflow("tag number too large".to_string()))?;
                if byte & 0x80 == 0 {
                    break;
                }
            }
        }
        Ok(Tag {
            class,
            constructed,
            number,
        })
    }

    pub fn peek_tag(&mut self) -> Result<Tag, ErrorKind> {
        let start = self.pos;
        let tag = self.read_tag();
        self.pos = start;
        tag
    }

    /// Check if the next identifier names a derived class
    pub fn at_class_name(&self) -> bool {
        self.peek_byte() == Some(CLASS_NAME_IDENTIFIER)
    }

    /// Read a class-name identifier and return the name
    pub fn read_class_name(&mut self) -> Result<String, ErrorKind> {
        if self.next_byte()? != CLASS_NAME_IDENTIFIER {
            return Err(ErrorKind::format("expected class name tag"));
        }
        let mut name = String::new();
        loop {
            let byte = self.next_byte()?;
            name.push((byte & 0x7F) as char);
            if byte & 0x80 == 0 {
                return Ok(name);
            }
        }
    }

    pub fn read_length(&mut self, max_length: usize) -> Result<Length, ErrorKind> {
        let first = self.next_byte()?;
        let length = match first {
            0..=0x7F => first as usize,
            INDEFINITE => return Ok(Length::Indefinite),
            0x81..=0x88 => {
                let count = (first & 0x7F) as usize;
                let mut value: u64 = 0;
                for _ in 0..count {
                    value = (value << 8) | self.next_byte()? as u64;
                }
                usize::try_from(value)
                    .map_err(|_| ErrorKind::Overflow(format!("length {} too large", value)))?
            }
            _ => {
                return Err(ErrorKind::format(format!(
                    "invalid length byte {:#04x}",
                    first
                )))
            }
        };
        if length > max_length {
            return Err(ErrorKind::LimitExceeded(format!(
                "length {} exceeds max_length {}",
                length, max_length
            )));
        }
        Ok(Length::Definite(length))
    }

    /// Read a definite length and return that many content bytes
    pub fn read_primitive(&mut self, max_length: usize) -> Result<&[u8], ErrorKind> {
        match self.read_length(max_length)? {
            Length::Definite(length) => self.read_content(length),
            Length::Indefinite => Err(ErrorKind::format("indefinite length on primitive value")),
        }
    }

    pub fn read_content(&mut self, length: usize) -> Result<&[u8], ErrorKind> {
        if length > self.remaining() {
            return Err(ErrorKind::UnexpectedEof);
        }
        let start = self.pos;
        self.pos += length;
        Ok(&self.data[start..self.pos])
    }

    /// Read the length of a constructed value and work out where it ends
    pub fn begin_constructed(&mut self, max_length: usize) -> Result<End, ErrorKind> {
        match self.read_length(max_length)? {
            Length::Indefinite => Ok(End::Marker),
            Length::Definite(length) if length <= self.remaining() => {
                Ok(End::Offset(self.pos + length))
            }
            Length::Definite(_) => Err(ErrorKind::UnexpectedEof),
        }
    }

    /// Check if the constructed value ending at `end` has no more content
    pub fn at_end(&self, end: End) -> Result<bool, ErrorKind> {
        match end {
            End::Marker => match self.data.get(self.pos..).unwrap_or_default() {
                [0, 0, ..] => Ok(true),
                [] | [0] => Err(ErrorKind::UnexpectedEof),
                _ => Ok(false),
            },
            End::Offset(offset) if self.pos > offset => {
                Err(ErrorKind::format("value overruns its container"))
            }
            End::Offset(offset) => Ok(self.pos == offset),
        }
    }

    /// Consume the end of a constructed value
    pub fn finish(&mut self, end: End) -> Result<(), ErrorKind> {
        match end {
            End::Marker => match self.data.get(self.pos..self.pos + 2) {
                Some([0, 0]) => {
                    self.pos += 2;
                    Ok(())
                }
                Some(_) => Err(ErrorKind::format("expected end-of-contents")),
                None => Err(ErrorKind::UnexpectedEof),
            },
            End::Offset(offset) if self.pos == offset => Ok(()),
            End::Offset(_) => Err(ErrorKind::format("constructed value length mismatch")),
        }
    }

    /// Skip one complete TLV, returning how many TLVs it held
    pub fn skip_value(&mut self, max_depth: usize, max_length: usize) -> Result<usize, ErrorKind> {
        if max_depth == 0 {
            return Err(ErrorKind::LimitExceeded("nesting too deep".to_string()));
        }
        let tag = if self.at_class_name() {
            self.read_class_name()?;
            Tag::application(0).constructed()
        } else {
            self.read_tag()?
        };
        if tag.is_end_of_contents() {
            return Err(ErrorKind::format("unexpected end-of-contents"));
        }
        if !tag.constructed {
            self.read_primitive(max_length)?;
            return Ok(1);
        }
        let end = self.begin_constructed(max_length)?;
        let mut count = 1;
        while !self.at_end(end)? {
            count += self.skip_value(max_depth - 1, max_length)?;
        }
        self.finish(end)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::tag::{encode_length, INTEGER};
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_read_short_and_long_tags() {
        let mut reader = BerReader::new(&[0x02, 0xBF, 0x81, 0x48][..]);
        assert_eq!(reader.read_tag().unwrap(), Tag::universal(INTEGER));
        assert_eq!(reader.read_tag().unwrap(), Tag::context(200));
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_truncated_long_tag() {
        let mut reader = BerReader::new(&[0x1F, 0x81][..]);
        assert!(matches!(reader.read_tag(), Err(ErrorKind::UnexpectedEof)));
    }

    #[test]
    fn test_oversized_tag_number() {
        let mut reader = BerReader::new(&[0x1F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F][..]);
        assert!(matches!(reader.read_tag(), Err(ErrorKind::Overflow(_))));
    }

    #[test]
    fn test_class_name() {
        let mut reader = BerReader::new(&[0x7F, b'N' | 0x80, b'o' | 0x80, b'd' | 0x80, b'e'][..]);
        assert!(reader.at_class_name());
        assert_eq!(reader.read_class_name().unwrap(), "Node");
    }

    #[test]
    fn test_length_forms() {
        let mut reader = BerReader::new(&[0x05, 0x80, 0x82, 0x01, 0x00, 0x89][..]);
        assert_eq!(reader.read_length(usize::MAX).unwrap(), Length::Definite(5));
        assert_eq!(reader.read_length(usize::MAX).unwrap(), Length::Indefinite);
        assert_eq!(reader.read_length(usize::MAX).unwrap(), Length::Definite(256));
        assert!(matches!(
            reader.read_length(usize::MAX),
            Err(ErrorKind::Format(_))
        ));
    }

    #[test]
    fn test_length_limit() {
        let mut reader = BerReader::new(&[0x82, 0x10, 0x00][..]);
        assert!(matches!(
            reader.read_length(100),
            Err(ErrorKind::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_primitive_past_end() {
        let mut reader = BerReader::new(&[0x04, 0x05, 0x01][..]);
        reader.read_tag().unwrap();
        assert!(matches!(
            reader.read_primitive(usize::MAX),
            Err(ErrorKind::UnexpectedEof)
        ));
    }

    #[test]
    fn test_skip_mixed_lengths() {
        // SEQUENCE (indefinite) { INTEGER 1, SEQUENCE (definite) { NULL } }
        let data = [0x30, 0x80, 0x02, 0x01, 0x01, 0x30, 0x02, 0x05, 0x00, 0x00, 0x00];
        let mut reader = BerReader::new(&data[..]);
        assert_eq!(reader.skip_value(8, usize::MAX).unwrap(), 4);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_skip_depth_limit() {
        let data = [0x30, 0x80, 0x30, 0x80, 0x00, 0x00, 0x00, 0x00];
        let mut reader = BerReader::new(&data[..]);
        assert!(matches!(
            reader.skip_value(1, usize::MAX),
            Err(ErrorKind::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_definite_overrun() {
        // outer claims 2 bytes but the inner value is 3
        let data = [0x30, 0x02, 0x02, 0x01, 0x01];
        let mut reader = BerReader::new(&data[..]);
        reader.read_tag().unwrap();
        let end = reader.begin_constructed(usize::MAX).unwrap();
        assert_eq!(end, End::Offset(4));
        reader.skip_value(4, usize::MAX).unwrap();
        assert!(reader.at_end(end).is_err());
    }

    #[test]
    fn test_skip_class_name_wrapper() {
        let mut data = vec![0x7F];
        data.extend(b"Derived"[..6].iter().map(|b| b | 0x80));
        data.extend_from_slice(&[b'd', 0x80, 0x05, 0x00, 0x00, 0x00]);
        let mut reader = BerReader::new(&data[..]);
        assert_eq!(reader.skip_value(4, usize::MAX).unwrap(), 2);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_lone_zero_before_marker_is_eof() {
        let reader = BerReader::new(&[0x00][..]);
        assert!(matches!(
            reader.at_end(End::Marker),
            Err(ErrorKind::UnexpectedEof)
        ));
    }

    #[quickcheck]
    fn prop_length_round_trip(length: usize) -> bool {
        let mut out = Vec::new();
        encode_length(length, &mut out);
        let mut reader = BerReader::new(out);
        reader.read_length(usize::MAX).ok() == Some(Length::Definite(length))
            && reader.is_exhausted()
    }
}
