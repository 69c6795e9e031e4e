//! BER identifiers and lengths
//!
//! ```text
//! identifier   8 7 | 6 | 5 4 3 2 1
//!              class | C | number (0x1F = long form follows)
//! long form    1nnnnnnn ... 0nnnnnnn      base-128, high bit = more
//! length       0lllllll                   short
//!              1000 0000                  indefinite, ends with 00 00
//!              1kkk kkkk + k bytes        long, big-endian
//! ```

use std::fmt;

/// Tag class, already shifted into the identifier bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal = 0x00,
    Application = 0x40,
    ContextSpecific = 0x80,
    Private = 0xC0,
}

impl TagClass {
    pub fn from_identifier(byte: u8) -> Self {
        match byte & 0xC0 {
            0x00 => TagClass::Universal,
            0x40 => TagClass::Application,
            0x80 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for TagClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TagClass::Universal => "UNIVERSAL",
            TagClass::Application => "APPLICATION",
            TagClass::ContextSpecific => "CONTEXT",
            TagClass::Private => "PRIVATE",
        })
    }
}

/// Constructed bit
pub const CONSTRUCTED: u8 = 0x20;
/// Low bits announcing a long-form number
pub const LONG_FORM: u8 = 0x1F;
/// Length byte of an indefinite length
pub const INDEFINITE: u8 = 0x80;
/// Identifier byte of a pointer to an object of a derived class;
/// the long-form bytes spell the class name
pub const CLASS_NAME_IDENTIFIER: u8 = 0x40 | CONSTRUCTED | LONG_FORM;

// Universal tag numbers
pub const BOOLEAN: u32 = 1;
pub const INTEGER: u32 = 2;
pub const OCTET_STRING: u32 = 4;
pub const NULL: u32 = 5;
pub const REAL: u32 = 9;
pub const ENUMERATED: u32 = 10;
pub const SEQUENCE: u32 = 16;
pub const SET: u32 = 17;
pub const VISIBLE_STRING: u32 = 26;
pub const GENERAL_STRING: u32 = 27;

// Application tag numbers
pub const STRING_STORE: u32 = 1;
pub const OBJECT_REFERENCE: u32 = 2;

/// A decoded identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: TagClass,
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    pub const fn universal(number: u32) -> Self {
        Self {
            class: TagClass::Universal,
            constructed: false,
            number,
        }
    }

    pub const fn application(number: u32) -> Self {
        Self {
            class: TagClass::Application,
            constructed: false,
            number,
        }
    }

    pub const fn context(number: u32) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            constructed: true,
            number,
        }
    }

    pub const fn constructed(mut self) -> Self {
        self.constructed = true;
        self
    }

    /// End-of-contents marker (`00 00` with its length byte)
    pub fn is_end_of_contents(&self) -> bool {
        self.class == TagClass::Universal && !self.constructed && self.number == 0
    }

    /// Append the identifier bytes to `out`
    pub fn encode(&self, out: &mut Vec<u8>) {
        let first = self.class.bits() | if self.constructed { CONSTRUCTED } else { 0 };
        if self.number < LONG_FORM as u32 {
            out.push(first | self.number as u8);
        } else {
            out.push(first | LONG_FORM);
            encode_base128(self.number as u64, out);
        }
    }

    /// Name of a universal tag
    pub fn universal_name(&self) -> Option<&'static str> {
        if self.class != TagClass::Universal {
            return None;
        }
        Some(match self.number {
            0 => "end-of-contents",
            BOOLEAN => "BOOLEAN",
            INTEGER => "INTEGER",
            OCTET_STRING => "OCTET STRING",
            NULL => "NULL",
            REAL => "REAL",
            ENUMERATED => "ENUMERATED",
            SEQUENCE => "SEQUENCE",
            SET => "SET",
            VISIBLE_STRING => "VisibleString",
            GENERAL_STRING => "GeneralString",
            _ => return None,
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            TagClass::ContextSpecific => write!(f, "[{}]", self.number),
            class => write!(f, "[{} {}]", class, self.number),
        }
    }
}

/// Base-128 with the continuation bit on every byte but the last
pub fn encode_base128(mut value: u64, out: &mut Vec<u8>) {
    let mut groups = [0u8; 10];
    let mut count = 0;
    loop {
        groups[count] = (value & 0x7F) as u8;
        count += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        let more = if i > 0 { 0x80 } else { 0 };
        out.push(groups[i] | more);
    }
}

/// Long-form identifier bytes spelling an ASCII class name
///
/// Returns `None` for empty or non-ASCII names.
pub fn encode_class_name(name: &str, out: &mut Vec<u8>) -> Option<()> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || !bytes.is_ascii() {
        return None;
    }
    out.push(CLASS_NAME_IDENTIFIER);
    let last = bytes.len() - 1;
    for (i, &b) in bytes.iter().enumerate() {
        out.push(if i < last { b | 0x80 } else { b });
    }
    Some(())
}

/// Append a definite length
pub fn encode_length(length: usize, out: &mut Vec<u8>) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let bytes = (length as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}
