//! Content octets of primitive values

use crate::error::ErrorKind;

/// Longest REAL content accepted or produced
pub const MAX_REAL_LENGTH: usize = 32;

const REAL_DECIMAL_NR3: u8 = 0x03;
const REAL_PLUS_INFINITY: u8 = 0x40;
const REAL_MINUS_INFINITY: u8 = 0x41;
const REAL_NOT_A_NUMBER: u8 = 0x42;

/// Minimal two's complement
pub fn encode_int(value: i64, out: &mut Vec<u8>) {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let (b, next) = (bytes[start], bytes[start + 1]);
        let redundant = (b == 0x00 && next & 0x80 == 0) || (b == 0xFF && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    out.extend_from_slice(&bytes[start..]);
}

/// Minimal big-endian, with a leading zero when the top bit is set
pub fn encode_uint(value: u64, out: &mut Vec<u8>) {
    let bytes = value.to_be_bytes();
    let start = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);
    if bytes[start] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[start..]);
}

pub fn decode_int(content: &[u8]) -> Result<i64, ErrorKind> {
    let (&first, _) = content
        .split_first()
        .ok_or_else(|| ErrorKind::format("zero-length integer"))?;
    let fill = if first & 0x80 != 0 { 0xFF } else { 0x00 };
    if content.len() > 8 {
        let (surplus, tail) = content.split_at(content.len() - 8);
        let sign_ok = (tail[0] & 0x80 != 0) == (fill == 0xFF);
        if !surplus.iter().all(|&b| b == fill) || !sign_ok {
            return Err(ErrorKind::Overflow(format!(
                "{}-byte integer does not fit 64 bits",
                content.len()
            )));
        }
        return Ok(i64::from_be_bytes(tail.try_into().unwrap_or([fill; 8])));
    }
    let mut bytes = [fill; 8];
    bytes[8 - content.len()..].copy_from_slice(content);
    Ok(i64::from_be_bytes(bytes))
}

pub fn decode_uint(content: &[u8]) -> Result<u64, ErrorKind> {
    let (&first, _) = content
        .split_first()
        .ok_or_else(|| ErrorKind::format("zero-length integer"))?;
    if first & 0x80 != 0 {
        return Err(ErrorKind::Overflow(
            "negative value for unsigned integer".to_string(),
        ));
    }
    let significant = &content[content.iter().take_while(|&&b| b == 0).count()..];
    if significant.len() > 8 {
        return Err(ErrorKind::Overflow(format!(
            "{}-byte integer does not fit 64 bits",
            content.len()
        )));
    }
    let mut bytes = [0u8; 8];
    bytes[8 - significant.len()..].copy_from_slice(significant);
    Ok(u64::from_be_bytes(bytes))
}

pub fn encode_bool(value: bool, out: &mut Vec<u8>) {
    out.push(if value { 0xFF } else { 0x00 });
}

pub fn decode_bool(content: &[u8]) -> Result<bool, ErrorKind> {
    match content {
        [b] => Ok(*b != 0),
        _ => Err(ErrorKind::format(format!(
            "BOOLEAN of length {}",
            content.len()
        ))),
    }
}

/// Decimal text form, or a single special-value byte
pub fn encode_real(value: f64, out: &mut Vec<u8>) {
    if value.is_nan() {
        out.push(REAL_NOT_A_NUMBER);
    } else if value == f64::INFINITY {
        out.push(REAL_PLUS_INFINITY);
    } else if value == f64::NEG_INFINITY {
        out.push(REAL_MINUS_INFINITY);
    } else {
        out.push(REAL_DECIMAL_NR3);
        // shortest text that parses back to the same bits
        out.extend_from_slice(format!("{:e}", value).as_bytes());
    }
}

pub fn decode_real(content: &[u8]) -> Result<f64, ErrorKind> {
    match content {
        [] => Ok(0.0),
        [REAL_PLUS_INFINITY] => Ok(f64::INFINITY),
        [REAL_MINUS_INFINITY] => Ok(f64::NEG_INFINITY),
        [REAL_NOT_A_NUMBER] => Ok(f64::NAN),
        [b] => Err(ErrorKind::format(format!("unknown REAL special value {:#04x}", b))),
        _ if content.len() > MAX_REAL_LENGTH => Err(ErrorKind::format(format!(
            "REAL of length {} exceeds {}",
            content.len(),
            MAX_REAL_LENGTH
        ))),
        [form, text @ ..] if (0x01..=REAL_DECIMAL_NR3).contains(form) => {
            let text = std::str::from_utf8(text)
                .map_err(|_| ErrorKind::format("REAL text is not ASCII"))?;
            text.trim()
                .parse::<f64>()
                .map_err(|_| ErrorKind::format(format!("bad REAL text {:?}", text)))
        }
        [form, ..] => Err(ErrorKind::format(format!(
            "unsupported REAL encoding {:#04x}",
            form
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn int_bytes(value: i64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_int(value, &mut out);
        out
    }

    fn uint_bytes(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_uint(value, &mut out);
        out
    }

    #[test]
    fn test_minimal_int_encoding() {
        assert_eq!(int_bytes(0), [0x00]);
        assert_eq!(int_bytes(127), [0x7F]);
        assert_eq!(int_bytes(128), [0x00, 0x80]);
        assert_eq!(int_bytes(-1), [0xFF]);
        assert_eq!(int_bytes(-128), [0x80]);
        assert_eq!(int_bytes(-129), [0xFF, 0x7F]);
        assert_eq!(int_bytes(i64::MIN).len(), 8);
    }

    #[test]
    fn test_uint_leading_zero() {
        assert_eq!(uint_bytes(0), [0x00]);
        assert_eq!(uint_bytes(0x80), [0x00, 0x80]);
        assert_eq!(uint_bytes(u64::MAX).len(), 9);
    }

    #[test]
    fn test_int_errors() {
        assert!(matches!(decode_int(&[]), Err(ErrorKind::Format(_))));
        assert!(matches!(
            decode_int(&[0x01, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(ErrorKind::Overflow(_))
        ));
        // redundant sign bytes are tolerated
        assert_eq!(decode_int(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]).unwrap(), -2);
        assert!(matches!(decode_uint(&[0x80]), Err(ErrorKind::Overflow(_))));
    }

    #[test]
    fn test_real_special_values() {
        let mut out = Vec::new();
        encode_real(f64::NEG_INFINITY, &mut out);
        assert_eq!(out, [0x41]);
        assert!(decode_real(&[0x42]).unwrap().is_nan());
        assert_eq!(decode_real(&[0x40]).unwrap(), f64::INFINITY);
        assert!(decode_real(&[0x43]).is_err());
    }

    #[test]
    fn test_real_text() {
        let mut out = Vec::new();
        encode_real(1.5, &mut out);
        assert_eq!(out[0], 0x03);
        assert_eq!(&out[1..], b"1.5e0");
        assert_eq!(decode_real(b"\x03-2.5e3").unwrap(), -2500.0);

        let mut long = vec![0x03];
        long.extend(std::iter::repeat(b'1').take(40));
        assert!(decode_real(&long).is_err());
    }

    #[test]
    fn test_bool_content() {
        assert!(decode_bool(&[0x01]).unwrap());
        assert!(!decode_bool(&[0x00]).unwrap());
        assert!(decode_bool(&[]).is_err());
    }

    #[quickcheck]
    fn prop_int_round_trip(value: i64) -> bool {
        let bytes = int_bytes(value);
        bytes.len() <= 8 && decode_int(&bytes).ok() == Some(value)
    }

    #[quickcheck]
    fn prop_uint_round_trip(value: u64) -> bool {
        decode_uint(&uint_bytes(value)).ok() == Some(value)
    }

    #[quickcheck]
    fn prop_int_is_minimal(value: i64) -> bool {
        let bytes = int_bytes(value);
        match bytes.as_slice() {
            [a, b, ..] => !((*a == 0 && b & 0x80 == 0) || (*a == 0xFF && b & 0x80 != 0)),
            _ => true,
        }
    }

    #[quickcheck]
    fn prop_real_round_trip(value: f64) -> bool {
        let mut out = Vec::new();
        encode_real(value, &mut out);
        let back = decode_real(&out);
        out.len() <= MAX_REAL_LENGTH
            && match back {
                Ok(back) => back.to_bits() == value.to_bits() || (value.is_nan() && back.is_nan()),
                Err(_) => false,
            }
    }
}
