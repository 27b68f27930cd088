//! Encoding: `K` values → Q IPC frames.

use bytes::BufMut;

use super::{compress, MessageType};
use crate::error::KxError;
use crate::types::{code, Attr, K, KData};

/// Encodes a complete framed message.
///
/// The body is always little-endian. The finished frame is offered to the
/// compressor; when the payload shrinks below half its raw size the
/// compressed frame is returned instead. Values that cannot be framed
/// losslessly (symbols with interior NUL octets, dictionaries or tables
/// with mismatched lengths) are rejected rather than written corrupt.
pub fn encode(msg_type: MessageType, value: &K) -> Result<Vec<u8>, KxError> {
    let mut frame = Vec::with_capacity(64);
    frame.put_u8(1); // little-endian body
    frame.put_u8(msg_type as u8);
    frame.put_u8(0); // compressed flag, set by the compressor
    frame.put_u8(0); // reserved
    frame.put_u32_le(0); // length, patched below
    encode_value(&mut frame, value)?;
    let len = frame.len() as u32;
    frame[4..8].copy_from_slice(&len.to_le_bytes());
    Ok(match compress::compress(&frame) {
        Some(compressed) => compressed,
        None => frame,
    })
}

/// Encodes one value (type code plus payload) into the buffer.
pub fn encode_value(buf: &mut Vec<u8>, value: &K) -> Result<(), KxError> {
    match &value.data {
        KData::Bool(x) => {
            buf.put_i8(-code::BOOLEAN);
            buf.put_u8(*x as u8);
        }
        KData::Guid(x) => {
            buf.put_i8(-code::GUID);
            buf.put_slice(x.as_bytes());
        }
        KData::Byte(x) => {
            buf.put_i8(-code::BYTE);
            buf.put_u8(*x);
        }
        KData::Short(x) => {
            buf.put_i8(-code::SHORT);
            buf.put_i16_le(*x);
        }
        KData::Int(x) => {
            buf.put_i8(-code::INT);
            buf.put_i32_le(*x);
        }
        KData::Long(x) => {
            buf.put_i8(-code::LONG);
            buf.put_i64_le(*x);
        }
        KData::Real(x) => {
            buf.put_i8(-code::REAL);
            buf.put_f32_le(*x);
        }
        KData::Float(x) => {
            buf.put_i8(-code::FLOAT);
            buf.put_f64_le(*x);
        }
        KData::Char(x) => {
            buf.put_i8(-code::CHAR);
            buf.put_u8(*x);
        }
        KData::Symbol(s) => {
            buf.put_i8(-code::SYMBOL);
            put_symbol(buf, s)?;
        }
        KData::Timestamp(x) => {
            buf.put_i8(-code::TIMESTAMP);
            buf.put_i64_le(x.0);
        }
        KData::Month(x) => {
            buf.put_i8(-code::MONTH);
            buf.put_i32_le(x.0);
        }
        KData::Date(x) => {
            buf.put_i8(-code::DATE);
            buf.put_i32_le(x.0);
        }
        KData::Datetime(x) => {
            buf.put_i8(-code::DATETIME);
            buf.put_f64_le(x.0);
        }
        KData::Timespan(x) => {
            buf.put_i8(-code::TIMESPAN);
            buf.put_i64_le(x.0);
        }
        KData::Minute(x) => {
            buf.put_i8(-code::MINUTE);
            buf.put_i32_le(x.0);
        }
        KData::Second(x) => {
            buf.put_i8(-code::SECOND);
            buf.put_i32_le(x.0);
        }
        KData::Time(x) => {
            buf.put_i8(-code::TIME);
            buf.put_i32_le(x.0);
        }

        KData::BoolVec(v) => {
            put_vec_header(buf, code::BOOLEAN, value.attr, v.len());
            for x in v {
                buf.put_u8(*x as u8);
            }
        }
        KData::GuidVec(v) => {
            put_vec_header(buf, code::GUID, value.attr, v.len());
            for x in v {
                buf.put_slice(x.as_bytes());
            }
        }
        KData::ByteVec(v) => {
            put_vec_header(buf, code::BYTE, value.attr, v.len());
            buf.put_slice(v);
        }
        KData::ShortVec(v) => {
            put_vec_header(buf, code::SHORT, value.attr, v.len());
            for x in v {
                buf.put_i16_le(*x);
            }
        }
        KData::IntVec(v) => {
            put_vec_header(buf, code::INT, value.attr, v.len());
            for x in v {
                buf.put_i32_le(*x);
            }
        }
        KData::LongVec(v) => {
            put_vec_header(buf, code::LONG, value.attr, v.len());
            for x in v {
                buf.put_i64_le(*x);
            }
        }
        KData::RealVec(v) => {
            put_vec_header(buf, code::REAL, value.attr, v.len());
            for x in v {
                buf.put_f32_le(*x);
            }
        }
        KData::FloatVec(v) => {
            put_vec_header(buf, code::FLOAT, value.attr, v.len());
            for x in v {
                buf.put_f64_le(*x);
            }
        }
        KData::CharVec(s) => {
            put_vec_header(buf, code::CHAR, value.attr, s.len());
            buf.put_slice(s.as_bytes());
        }
        KData::SymbolVec(v) => {
            put_vec_header(buf, code::SYMBOL, value.attr, v.len());
            for s in v {
                put_symbol(buf, s)?;
            }
        }
        KData::TimestampVec(v) => {
            put_vec_header(buf, code::TIMESTAMP, value.attr, v.len());
            for x in v {
                buf.put_i64_le(x.0);
            }
        }
        KData::MonthVec(v) => {
            put_vec_header(buf, code::MONTH, value.attr, v.len());
            for x in v {
                buf.put_i32_le(x.0);
            }
        }
        KData::DateVec(v) => {
            put_vec_header(buf, code::DATE, value.attr, v.len());
            for x in v {
                buf.put_i32_le(x.0);
            }
        }
        KData::DatetimeVec(v) => {
            put_vec_header(buf, code::DATETIME, value.attr, v.len());
            for x in v {
                buf.put_f64_le(x.0);
            }
        }
        KData::TimespanVec(v) => {
            put_vec_header(buf, code::TIMESPAN, value.attr, v.len());
            for x in v {
                buf.put_i64_le(x.0);
            }
        }
        KData::MinuteVec(v) => {
            put_vec_header(buf, code::MINUTE, value.attr, v.len());
            for x in v {
                buf.put_i32_le(x.0);
            }
        }
        KData::SecondVec(v) => {
            put_vec_header(buf, code::SECOND, value.attr, v.len());
            for x in v {
                buf.put_i32_le(x.0);
            }
        }
        KData::TimeVec(v) => {
            put_vec_header(buf, code::TIME, value.attr, v.len());
            for x in v {
                buf.put_i32_le(x.0);
            }
        }

        KData::Mixed(items) => {
            put_vec_header(buf, code::MIXED, value.attr, items.len());
            for item in items {
                encode_value(buf, item)?;
            }
        }
        KData::Dict(d) => {
            if d.key.len() != d.value.len() {
                return Err(KxError::BadMessage(
                    "dictionary key/value length mismatch".into(),
                ));
            }
            // A sorted dictionary takes the distinguished code; the layout
            // is the same. No attribute byte in either form.
            if value.attr == Attr::Sorted {
                buf.put_i8(code::SORTED_DICT);
            } else {
                buf.put_i8(code::DICT);
            }
            encode_value(buf, &d.key)?;
            encode_value(buf, &d.value)?;
        }
        KData::Table(t) => {
            if t.columns.len() != t.data.len() {
                return Err(KxError::BadMessage("table column count mismatch".into()));
            }
            let rows = t.rows();
            if t.data.iter().any(|column| column.len() != rows) {
                return Err(KxError::BadMessage(
                    "table columns have unequal lengths".into(),
                ));
            }
            buf.put_i8(code::TABLE);
            buf.put_u8(value.attr.to_wire());
            buf.put_i8(code::DICT);
            encode_value(buf, &K::symbol_vec(t.columns.clone()))?;
            put_vec_header(buf, code::MIXED, Attr::None, t.data.len());
            for column in &t.data {
                encode_value(buf, column)?;
            }
        }
        KData::Lambda(l) => {
            buf.put_i8(code::LAMBDA);
            put_symbol(buf, &l.namespace)?;
            put_vec_header(buf, code::CHAR, Attr::None, l.body.len());
            buf.put_slice(l.body.as_bytes());
        }
        KData::UnaryPrimitive(idx) => {
            buf.put_i8(code::UNARY_PRIMITIVE);
            buf.put_u8(*idx);
        }
        KData::BinaryPrimitive(idx) => {
            buf.put_i8(code::BINARY_PRIMITIVE);
            buf.put_u8(*idx);
        }
        KData::TernaryPrimitive(idx) => {
            buf.put_i8(code::TERNARY_PRIMITIVE);
            buf.put_u8(*idx);
        }
        KData::Projection(children) => {
            buf.put_i8(code::PROJECTION);
            buf.put_u32_le(children.len() as u32);
            for child in children {
                encode_value(buf, child)?;
            }
        }
        KData::Composition(children) => {
            buf.put_i8(code::COMPOSITION);
            buf.put_u32_le(children.len() as u32);
            for child in children {
                encode_value(buf, child)?;
            }
        }
        KData::Adverb(kind, inner) => {
            buf.put_i8(kind.code());
            encode_value(buf, inner)?;
        }
        KData::Error(msg) => {
            buf.put_i8(code::ERROR);
            put_symbol(buf, msg)?;
        }
    }
    Ok(())
}

fn put_vec_header(buf: &mut Vec<u8>, type_code: i8, attr: Attr, len: usize) {
    buf.put_i8(type_code);
    buf.put_u8(attr.to_wire());
    buf.put_u32_le(len as u32);
}

/// Octets followed by the zero terminator. An interior NUL would truncate
/// the symbol on the wire and shift every field a peer reads after it.
fn put_symbol(buf: &mut Vec<u8>, s: &str) -> Result<(), KxError> {
    if s.as_bytes().contains(&0) {
        return Err(KxError::BadMessage("symbol contains a NUL octet".into()));
    }
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_bool_atom() {
        let frame = encode(MessageType::Async, &K::bool(false)).expect("encode");
        assert_eq!(
            frame,
            [0x01, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0xff, 0x00]
        );
    }

    #[test]
    fn encode_int_atom() {
        let frame = encode(MessageType::Async, &K::int(1)).expect("encode");
        assert_eq!(
            frame,
            [0x01, 0x00, 0x00, 0x00, 0x0d, 0x00, 0x00, 0x00, 0xfa, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn encode_enlisted_int() {
        let frame = encode(MessageType::Async, &K::int_vec(vec![1])).expect("encode");
        assert_eq!(
            frame,
            [
                0x01, 0x00, 0x00, 0x00, 0x12, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x00,
                0x00, 0x01, 0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn encode_char_vector() {
        let frame = encode(MessageType::Async, &K::string("GOOG")).expect("encode");
        assert_eq!(
            frame,
            [
                0x01, 0x00, 0x00, 0x00, 0x12, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x04, 0x00, 0x00,
                0x00, 0x47, 0x4f, 0x4f, 0x47
            ]
        );
    }

    #[test]
    fn encode_byte_vector() {
        let frame = encode(MessageType::Async, &K::byte_vec(vec![0, 1, 2, 3, 4])).expect("encode");
        assert_eq!(
            frame,
            [
                0x01, 0x00, 0x00, 0x00, 0x13, 0x00, 0x00, 0x00, 0x04, 0x00, 0x05, 0x00, 0x00,
                0x00, 0x00, 0x01, 0x02, 0x03, 0x04
            ]
        );
    }

    #[test]
    fn encode_symbol_vector() {
        let frame = encode(
            MessageType::Async,
            &K::symbol_vec(vec!["abc".into(), "bc".into(), "c".into()]),
        )
        .expect("encode");
        assert_eq!(
            frame,
            [
                0x01, 0x00, 0x00, 0x00, 0x17, 0x00, 0x00, 0x00, 0x0b, 0x00, 0x03, 0x00, 0x00,
                0x00, 0x61, 0x62, 0x63, 0x00, 0x62, 0x63, 0x00, 0x63, 0x00
            ]
        );
    }

    #[test]
    fn encode_dict() {
        // `a`b!2 3
        let frame = encode(
            MessageType::Async,
            &K::dict(
                K::symbol_vec(vec!["a".into(), "b".into()]),
                K::int_vec(vec![2, 3]),
            ),
        )
        .expect("encode");
        assert_eq!(
            frame,
            [
                0x01, 0x00, 0x00, 0x00, 0x21, 0x00, 0x00, 0x00, 0x63, 0x0b, 0x00, 0x02, 0x00,
                0x00, 0x00, 0x61, 0x00, 0x62, 0x00, 0x06, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02,
                0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn encode_sorted_dict_uses_distinguished_code() {
        let dict = K::dict(
            K::symbol_vec(vec!["a".into()]),
            K::int_vec(vec![1]),
        )
        .with_attr(Attr::Sorted);
        let frame = encode(MessageType::Async, &dict).expect("encode");
        assert_eq!(frame[8] as i8, 127);
    }

    #[test]
    fn encode_error_atom() {
        let frame = encode(MessageType::Async, &K::error("type")).expect("encode");
        assert_eq!(
            frame,
            [
                0x01, 0x00, 0x00, 0x00, 0x0e, 0x00, 0x00, 0x00, 0x80, 0x74, 0x79, 0x70, 0x65,
                0x00
            ]
        );
    }

    #[test]
    fn encode_lambda() {
        // Root namespace: empty string + NUL, then the body as a char vector.
        let frame = encode(MessageType::Async, &K::lambda("", "{x+y}")).expect("encode");
        assert_eq!(
            frame,
            [
                0x01, 0x00, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x64, 0x00, 0x0a, 0x00, 0x05,
                0x00, 0x00, 0x00, 0x7b, 0x78, 0x2b, 0x79, 0x7d
            ]
        );
    }

    #[test]
    fn encode_sync_class_in_header() {
        let frame = encode(MessageType::Sync, &K::int(1)).expect("encode");
        assert_eq!(frame[1], 1);
        let frame = encode(MessageType::Response, &K::int(1)).expect("encode");
        assert_eq!(frame[1], 2);
    }

    #[test]
    fn large_repetitive_payload_is_compressed() {
        let frame = encode(MessageType::Async, &K::bool_vec(vec![true; 2000])).expect("encode");
        assert_eq!(frame[2], 1);
        assert_eq!(frame.len(), 38);
        let total = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
        assert_eq!(total as usize, frame.len());
    }

    #[test]
    fn vector_attr_is_carried() {
        let frame = encode(
            MessageType::Async,
            &K::int_vec(vec![1, 2, 3]).with_attr(Attr::Sorted),
        )
        .expect("encode");
        assert_eq!(frame[9], 1);
    }

    #[test]
    fn symbol_with_interior_nul_is_rejected() {
        assert!(encode(MessageType::Async, &K::symbol("a\0b")).is_err());
        assert!(encode(
            MessageType::Async,
            &K::symbol_vec(vec!["ok".into(), "a\0b".into()])
        )
        .is_err());
        assert!(encode(MessageType::Async, &K::error("a\0b")).is_err());
        assert!(encode(MessageType::Async, &K::lambda("a\0b", "{x}")).is_err());
    }

    #[test]
    fn mismatched_dict_is_rejected() {
        let dict = K::dict(K::symbol_vec(vec!["a".into()]), K::int_vec(vec![1, 2]));
        assert!(encode(MessageType::Async, &dict).is_err());
    }

    #[test]
    fn malformed_table_is_rejected() {
        // More columns than column vectors.
        let table = K::table(
            vec!["a".into(), "b".into()],
            vec![K::int_vec(vec![1, 2])],
        );
        assert!(encode(MessageType::Async, &table).is_err());

        // Ragged column lengths.
        let table = K::table(
            vec!["a".into(), "b".into()],
            vec![K::int_vec(vec![1, 2]), K::int_vec(vec![3])],
        );
        assert!(encode(MessageType::Async, &table).is_err());
    }
}
