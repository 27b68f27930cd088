//! Decoding: Q IPC frames → `K` values.

use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

use super::{compress, Header, MessageType, HEADER_SIZE};
use crate::error::KxError;
use crate::types::{
    code, Adverb, Attr, Date, Datetime, K, KData, Lambda, Minute, Month, Second, Table, Time,
    Timespan, Timestamp,
};

/// Reads one complete framed message from the stream.
///
/// Validates the 8-octet header, reads the body, decompresses when the
/// frame is flagged compressed, and parses the payload in the sender's
/// declared byte order. Short reads surface as I/O errors; an error atom
/// in the payload surfaces as [`KxError::Remote`].
pub async fn read_frame<R>(reader: &mut R) -> Result<(K, MessageType), KxError>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; HEADER_SIZE];
    reader.read_exact(&mut head).await?;
    let header = Header::parse(head)?;

    let mut body = vec![0u8; header.len as usize - HEADER_SIZE];
    reader.read_exact(&mut body).await?;

    let value = decode_body(&body, header.compressed, header.little_endian)?;
    Ok((value, header.msg_type))
}

/// Parses a message body (the frame minus its 8-octet header).
pub fn decode_body(body: &[u8], compressed: bool, little_endian: bool) -> Result<K, KxError> {
    if compressed {
        let raw = compress::uncompress(body)?;
        // The rebuilt buffer carries an 8-octet header stub of its own.
        let mut cur = Cursor::new(&raw[HEADER_SIZE..], little_endian);
        decode_value(&mut cur)
    } else {
        let mut cur = Cursor::new(body, little_endian);
        decode_value(&mut cur)
    }
}

/// Bounded reader over a message body honouring the declared byte order.
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8], little_endian: bool) -> Self {
        Self {
            buf,
            pos: 0,
            little_endian,
        }
    }

    fn need(&self, n: usize) -> Result<(), KxError> {
        if self.buf.len() - self.pos < n {
            Err(KxError::BadMessage(format!(
                "need {n} bytes but only {} remaining",
                self.buf.len() - self.pos
            )))
        } else {
            Ok(())
        }
    }

    fn get_slice(&mut self, n: usize) -> Result<&'a [u8], KxError> {
        self.need(n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn get_u8(&mut self) -> Result<u8, KxError> {
        Ok(self.get_slice(1)?[0])
    }

    fn get_i8(&mut self) -> Result<i8, KxError> {
        Ok(self.get_u8()? as i8)
    }

    fn get_i16(&mut self) -> Result<i16, KxError> {
        let b: [u8; 2] = copy_array(self.get_slice(2)?);
        Ok(if self.little_endian {
            i16::from_le_bytes(b)
        } else {
            i16::from_be_bytes(b)
        })
    }

    fn get_i32(&mut self) -> Result<i32, KxError> {
        let b: [u8; 4] = copy_array(self.get_slice(4)?);
        Ok(if self.little_endian {
            i32::from_le_bytes(b)
        } else {
            i32::from_be_bytes(b)
        })
    }

    fn get_i64(&mut self) -> Result<i64, KxError> {
        let b: [u8; 8] = copy_array(self.get_slice(8)?);
        Ok(if self.little_endian {
            i64::from_le_bytes(b)
        } else {
            i64::from_be_bytes(b)
        })
    }

    fn get_f32(&mut self) -> Result<f32, KxError> {
        Ok(f32::from_bits(self.get_i32()? as u32))
    }

    fn get_f64(&mut self) -> Result<f64, KxError> {
        Ok(f64::from_bits(self.get_i64()? as u64))
    }

    /// Reads a zero-terminated string. The terminator is consumed.
    fn get_str0(&mut self) -> Result<String, KxError> {
        let rest = &self.buf[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| KxError::BadMessage("unterminated symbol".into()))?;
        let s = std::str::from_utf8(&rest[..end])
            .map_err(|e| KxError::BadMessage(format!("invalid UTF-8 symbol: {e}")))?
            .to_owned();
        self.pos += end + 1;
        Ok(s)
    }
}

fn copy_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

/// Reads the attribute octet and 32-bit element count of a vector.
fn vec_header(cur: &mut Cursor<'_>) -> Result<(Attr, usize), KxError> {
    let attr = Attr::from_wire(cur.get_u8()?)
        .ok_or_else(|| KxError::BadMessage("unknown vector attribute".into()))?;
    let len = cur.get_i32()?;
    if len < 0 {
        return Err(KxError::BadMessage("negative vector length".into()));
    }
    Ok((attr, len as usize))
}

/// Parses one value from the cursor.
pub(crate) fn decode_value(cur: &mut Cursor<'_>) -> Result<K, KxError> {
    let t = cur.get_i8()?;
    match t {
        -1 => Ok(K::bool(cur.get_u8()? != 0)),
        -2 => {
            let raw: [u8; 16] = copy_array(cur.get_slice(16)?);
            Ok(K::guid(Uuid::from_bytes(raw)))
        }
        -4 => Ok(K::byte(cur.get_u8()?)),
        -5 => Ok(K::short(cur.get_i16()?)),
        -6 => Ok(K::int(cur.get_i32()?)),
        -7 => Ok(K::long(cur.get_i64()?)),
        -8 => Ok(K::real(cur.get_f32()?)),
        -9 => Ok(K::float(cur.get_f64()?)),
        -10 => Ok(K::char(cur.get_u8()?)),
        -11 => Ok(K::symbol(cur.get_str0()?)),
        -12 => Ok(K::timestamp(Timestamp(cur.get_i64()?))),
        -13 => Ok(K::month(Month(cur.get_i32()?))),
        -14 => Ok(K::date(Date(cur.get_i32()?))),
        -15 => Ok(K::datetime(Datetime(cur.get_f64()?))),
        -16 => Ok(K::timespan(Timespan(cur.get_i64()?))),
        -17 => Ok(K::minute(Minute(cur.get_i32()?))),
        -18 => Ok(K::second(Second(cur.get_i32()?))),
        -19 => Ok(K::time(Time(cur.get_i32()?))),

        code::MIXED => {
            let (attr, len) = vec_header(cur)?;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(decode_value(cur)?);
            }
            Ok(K::mixed(items).with_attr(attr))
        }
        code::BOOLEAN => {
            let (attr, len) = vec_header(cur)?;
            let raw = cur.get_slice(len)?;
            Ok(K::bool_vec(raw.iter().map(|&b| b != 0).collect()).with_attr(attr))
        }
        code::GUID => {
            let (attr, len) = vec_header(cur)?;
            let raw = cur.get_slice(len.checked_mul(16).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let v = raw
                .chunks_exact(16)
                .map(|chunk| Uuid::from_bytes(copy_array(chunk)))
                .collect();
            Ok(K::guid_vec(v).with_attr(attr))
        }
        code::BYTE => {
            let (attr, len) = vec_header(cur)?;
            Ok(K::byte_vec(cur.get_slice(len)?.to_vec()).with_attr(attr))
        }
        code::SHORT => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(2).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(cur.get_i16()?);
            }
            Ok(K::short_vec(v).with_attr(attr))
        }
        code::INT => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(4).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(cur.get_i32()?);
            }
            Ok(K::int_vec(v).with_attr(attr))
        }
        code::LONG => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(8).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(cur.get_i64()?);
            }
            Ok(K::long_vec(v).with_attr(attr))
        }
        code::REAL => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(4).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(cur.get_f32()?);
            }
            Ok(K::real_vec(v).with_attr(attr))
        }
        code::FLOAT => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(8).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(cur.get_f64()?);
            }
            Ok(K::float_vec(v).with_attr(attr))
        }
        code::CHAR => {
            let (attr, len) = vec_header(cur)?;
            let raw = cur.get_slice(len)?;
            let s = std::str::from_utf8(raw)
                .map_err(|e| KxError::BadMessage(format!("invalid UTF-8 string: {e}")))?;
            Ok(K::string(s).with_attr(attr))
        }
        code::SYMBOL => {
            let (attr, len) = vec_header(cur)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(cur.get_str0()?);
            }
            Ok(K::symbol_vec(v).with_attr(attr))
        }
        code::TIMESTAMP => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(8).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(Timestamp(cur.get_i64()?));
            }
            Ok(K::timestamp_vec(v).with_attr(attr))
        }
        code::MONTH => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(4).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(Month(cur.get_i32()?));
            }
            Ok(K::month_vec(v).with_attr(attr))
        }
        code::DATE => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(4).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(Date(cur.get_i32()?));
            }
            Ok(K::date_vec(v).with_attr(attr))
        }
        code::DATETIME => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(8).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(Datetime(cur.get_f64()?));
            }
            Ok(K::datetime_vec(v).with_attr(attr))
        }
        code::TIMESPAN => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(8).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(Timespan(cur.get_i64()?));
            }
            Ok(K::timespan_vec(v).with_attr(attr))
        }
        code::MINUTE => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(4).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(Minute(cur.get_i32()?));
            }
            Ok(K::minute_vec(v).with_attr(attr))
        }
        code::SECOND => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(4).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(Second(cur.get_i32()?));
            }
            Ok(K::second_vec(v).with_attr(attr))
        }
        code::TIME => {
            let (attr, len) = vec_header(cur)?;
            cur.need(len.checked_mul(4).ok_or_else(|| KxError::BadMessage("vector length overflow".into()))?)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(Time(cur.get_i32()?));
            }
            Ok(K::time_vec(v).with_attr(attr))
        }

        code::DICT | code::SORTED_DICT => {
            let key = decode_value(cur)?;
            let value = decode_value(cur)?;
            if key.len() != value.len() {
                return Err(KxError::BadMessage(
                    "dictionary key/value length mismatch".into(),
                ));
            }
            let attr = if t == code::SORTED_DICT {
                Attr::Sorted
            } else {
                Attr::None
            };
            Ok(K::dict(key, value).with_attr(attr))
        }
        code::TABLE => {
            let attr = Attr::from_wire(cur.get_u8()?)
                .ok_or_else(|| KxError::BadMessage("unknown table attribute".into()))?;
            let inner = decode_value(cur)?;
            let dict = match inner.data {
                KData::Dict(d) => *d,
                _ => return Err(KxError::BadMessage("table payload is not a dictionary".into())),
            };
            let columns = match dict.key.data {
                KData::SymbolVec(cols) => cols,
                _ => {
                    return Err(KxError::BadMessage(
                        "table columns are not a symbol vector".into(),
                    ))
                }
            };
            let data = match dict.value.data {
                KData::Mixed(cols) => cols,
                _ => {
                    return Err(KxError::BadMessage(
                        "table body is not a mixed list".into(),
                    ))
                }
            };
            if columns.len() != data.len() {
                return Err(KxError::BadMessage(
                    "table column count mismatch".into(),
                ));
            }
            Ok(K::new(KData::Table(Table { columns, data })).with_attr(attr))
        }
        code::LAMBDA => {
            let namespace = cur.get_str0()?;
            let body = decode_value(cur)?;
            match body.data {
                KData::CharVec(body) => Ok(K::new(KData::Lambda(Lambda { namespace, body }))),
                _ => Err(KxError::BadMessage(
                    "lambda body is not a char vector".into(),
                )),
            }
        }
        code::UNARY_PRIMITIVE => Ok(K::new(KData::UnaryPrimitive(cur.get_u8()?))),
        code::BINARY_PRIMITIVE => Ok(K::new(KData::BinaryPrimitive(cur.get_u8()?))),
        code::TERNARY_PRIMITIVE => Ok(K::new(KData::TernaryPrimitive(cur.get_u8()?))),
        code::PROJECTION | code::COMPOSITION => {
            let n = cur.get_i32()?;
            if n < 0 {
                return Err(KxError::BadMessage("negative argument count".into()));
            }
            let mut children = Vec::with_capacity(n as usize);
            for _ in 0..n {
                children.push(decode_value(cur)?);
            }
            if t == code::PROJECTION {
                Ok(K::projection(children))
            } else {
                Ok(K::composition(children))
            }
        }
        code::EACH..=code::EACH_LEFT => {
            let inner = decode_value(cur)?;
            let kind = Adverb::from_code(t)
                .ok_or_else(|| KxError::BadMessage("bad adverb code".into()))?;
            Ok(K::adverb(kind, inner))
        }
        code::DYNAMIC_LOAD => Err(KxError::Unsupported("dynamic load".into())),
        code::ERROR => Err(KxError::Remote(cur.get_str0()?)),
        _ => Err(KxError::BadMessage(format!("unknown type code {t}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::encode::encode;
    use crate::types::{INF_LONG, NULL_INT, NULL_LONG, NULL_SHORT};

    async fn round_trip(value: K) -> K {
        round_trip_class(value, MessageType::Async).await
    }

    async fn round_trip_class(value: K, class: MessageType) -> K {
        let frame = encode(class, &value).expect("encode");
        let (decoded, decoded_class) = read_frame(&mut frame.as_slice()).await.expect("decode");
        assert_eq!(decoded_class, class);
        decoded
    }

    #[tokio::test]
    async fn round_trip_atoms() {
        for value in [
            K::bool(true),
            K::byte(0xfe),
            K::short(-42),
            K::int(123_456),
            K::long(-9_000_000_000),
            K::real(1.5),
            K::float(-2.75),
            K::char(b'q'),
            K::symbol("trade"),
            K::symbol(""),
            K::guid(Uuid::from_bytes([7; 16])),
        ] {
            assert_eq!(round_trip(value.clone()).await, value);
        }
    }

    #[tokio::test]
    async fn round_trip_message_classes() {
        for class in [MessageType::Async, MessageType::Sync, MessageType::Response] {
            let v = round_trip_class(K::int(1), class).await;
            assert_eq!(v, K::int(1));
        }
    }

    #[tokio::test]
    async fn round_trip_temporal_atoms() {
        for value in [
            K::timestamp(Timestamp(86_400_000_000_000)),
            K::timestamp(Timestamp::NULL),
            K::month(Month(245)),
            K::date(Date(18_000)),
            K::date(Date::NULL),
            K::datetime(Datetime(0.5)),
            K::datetime(Datetime::NULL),
            K::timespan(Timespan(1_234_567_890)),
            K::minute(Minute(125)),
            K::second(Second(3_725)),
            K::time(Time(45_296_789)),
        ] {
            assert_eq!(round_trip(value.clone()).await, value);
        }
    }

    #[tokio::test]
    async fn round_trip_vectors() {
        for value in [
            K::bool_vec(vec![true, false, true]),
            K::byte_vec(vec![0, 1, 2, 3, 4]),
            K::short_vec(vec![1, NULL_SHORT, 3]),
            K::int_vec(vec![2, 3]),
            K::long_vec(vec![NULL_LONG, INF_LONG, 0]),
            K::real_vec(vec![1.0, 2.5]),
            K::float_vec(vec![-1.0, 0.0, 9.9]),
            K::string("GOOG"),
            K::symbol_vec(vec!["abc".into(), "bc".into(), "c".into()]),
            K::guid_vec(vec![Uuid::from_bytes([1; 16]), Uuid::from_bytes([2; 16])]),
            K::timestamp_vec(vec![Timestamp(0), Timestamp::NULL]),
            K::month_vec(vec![Month(1), Month(2)]),
            K::date_vec(vec![Date(0), Date(365)]),
            K::datetime_vec(vec![Datetime(1.25)]),
            K::timespan_vec(vec![Timespan(-5), Timespan(5)]),
            K::minute_vec(vec![Minute(0), Minute(1_439)]),
            K::second_vec(vec![Second(59)]),
            K::time_vec(vec![Time(0), Time(86_399_999)]),
        ] {
            assert_eq!(round_trip(value.clone()).await, value);
        }
    }

    #[tokio::test]
    async fn round_trip_empty_vectors() {
        for value in [
            K::bool_vec(vec![]),
            K::byte_vec(vec![]),
            K::short_vec(vec![]),
            K::int_vec(vec![]),
            K::long_vec(vec![]),
            K::real_vec(vec![]),
            K::float_vec(vec![]),
            K::string(""),
            K::symbol_vec(vec![]),
            K::guid_vec(vec![]),
            K::timestamp_vec(vec![]),
            K::month_vec(vec![]),
            K::date_vec(vec![]),
            K::datetime_vec(vec![]),
            K::timespan_vec(vec![]),
            K::minute_vec(vec![]),
            K::second_vec(vec![]),
            K::time_vec(vec![]),
            K::mixed(vec![]),
        ] {
            assert_eq!(round_trip(value.clone()).await, value);
        }
    }

    #[tokio::test]
    async fn round_trip_enlisted_scalars() {
        for value in [
            K::bool_vec(vec![true]),
            K::byte_vec(vec![9]),
            K::short_vec(vec![-1]),
            K::int_vec(vec![1]),
            K::long_vec(vec![1]),
            K::real_vec(vec![0.5]),
            K::float_vec(vec![0.25]),
            K::symbol_vec(vec!["one".into()]),
        ] {
            assert_eq!(round_trip(value.clone()).await, value);
        }
    }

    #[tokio::test]
    async fn null_and_infinity_sentinels_survive() {
        let v = round_trip(K::short(NULL_SHORT)).await;
        assert_eq!(v, K::short(NULL_SHORT));
        let v = round_trip(K::int(NULL_INT)).await;
        assert_eq!(v, K::int(NULL_INT));
        let v = round_trip(K::long(INF_LONG)).await;
        assert_eq!(v, K::long(INF_LONG));

        // NaN nulls compare by bits.
        let v = round_trip(K::real(f32::NAN)).await;
        match v.data {
            KData::Real(x) => assert!(x.is_nan()),
            other => panic!("expected real, got {other:?}"),
        }
        let v = round_trip(K::float(f64::NAN)).await;
        match v.data {
            KData::Float(x) => assert!(x.is_nan()),
            other => panic!("expected float, got {other:?}"),
        }
        let v = round_trip(K::float(f64::INFINITY)).await;
        assert_eq!(v, K::float(f64::INFINITY));
    }

    #[tokio::test]
    async fn round_trip_attributes() {
        let value = K::long_vec(vec![1, 2, 3]).with_attr(Attr::Sorted);
        assert_eq!(round_trip(value.clone()).await, value);
        let value = K::symbol_vec(vec!["a".into()]).with_attr(Attr::Unique);
        assert_eq!(round_trip(value.clone()).await, value);
    }

    #[tokio::test]
    async fn round_trip_mixed_with_nested_dict() {
        let value = K::mixed(vec![
            K::int(1),
            K::string("two"),
            K::dict(
                K::symbol_vec(vec!["a".into(), "b".into()]),
                K::mixed(vec![K::int_vec(vec![2]), K::int_vec(vec![3])]),
            ),
            K::bool_vec(vec![true, false]),
        ]);
        assert_eq!(round_trip(value.clone()).await, value);
    }

    #[tokio::test]
    async fn round_trip_sorted_dict() {
        let value = K::dict(
            K::symbol_vec(vec!["a".into(), "b".into()]),
            K::int_vec(vec![2, 3]),
        )
        .with_attr(Attr::Sorted);
        let decoded = round_trip(value.clone()).await;
        assert_eq!(decoded, value);
        assert_eq!(decoded.attr, Attr::Sorted);
        assert_eq!(decoded.type_code(), 127);
    }

    #[tokio::test]
    async fn round_trip_table() {
        let value = K::table(
            vec!["sym".into(), "size".into()],
            vec![
                K::symbol_vec(vec!["a".into(), "b".into()]),
                K::long_vec(vec![100, 200]),
            ],
        );
        assert_eq!(round_trip(value.clone()).await, value);
    }

    #[tokio::test]
    async fn round_trip_empty_table() {
        let value = K::table(vec!["a".into()], vec![K::int_vec(vec![])]);
        assert_eq!(round_trip(value.clone()).await, value);
    }

    #[tokio::test]
    async fn round_trip_keyed_table() {
        // A keyed table is dict(table, table).
        let keys = K::table(
            vec!["id".into()],
            vec![K::long_vec(vec![1, 2])],
        );
        let values = K::table(
            vec!["px".into()],
            vec![K::float_vec(vec![10.0, 20.0])],
        );
        let value = K::dict(keys, values);
        assert_eq!(round_trip(value.clone()).await, value);
    }

    #[tokio::test]
    async fn round_trip_functions() {
        for value in [
            K::lambda("", "{x+y}"),
            K::lambda("d", "{x*2}"),
            K::new(KData::UnaryPrimitive(41)),
            K::new(KData::BinaryPrimitive(2)),
            K::new(KData::TernaryPrimitive(0)),
            K::projection(vec![K::lambda("", "{x+y}"), K::int(1)]),
            K::composition(vec![K::lambda("", "{x}"), K::lambda("", "{y}")]),
            K::adverb(Adverb::Each, K::lambda("", "{x}")),
            K::adverb(Adverb::Over, K::new(KData::BinaryPrimitive(1))),
            K::adverb(Adverb::EachLeft, K::lambda("", "{x,y}")),
        ] {
            assert_eq!(round_trip(value.clone()).await, value);
        }
    }

    #[tokio::test]
    async fn compressed_round_trip() {
        let value = K::bool_vec(vec![true; 2000]);
        let frame = encode(MessageType::Async, &value).expect("encode");
        assert_eq!(frame[2], 1);
        let (decoded, class) = read_frame(&mut frame.as_slice()).await.expect("decode");
        assert_eq!(class, MessageType::Async);
        assert_eq!(decoded, value);
    }

    #[tokio::test]
    async fn big_endian_frame_decodes() {
        // 1i as a big-endian sender would frame it.
        let frame: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0d, 0xfa, 0x00, 0x00, 0x00, 0x01,
        ];
        let (decoded, class) = read_frame(&mut frame.as_slice()).await.expect("decode");
        assert_eq!(class, MessageType::Async);
        assert_eq!(decoded, K::int(1));
    }

    #[tokio::test]
    async fn big_endian_vector_decodes() {
        // 2 3 as shorts, big-endian, sync class.
        let frame: Vec<u8> = vec![
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x12, 0x05, 0x00, 0x00, 0x00, 0x00, 0x02,
            0x00, 0x02, 0x00, 0x03,
        ];
        let (decoded, class) = read_frame(&mut frame.as_slice()).await.expect("decode");
        assert_eq!(class, MessageType::Sync);
        assert_eq!(decoded, K::short_vec(vec![2, 3]));
    }

    #[tokio::test]
    async fn rejects_bad_header() {
        let frame: Vec<u8> = vec![0x07, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0xff, 0x00];
        let err = read_frame(&mut frame.as_slice()).await.unwrap_err();
        assert!(matches!(err, KxError::BadHeader));
    }

    #[tokio::test]
    async fn short_body_is_io_error() {
        let frame: Vec<u8> = vec![0x01, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00, 0x06, 0x00];
        let err = read_frame(&mut frame.as_slice()).await.unwrap_err();
        assert!(matches!(err, KxError::Io(_)));
    }

    #[tokio::test]
    async fn dynamic_load_is_unsupported() {
        let frame: Vec<u8> = vec![0x01, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x70, 0x00];
        let err = read_frame(&mut frame.as_slice()).await.unwrap_err();
        assert!(matches!(err, KxError::Unsupported(_)));
    }

    #[tokio::test]
    async fn error_atom_surfaces_as_remote() {
        let frame = encode(MessageType::Response, &K::error("type")).expect("encode");
        let err = read_frame(&mut frame.as_slice()).await.unwrap_err();
        match err {
            KxError::Remote(msg) => assert_eq!(msg, "type"),
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mismatched_dict_lengths_rejected() {
        // `a`b keyed to 1 2 3: two keys, three values.
        let frame: Vec<u8> = vec![
            0x01, 0x00, 0x00, 0x00, 0x25, 0x00, 0x00, 0x00, 0x63, 0x0b, 0x00, 0x02, 0x00, 0x00,
            0x00, 0x61, 0x00, 0x62, 0x00, 0x06, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00,
            0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00,
        ];
        let err = read_frame(&mut frame.as_slice()).await.unwrap_err();
        assert!(matches!(err, KxError::BadMessage(_)));
    }

    #[tokio::test]
    async fn unknown_type_code_rejected() {
        let frame: Vec<u8> = vec![0x01, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x50, 0x00];
        let err = read_frame(&mut frame.as_slice()).await.unwrap_err();
        assert!(matches!(err, KxError::BadMessage(_)));
    }
}
