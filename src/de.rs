//! Mapping decoded values onto Rust records with serde.
//!
//! A dictionary with symbol keys deserialises into a struct or map, a
//! table into a sequence of row records, and vectors into sequences, so a
//! decoded query result can land directly in application types:
//!
//! ```ignore
//! #[derive(serde::Deserialize)]
//! struct Trade { sym: String, size: i64 }
//! let trades: Vec<Trade> = kxr::from_k(&table)?;
//! ```

use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::Deserializer;

use crate::error::KxError;
use crate::types::{Dict, K, KData};

impl de::Error for KxError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        KxError::Deserialize(msg.to_string())
    }
}

/// Deserialises a decoded value into any `serde`-deserialisable type.
pub fn from_k<T: DeserializeOwned>(value: &K) -> Result<T, KxError> {
    T::deserialize(KDeserializer { value })
}

#[derive(Clone, Copy)]
struct KDeserializer<'a> {
    value: &'a K,
}

impl<'de> Deserializer<'de> for KDeserializer<'_> {
    type Error = KxError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, KxError> {
        match &self.value.data {
            KData::Bool(x) => visitor.visit_bool(*x),
            KData::Guid(x) => visitor.visit_string(x.to_string()),
            KData::Byte(x) => visitor.visit_u8(*x),
            KData::Short(x) => visitor.visit_i16(*x),
            KData::Int(x) => visitor.visit_i32(*x),
            KData::Long(x) => visitor.visit_i64(*x),
            KData::Real(x) => visitor.visit_f32(*x),
            KData::Float(x) => visitor.visit_f64(*x),
            KData::Char(x) => visitor.visit_char(*x as char),
            KData::CharVec(s) => visitor.visit_str(s),
            KData::Symbol(s) => visitor.visit_str(s),

            // Temporal values surface as their Q-native numbers.
            KData::Timestamp(x) => visitor.visit_i64(x.0),
            KData::Month(x) => visitor.visit_i32(x.0),
            KData::Date(x) => visitor.visit_i32(x.0),
            KData::Datetime(x) => visitor.visit_f64(x.0),
            KData::Timespan(x) => visitor.visit_i64(x.0),
            KData::Minute(x) => visitor.visit_i32(x.0),
            KData::Second(x) => visitor.visit_i32(x.0),
            KData::Time(x) => visitor.visit_i32(x.0),

            KData::BoolVec(_)
            | KData::GuidVec(_)
            | KData::ByteVec(_)
            | KData::ShortVec(_)
            | KData::IntVec(_)
            | KData::LongVec(_)
            | KData::RealVec(_)
            | KData::FloatVec(_)
            | KData::SymbolVec(_)
            | KData::TimestampVec(_)
            | KData::MonthVec(_)
            | KData::DateVec(_)
            | KData::DatetimeVec(_)
            | KData::TimespanVec(_)
            | KData::MinuteVec(_)
            | KData::SecondVec(_)
            | KData::TimeVec(_)
            | KData::Mixed(_)
            | KData::Table(_) => visitor.visit_seq(Elements {
                value: self.value,
                index: 0,
                len: self.value.len(),
            }),

            KData::Dict(dict) => visitor.visit_map(Entries {
                dict,
                index: 0,
                len: dict.key.len(),
                value_pending: false,
            }),

            KData::Error(msg) => Err(KxError::Remote(msg.clone())),
            KData::Lambda(_)
            | KData::UnaryPrimitive(_)
            | KData::BinaryPrimitive(_)
            | KData::TernaryPrimitive(_)
            | KData::Projection(_)
            | KData::Composition(_)
            | KData::Adverb(..) => Err(de::Error::custom(format!(
                "cannot deserialise a function value (type {})",
                self.value.type_code()
            ))),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, KxError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, KxError> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        enum identifier ignored_any
    }
}

/// Sequence access over vectors, mixed lists, and table rows, driven by
/// [`K::index`].
struct Elements<'a> {
    value: &'a K,
    index: usize,
    len: usize,
}

impl<'de> SeqAccess<'de> for Elements<'_> {
    type Error = KxError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, KxError> {
        if self.index >= self.len {
            return Ok(None);
        }
        let element = self
            .value
            .index(self.index)
            .ok_or_else(|| <KxError as de::Error>::custom("element index out of range"))?;
        self.index += 1;
        seed.deserialize(KDeserializer { value: &element }).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len - self.index)
    }
}

/// Map access over a dictionary's key/value pairs.
struct Entries<'a> {
    dict: &'a Dict,
    index: usize,
    len: usize,
    value_pending: bool,
}

impl<'de> MapAccess<'de> for Entries<'_> {
    type Error = KxError;

    fn next_key_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, KxError> {
        if self.index >= self.len {
            return Ok(None);
        }
        let key = self
            .dict
            .key
            .index(self.index)
            .ok_or_else(|| <KxError as de::Error>::custom("dictionary key is not indexable"))?;
        self.value_pending = true;
        seed.deserialize(KDeserializer { value: &key }).map(Some)
    }

    fn next_value_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<T::Value, KxError> {
        if !self.value_pending {
            return Err(de::Error::custom("value requested before key"));
        }
        let value = self
            .dict
            .value
            .index(self.index)
            .ok_or_else(|| <KxError as de::Error>::custom("dictionary value is not indexable"))?;
        self.index += 1;
        self.value_pending = false;
        seed.deserialize(KDeserializer { value: &value })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len - self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Quote {
        sym: String,
        bid: f64,
        size: i64,
        live: bool,
    }

    fn quote_dict() -> K {
        K::dict(
            K::symbol_vec(vec![
                "sym".into(),
                "bid".into(),
                "size".into(),
                "live".into(),
            ]),
            K::mixed(vec![
                K::symbol("kx"),
                K::float(101.25),
                K::long(500),
                K::bool(true),
            ]),
        )
    }

    #[test]
    fn dict_to_struct() {
        let quote: Quote = from_k(&quote_dict()).expect("deserialise");
        assert_eq!(
            quote,
            Quote {
                sym: "kx".into(),
                bid: 101.25,
                size: 500,
                live: true,
            }
        );
    }

    #[test]
    fn dict_to_map() {
        let d = K::dict(
            K::symbol_vec(vec!["a".into(), "b".into()]),
            K::int_vec(vec![2, 3]),
        );
        let m: HashMap<String, i32> = from_k(&d).expect("deserialise");
        assert_eq!(m, HashMap::from([("a".into(), 2), ("b".into(), 3)]));
    }

    #[test]
    fn table_to_rows() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Row {
            sym: String,
            px: f64,
        }

        let t = K::table(
            vec!["sym".into(), "px".into()],
            vec![
                K::symbol_vec(vec!["a".into(), "b".into()]),
                K::float_vec(vec![1.5, 2.5]),
            ],
        );
        let rows: Vec<Row> = from_k(&t).expect("deserialise");
        assert_eq!(
            rows,
            vec![
                Row {
                    sym: "a".into(),
                    px: 1.5
                },
                Row {
                    sym: "b".into(),
                    px: 2.5
                },
            ]
        );
    }

    #[test]
    fn vectors_to_sequences() {
        let v: Vec<i32> = from_k(&K::int_vec(vec![1, 2, 3])).expect("deserialise");
        assert_eq!(v, vec![1, 2, 3]);
        let v: Vec<u8> = from_k(&K::byte_vec(vec![9, 8])).expect("deserialise");
        assert_eq!(v, vec![9, 8]);
        let v: Vec<String> =
            from_k(&K::symbol_vec(vec!["x".into(), "y".into()])).expect("deserialise");
        assert_eq!(v, vec!["x".to_owned(), "y".to_owned()]);
    }

    #[test]
    fn scalars_and_strings() {
        let s: String = from_k(&K::string("GOOG")).expect("deserialise");
        assert_eq!(s, "GOOG");
        let n: i64 = from_k(&K::long(42)).expect("deserialise");
        assert_eq!(n, 42);
        let o: Option<i32> = from_k(&K::int(7)).expect("deserialise");
        assert_eq!(o, Some(7));
    }

    #[test]
    fn numeric_widening() {
        // i32 on the wire, i64 in the record.
        let n: i64 = from_k(&K::int(7)).expect("deserialise");
        assert_eq!(n, 7);
    }

    #[test]
    fn error_atom_fails() {
        let err = from_k::<String>(&K::error("type")).unwrap_err();
        assert!(matches!(err, KxError::Remote(_)));
    }

    #[test]
    fn function_values_fail() {
        assert!(from_k::<String>(&K::lambda("", "{x}")).is_err());
    }
}
