//! The `K` value tree.

use std::fmt;

use uuid::Uuid;

use super::temporal::{Date, Datetime, Minute, Month, Second, Time, Timespan, Timestamp};
use super::{code, Attr};

// Null and infinity sentinels. Bit-exact values that must survive
// encode/decode round-trips.
pub const NULL_SHORT: i16 = i16::MIN;
pub const INF_SHORT: i16 = i16::MAX;
pub const NULL_INT: i32 = i32::MIN;
pub const INF_INT: i32 = i32::MAX;
pub const NULL_LONG: i64 = i64::MIN;
pub const INF_LONG: i64 = i64::MAX;
pub const NULL_REAL: f32 = f32::NAN;
pub const INF_REAL: f32 = f32::INFINITY;
pub const NULL_FLOAT: f64 = f64::NAN;
pub const INF_FLOAT: f64 = f64::INFINITY;

/// A value in the Q IPC protocol: a payload plus a vector attribute.
///
/// The wire type code is derived from the payload variant (see
/// [`K::type_code`]); a dictionary whose attribute is [`Attr::Sorted`]
/// takes the sorted-dictionary code 127.
#[derive(Debug, Clone, PartialEq)]
pub struct K {
    pub attr: Attr,
    pub data: KData,
}

/// The payload of a [`K`] value, one variant per type family.
#[derive(Debug, Clone, PartialEq)]
pub enum KData {
    Bool(bool),
    BoolVec(Vec<bool>),
    Guid(Uuid),
    GuidVec(Vec<Uuid>),
    Byte(u8),
    ByteVec(Vec<u8>),
    Short(i16),
    ShortVec(Vec<i16>),
    Int(i32),
    IntVec(Vec<i32>),
    Long(i64),
    LongVec(Vec<i64>),
    Real(f32),
    RealVec(Vec<f32>),
    Float(f64),
    FloatVec(Vec<f64>),
    Char(u8),
    /// A q "string": a char vector. Octets, conveyed without transcoding.
    CharVec(String),
    Symbol(String),
    SymbolVec(Vec<String>),
    Timestamp(Timestamp),
    TimestampVec(Vec<Timestamp>),
    Month(Month),
    MonthVec(Vec<Month>),
    Date(Date),
    DateVec(Vec<Date>),
    Datetime(Datetime),
    DatetimeVec(Vec<Datetime>),
    Timespan(Timespan),
    TimespanVec(Vec<Timespan>),
    Minute(Minute),
    MinuteVec(Vec<Minute>),
    Second(Second),
    SecondVec(Vec<Second>),
    Time(Time),
    TimeVec(Vec<Time>),
    /// Heterogeneous list (type 0).
    Mixed(Vec<K>),
    Dict(Box<Dict>),
    Table(Table),
    Lambda(Lambda),
    UnaryPrimitive(u8),
    BinaryPrimitive(u8),
    TernaryPrimitive(u8),
    Projection(Vec<K>),
    Composition(Vec<K>),
    /// Adverb-wrapped function (codes 106-111); the wrapper is preserved.
    Adverb(Adverb, Box<K>),
    Error(String),
}

/// Ordered key/value mapping. Key and value have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Dict {
    pub key: K,
    pub value: K,
}

/// Column-oriented table: column names plus same-length column vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub data: Vec<K>,
}

impl Table {
    /// Number of rows (length of the first column).
    pub fn rows(&self) -> usize {
        self.data.first().map_or(0, K::len)
    }

    /// The i'th row as a column-name to value dictionary.
    pub fn row(&self, i: usize) -> Option<Dict> {
        if i >= self.rows() {
            return None;
        }
        let mut values = Vec::with_capacity(self.data.len());
        for col in &self.data {
            values.push(col.index(i)?);
        }
        Some(Dict {
            key: K::symbol_vec(self.columns.clone()),
            value: K::mixed(values),
        })
    }
}

/// A q function body with its namespace context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lambda {
    pub namespace: String,
    pub body: String,
}

/// Adverb wrapper kinds (type codes 106-111).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adverb {
    Each,
    Over,
    Scan,
    Prior,
    EachRight,
    EachLeft,
}

impl Adverb {
    pub fn code(self) -> i8 {
        match self {
            Self::Each => code::EACH,
            Self::Over => code::OVER,
            Self::Scan => code::SCAN,
            Self::Prior => code::PRIOR,
            Self::EachRight => code::EACH_RIGHT,
            Self::EachLeft => code::EACH_LEFT,
        }
    }

    pub fn from_code(c: i8) -> Option<Self> {
        match c {
            code::EACH => Some(Self::Each),
            code::OVER => Some(Self::Over),
            code::SCAN => Some(Self::Scan),
            code::PRIOR => Some(Self::Prior),
            code::EACH_RIGHT => Some(Self::EachRight),
            code::EACH_LEFT => Some(Self::EachLeft),
            _ => None,
        }
    }
}

impl K {
    pub fn new(data: KData) -> Self {
        Self {
            attr: Attr::None,
            data,
        }
    }

    /// Tags the value with a vector attribute.
    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attr = attr;
        self
    }

    // -- Atom constructors --

    pub fn bool(x: bool) -> Self {
        Self::new(KData::Bool(x))
    }

    pub fn guid(x: Uuid) -> Self {
        Self::new(KData::Guid(x))
    }

    pub fn byte(x: u8) -> Self {
        Self::new(KData::Byte(x))
    }

    pub fn short(x: i16) -> Self {
        Self::new(KData::Short(x))
    }

    pub fn int(x: i32) -> Self {
        Self::new(KData::Int(x))
    }

    pub fn long(x: i64) -> Self {
        Self::new(KData::Long(x))
    }

    pub fn real(x: f32) -> Self {
        Self::new(KData::Real(x))
    }

    pub fn float(x: f64) -> Self {
        Self::new(KData::Float(x))
    }

    pub fn char(x: u8) -> Self {
        Self::new(KData::Char(x))
    }

    /// A q string (char vector, type 10).
    pub fn string(x: impl Into<String>) -> Self {
        Self::new(KData::CharVec(x.into()))
    }

    /// A symbol atom. Symbols are zero-terminated on the wire, so the
    /// encoder rejects values containing an interior NUL octet.
    pub fn symbol(x: impl Into<String>) -> Self {
        Self::new(KData::Symbol(x.into()))
    }

    pub fn timestamp(x: Timestamp) -> Self {
        Self::new(KData::Timestamp(x))
    }

    pub fn month(x: Month) -> Self {
        Self::new(KData::Month(x))
    }

    pub fn date(x: Date) -> Self {
        Self::new(KData::Date(x))
    }

    pub fn datetime(x: Datetime) -> Self {
        Self::new(KData::Datetime(x))
    }

    pub fn timespan(x: Timespan) -> Self {
        Self::new(KData::Timespan(x))
    }

    pub fn minute(x: Minute) -> Self {
        Self::new(KData::Minute(x))
    }

    pub fn second(x: Second) -> Self {
        Self::new(KData::Second(x))
    }

    pub fn time(x: Time) -> Self {
        Self::new(KData::Time(x))
    }

    // -- Vector constructors --

    pub fn bool_vec(x: Vec<bool>) -> Self {
        Self::new(KData::BoolVec(x))
    }

    pub fn guid_vec(x: Vec<Uuid>) -> Self {
        Self::new(KData::GuidVec(x))
    }

    pub fn byte_vec(x: Vec<u8>) -> Self {
        Self::new(KData::ByteVec(x))
    }

    pub fn short_vec(x: Vec<i16>) -> Self {
        Self::new(KData::ShortVec(x))
    }

    pub fn int_vec(x: Vec<i32>) -> Self {
        Self::new(KData::IntVec(x))
    }

    pub fn long_vec(x: Vec<i64>) -> Self {
        Self::new(KData::LongVec(x))
    }

    pub fn real_vec(x: Vec<f32>) -> Self {
        Self::new(KData::RealVec(x))
    }

    pub fn float_vec(x: Vec<f64>) -> Self {
        Self::new(KData::FloatVec(x))
    }

    /// A symbol vector. As with [`K::symbol`], elements containing an
    /// interior NUL octet are rejected by the encoder.
    pub fn symbol_vec(x: Vec<String>) -> Self {
        Self::new(KData::SymbolVec(x))
    }

    pub fn timestamp_vec(x: Vec<Timestamp>) -> Self {
        Self::new(KData::TimestampVec(x))
    }

    pub fn month_vec(x: Vec<Month>) -> Self {
        Self::new(KData::MonthVec(x))
    }

    pub fn date_vec(x: Vec<Date>) -> Self {
        Self::new(KData::DateVec(x))
    }

    pub fn datetime_vec(x: Vec<Datetime>) -> Self {
        Self::new(KData::DatetimeVec(x))
    }

    pub fn timespan_vec(x: Vec<Timespan>) -> Self {
        Self::new(KData::TimespanVec(x))
    }

    pub fn minute_vec(x: Vec<Minute>) -> Self {
        Self::new(KData::MinuteVec(x))
    }

    pub fn second_vec(x: Vec<Second>) -> Self {
        Self::new(KData::SecondVec(x))
    }

    pub fn time_vec(x: Vec<Time>) -> Self {
        Self::new(KData::TimeVec(x))
    }

    // -- Composite constructors --

    pub fn mixed(x: Vec<K>) -> Self {
        Self::new(KData::Mixed(x))
    }

    /// A dictionary. Key and value must have equal length; the encoder
    /// rejects mismatched pairs.
    pub fn dict(key: K, value: K) -> Self {
        Self::new(KData::Dict(Box::new(Dict { key, value })))
    }

    /// A table. Column names and column vectors must line up one to one,
    /// with every column the same length; the encoder rejects anything
    /// else.
    pub fn table(columns: Vec<String>, data: Vec<K>) -> Self {
        Self::new(KData::Table(Table { columns, data }))
    }

    pub fn lambda(namespace: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(KData::Lambda(Lambda {
            namespace: namespace.into(),
            body: body.into(),
        }))
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::new(KData::Error(msg.into()))
    }

    pub fn projection(children: Vec<K>) -> Self {
        Self::new(KData::Projection(children))
    }

    pub fn composition(children: Vec<K>) -> Self {
        Self::new(KData::Composition(children))
    }

    pub fn adverb(kind: Adverb, inner: K) -> Self {
        Self::new(KData::Adverb(kind, Box::new(inner)))
    }

    /// The wire type code for this value. Atoms are negative, vectors
    /// positive; a sorted dictionary reports 127.
    pub fn type_code(&self) -> i8 {
        match &self.data {
            KData::Bool(_) => -code::BOOLEAN,
            KData::BoolVec(_) => code::BOOLEAN,
            KData::Guid(_) => -code::GUID,
            KData::GuidVec(_) => code::GUID,
            KData::Byte(_) => -code::BYTE,
            KData::ByteVec(_) => code::BYTE,
            KData::Short(_) => -code::SHORT,
            KData::ShortVec(_) => code::SHORT,
            KData::Int(_) => -code::INT,
            KData::IntVec(_) => code::INT,
            KData::Long(_) => -code::LONG,
            KData::LongVec(_) => code::LONG,
            KData::Real(_) => -code::REAL,
            KData::RealVec(_) => code::REAL,
            KData::Float(_) => -code::FLOAT,
            KData::FloatVec(_) => code::FLOAT,
            KData::Char(_) => -code::CHAR,
            KData::CharVec(_) => code::CHAR,
            KData::Symbol(_) => -code::SYMBOL,
            KData::SymbolVec(_) => code::SYMBOL,
            KData::Timestamp(_) => -code::TIMESTAMP,
            KData::TimestampVec(_) => code::TIMESTAMP,
            KData::Month(_) => -code::MONTH,
            KData::MonthVec(_) => code::MONTH,
            KData::Date(_) => -code::DATE,
            KData::DateVec(_) => code::DATE,
            KData::Datetime(_) => -code::DATETIME,
            KData::DatetimeVec(_) => code::DATETIME,
            KData::Timespan(_) => -code::TIMESPAN,
            KData::TimespanVec(_) => code::TIMESPAN,
            KData::Minute(_) => -code::MINUTE,
            KData::MinuteVec(_) => code::MINUTE,
            KData::Second(_) => -code::SECOND,
            KData::SecondVec(_) => code::SECOND,
            KData::Time(_) => -code::TIME,
            KData::TimeVec(_) => code::TIME,
            KData::Mixed(_) => code::MIXED,
            KData::Dict(_) => {
                if self.attr == Attr::Sorted {
                    code::SORTED_DICT
                } else {
                    code::DICT
                }
            }
            KData::Table(_) => code::TABLE,
            KData::Lambda(_) => code::LAMBDA,
            KData::UnaryPrimitive(_) => code::UNARY_PRIMITIVE,
            KData::BinaryPrimitive(_) => code::BINARY_PRIMITIVE,
            KData::TernaryPrimitive(_) => code::TERNARY_PRIMITIVE,
            KData::Projection(_) => code::PROJECTION,
            KData::Composition(_) => code::COMPOSITION,
            KData::Adverb(a, _) => a.code(),
            KData::Error(_) => code::ERROR,
        }
    }

    /// Number of elements: vector/list length, dictionary key count,
    /// table row count; atoms and functions count 1.
    pub fn len(&self) -> usize {
        match &self.data {
            KData::BoolVec(v) => v.len(),
            KData::GuidVec(v) => v.len(),
            KData::ByteVec(v) => v.len(),
            KData::ShortVec(v) => v.len(),
            KData::IntVec(v) => v.len(),
            KData::LongVec(v) => v.len(),
            KData::RealVec(v) => v.len(),
            KData::FloatVec(v) => v.len(),
            KData::CharVec(s) => s.len(),
            KData::SymbolVec(v) => v.len(),
            KData::TimestampVec(v) => v.len(),
            KData::MonthVec(v) => v.len(),
            KData::DateVec(v) => v.len(),
            KData::DatetimeVec(v) => v.len(),
            KData::TimespanVec(v) => v.len(),
            KData::MinuteVec(v) => v.len(),
            KData::SecondVec(v) => v.len(),
            KData::TimeVec(v) => v.len(),
            KData::Mixed(v) => v.len(),
            KData::Dict(d) => d.key.len(),
            KData::Table(t) => t.rows(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The i'th element of a vector, list, or table.
    ///
    /// Vector elements come back rewrapped as atoms; a table row comes back
    /// as a column-name to value dictionary. Returns `None` for atoms,
    /// functions, dictionaries, and out-of-range indices.
    pub fn index(&self, i: usize) -> Option<K> {
        match &self.data {
            KData::BoolVec(v) => v.get(i).map(|x| K::bool(*x)),
            KData::GuidVec(v) => v.get(i).map(|x| K::guid(*x)),
            KData::ByteVec(v) => v.get(i).map(|x| K::byte(*x)),
            KData::ShortVec(v) => v.get(i).map(|x| K::short(*x)),
            KData::IntVec(v) => v.get(i).map(|x| K::int(*x)),
            KData::LongVec(v) => v.get(i).map(|x| K::long(*x)),
            KData::RealVec(v) => v.get(i).map(|x| K::real(*x)),
            KData::FloatVec(v) => v.get(i).map(|x| K::float(*x)),
            KData::CharVec(s) => s.as_bytes().get(i).map(|x| K::char(*x)),
            KData::SymbolVec(v) => v.get(i).map(|x| K::symbol(x.clone())),
            KData::TimestampVec(v) => v.get(i).map(|x| K::timestamp(*x)),
            KData::MonthVec(v) => v.get(i).map(|x| K::month(*x)),
            KData::DateVec(v) => v.get(i).map(|x| K::date(*x)),
            KData::DatetimeVec(v) => v.get(i).map(|x| K::datetime(*x)),
            KData::TimespanVec(v) => v.get(i).map(|x| K::timespan(*x)),
            KData::MinuteVec(v) => v.get(i).map(|x| K::minute(*x)),
            KData::SecondVec(v) => v.get(i).map(|x| K::second(*x)),
            KData::TimeVec(v) => v.get(i).map(|x| K::time(*x)),
            KData::Mixed(v) | KData::Projection(v) | KData::Composition(v) => v.get(i).cloned(),
            KData::Table(t) => t.row(i).map(|d| K::new(KData::Dict(Box::new(d)))),
            _ => None,
        }
    }
}

impl From<bool> for K {
    fn from(x: bool) -> Self {
        Self::bool(x)
    }
}

impl From<i16> for K {
    fn from(x: i16) -> Self {
        Self::short(x)
    }
}

impl From<i32> for K {
    fn from(x: i32) -> Self {
        Self::int(x)
    }
}

impl From<i64> for K {
    fn from(x: i64) -> Self {
        Self::long(x)
    }
}

impl From<f32> for K {
    fn from(x: f32) -> Self {
        Self::real(x)
    }
}

impl From<f64> for K {
    fn from(x: f64) -> Self {
        Self::float(x)
    }
}

impl From<Uuid> for K {
    fn from(x: Uuid) -> Self {
        Self::guid(x)
    }
}

impl From<&str> for K {
    fn from(x: &str) -> Self {
        Self::string(x)
    }
}

impl From<String> for K {
    fn from(x: String) -> Self {
        Self::string(x)
    }
}

impl From<Vec<K>> for K {
    fn from(x: Vec<K>) -> Self {
        Self::mixed(x)
    }
}

fn fmt_seq<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], open: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(";")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(")")
}

impl fmt::Display for K {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.attr.prefix();
        match &self.data {
            KData::Bool(x) => write!(f, "{}b", *x as u8),
            KData::BoolVec(v) => {
                write!(f, "{p}")?;
                for x in v {
                    write!(f, "{}", *x as u8)?;
                }
                f.write_str("b")
            }
            KData::Guid(x) => write!(f, "{x}"),
            KData::GuidVec(v) => write!(f, "{p}{v:?}"),
            KData::Byte(x) => write!(f, "0x{x:02x}"),
            KData::ByteVec(v) => {
                write!(f, "{p}0x")?;
                for x in v {
                    write!(f, "{x:02x}")?;
                }
                Ok(())
            }
            KData::Short(x) => write!(f, "{x}"),
            KData::ShortVec(v) => write!(f, "{p}{v:?}"),
            KData::Int(x) => write!(f, "{x}"),
            KData::IntVec(v) => write!(f, "{p}{v:?}"),
            KData::Long(x) => write!(f, "{x}"),
            KData::LongVec(v) => write!(f, "{p}{v:?}"),
            KData::Real(x) => write!(f, "{x}"),
            KData::RealVec(v) => write!(f, "{p}{v:?}"),
            KData::Float(x) => write!(f, "{x}"),
            KData::FloatVec(v) => write!(f, "{p}{v:?}"),
            KData::Char(x) => write!(f, "\"{}\"", *x as char),
            KData::CharVec(s) => write!(f, "{p}\"{s}\""),
            KData::Symbol(s) => write!(f, "`{s}"),
            KData::SymbolVec(v) => {
                write!(f, "{p}")?;
                for s in v {
                    write!(f, "`{s}")?;
                }
                Ok(())
            }
            KData::Timestamp(x) => write!(f, "{x}"),
            KData::TimestampVec(v) => fmt_seq(f, v, "("),
            KData::Month(x) => write!(f, "{x}"),
            KData::MonthVec(v) => fmt_seq(f, v, "("),
            KData::Date(x) => write!(f, "{x}"),
            KData::DateVec(v) => fmt_seq(f, v, "("),
            KData::Datetime(x) => write!(f, "{x}"),
            KData::DatetimeVec(v) => fmt_seq(f, v, "("),
            KData::Timespan(x) => write!(f, "{x}"),
            KData::TimespanVec(v) => fmt_seq(f, v, "("),
            KData::Minute(x) => write!(f, "{x}"),
            KData::MinuteVec(v) => fmt_seq(f, v, "("),
            KData::Second(x) => write!(f, "{x}"),
            KData::SecondVec(v) => fmt_seq(f, v, "("),
            KData::Time(x) => write!(f, "{x}"),
            KData::TimeVec(v) => fmt_seq(f, v, "("),
            KData::Mixed(v) => {
                write!(f, "{p}")?;
                fmt_seq(f, v, "(")
            }
            KData::Dict(d) => write!(f, "{p}{}!{}", d.key, d.value),
            KData::Table(t) => {
                write!(f, "{p}+")?;
                for c in &t.columns {
                    write!(f, "`{c}")?;
                }
                f.write_str("!")?;
                fmt_seq(f, &t.data, "(")
            }
            KData::Lambda(l) => write!(f, "{}", l.body),
            KData::UnaryPrimitive(i) | KData::BinaryPrimitive(i) | KData::TernaryPrimitive(i) => {
                write!(f, "prim[{i}]")
            }
            KData::Projection(v) => fmt_seq(f, v, "projection("),
            KData::Composition(v) => fmt_seq(f, v, "composition("),
            KData::Adverb(a, inner) => write!(f, "{inner}{}", adverb_suffix(*a)),
            KData::Error(e) => write!(f, "'{e}"),
        }
    }
}

fn adverb_suffix(a: Adverb) -> &'static str {
    match a {
        Adverb::Each => "'",
        Adverb::Over => "/",
        Adverb::Scan => "\\",
        Adverb::Prior => "':",
        Adverb::EachRight => "/:",
        Adverb::EachLeft => "\\:",
    }
}
