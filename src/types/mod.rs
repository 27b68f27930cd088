//! Q IPC value types.

mod temporal;
mod value;

pub use temporal::{Date, Datetime, Minute, Month, Second, Time, Timespan, Timestamp};
pub use value::{
    Adverb, Dict, K, KData, Lambda, Table, INF_FLOAT, INF_INT, INF_LONG, INF_REAL, INF_SHORT,
    NULL_FLOAT, NULL_INT, NULL_LONG, NULL_REAL, NULL_SHORT,
};

/// Vector attribute: known ordering or grouping of a vector or table.
///
/// Carried on the wire but never checked at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attr {
    #[default]
    None,
    Sorted,
    Unique,
    Parted,
    Grouped,
}

impl Attr {
    pub fn from_wire(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::None),
            1 => Some(Self::Sorted),
            2 => Some(Self::Unique),
            3 => Some(Self::Parted),
            4 => Some(Self::Grouped),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Sorted => 1,
            Self::Unique => 2,
            Self::Parted => 3,
            Self::Grouped => 4,
        }
    }

    /// The q display prefix for this attribute.
    pub(crate) fn prefix(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Sorted => "`s#",
            Self::Unique => "`u#",
            Self::Parted => "`p#",
            Self::Grouped => "`g#",
        }
    }
}

/// Canonical Q type codes. Negative codes are atoms, their positive
/// counterparts homogeneous vectors of the same element type.
pub mod code {
    pub const MIXED: i8 = 0;
    pub const BOOLEAN: i8 = 1;
    pub const GUID: i8 = 2;
    pub const BYTE: i8 = 4;
    pub const SHORT: i8 = 5;
    pub const INT: i8 = 6;
    pub const LONG: i8 = 7;
    pub const REAL: i8 = 8;
    pub const FLOAT: i8 = 9;
    pub const CHAR: i8 = 10;
    pub const SYMBOL: i8 = 11;
    pub const TIMESTAMP: i8 = 12;
    pub const MONTH: i8 = 13;
    pub const DATE: i8 = 14;
    pub const DATETIME: i8 = 15;
    pub const TIMESPAN: i8 = 16;
    pub const MINUTE: i8 = 17;
    pub const SECOND: i8 = 18;
    pub const TIME: i8 = 19;
    pub const TABLE: i8 = 98;
    pub const DICT: i8 = 99;
    pub const LAMBDA: i8 = 100;
    pub const UNARY_PRIMITIVE: i8 = 101;
    pub const BINARY_PRIMITIVE: i8 = 102;
    pub const TERNARY_PRIMITIVE: i8 = 103;
    pub const PROJECTION: i8 = 104;
    pub const COMPOSITION: i8 = 105;
    pub const EACH: i8 = 106;
    pub const OVER: i8 = 107;
    pub const SCAN: i8 = 108;
    pub const PRIOR: i8 = 109;
    pub const EACH_RIGHT: i8 = 110;
    pub const EACH_LEFT: i8 = 111;
    pub const DYNAMIC_LOAD: i8 = 112;
    pub const SORTED_DICT: i8 = 127;
    pub const ERROR: i8 = -128;
}
