//! Q IPC client: connection management and calls.

mod connection;

pub use connection::{Connection, CAPABILITY};
