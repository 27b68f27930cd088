//! kxr — A pure-Rust Q IPC (kdb+) wire protocol library.
//!
//! This crate implements the binary IPC protocol spoken by kdb+ and
//! compatible column-store databases. It provides the typed value tree,
//! the bidirectional codec (including the Q IPC compression scheme),
//! and client/server components for conveying messages over TCP, TLS,
//! or OS-local sockets.
//!
//! # Architecture
//!
//! - **`types`** — The `K` value tree (atoms, typed vectors, dictionaries,
//!   tables, functions) and the Q temporal newtypes
//! - **`ipc`** — Framing, encoding/decoding, and the compression codec
//! - **`client`** — Connection with handshake, sync/async calls
//! - **`server`** — Accept loop dispatching decoded messages to a handler
//! - **`de`** — serde mapping of decoded dictionaries and tables onto records

pub mod client;
pub mod de;
pub mod error;
pub mod ipc;
pub mod server;
pub mod types;

pub use client::Connection;
pub use de::from_k;
pub use error::KxError;
pub use ipc::MessageType;
pub use server::{KxHandler, KxServer, RejectSync};
pub use types::{Attr, Dict, K, KData, Lambda, Table};
