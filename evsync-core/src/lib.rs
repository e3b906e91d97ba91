//! Core of the evsync ecosystem.
//!
//! This crate holds everything the CLI needs apart from argument parsing and
//! terminal output:
//! - `store`, `intern`, `resolve`, `recall` for the persisted record store
//! - `temporal` for timestamp decoding/encoding
//! - `shape` and `forward` for turning source events into calendar events
//! - `remote` and `auth` for the HTTP collaborators
//! - `config` for per-profile settings

pub mod auth;
pub mod config;
pub mod error;
pub mod forward;
pub mod intern;
pub mod recall;
pub mod remote;
pub mod resolve;
pub mod shape;
pub mod store;
pub mod temporal;
pub mod value;

pub use error::{SyncError, SyncResult};
pub use store::RecordStore;
pub use temporal::TemporalCodec;
pub use value::{Record, Store, Value};
