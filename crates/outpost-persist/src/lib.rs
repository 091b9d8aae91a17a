//! Ordered subsystem snapshots in a compressed save stream.
//!
//! A save is a gzip stream holding, in a fixed order, one independently
//! decodable binary frame per subsystem: listener roster, malfunction
//! registry, environment, missions, event log, crew, settlement, clock.
//! Load reconstructs them in the same order; the caller then runs its
//! rebind pass (re-attaching listeners) before any pulse resumes.
//!
//! Persistence failures are fatal by contract: a bad magic, version
//! mismatch, or truncated stream is reported to the operator and the
//! process exits cleanly -- there is no partial-state resume.
//!
//! # Modules
//!
//! - [`error`] -- [`PersistError`].
//! - [`snapshot`] -- [`SaveData`], the section order, and the stream
//!   encode/decode functions.
//!
//! [`PersistError`]: error::PersistError
//! [`SaveData`]: snapshot::SaveData

pub mod error;
pub mod snapshot;

pub use error::PersistError;
pub use snapshot::{
    load_from_path, load_from_reader, save_to_path, save_to_writer, ClockSnapshot, SaveData,
    SAVE_VERSION,
};
