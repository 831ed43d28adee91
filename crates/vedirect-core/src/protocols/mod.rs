//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: byte constants (source of truth)
//! - `reader`: checksum accumulation and field buffers
//! - `parser`: the byte-driven state machine
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; sources and the frame reader handle
//! byte acquisition.

pub mod vedirect;
