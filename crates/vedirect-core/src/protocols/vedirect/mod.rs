//! VE.Direct text-protocol decoding.
//!
//! Devices emit blocks of `\r\n<key>\t<value>` fields closed by a `Checksum`
//! field whose single raw byte makes the block sum to 0 mod 256. There is no
//! length or frame delimiter: a frame ends when the first field name of a
//! cycle recurs and the checksum that follows validates. Binary HEX traffic
//! (`:` up to the next `\n`) shares the link and is skipped without decoding.
//!
//! Byte constants live in `layout`, checksum and field buffers in `reader`,
//! the state machine in `parser`.

pub mod error;
pub mod frame;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::FrameError;
pub use frame::Frame;
pub use parser::{DecoderState, DecoderStats, FrameDecoder};
