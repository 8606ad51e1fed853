//! Minimal miniSEED 2.x support for the playback tools.
//!
//! Only the fixed section of data header and blockettes 100, 1000 and 1001
//! are interpreted; the data section is carried as opaque bytes. Records
//! are self-delimiting through the blockette 1000 record length.

mod error;
mod header;
mod reader;
mod record;

pub use error::MseedError;
pub use header::{ByteOrder, FIXED_HEADER_LEN, FixedHeader, MAX_RECORD_EXP, MIN_RECORD_EXP};
pub use reader::MseedReader;
pub use record::{Blockettes, MseedRecord};

#[cfg(any(test, feature = "synth"))]
pub mod synth;
