//! DBF fixed-layout table format.
//!
//! Header, column descriptor and record codecs plus the stream-level reader
//! and writer that place them at their fixed offsets.

pub mod types;
pub mod record;
pub mod reader;
pub mod writer;

pub use types::*;
pub use record::Record;
pub use reader::TableReader;
pub use writer::TableWriter;
