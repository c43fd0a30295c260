//! en-ecl: fixed-format binary keyword records.
//!
//! Simulator output (summary headers, summary data, restart snapshots) is a
//! flat sequence of Fortran-unformatted keyword records: an 8-character
//! keyword, a typed element count, and the payload split into length-framed
//! blocks. This crate owns that wire format and nothing else; what the
//! records *mean* is the business of the layers above.

pub mod codec;
pub mod error;
pub mod filename;
pub mod record;

pub use codec::{read_record, read_records, write_record, write_records};
pub use error::{EclError, EclResult};
pub use filename::{EclFileKind, ecl_filename};
pub use record::{EclData, EclKind, EclRecord, STRING_WIDTH, find};
