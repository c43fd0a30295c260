//! en-smspec: summary-index registry and summary data files.
//!
//! The registry is the authoritative mapping between human-meaningful
//! variable identifiers (`WOPR:P1`, `FOPR`, `RPR:3`) and column positions in
//! the flat per-timestep result vectors. It is populated either
//! programmatically (when declaring a new case) or by parsing an existing
//! binary header file, and it is the lookup structure every result load
//! goes through.

pub mod error;
pub mod header;
pub mod node;
pub mod registry;
pub mod summary;

pub use error::{SmspecError, SmspecResult};
pub use header::{read_header, write_header};
pub use node::{DUMMY_WELL, LgrLocation, SmspecNode, SmspecVarKind};
pub use registry::{GridDims, SmspecRegistry, UnitSystem};
pub use summary::{MiniStep, SummaryData, SummaryWriter, case_file};
