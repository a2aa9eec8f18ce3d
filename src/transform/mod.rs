//! Record cleaning, unit conversion, grouping and pipeline orchestration.

pub mod clean;
pub mod grouper;
pub mod pipeline;

pub use clean::{convert_to_kilograms, filter_records, DropReason, DroppedRow};
pub use grouper::{group_records, license_ids};
pub use pipeline::{process, Diagnostics, FileInfo, ProcessResult, Summary};
