//! # groupscholar-semester-gpa
//!
//! Grade-point computation for semester marks and a flat-file store of the
//! resulting student records.
pub mod codec;
pub mod config;
pub mod grade;
pub mod import;
pub mod models;
pub mod report;
pub mod stats;
pub mod store;

pub use config::StoreConfig;
pub use grade::{compute_simple, compute_weighted, Classification, Grade};
pub use models::{Computation, SemesterRecord, StudentInfo, Subject, ValidationError};
pub use stats::{summarize, Summary};
pub use store::{KeyPolicy, Outcome, RecordStore, StoreError, SwapMode};
