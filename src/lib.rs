//! In-memory student roster with cached dashboard statistics and CSV exchange.

pub mod config;
pub mod error;
pub mod exchange;
pub mod models;
pub mod report;
pub mod stats;
pub mod store;
pub mod validation;

pub use error::{Outcome, StoreError, StoreResult};
pub use exchange::ImportReport;
pub use models::{
    Activity, AttendanceTier, DirectoryFilter, Grade, PerformanceTier, StudentDraft,
    StudentPatch, StudentRecord,
};
pub use stats::{PerformanceAnalysis, StatisticsEngine, StatisticsSnapshot, Trend};
pub use store::{IntegrityIssue, StudentManager};
pub use validation::validate;
