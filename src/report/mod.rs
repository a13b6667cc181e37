pub mod assembler;
pub mod domain;
pub mod history;
pub mod keys;
pub mod normalizer;
pub mod pictures;
pub mod scoring;
pub mod sources;
pub mod thresholds;

pub use assembler::{assemble_report, AuditRequest, ReportContext, ReportError, ReportOptions};
pub use thresholds::{ThresholdResolver, Thresholds};
