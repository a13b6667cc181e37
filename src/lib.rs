pub mod config;
pub mod error;
pub mod report;
pub mod telemetry;

pub use error::AppError;
pub use report::assembler::views::ReportDocument;
pub use report::{assemble_report, AuditRequest, ReportContext, ReportOptions};
