// Application layer - use cases on top of the repository and the calculator.
// The CLI goes through ScheduleService; exporters take the reports built here.

pub mod error;
pub mod reporting;
mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
