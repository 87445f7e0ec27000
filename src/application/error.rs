use thiserror::Error;

use crate::domain::{CarId, CategoryId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Car not found: {0}")]
    CarNotFound(CarId),

    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    #[error("Invalid month: {0} (expected 1-12)")]
    InvalidMonth(u32),

    #[error("Invalid year: {0} (expected YYYY)")]
    InvalidYear(String),

    #[error("Invalid date '{0}': expected YYYY-MM")]
    InvalidDate(String),

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    #[error("Workbook export is unavailable in this build (enable the `xlsx` feature)")]
    XlsxUnavailable,

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
