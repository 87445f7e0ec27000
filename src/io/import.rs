use anyhow::{Context, Result};
use std::io::Read;
use tracing::{info, warn};

use crate::application::ScheduleService;
use crate::domain::{parse_currency, DepreciationRecord, Series, YearMonth};
use crate::io::export::ScheduleSnapshot;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub validate_only: bool,
}

impl ImportOptions {
    fn writes(&self) -> bool {
        !self.dry_run && !self.validate_only
    }
}

/// Importer for loading back-office data into the local store
pub struct Importer<'a> {
    service: &'a ScheduleService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a ScheduleService) -> Self {
        Self { service }
    }

    /// Import depreciation records of one series from CSV.
    ///
    /// Header: `id,category_id,car_id,date,amount,active`. `active` may be
    /// omitted and defaults to true.
    pub async fn import_records_csv<R: Read>(
        &self,
        series: Series,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut result = ImportResult::default();

        for (line_num, row) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let record = match parse_record_row(&row) {
                Ok(record) => record,
                Err(error) => {
                    result.errors.push(ImportError { line, ..error });
                    continue;
                }
            };

            if options.writes() {
                if let Err(e) = self.service.save_record(series, &record).await {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: e.to_string(),
                    });
                    continue;
                }
            }
            result.imported += 1;
        }

        if !result.errors.is_empty() {
            warn!(%series, errors = result.errors.len(), "records rejected during import");
        }
        info!(%series, imported = result.imported, dry_run = !options.writes(), "imported records");
        Ok(result)
    }

    /// Import a full JSON snapshot. Categories keep the order they have in the file.
    pub async fn import_snapshot_json<R: Read>(
        &self,
        mut reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        let snapshot: ScheduleSnapshot =
            serde_json::from_str(&json).context("Invalid snapshot JSON")?;

        let mut result = ImportResult::default();

        for car in &snapshot.cars {
            if options.writes() {
                self.service.save_car(car).await?;
            }
            result.imported += 1;
        }

        for category in &snapshot.categories {
            if options.writes() {
                self.service.save_category(category).await?;
            }
            result.imported += 1;
        }

        let series_records = [
            (Series::Current, &snapshot.depreciation),
            (Series::WithAdd, &snapshot.depreciation_with_add),
        ];
        for (series, records) in series_records {
            for (i, record) in records.iter().enumerate() {
                if YearMonth::parse(&record.date).is_none() {
                    result.errors.push(ImportError {
                        line: i + 1,
                        field: Some(format!("{}.date", series)),
                        error: format!("Invalid date '{}': expected YYYY-MM", record.date),
                    });
                    result.skipped += 1;
                    continue;
                }
                if options.writes() {
                    self.service.save_record(series, record).await?;
                }
                result.imported += 1;
            }
        }

        info!(
            version = %snapshot.version,
            imported = result.imported,
            skipped = result.skipped,
            "imported snapshot"
        );
        Ok(result)
    }
}

fn parse_record_row(row: &csv::StringRecord) -> std::result::Result<DepreciationRecord, ImportError> {
    let field_error = |field: &str, error: String| ImportError {
        line: 0,
        field: Some(field.to_string()),
        error,
    };

    let int_field = |index: usize, name: &str| -> std::result::Result<i64, ImportError> {
        let raw = row.get(index).unwrap_or("").trim();
        raw.parse()
            .map_err(|_| field_error(name, format!("Invalid {}: '{}'", name, raw)))
    };

    let id = int_field(0, "id")?;
    let category_id = int_field(1, "category_id")?;
    let car_id = int_field(2, "car_id")?;

    let date = row.get(3).unwrap_or("").trim().to_string();
    if YearMonth::parse(&date).is_none() {
        return Err(field_error(
            "date",
            format!("Invalid date '{}': expected YYYY-MM", date),
        ));
    }

    let amount = parse_currency(row.get(4).unwrap_or(""))
        .map_err(|e| field_error("amount", format!("Invalid amount: {}", e)))?;

    let active = match row.get(5).map(|s| s.trim().to_lowercase()) {
        None => true,
        Some(s) if s.is_empty() => true,
        Some(s) => match s.as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => {
                return Err(field_error("active", format!("Invalid active flag: '{}'", other)));
            }
        },
    };

    Ok(DepreciationRecord {
        id,
        category_id,
        car_id,
        date,
        amount,
        active,
    })
}
