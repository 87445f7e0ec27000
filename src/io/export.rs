use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::application::{
    DepreciationSchedule, ScheduleService, ScheduleTable, MONTH_LABELS,
};
use crate::application::AppError;
use crate::domain::{
    format_currency, format_percentage, sanitize_field, sorted_by_id, CarId, CarProfile,
    CostCategory, DepreciationRecord, Series,
};

pub const TEMPLATE_CSV_FILENAME: &str = "NADA Depreciation Schedule Template.csv";
pub const TEMPLATE_XLSX_FILENAME: &str = "NADA Depreciation Schedule Template.xlsx";
pub const TEMPLATE_SHEET_NAME: &str = "NADA Depreciation";

const UTF8_BOM: &str = "\u{FEFF}";

/// Database snapshot mirroring a back-office dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub cars: Vec<CarProfile>,
    pub categories: Vec<CostCategory>,
    pub depreciation: Vec<DepreciationRecord>,
    pub depreciation_with_add: Vec<DepreciationRecord>,
}

/// Output format of the fill-in template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Csv,
    Xlsx,
}

impl TemplateFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateFormat::Csv => "csv",
            TemplateFormat::Xlsx => "xlsx",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(TemplateFormat::Csv),
            "xlsx" | "excel" => Some(TemplateFormat::Xlsx),
            _ => None,
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            TemplateFormat::Csv => TEMPLATE_CSV_FILENAME,
            TemplateFormat::Xlsx => TEMPLATE_XLSX_FILENAME,
        }
    }
}

/// `Export {year} {make model}-{owner} NADA depreciation schedule.csv`
pub fn detailed_filename(year: &str, make_model: &str, owner_full_name: &str) -> String {
    let name = format!(
        "Export {} {}-{} NADA depreciation schedule.csv",
        year, make_model, owner_full_name
    );
    name.replace(['/', '\\'], "-")
}

/// Write the detailed schedule: header block, prior year, change %, current
/// year and equity. Starts with a UTF-8 byte-order mark.
pub fn write_detailed_csv<W: Write>(schedule: &DepreciationSchedule, mut writer: W) -> Result<()> {
    writer.write_all(UTF8_BOM.as_bytes())?;
    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);

    let car = &schedule.car;
    let text = |value: &Option<String>| sanitize_field(value.as_deref().unwrap_or_default());

    // Header block
    csv_writer.write_record(["NADA Depreciation Schedule", schedule.year.as_str()])?;
    let model_year = car.model_year.map(|y| y.to_string()).unwrap_or_default();
    let header_block = [
        ("Car", sanitize_field(&car.make_model)),
        ("Model Year", model_year),
        ("VIN", text(&car.vin)),
        ("License Plate", text(&car.license_plate)),
        ("Owner", sanitize_field(&car.owner_full_name())),
        ("Email", text(&car.owner_email)),
        ("Phone", text(&car.owner_phone)),
    ];
    for (label, value) in &header_block {
        csv_writer.write_record([*label, value.as_str()])?;
    }
    csv_writer.write_record([""])?;

    write_schedule_section(&mut csv_writer, "Prior Year Schedule", &schedule.prior)?;
    csv_writer.write_record([""])?;

    // Change %
    csv_writer.write_record(["Change %"])?;
    let mut header = vec!["Category"];
    header.extend(MONTH_LABELS);
    header.extend(["Average", "Current"]);
    csv_writer.write_record(&header)?;
    for row in &schedule.change.rows {
        let mut record = vec![sanitize_field(&row.label)];
        record.extend(row.months.iter().map(|v| format_percentage(*v)));
        record.push(format_percentage(row.average));
        record.push(format_percentage(row.current));
        csv_writer.write_record(&record)?;
    }
    csv_writer.write_record([""])?;

    write_schedule_section(&mut csv_writer, "Current Year Schedule", &schedule.current)?;
    let mut equity = vec!["Equity".to_string()];
    equity.extend(schedule.equity.months.iter().map(|v| format_currency(*v)));
    equity.push(format_currency(schedule.equity.current));
    csv_writer.write_record(&equity)?;

    csv_writer.flush()?;
    Ok(())
}

fn write_schedule_section<W: Write>(
    csv_writer: &mut csv::Writer<W>,
    title: &str,
    table: &ScheduleTable,
) -> Result<()> {
    csv_writer.write_record([title])?;
    let mut header = vec!["Category"];
    header.extend(MONTH_LABELS);
    header.push("Current");
    csv_writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![sanitize_field(&row.category_name)];
        record.extend(row.months.iter().map(|v| format_currency(*v)));
        record.push(format_currency(row.current));
        csv_writer.write_record(&record)?;
    }
    Ok(())
}

/// One cell of the fill-in template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateCell {
    Text(String),
    Blank,
    Zero,
}

/// Prior year and current year sections, categories by ID, every month 0.
pub fn template_rows(categories: &[CostCategory]) -> Vec<Vec<TemplateCell>> {
    let sorted = sorted_by_id(categories);
    let header = || {
        let mut row = vec![TemplateCell::Text("Category".to_string())];
        row.extend(MONTH_LABELS.iter().map(|m| TemplateCell::Text(m.to_string())));
        row
    };

    let mut rows = Vec::new();
    for (i, title) in ["Prior Year", "Current Year"].into_iter().enumerate() {
        if i > 0 {
            rows.push(vec![TemplateCell::Blank]);
        }
        rows.push(vec![TemplateCell::Text(title.to_string())]);
        rows.push(header());
        for category in &sorted {
            let mut row = vec![TemplateCell::Text(sanitize_field(&category.name))];
            row.extend(std::iter::repeat_n(TemplateCell::Zero, 12));
            rows.push(row);
        }
    }
    rows
}

pub fn write_template_csv<W: Write>(categories: &[CostCategory], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);

    for row in template_rows(categories) {
        let record: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                TemplateCell::Text(s) => s.clone(),
                TemplateCell::Blank => String::new(),
                TemplateCell::Zero => "0".to_string(),
            })
            .collect();
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Workbook failures surface as `AppError::Export`.
#[cfg(feature = "xlsx")]
pub fn write_template_xlsx(categories: &[CostCategory], path: &Path) -> Result<()> {
    let mut workbook = template_workbook(categories)
        .map_err(|e| AppError::Export(format!("template workbook: {}", e)))?;
    workbook
        .save(path)
        .map_err(|e| AppError::Export(format!("{}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(feature = "xlsx")]
fn template_workbook(
    categories: &[CostCategory],
) -> Result<rust_xlsxwriter::Workbook, rust_xlsxwriter::XlsxError> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(TEMPLATE_SHEET_NAME)?;
    worksheet.set_column_width(0, 25.0)?;
    for col in 1..=12u16 {
        worksheet.set_column_width(col, 12.0)?;
    }

    for (r, row) in template_rows(categories).iter().enumerate() {
        let r = r as u32;
        let title_row = row.len() == 1;
        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            match cell {
                TemplateCell::Text(s) if title_row => {
                    worksheet.write_string_with_format(r, c, s, &bold)?;
                }
                TemplateCell::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                TemplateCell::Zero => {
                    worksheet.write_number(r, c, 0.0)?;
                }
                TemplateCell::Blank => {}
            }
        }
    }

    Ok(workbook)
}

#[cfg(not(feature = "xlsx"))]
pub fn write_template_xlsx(_categories: &[CostCategory], _path: &Path) -> Result<()> {
    Err(AppError::XlsxUnavailable.into())
}

/// Exporter writing schedule files into a directory
pub struct Exporter<'a> {
    service: &'a ScheduleService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a ScheduleService) -> Self {
        Self { service }
    }

    /// Write the detailed schedule for one car and year. Returns the file path.
    pub async fn export_detailed(&self, car_id: CarId, year: &str, dir: &Path) -> Result<PathBuf> {
        let schedule = self.service.schedule(car_id, year).await?;
        let filename = detailed_filename(
            year,
            &schedule.car.make_model,
            &schedule.car.owner_full_name(),
        );
        let path = dir.join(filename);

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_detailed_csv(&schedule, BufWriter::new(file))?;

        info!(car_id, year, path = %path.display(), "exported detailed schedule");
        Ok(path)
    }

    /// Write the all-zero template in the given format. Returns the file path.
    pub async fn export_template(&self, format: TemplateFormat, dir: &Path) -> Result<PathBuf> {
        let categories = self.service.list_categories().await?;
        let path = dir.join(format.filename());

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
        match format {
            TemplateFormat::Csv => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_template_csv(&categories, BufWriter::new(file))?;
            }
            TemplateFormat::Xlsx => write_template_xlsx(&categories, &path)?,
        }

        info!(format = format.as_str(), path = %path.display(), "exported template");
        Ok(path)
    }

    /// Export everything as a JSON snapshot
    pub async fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<ScheduleSnapshot> {
        let snapshot = ScheduleSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            cars: self.service.list_cars().await?,
            categories: self.service.list_categories().await?,
            depreciation: self.service.list_all_records(Series::Current).await?,
            depreciation_with_add: self.service.list_all_records(Series::WithAdd).await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::build_schedule;

    fn categories() -> Vec<CostCategory> {
        vec![
            CostCategory::new(2, "Clean"),
            CostCategory::new(1, "Retail"),
            CostCategory::new(6, "Amount Owed"),
        ]
    }

    #[test]
    fn test_detailed_filename() {
        assert_eq!(
            detailed_filename("2024", "Toyota Camry", "Ana Lopez"),
            "Export 2024 Toyota Camry-Ana Lopez NADA depreciation schedule.csv"
        );
        assert_eq!(
            detailed_filename("2024", "A/B", "C"),
            "Export 2024 A-B-C NADA depreciation schedule.csv"
        );
    }

    #[test]
    fn test_template_format_parse() {
        assert_eq!(TemplateFormat::from_str("CSV"), Some(TemplateFormat::Csv));
        assert_eq!(TemplateFormat::from_str("xlsx"), Some(TemplateFormat::Xlsx));
        assert_eq!(TemplateFormat::from_str("pdf"), None);
        assert_eq!(TemplateFormat::Xlsx.filename(), TEMPLATE_XLSX_FILENAME);
    }

    #[test]
    fn test_template_rows_sorted_and_zeroed() {
        let rows = template_rows(&categories());
        // title, header, 3 categories, blank, title, header, 3 categories
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[0], vec![TemplateCell::Text("Prior Year".into())]);
        assert_eq!(rows[2][0], TemplateCell::Text("Retail".into()));
        assert_eq!(rows[3][0], TemplateCell::Text("Clean".into()));
        assert_eq!(rows[4][0], TemplateCell::Text("Amount Owed".into()));
        assert!(rows[2][1..].iter().all(|c| *c == TemplateCell::Zero));
        assert_eq!(rows[2].len(), 13);
        assert_eq!(rows[6], vec![TemplateCell::Text("Current Year".into())]);
    }

    #[test]
    fn test_template_csv() {
        let mut out = Vec::new();
        write_template_csv(&categories(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Prior Year");
        assert_eq!(lines[1], "Category,Jan,Feb,Mar,Apr,May,Jun,Jul,Aug,Sep,Oct,Nov,Dec");
        assert_eq!(lines[2], "Retail,0,0,0,0,0,0,0,0,0,0,0,0");
        assert_eq!(lines[6], "Current Year");
    }

    #[test]
    fn test_detailed_csv_layout() {
        let car = CarProfile {
            vin: Some("1HGCM82633A004352".into()),
            license_plate: Some("8ABC123".into()),
            owner_email: Some("ana@example.com".into()),
            owner_phone: Some("555-0100".into()),
            ..CarProfile::new(7, "Toyota Camry").with_owner("Ana", "Lopez, Jr.")
        };
        let prior = vec![DepreciationRecord::new(1, 1, 7, "2024-03", 25000.0)];
        let current = vec![
            DepreciationRecord::new(2, 1, 7, "2024-03", 20000.0),
            DepreciationRecord::new(3, 6, 7, "2024-03", 12000.0),
        ];
        let cats = vec![
            CostCategory::new(1, "Retail"),
            CostCategory::new(6, "Amount Owed"),
        ];
        let schedule = build_schedule(car, "2024", &prior, &current, &cats);

        let mut out = Vec::new();
        write_detailed_csv(&schedule, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with('\u{FEFF}'));
        assert!(text.contains("Owner,Ana Lopez Jr.\n"));
        assert!(text.contains("VIN,1HGCM82633A004352\n"));
        assert!(text.contains("Prior Year Schedule\n"));
        assert!(text.contains("Change %\n"));
        assert!(text.contains("Current Year Schedule\n"));
        assert!(text.contains("Retail,0.00%,0.00%,-20.00%,"));
        assert!(text.contains("\"$ 25,000.00\""));

        let equity = text.lines().last().unwrap();
        assert!(equity.starts_with("Equity,$ 0.00,$ 0.00,\"$ 8,000.00\""));
        assert!(equity.ends_with("\"$ 8,000.00\""));
    }
}
