use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

use crate::application::{AppError, ChangeTable, ScheduleService, ScheduleTable, MONTH_LABELS};
use crate::config::Settings;
use crate::domain::{
    format_currency, format_percentage, ChangeField, MonthSelector, Series, CHANGE_CATEGORIES,
};
use crate::io::{Exporter, ImportOptions, ImportResult, Importer, TemplateFormat};

/// nada - NADA depreciation schedules for fleet cars
#[derive(Parser)]
#[command(name = "nada")]
#[command(about = "Depreciation schedules, change tables and equity for fleet cars")]
#[command(version)]
pub struct Cli {
    /// Settings file (JSON); falls back to $NADA_CONFIG
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file path (overrides the settings file)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Import back-office data
    #[command(subcommand)]
    Import(ImportCommands),

    /// List cost categories in schedule order
    Categories,

    /// List known cars
    Cars,

    /// Look up one category's value for a month
    Lookup {
        #[arg(long)]
        car: i64,

        #[arg(long)]
        category: i64,

        /// Year (YYYY)
        #[arg(long)]
        year: String,

        /// Month 1-12 (omit for the latest month present)
        #[arg(long)]
        month: Option<u32>,

        /// Series: current, with-add
        #[arg(long, default_value = "current")]
        series: String,
    },

    /// Change from the with-add series to the current series for a month
    Change {
        #[arg(long)]
        car: i64,

        #[arg(long)]
        year: String,

        #[arg(long)]
        month: u32,

        /// Print a single field: retail, clean, average, rough
        #[arg(long)]
        field: Option<String>,

        /// Output format: table, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Change between the latest months of both series for one category
    CurrentChange {
        #[arg(long)]
        car: i64,

        #[arg(long)]
        category: i64,

        #[arg(long)]
        year: String,
    },

    /// Retail value minus amount owed for a month
    Equity {
        #[arg(long)]
        car: i64,

        #[arg(long)]
        year: String,

        #[arg(long)]
        month: u32,
    },

    /// Show the full depreciation schedule of a car
    Schedule {
        #[arg(long)]
        car: i64,

        #[arg(long)]
        year: String,

        /// Output format: table, json, csv
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Export schedule files
    #[command(subcommand)]
    Export(ExportCommands),
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import a JSON snapshot (cars, categories and both series)
    Snapshot {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Validate without importing
        #[arg(long)]
        validate: bool,
    },

    /// Import records of one series from CSV
    Records {
        /// Series: current, with-add
        #[arg(long)]
        series: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Validate without importing
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Detailed schedule CSV for one car and year
    Detailed {
        #[arg(long)]
        car: i64,

        #[arg(long)]
        year: String,

        /// Output directory (defaults to the configured export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Empty fill-in template
    Template {
        /// Format: csv, xlsx
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output directory (defaults to the configured export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full JSON snapshot
    Snapshot {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// How a report is printed on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    /// Parse `s`, accepting only the formats listed in `allowed`.
    pub fn parse(s: &str, allowed: &[OutputFormat]) -> Result<Self, AppError> {
        let format = match s.to_lowercase().as_str() {
            "table" => OutputFormat::Table,
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => return Err(AppError::UnknownFormat(s.to_string())),
        };
        if allowed.contains(&format) {
            Ok(format)
        } else {
            Err(AppError::UnknownFormat(s.to_string()))
        }
    }
}

impl Cli {
    pub async fn run(self, settings: Settings) -> Result<()> {
        let database = self.database.unwrap_or_else(|| settings.database.clone());

        match self.command {
            Commands::Init => {
                ScheduleService::init(&database).await?;
                println!("Database initialized: {}", database);
            }

            Commands::Import(cmd) => {
                let service = ScheduleService::connect(&database).await?;
                run_import_command(&service, cmd).await?;
            }

            Commands::Categories => {
                let service = ScheduleService::connect(&database).await?;
                let categories = service.list_categories().await?;
                if categories.is_empty() {
                    println!("No categories found.");
                } else {
                    println!("{:<6} {:<24} {:<12}", "ID", "NAME", "ROLE");
                    println!("{}", "-".repeat(44));
                    for category in categories {
                        println!(
                            "{:<6} {:<24} {:<12}",
                            category.id,
                            truncate(&category.name, 24),
                            category.role.map(|r| r.as_str()).unwrap_or("-")
                        );
                    }
                }
            }

            Commands::Cars => {
                let service = ScheduleService::connect(&database).await?;
                let cars = service.list_cars().await?;
                if cars.is_empty() {
                    println!("No cars found.");
                } else {
                    println!("{:<6} {:<24} {:<20} {:<24}", "ID", "CAR", "VIN", "OWNER");
                    println!("{}", "-".repeat(77));
                    for car in cars {
                        println!(
                            "{:<6} {:<24} {:<20} {:<24}",
                            car.id,
                            truncate(&car.make_model, 24),
                            car.vin.as_deref().unwrap_or("-"),
                            truncate(&car.owner_full_name(), 24)
                        );
                    }
                }
            }

            Commands::Lookup {
                car,
                category,
                year,
                month,
                series,
            } => {
                let service = ScheduleService::connect(&database).await?;
                let series = parse_series(&series)?;
                let selector = month.map(MonthSelector::Month).unwrap_or(MonthSelector::Latest);
                let category = service.get_category(category).await?;
                let result = service.lookup(series, car, category.id, selector, &year).await?;

                println!("Category: {}", category.name);
                println!("Amount:  {}", format_currency(result.amount));
                println!("Latest:  {}", format_currency(result.current_amount));
                match result.record {
                    Some(record) => println!("Record:  #{} ({})", record.id, record.date),
                    None => println!("Record:  none"),
                }
            }

            Commands::Change {
                car,
                year,
                month,
                field,
                format,
            } => {
                let format = OutputFormat::parse(&format, &[OutputFormat::Table, OutputFormat::Json])?;
                let service = ScheduleService::connect(&database).await?;
                let changes = service.change_percentages(car, month, &year).await?;

                if let Some(field) = field {
                    let field = ChangeField::from_str(&field)
                        .ok_or_else(|| anyhow::anyhow!("Unknown change field '{}'", field))?;
                    println!("{}", format_percentage(changes.get(field)));
                } else if format == OutputFormat::Json {
                    println!("{}", serde_json::to_string_pretty(&changes)?);
                } else {
                    println!("Change % for {} {}", MONTH_LABELS[month as usize - 1], year);
                    for (category_id, label) in CHANGE_CATEGORIES {
                        println!(
                            "  {:<10} {:>10}",
                            label,
                            format_percentage(changes.for_category(category_id))
                        );
                    }
                }
            }

            Commands::CurrentChange { car, category, year } => {
                let service = ScheduleService::connect(&database).await?;
                let category = service.get_category(category).await?;
                let change = service.current_change(car, category.id, &year).await?;
                println!("{}", format_percentage(change));
            }

            Commands::Equity { car, year, month } => {
                let service = ScheduleService::connect(&database).await?;
                let equity = service.equity(car, month, &year).await?;
                println!("{}", format_currency(equity));
            }

            Commands::Schedule { car, year, format } => {
                let format = OutputFormat::parse(
                    &format,
                    &[OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv],
                )?;
                let service = ScheduleService::connect(&database).await?;
                let schedule = service.schedule(car, &year).await?;

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&schedule)?),
                    OutputFormat::Csv => {
                        crate::io::write_detailed_csv(&schedule, io::stdout().lock())?;
                    }
                    OutputFormat::Table => {
                        println!(
                            "{} - {} ({})",
                            schedule.car.make_model,
                            schedule.car.owner_full_name(),
                            schedule.year
                        );
                        println!();
                        print_schedule_table("Prior Year Schedule", &schedule.prior);
                        println!();
                        print_change_table(&schedule.change);
                        println!();
                        print_schedule_table("Current Year Schedule", &schedule.current);
                        print_amount_row("Equity", &schedule.equity.months, schedule.equity.current);
                    }
                }
            }

            Commands::Export(cmd) => {
                let service = ScheduleService::connect(&database).await?;
                run_export_command(&service, &settings, cmd).await?;
            }
        }

        Ok(())
    }
}

async fn run_import_command(service: &ScheduleService, cmd: ImportCommands) -> Result<()> {
    let (input, options, result) = match cmd {
        ImportCommands::Snapshot {
            input,
            dry_run,
            validate,
        } => {
            let options = ImportOptions {
                dry_run,
                validate_only: validate,
            };
            let reader = open_input(input.as_deref())?;
            let result = Importer::new(service)
                .import_snapshot_json(reader, options.clone())
                .await?;
            (input, options, result)
        }
        ImportCommands::Records {
            series,
            input,
            dry_run,
            validate,
        } => {
            let series = parse_series(&series)?;
            let options = ImportOptions {
                dry_run,
                validate_only: validate,
            };
            let reader = open_input(input.as_deref())?;
            let result = Importer::new(service)
                .import_records_csv(series, reader, options.clone())
                .await?;
            (input, options, result)
        }
    };

    print_import_result(input.as_deref().unwrap_or("stdin"), &options, &result);
    Ok(())
}

async fn run_export_command(
    service: &ScheduleService,
    settings: &Settings,
    cmd: ExportCommands,
) -> Result<()> {
    let exporter = Exporter::new(service);

    match cmd {
        ExportCommands::Detailed { car, year, output } => {
            let dir = output.unwrap_or_else(|| settings.export_dir());
            let path = exporter.export_detailed(car, &year, &dir).await?;
            println!("Wrote {}", path.display());
        }
        ExportCommands::Template { format, output } => {
            let format = TemplateFormat::from_str(&format)
                .ok_or(AppError::UnknownFormat(format))?;
            let dir = output.unwrap_or_else(|| settings.export_dir());
            let path = exporter.export_template(format, &dir).await?;
            println!("Wrote {}", path.display());
        }
        ExportCommands::Snapshot { output } => match output {
            Some(path) => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let snapshot = exporter.export_snapshot_json(file).await?;
                eprintln!(
                    "Exported {} cars, {} categories, {} + {} records",
                    snapshot.cars.len(),
                    snapshot.categories.len(),
                    snapshot.depreciation.len(),
                    snapshot.depreciation_with_add.len()
                );
            }
            None => {
                exporter.export_snapshot_json(io::stdout().lock()).await?;
            }
        },
    }

    Ok(())
}

fn open_input(path: Option<&str>) -> Result<Box<dyn Read>> {
    Ok(match path {
        Some(p) => Box::new(BufReader::new(
            File::open(p).with_context(|| format!("Failed to open {}", p))?,
        )),
        None => Box::new(io::stdin()),
    })
}

fn parse_series(s: &str) -> Result<Series> {
    Series::from_str(s)
        .ok_or_else(|| anyhow::anyhow!("Invalid series '{}'. Valid: current, with-add", s))
}

fn print_import_result(source: &str, options: &ImportOptions, result: &ImportResult) {
    if options.validate_only {
        println!("Validation of {} finished", source);
    } else if options.dry_run {
        println!("Dry run of {} finished", source);
    } else {
        println!("Import of {} complete", source);
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}{}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("[{}] ", f))
                    .unwrap_or_default(),
                error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }
}

fn print_month_header(first: &str, extra: &[&str]) {
    print!("{:<16}", first);
    for label in MONTH_LABELS.iter().chain(extra) {
        print!(" {:>13}", label);
    }
    println!();
    println!("{}", "-".repeat(16 + 14 * (12 + extra.len())));
}

fn print_amount_row(label: &str, months: &[f64; 12], current: f64) {
    print!("{:<16}", truncate(label, 16));
    for value in months.iter().chain(std::iter::once(&current)) {
        print!(" {:>13}", format_currency(*value).trim_start_matches("$ "));
    }
    println!();
}

fn print_schedule_table(title: &str, table: &ScheduleTable) {
    println!("{}", title);
    print_month_header("CATEGORY", &["Current"]);
    for row in &table.rows {
        print_amount_row(&row.category_name, &row.months, row.current);
    }
}

fn print_change_table(table: &ChangeTable) {
    println!("Change %");
    print_month_header("CATEGORY", &["Average", "Current"]);
    for row in &table.rows {
        print!("{:<16}", row.label);
        for value in row.months.iter().chain([&row.average, &row.current]) {
            print!(" {:>13}", format_percentage(*value));
        }
        println!();
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
