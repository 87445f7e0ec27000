use tracing::{debug, info};

use crate::domain::{
    self, CarId, CarProfile, CategoryId, ChangePercentages, CostCategory, DepreciationRecord,
    MonthSelector, Series, YearMonth,
};
use crate::storage::Repository;

use super::{build_schedule, AppError, DepreciationSchedule};

/// Application service providing the schedule use cases.
/// This is the primary interface for any client (CLI, exporters, tests).
pub struct ScheduleService {
    repo: Repository,
}

/// Owned result of a monthly lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    pub amount: f64,
    pub record: Option<DepreciationRecord>,
    pub current_amount: f64,
}

/// Both series for one car and year, fetched together.
#[derive(Debug, Clone, Default)]
pub struct SeriesPair {
    pub prior: Vec<DepreciationRecord>,
    pub current: Vec<DepreciationRecord>,
}

impl ScheduleService {
    /// Create a new schedule service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        info!(database = database_path, "database initialized");
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        debug!(database = database_path, "connected");
        Ok(Self::new(repo))
    }

    // ========================
    // Cars and categories
    // ========================

    pub async fn save_car(&self, car: &CarProfile) -> Result<(), AppError> {
        self.repo.save_car(car).await?;
        Ok(())
    }

    pub async fn get_car(&self, id: CarId) -> Result<CarProfile, AppError> {
        self.repo
            .get_car(id)
            .await?
            .ok_or(AppError::CarNotFound(id))
    }

    pub async fn list_cars(&self) -> Result<Vec<CarProfile>, AppError> {
        Ok(self.repo.list_cars().await?)
    }

    /// Append a category to the end of the ordered list, or update it in place.
    pub async fn save_category(&self, category: &CostCategory) -> Result<(), AppError> {
        let position = match self.repo.category_position(category.id).await? {
            Some(existing) => existing,
            None => self.repo.next_category_position().await?,
        };
        self.repo.save_category(category, position).await?;
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<CostCategory>, AppError> {
        Ok(self.repo.list_categories().await?)
    }

    /// Fetch one category; `CategoryNotFound` when it was never imported.
    pub async fn get_category(&self, id: CategoryId) -> Result<CostCategory, AppError> {
        self.repo
            .get_category(id)
            .await?
            .ok_or(AppError::CategoryNotFound(id))
    }

    // ========================
    // Records
    // ========================

    /// Store one record after checking its date is a calendar month.
    /// The date is stored as `YYYY-MM` so year queries can find it.
    pub async fn save_record(
        &self,
        series: Series,
        record: &DepreciationRecord,
    ) -> Result<(), AppError> {
        let month = YearMonth::parse(&record.date)
            .ok_or_else(|| AppError::InvalidDate(record.date.clone()))?;
        let date = month.format();

        if date == record.date {
            self.repo.save_record(series, record).await?;
        } else {
            debug!(%series, id = record.id, from = %record.date, to = %date, "normalized record date");
            let normalized = DepreciationRecord {
                date,
                ..record.clone()
            };
            self.repo.save_record(series, &normalized).await?;
        }
        Ok(())
    }

    pub async fn records(
        &self,
        series: Series,
        car_id: CarId,
        year: &str,
    ) -> Result<Vec<DepreciationRecord>, AppError> {
        validate_year(year)?;
        let records = self.repo.list_records(series, car_id, year).await?;
        debug!(%series, car_id, year, count = records.len(), "fetched records");
        Ok(records)
    }

    pub async fn series_pair(&self, car_id: CarId, year: &str) -> Result<SeriesPair, AppError> {
        Ok(SeriesPair {
            prior: self.records(Series::WithAdd, car_id, year).await?,
            current: self.records(Series::Current, car_id, year).await?,
        })
    }

    pub async fn count_records(&self, series: Series) -> Result<i64, AppError> {
        Ok(self.repo.count_records(series).await?)
    }

    pub async fn list_all_records(&self, series: Series) -> Result<Vec<DepreciationRecord>, AppError> {
        Ok(self.repo.list_all_records(series).await?)
    }

    // ========================
    // Calculations
    // ========================

    pub async fn lookup(
        &self,
        series: Series,
        car_id: CarId,
        category_id: CategoryId,
        selector: MonthSelector,
        year: &str,
    ) -> Result<LookupResult, AppError> {
        if let MonthSelector::Month(month) = selector {
            validate_month(month)?;
        }
        let records = self.records(series, car_id, year).await?;
        let lookup = domain::lookup_series(series, selector, category_id, &records, year);

        Ok(LookupResult {
            amount: lookup.amount,
            record: lookup.record.cloned(),
            current_amount: lookup.current_amount,
        })
    }

    pub async fn change_percentages(
        &self,
        car_id: CarId,
        month: u32,
        year: &str,
    ) -> Result<ChangePercentages, AppError> {
        validate_month(month)?;
        let pair = self.series_pair(car_id, year).await?;
        Ok(domain::change_percentages(month, &pair.prior, &pair.current, year))
    }

    pub async fn current_change(
        &self,
        car_id: CarId,
        category_id: CategoryId,
        year: &str,
    ) -> Result<f64, AppError> {
        let pair = self.series_pair(car_id, year).await?;
        Ok(domain::current_change(category_id, &pair.prior, &pair.current, year))
    }

    pub async fn equity(&self, car_id: CarId, month: u32, year: &str) -> Result<f64, AppError> {
        validate_month(month)?;
        let records = self.records(Series::Current, car_id, year).await?;
        let categories = self.repo.list_categories().await?;
        Ok(domain::equity(month, year, &records, &categories))
    }

    /// Full schedule for one car and year: both series, change table and equity.
    pub async fn schedule(&self, car_id: CarId, year: &str) -> Result<DepreciationSchedule, AppError> {
        let car = self.get_car(car_id).await?;
        let pair = self.series_pair(car_id, year).await?;
        let categories = self.repo.list_categories().await?;

        info!(
            car_id,
            year,
            prior = pair.prior.len(),
            current = pair.current.len(),
            categories = categories.len(),
            "building depreciation schedule"
        );
        Ok(build_schedule(car, year, &pair.prior, &pair.current, &categories))
    }
}

pub fn validate_month(month: u32) -> Result<(), AppError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(AppError::InvalidMonth(month))
    }
}

pub fn validate_year(year: &str) -> Result<(), AppError> {
    if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::InvalidYear(year.to_string()))
    }
}
