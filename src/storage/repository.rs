use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::{
    CarId, CarProfile, CategoryId, CategoryRole, CostCategory, DepreciationRecord, Series,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_DEPRECIATION};

/// Repository holding the cars, categories and depreciation records
/// fetched from the back-office API.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_DEPRECIATION)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        debug!("migrations applied");
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Car operations
    // ========================

    /// Insert or replace a car profile.
    pub async fn save_car(&self, car: &CarProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO cars (id, make_model, model_year, vin, license_plate, owner_first_name, owner_last_name, owner_email, owner_phone)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(car.id)
        .bind(&car.make_model)
        .bind(car.model_year)
        .bind(&car.vin)
        .bind(&car.license_plate)
        .bind(&car.owner_first_name)
        .bind(&car.owner_last_name)
        .bind(&car.owner_email)
        .bind(&car.owner_phone)
        .execute(&self.pool)
        .await
        .context("Failed to save car")?;
        Ok(())
    }

    /// Get a car by ID.
    pub async fn get_car(&self, id: CarId) -> Result<Option<CarProfile>> {
        let row = sqlx::query(
            r#"
            SELECT id, make_model, model_year, vin, license_plate, owner_first_name, owner_last_name, owner_email, owner_phone
            FROM cars
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch car")?;

        Ok(row.as_ref().map(Self::row_to_car))
    }

    pub async fn list_cars(&self) -> Result<Vec<CarProfile>> {
        let rows = sqlx::query(
            "SELECT id, make_model, model_year, vin, license_plate, owner_first_name, owner_last_name, owner_email, owner_phone FROM cars ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list cars")?;

        Ok(rows.iter().map(Self::row_to_car).collect())
    }

    fn row_to_car(row: &sqlx::sqlite::SqliteRow) -> CarProfile {
        CarProfile {
            id: row.get("id"),
            make_model: row.get("make_model"),
            model_year: row.get("model_year"),
            vin: row.get("vin"),
            license_plate: row.get("license_plate"),
            owner_first_name: row.get("owner_first_name"),
            owner_last_name: row.get("owner_last_name"),
            owner_email: row.get("owner_email"),
            owner_phone: row.get("owner_phone"),
        }
    }

    // ========================
    // Category operations
    // ========================

    /// Insert or replace a category at the given list position.
    pub async fn save_category(&self, category: &CostCategory, position: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO cost_categories (id, name, compute_expression, role, position)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.compute_expression)
        .bind(category.role.map(|r| r.as_str()))
        .bind(position)
        .execute(&self.pool)
        .await
        .context("Failed to save category")?;
        Ok(())
    }

    pub async fn category_position(&self, id: CategoryId) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT position FROM cost_categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read category position")?;
        Ok(row.map(|r| r.get("position")))
    }

    /// Position the next appended category would take.
    pub async fn next_category_position(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COALESCE(MAX(position), -1) + 1 AS next FROM cost_categories")
            .fetch_one(&self.pool)
            .await
            .context("Failed to read category positions")?;
        Ok(row.get("next"))
    }

    /// Categories in list order; order decides the positional roles.
    pub async fn list_categories(&self) -> Result<Vec<CostCategory>> {
        let rows = sqlx::query(
            "SELECT id, name, compute_expression, role FROM cost_categories ORDER BY position, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")?;

        rows.iter().map(Self::row_to_category).collect()
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Option<CostCategory>> {
        let row = sqlx::query(
            "SELECT id, name, compute_expression, role FROM cost_categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category")?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<CostCategory> {
        let role_str: Option<String> = row.get("role");
        let role = role_str
            .map(|s| {
                CategoryRole::from_str(&s).ok_or_else(|| anyhow::anyhow!("Invalid category role: {}", s))
            })
            .transpose()?;

        Ok(CostCategory {
            id: row.get("id"),
            name: row.get("name"),
            compute_expression: row.get("compute_expression"),
            role,
        })
    }

    // ========================
    // Depreciation operations
    // ========================

    /// Insert or replace a record in the given series.
    pub async fn save_record(&self, series: Series, record: &DepreciationRecord) -> Result<()> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (id, category_id, car_id, date, amount, active) VALUES (?, ?, ?, ?, ?, ?)",
            series.table_name()
        );
        sqlx::query(&sql)
            .bind(record.id)
            .bind(record.category_id)
            .bind(record.car_id)
            .bind(&record.date)
            .bind(record.amount)
            .bind(record.active)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to save {} record {}", series, record.id))?;
        Ok(())
    }

    /// All records of one car whose date starts with `year`.
    pub async fn list_records(
        &self,
        series: Series,
        car_id: CarId,
        year: &str,
    ) -> Result<Vec<DepreciationRecord>> {
        let sql = format!(
            "SELECT id, category_id, car_id, date, amount, active FROM {} WHERE car_id = ? AND substr(date, 1, 4) = ? ORDER BY date, id",
            series.table_name()
        );
        let rows = sqlx::query(&sql)
            .bind(car_id)
            .bind(year)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} records", series))?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    /// Every record in the series, for snapshots.
    pub async fn list_all_records(&self, series: Series) -> Result<Vec<DepreciationRecord>> {
        let sql = format!(
            "SELECT id, category_id, car_id, date, amount, active FROM {} ORDER BY car_id, date, id",
            series.table_name()
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} records", series))?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    pub async fn count_records(&self, series: Series) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", series.table_name());
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count records")?;
        Ok(row.get("count"))
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> DepreciationRecord {
        DepreciationRecord {
            id: row.get("id"),
            category_id: row.get("category_id"),
            car_id: row.get("car_id"),
            date: row.get("date"),
            amount: row.get("amount"),
            active: row.get::<i64, _>("active") != 0,
        }
    }
}
