// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use nada_schedule::application::ScheduleService;
use nada_schedule::domain::{CarProfile, CostCategory, DepreciationRecord, Series};
use tempfile::TempDir;

pub const CAR_ID: i64 = 42;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(ScheduleService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = ScheduleService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Test fixture: the standard NADA category list and one car
pub struct Fleet;

impl Fleet {
    pub fn categories() -> Vec<CostCategory> {
        vec![
            CostCategory::new(1, "Retail"),
            CostCategory::new(2, "Clean"),
            CostCategory::new(3, "Average"),
            CostCategory::new(4, "Rough"),
            CostCategory::new(5, "Mileage"),
            CostCategory::new(6, "Amount Owed"),
        ]
    }

    pub fn car() -> CarProfile {
        CarProfile {
            model_year: Some(2021),
            vin: Some("1HGCM82633A004352".into()),
            license_plate: Some("8ABC123".into()),
            owner_email: Some("ana@example.com".into()),
            owner_phone: Some("555-0100".into()),
            ..CarProfile::new(CAR_ID, "Toyota Camry").with_owner("Ana", "Lopez")
        }
    }

    /// Create the car and the categories
    pub async fn create(service: &ScheduleService) -> Result<()> {
        service.save_car(&Self::car()).await?;
        for category in Self::categories() {
            service.save_category(&category).await?;
        }
        Ok(())
    }

    /// Store `(id, category, date, amount)` rows in a series for the fixture car
    pub async fn record_all(
        service: &ScheduleService,
        series: Series,
        rows: &[(i64, i64, &str, f64)],
    ) -> Result<()> {
        for &(id, category_id, date, amount) in rows {
            let record = DepreciationRecord::new(id, category_id, CAR_ID, date, amount);
            service.save_record(series, &record).await?;
        }
        Ok(())
    }
}
