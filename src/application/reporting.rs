use serde::{Deserialize, Serialize};

use crate::domain::{
    change_percentages, current_change, current_equity, equity, lookup_series, CarProfile,
    CategoryId, CostCategory, DepreciationRecord, MonthSelector, Series, CHANGE_CATEGORIES,
};

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleTable {
    pub series: Series,
    pub rows: Vec<ScheduleRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub category_id: CategoryId,
    pub category_name: String,
    pub months: [f64; 12],
    pub current: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeTable {
    pub rows: Vec<ChangeRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRow {
    pub category_id: CategoryId,
    pub label: String,
    pub months: [f64; 12],
    /// Mean over the months that had a non-zero prior value.
    pub average: f64,
    pub current: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityRow {
    pub months: [f64; 12],
    pub current: f64,
}

/// Everything a detailed export prints for one car and year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationSchedule {
    pub car: CarProfile,
    pub year: String,
    pub prior: ScheduleTable,
    pub change: ChangeTable,
    pub current: ScheduleTable,
    pub equity: EquityRow,
}

/// One row per category, twelve months plus the latest value.
pub fn build_schedule_table(
    series: Series,
    records: &[DepreciationRecord],
    categories: &[CostCategory],
    year: &str,
) -> ScheduleTable {
    let rows = categories
        .iter()
        .map(|category| {
            let mut months = [0.0; 12];
            for (i, slot) in months.iter_mut().enumerate() {
                let month = i as u32 + 1;
                *slot = lookup_series(series, MonthSelector::Month(month), category.id, records, year)
                    .amount;
            }
            let current =
                lookup_series(series, MonthSelector::Latest, category.id, records, year).current_amount;

            ScheduleRow {
                category_id: category.id,
                category_name: category.name.clone(),
                months,
                current,
            }
        })
        .collect();

    ScheduleTable { series, rows }
}

pub fn build_change_table(
    prior_records: &[DepreciationRecord],
    current_records: &[DepreciationRecord],
    year: &str,
) -> ChangeTable {
    let monthly: Vec<_> = (1..=12)
        .map(|month| change_percentages(month, prior_records, current_records, year))
        .collect();

    let rows = CHANGE_CATEGORIES
        .iter()
        .map(|&(category_id, label)| {
            let mut months = [0.0; 12];
            let mut counted = 0usize;
            let mut total = 0.0;

            for (i, slot) in months.iter_mut().enumerate() {
                *slot = monthly[i].for_category(category_id);
                let prior = lookup_series(
                    Series::WithAdd,
                    MonthSelector::Month(i as u32 + 1),
                    category_id,
                    prior_records,
                    year,
                )
                .amount;
                if prior != 0.0 {
                    counted += 1;
                    total += *slot;
                }
            }

            let average = if counted == 0 {
                0.0
            } else {
                total / counted as f64
            };

            ChangeRow {
                category_id,
                label: label.to_string(),
                months,
                average,
                current: current_change(category_id, prior_records, current_records, year),
            }
        })
        .collect();

    ChangeTable { rows }
}

pub fn build_equity_row(
    current_records: &[DepreciationRecord],
    categories: &[CostCategory],
    year: &str,
) -> EquityRow {
    let mut months = [0.0; 12];
    for (i, slot) in months.iter_mut().enumerate() {
        *slot = equity(i as u32 + 1, year, current_records, categories);
    }

    EquityRow {
        months,
        current: current_equity(year, current_records, categories),
    }
}

pub fn build_schedule(
    car: CarProfile,
    year: &str,
    prior_records: &[DepreciationRecord],
    current_records: &[DepreciationRecord],
    categories: &[CostCategory],
) -> DepreciationSchedule {
    DepreciationSchedule {
        car,
        year: year.to_string(),
        prior: build_schedule_table(Series::WithAdd, prior_records, categories, year),
        change: build_change_table(prior_records, current_records, year),
        current: build_schedule_table(Series::Current, current_records, categories, year),
        equity: build_equity_row(current_records, categories, year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<CostCategory> {
        vec![
            CostCategory::new(1, "Retail"),
            CostCategory::new(2, "Clean"),
            CostCategory::new(6, "Amount Owed"),
        ]
    }

    #[test]
    fn test_schedule_table_fills_months_and_current() {
        let records = vec![
            DepreciationRecord::new(1, 1, 7, "2024-01", 21000.0),
            DepreciationRecord::new(2, 1, 7, "2024-03", 20000.0),
            DepreciationRecord::new(3, 6, 7, "2024-01", 15000.0),
        ];
        let table = build_schedule_table(Series::Current, &records, &categories(), "2024");

        assert_eq!(table.rows.len(), 3);
        let retail = &table.rows[0];
        assert_eq!(retail.months[0], 21000.0);
        assert_eq!(retail.months[1], 0.0);
        assert_eq!(retail.months[2], 20000.0);
        assert_eq!(retail.current, 20000.0);
        assert_eq!(table.rows[1].current, 0.0);
    }

    #[test]
    fn test_change_table_average_skips_months_without_prior() {
        let prior = vec![
            DepreciationRecord::new(1, 1, 7, "2024-01", 100.0),
            DepreciationRecord::new(2, 1, 7, "2024-02", 200.0),
        ];
        let current = vec![
            DepreciationRecord::new(3, 1, 7, "2024-01", 110.0),
            DepreciationRecord::new(4, 1, 7, "2024-02", 170.0),
            DepreciationRecord::new(5, 1, 7, "2024-03", 160.0),
        ];
        let table = build_change_table(&prior, &current, "2024");

        assert_eq!(table.rows.len(), 4);
        let retail = &table.rows[0];
        assert_eq!(retail.label, "Retail");
        assert!((retail.months[0] - 10.0).abs() < 1e-9);
        assert!((retail.months[1] - -15.0).abs() < 1e-9);
        assert_eq!(retail.months[2], 0.0);
        assert!((retail.average - -2.5).abs() < 1e-9);
        assert!((retail.current - -20.0).abs() < 1e-9);
        assert_eq!(table.rows[3].average, 0.0);
    }

    #[test]
    fn test_equity_row() {
        let records = vec![
            DepreciationRecord::new(1, 1, 7, "2024-01", 21000.0),
            DepreciationRecord::new(2, 6, 7, "2024-01", 15000.0),
            DepreciationRecord::new(3, 1, 7, "2024-02", 20000.0),
        ];
        let row = build_equity_row(&records, &categories(), "2024");
        assert_eq!(row.months[0], 6000.0);
        assert_eq!(row.months[1], 20000.0);
        assert_eq!(row.months[11], 0.0);
        assert_eq!(row.current, 5000.0);
    }
}
