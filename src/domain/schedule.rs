use serde::{Deserialize, Serialize};

use super::{
    finite_or_zero, resolve_role, CategoryId, CategoryRole, CostCategory, DepreciationRecord,
    Series, YearMatch, YearMonth, AVERAGE_ID, CLEAN_ID, RETAIL_ID, ROUGH_ID,
};

/// Which month a lookup reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthSelector {
    /// Calendar month, 1-12.
    Month(u32),
    /// The highest month present for the category in that year.
    Latest,
}

/// Result of a monthly lookup. Missing data reads as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthlyLookup<'a> {
    /// Amount at the selected month.
    pub amount: f64,
    /// The record behind `amount`, if one exists.
    pub record: Option<&'a DepreciationRecord>,
    /// Amount at the latest month present for the category in that year.
    pub current_amount: f64,
}

/// Highest month present for (category, year), or 0 when there is none.
pub fn latest_month(
    category_id: CategoryId,
    records: &[DepreciationRecord],
    year: &str,
    year_match: YearMatch,
) -> u32 {
    records
        .iter()
        .filter(|r| r.category_id == category_id && year_match.matches(&r.date, year))
        .filter_map(DepreciationRecord::month)
        .max()
        .unwrap_or(0)
}

/// Look up one category's value for a month and its latest value in the same year.
pub fn lookup_amount<'a>(
    selector: MonthSelector,
    category_id: CategoryId,
    records: &'a [DepreciationRecord],
    year: &str,
    year_match: YearMatch,
) -> MonthlyLookup<'a> {
    let max_month = latest_month(category_id, records, year, year_match);
    let month = match selector {
        MonthSelector::Month(m) => m,
        MonthSelector::Latest => max_month,
    };

    let mut lookup = MonthlyLookup::default();
    let mut latest: Option<&DepreciationRecord> = None;
    let mut latest_date: Option<YearMonth> = None;

    for record in records {
        if record.category_id != category_id || !year_match.matches(&record.date, year) {
            continue;
        }
        let Some(record_month) = record.month() else {
            continue;
        };

        if lookup.record.is_none() && month != 0 && record_month == month {
            lookup.amount = record.amount;
            lookup.record = Some(record);
        }

        if max_month != 0 && record_month == max_month {
            let date = YearMonth::parse(&record.date);
            if latest.is_none() || date > latest_date {
                latest = Some(record);
                latest_date = date;
            }
        }
    }

    lookup.current_amount = latest.map(|r| r.amount).unwrap_or(0.0);
    if selector == MonthSelector::Latest {
        lookup.amount = lookup.current_amount;
        lookup.record = latest;
    }
    lookup
}

/// [`lookup_amount`] with the year comparison the series is read with.
pub fn lookup_series<'a>(
    series: Series,
    selector: MonthSelector,
    category_id: CategoryId,
    records: &'a [DepreciationRecord],
    year: &str,
) -> MonthlyLookup<'a> {
    lookup_amount(selector, category_id, records, year, series.year_match())
}

/// `(current - prior) / prior * 100`, or 0 when the prior value is 0.
pub fn percentage_change(prior: f64, current: f64) -> f64 {
    if prior == 0.0 {
        return 0.0;
    }
    finite_or_zero((current - prior) / prior * 100.0)
}

/// Month-over-month change of the four fixed categories.
///
/// The `current_*` fields are never filled by [`change_percentages`]; only
/// [`current_change`] computes latest-month changes, one category at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangePercentages {
    pub retail: f64,
    pub clean: f64,
    pub average: f64,
    pub rough: f64,
    pub current_retail: Option<f64>,
    pub current_clean: Option<f64>,
    pub current_average: Option<f64>,
    pub current_rough: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeField {
    Retail,
    Clean,
    Average,
    Rough,
    CurrentRetail,
    CurrentClean,
    CurrentAverage,
    CurrentRough,
}

impl ChangeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeField::Retail => "retail",
            ChangeField::Clean => "clean",
            ChangeField::Average => "average",
            ChangeField::Rough => "rough",
            ChangeField::CurrentRetail => "current_retail",
            ChangeField::CurrentClean => "current_clean",
            ChangeField::CurrentAverage => "current_average",
            ChangeField::CurrentRough => "current_rough",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "retail" => Some(ChangeField::Retail),
            "clean" => Some(ChangeField::Clean),
            "average" => Some(ChangeField::Average),
            "rough" => Some(ChangeField::Rough),
            "current_retail" => Some(ChangeField::CurrentRetail),
            "current_clean" => Some(ChangeField::CurrentClean),
            "current_average" => Some(ChangeField::CurrentAverage),
            "current_rough" => Some(ChangeField::CurrentRough),
            _ => None,
        }
    }
}

impl ChangePercentages {
    /// Read one field; unfilled latest-month fields read as 0.
    pub fn get(&self, field: ChangeField) -> f64 {
        match field {
            ChangeField::Retail => self.retail,
            ChangeField::Clean => self.clean,
            ChangeField::Average => self.average,
            ChangeField::Rough => self.rough,
            ChangeField::CurrentRetail => self.current_retail.unwrap_or(0.0),
            ChangeField::CurrentClean => self.current_clean.unwrap_or(0.0),
            ChangeField::CurrentAverage => self.current_average.unwrap_or(0.0),
            ChangeField::CurrentRough => self.current_rough.unwrap_or(0.0),
        }
    }

    /// Month-specific change for one of the fixed category IDs.
    pub fn for_category(&self, category_id: CategoryId) -> f64 {
        match category_id {
            RETAIL_ID => self.retail,
            CLEAN_ID => self.clean,
            AVERAGE_ID => self.average,
            ROUGH_ID => self.rough,
            _ => 0.0,
        }
    }
}

/// Change from the with-add series to the current series for `month`.
pub fn change_percentages(
    month: u32,
    prior_records: &[DepreciationRecord],
    current_records: &[DepreciationRecord],
    year: &str,
) -> ChangePercentages {
    let mut changes = ChangePercentages::default();

    for (category_id, slot) in [
        (RETAIL_ID, &mut changes.retail),
        (CLEAN_ID, &mut changes.clean),
        (AVERAGE_ID, &mut changes.average),
        (ROUGH_ID, &mut changes.rough),
    ] {
        let prior = lookup_series(
            Series::WithAdd,
            MonthSelector::Month(month),
            category_id,
            prior_records,
            year,
        )
        .amount;
        if prior == 0.0 {
            continue;
        }
        let current = lookup_series(
            Series::Current,
            MonthSelector::Month(month),
            category_id,
            current_records,
            year,
        )
        .amount;
        *slot = percentage_change(prior, current);
    }

    changes
}

/// A single field of [`change_percentages`].
pub fn change_for(
    month: u32,
    prior_records: &[DepreciationRecord],
    current_records: &[DepreciationRecord],
    year: &str,
    field: ChangeField,
) -> f64 {
    change_percentages(month, prior_records, current_records, year).get(field)
}

/// Change between each series' latest month for one category.
///
/// The two series may have different latest months.
pub fn current_change(
    category_id: CategoryId,
    prior_records: &[DepreciationRecord],
    current_records: &[DepreciationRecord],
    year: &str,
) -> f64 {
    let prior = lookup_series(
        Series::WithAdd,
        MonthSelector::Latest,
        category_id,
        prior_records,
        year,
    )
    .current_amount;
    let current = lookup_series(
        Series::Current,
        MonthSelector::Latest,
        category_id,
        current_records,
        year,
    )
    .current_amount;
    finite_or_zero(percentage_change(prior, current))
}

/// Retail value minus amount owed for `month` in the current series.
pub fn equity(
    month: u32,
    year: &str,
    current_records: &[DepreciationRecord],
    categories: &[CostCategory],
) -> f64 {
    equity_at(MonthSelector::Month(month), year, current_records, categories)
}

/// Equity at each category's latest month.
pub fn current_equity(
    year: &str,
    current_records: &[DepreciationRecord],
    categories: &[CostCategory],
) -> f64 {
    equity_at(MonthSelector::Latest, year, current_records, categories)
}

fn equity_at(
    selector: MonthSelector,
    year: &str,
    current_records: &[DepreciationRecord],
    categories: &[CostCategory],
) -> f64 {
    if categories.is_empty() {
        return 0.0;
    }

    let amount_for = |role: CategoryRole| {
        resolve_role(categories, role)
            .map(|category| {
                lookup_series(Series::Current, selector, category.id, current_records, year).amount
            })
            .unwrap_or(0.0)
    };

    let retail = amount_for(CategoryRole::Retail);
    let amount_owed = amount_for(CategoryRole::AmountOwed);
    finite_or_zero(retail - amount_owed)
}
