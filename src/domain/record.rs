use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::CategoryId;

pub type RecordId = i64;
pub type CarId = i64;

/// Which of the two parallel depreciation families a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    /// Depreciation for the active year.
    Current,
    /// Prior-year values with added cost, the baseline for change percentages.
    WithAdd,
}

impl Series {
    pub fn as_str(&self) -> &'static str {
        match self {
            Series::Current => "current",
            Series::WithAdd => "with_add",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "current" => Some(Series::Current),
            "with_add" | "prior" => Some(Series::WithAdd),
            _ => None,
        }
    }

    /// Year comparison used when reading this series.
    ///
    /// The two families have always been filtered differently: current
    /// records by the literal year text, with-add records by the calendar
    /// year of the parsed date. Both are kept until someone decides which
    /// one is right.
    pub fn year_match(&self) -> YearMatch {
        match self {
            Series::Current => YearMatch::Literal,
            Series::WithAdd => YearMatch::Parsed,
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Series::Current => "nada_depreciation",
            Series::WithAdd => "nada_depreciation_with_add",
        }
    }
}

impl std::fmt::Display for Series {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One month of one category for one car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationRecord {
    pub id: RecordId,
    #[serde(alias = "categoryId")]
    pub category_id: CategoryId,
    #[serde(alias = "carId")]
    pub car_id: CarId,
    /// Always `YYYY-MM`.
    pub date: String,
    pub amount: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl DepreciationRecord {
    pub fn new(
        id: RecordId,
        category_id: CategoryId,
        car_id: CarId,
        date: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            id,
            category_id,
            car_id,
            date: date.into(),
            amount,
            active: true,
        }
    }

    /// Month number taken from the text after the first `-`.
    pub fn month(&self) -> Option<u32> {
        month_of(&self.date)
    }
}

/// How a record's `date` is compared against a requested year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearMatch {
    /// Text before the first `-` equals the year string.
    Literal,
    /// The date parses as a calendar month whose year equals the year string
    /// read as a number. Unparseable dates never match.
    Parsed,
}

impl YearMatch {
    pub fn matches(&self, date: &str, year: &str) -> bool {
        match self {
            YearMatch::Literal => date.split('-').next() == Some(year),
            YearMatch::Parsed => {
                let Ok(wanted) = year.trim().parse::<i32>() else {
                    return false;
                };
                YearMonth::parse(date).is_some_and(|ym| ym.year == wanted)
            }
        }
    }
}

/// A calendar month parsed from `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn parse(date: &str) -> Option<Self> {
        let first_day = NaiveDate::parse_from_str(&format!("{}-01", date.trim()), "%Y-%m-%d").ok()?;
        Some(Self {
            year: first_day.year(),
            month: first_day.month(),
        })
    }

    pub fn format(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Month number after the first `-`, without calendar validation.
pub fn month_of(date: &str) -> Option<u32> {
    date.split('-').nth(1)?.trim().parse().ok()
}

/// Car identity and owner contact printed at the top of a detailed export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarProfile {
    pub id: CarId,
    #[serde(alias = "makeModel")]
    pub make_model: String,
    #[serde(default, alias = "modelYear")]
    pub model_year: Option<i32>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default, alias = "licensePlate")]
    pub license_plate: Option<String>,
    #[serde(default, alias = "ownerFirstName")]
    pub owner_first_name: String,
    #[serde(default, alias = "ownerLastName")]
    pub owner_last_name: String,
    #[serde(default, alias = "ownerEmail")]
    pub owner_email: Option<String>,
    #[serde(default, alias = "ownerPhone")]
    pub owner_phone: Option<String>,
}

impl CarProfile {
    pub fn new(id: CarId, make_model: impl Into<String>) -> Self {
        Self {
            id,
            make_model: make_model.into(),
            ..Default::default()
        }
    }

    pub fn with_owner(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.owner_first_name = first_name.into();
        self.owner_last_name = last_name.into();
        self
    }

    pub fn owner_full_name(&self) -> String {
        format!("{} {}", self.owner_first_name, self.owner_last_name)
            .trim()
            .to_string()
    }
}
