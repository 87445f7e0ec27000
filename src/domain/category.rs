use serde::{Deserialize, Serialize};

pub type CategoryId = i64;

/// Category IDs the change tables are always computed for.
pub const RETAIL_ID: CategoryId = 1;
pub const CLEAN_ID: CategoryId = 2;
pub const AVERAGE_ID: CategoryId = 3;
pub const ROUGH_ID: CategoryId = 4;

/// The fixed change-table categories, in display order.
pub const CHANGE_CATEGORIES: [(CategoryId, &str); 4] = [
    (RETAIL_ID, "Retail"),
    (CLEAN_ID, "Clean"),
    (AVERAGE_ID, "Average"),
    (ROUGH_ID, "Rough"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryRole {
    Retail,
    Clean,
    Average,
    Rough,
    Mileage,
    AmountOwed,
}

impl CategoryRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryRole::Retail => "retail",
            CategoryRole::Clean => "clean",
            CategoryRole::Average => "average",
            CategoryRole::Rough => "rough",
            CategoryRole::Mileage => "mileage",
            CategoryRole::AmountOwed => "amount_owed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "retail" => Some(CategoryRole::Retail),
            "clean" => Some(CategoryRole::Clean),
            "average" => Some(CategoryRole::Average),
            "rough" => Some(CategoryRole::Rough),
            "mileage" => Some(CategoryRole::Mileage),
            "amount_owed" => Some(CategoryRole::AmountOwed),
            _ => None,
        }
    }
}

impl std::fmt::Display for CategoryRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named cost/value bucket tracked per month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCategory {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, alias = "computeExpression")]
    pub compute_expression: Option<String>,
    #[serde(default)]
    pub role: Option<CategoryRole>,
}

impl CostCategory {
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            compute_expression: None,
            role: None,
        }
    }

    pub fn with_role(mut self, role: CategoryRole) -> Self {
        self.role = Some(role);
        self
    }
}

/// Find the category playing `role` in an ordered category list.
///
/// An explicit role tag wins. Lists without a tag for the role fall back to
/// position among the untagged entries: the first is Retail and the last is
/// Amount Owed. Other roles have no positional meaning.
pub fn resolve_role(categories: &[CostCategory], role: CategoryRole) -> Option<&CostCategory> {
    if let Some(tagged) = categories.iter().find(|c| c.role == Some(role)) {
        return Some(tagged);
    }

    let mut untagged = categories.iter().filter(|c| c.role.is_none());
    match role {
        CategoryRole::Retail => untagged.next(),
        CategoryRole::AmountOwed => untagged.next_back(),
        _ => None,
    }
}

/// Categories ordered by ID, as the template export lists them.
pub fn sorted_by_id(categories: &[CostCategory]) -> Vec<CostCategory> {
    let mut sorted = categories.to_vec();
    sorted.sort_by_key(|c| c.id);
    sorted
}
