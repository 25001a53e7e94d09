use serde::Deserialize;
use serde::Serialize;

/// Semantic role of a table column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    TimeAxis,
    Revenue,
    Category,
    GenericNumeric,
    GenericText,
}

/// One role per column, in column order, plus the rankings the Analyzer needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleMapping {
    assignments: Vec<(String, ColumnRole)>,
    /// Category columns, best first
    categories: Vec<String>,
    margin: Option<String>,
}

impl RoleMapping {
    pub(crate) fn new(assignments: Vec<(String, ColumnRole)>, categories: Vec<String>, margin: Option<String>) -> Self {
        Self { assignments, categories, margin }
    }

    /// Role of the named column.
    pub fn role(&self, column: &str) -> Option<ColumnRole> {
        self.assignments
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, role)| *role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnRole)> + '_ {
        self.assignments.iter().map(|(name, role)| (name.as_str(), *role))
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    fn first_with(&self, role: ColumnRole) -> Option<&str> {
        self.iter().find(|(_, assigned)| *assigned == role).map(|(name, _)| name)
    }

    pub fn time_axis(&self) -> Option<&str> {
        self.first_with(ColumnRole::TimeAxis)
    }

    pub fn revenue(&self) -> Option<&str> {
        self.first_with(ColumnRole::Revenue)
    }

    /// Category columns ranked by ascending cardinality.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// The category used for product performance grouping.
    pub fn primary_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// The generic numeric column holding margin or profit figures, if any.
    pub fn margin_column(&self) -> Option<&str> {
        self.margin.as_deref()
    }

    pub fn generic_numeric(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, role)| *role == ColumnRole::GenericNumeric)
            .map(|(name, _)| name)
            .collect()
    }
}
