//! Sort and filter vocabulary for paginated listings.
//!
//! Sort rules travel as a single `sort` parameter holding comma-joined
//! `field:order` tokens; filters travel as flat query parameters next to
//! `page` and `limit`.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::error::ApiException;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortRule {
    pub field: String,
    pub order: SortOrder,
}

impl SortRule {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Desc)
    }

    pub fn token(&self) -> String {
        format!("{}:{}", self.field, self.order.as_str())
    }
}

/// Joins rules into the `sort` parameter. An empty rule list yields `None` so
/// the parameter is left out of the request instead of being sent empty.
pub fn serialize_sort(rules: &[SortRule]) -> Option<String> {
    if rules.is_empty() {
        return None;
    }
    Some(
        rules
            .iter()
            .map(SortRule::token)
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Inverse of [`serialize_sort`]. A token without an order sorts ascending.
pub fn parse_sort(raw: &str) -> Result<Vec<SortRule>, ApiException> {
    let mut rules = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (field, order) = match token.split_once(':') {
            Some((field, order)) => {
                let order = SortOrder::parse(order.trim()).ok_or_else(|| {
                    ApiException::validation(format!("invalid sort order in '{token}'"))
                })?;
                (field.trim(), order)
            }
            None => (token, SortOrder::Asc),
        };
        if field.is_empty() {
            return Err(ApiException::validation(format!(
                "missing sort field in '{token}'"
            )));
        }
        rules.push(SortRule::new(field, order));
    }
    Ok(rules)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    /// Empty text carries no constraint and is never put on the wire.
    pub fn is_blank(&self) -> bool {
        matches!(self, FilterValue::Text(text) if text.is_empty())
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Integer(value) => write!(f, "{value}"),
            FilterValue::Float(value) => write!(f, "{value}"),
            FilterValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        FilterValue::Integer(i64::from(value))
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(i64::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

pub type Filters = BTreeMap<String, Option<FilterValue>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, FilterValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect()
    }
}
