//! Query state owned by a table controller and the pure helpers that evolve it.

use shared::{
    protocol::DEFAULT_PAGE_LIMIT,
    query::{serialize_sort, FilterValue, Filters, QueryParams, SortOrder, SortRule},
};

pub const PAGE_PARAM: &str = "page";
pub const LIMIT_PARAM: &str = "limit";
pub const SORT_PARAM: &str = "sort";

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub page: u32,
    pub limit: u32,
    pub sort_rules: Vec<SortRule>,
    pub filters: Filters,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

impl QueryState {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            sort_rules: Vec::new(),
            filters: Filters::new(),
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_sort(mut self, rule: SortRule) -> Self {
        self.sort_rules = vec![rule];
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(key.into(), Some(value.into()));
        self
    }

    /// Outgoing parameters: `page`, `limit`, `sort`, then every filter.
    ///
    /// Filters are laid over the reserved keys, and any entry that ends up
    /// null or empty text is dropped, so a filter can never put an empty
    /// parameter on the wire.
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.insert(PAGE_PARAM, self.page);
        params.insert(LIMIT_PARAM, self.limit);
        if let Some(sort) = serialize_sort(&self.sort_rules) {
            params.insert(SORT_PARAM, sort);
        }
        for (key, value) in &self.filters {
            match value {
                Some(value) if !value.is_blank() => params.insert(key.clone(), value.clone()),
                _ => {
                    params.remove(key);
                }
            }
        }
        params
    }

    pub fn sort_order_of(&self, field: &str) -> Option<SortOrder> {
        self.sort_rules
            .iter()
            .find(|rule| rule.field == field)
            .map(|rule| rule.order)
    }
}

/// Column-header click: flips the order of an already sorted field, otherwise
/// replaces every rule with an ascending sort on `field`. Never yields more
/// than one rule.
pub fn toggle_sort(current: &[SortRule], field: &str) -> Vec<SortRule> {
    match current.iter().find(|rule| rule.field == field) {
        Some(rule) => vec![SortRule::new(field, rule.order.toggled())],
        None => vec![SortRule::asc(field)],
    }
}

pub fn merge_filters(current: &mut Filters, partial: Filters) {
    current.extend(partial);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(entries: &[(&str, Option<FilterValue>)]) -> Filters {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn toggle_sort_cycles_and_replaces() {
        let first = toggle_sort(&[], "title");
        assert_eq!(first, vec![SortRule::asc("title")]);

        let second = toggle_sort(&first, "title");
        assert_eq!(second, vec![SortRule::desc("title")]);

        let third = toggle_sort(&second, "title");
        assert_eq!(third, vec![SortRule::asc("title")]);

        let other = toggle_sort(&second, "id");
        assert_eq!(other, vec![SortRule::asc("id")]);
    }

    #[test]
    fn toggle_sort_collapses_multi_rule_input() {
        let rules = vec![SortRule::asc("year"), SortRule::desc("title")];
        assert_eq!(toggle_sort(&rules, "title"), vec![SortRule::asc("title")]);
    }

    #[test]
    fn merge_keeps_untouched_keys() {
        let mut current = filters(&[
            ("a", Some(FilterValue::Integer(1))),
            ("b", Some(FilterValue::Integer(2))),
        ]);
        merge_filters(&mut current, filters(&[("b", Some(FilterValue::Integer(3)))]));
        assert_eq!(
            current,
            filters(&[
                ("a", Some(FilterValue::Integer(1))),
                ("b", Some(FilterValue::Integer(3))),
            ])
        );
    }

    #[test]
    fn params_strip_null_and_empty_filters() {
        let mut state = QueryState::new(10);
        state.filters = filters(&[
            ("title", Some(FilterValue::from(""))),
            ("year", None),
            ("genre", Some(FilterValue::from("action"))),
        ]);

        let params = state.to_params();
        assert_eq!(params.get("genre"), Some(&FilterValue::from("action")));
        assert!(!params.contains_key("title"));
        assert!(!params.contains_key("year"));
        assert!(!params.contains_key(SORT_PARAM));
        assert_eq!(params.get(PAGE_PARAM), Some(&FilterValue::Integer(1)));
        assert_eq!(params.get(LIMIT_PARAM), Some(&FilterValue::Integer(10)));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn params_carry_serialized_sort() {
        let state = QueryState::new(25)
            .with_page(3)
            .with_sort(SortRule::desc("rating"));
        let params = state.to_params();
        assert_eq!(params.get(SORT_PARAM), Some(&FilterValue::from("rating:desc")));
        assert_eq!(state.sort_order_of("rating"), Some(SortOrder::Desc));
        assert_eq!(state.sort_order_of("title"), None);
    }

    #[test]
    fn blank_filter_named_like_reserved_key_drops_it() {
        let mut state = QueryState::new(10);
        state.filters.insert(PAGE_PARAM.to_string(), None);
        assert!(!state.to_params().contains_key(PAGE_PARAM));
    }
}
