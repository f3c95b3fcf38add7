use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            total: 0,
            total_pages: 1,
        }
    }
}

impl PageMeta {
    /// Derives `total_pages` from `total`; an empty listing still has one page.
    pub fn for_total(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            1
        } else {
            total.div_ceil(u64::from(limit)).max(1)
        };
        Self {
            page,
            limit,
            total,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev_page(&self) -> bool {
        self.page > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<R> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<R>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<R> PageResponse<R> {
    pub fn ok(data: Vec<R>, meta: PageMeta) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(meta),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            meta: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_meta_matches_empty_first_page() {
        let meta = PageMeta::default();
        assert_eq!((meta.page, meta.limit, meta.total, meta.total_pages), (1, 10, 0, 1));
        assert!(!meta.has_next_page());
        assert!(!meta.has_prev_page());
    }

    #[test]
    fn for_total_rounds_pages_up() {
        let meta = PageMeta::for_total(2, 10, 21);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page());
        assert!(meta.has_prev_page());
        assert_eq!(PageMeta::for_total(1, 10, 0).total_pages, 1);
    }

    #[test]
    fn failure_envelope_parses_without_data_or_meta() {
        let response: PageResponse<serde_json::Value> =
            serde_json::from_str(r#"{"success":false,"message":"boom"}"#).expect("json");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("boom"));
    }

    #[test]
    fn meta_uses_camel_case_total_pages() {
        let json = serde_json::to_value(PageMeta::for_total(1, 5, 6)).expect("json");
        assert_eq!(json["totalPages"], 2);
    }
}
