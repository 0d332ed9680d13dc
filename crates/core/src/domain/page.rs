// Paginated result envelope

use serde::{Deserialize, Serialize};

/// Page size used whenever the SDK walks a paginated collection
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// One page of a paginated platform collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, has_next_page: bool) -> Self {
        Self {
            has_next_page,
            page: None,
            limit: None,
            total: None,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let page: Page<String> = serde_json::from_str("{}").unwrap();
        assert!(!page.has_next_page);
        assert!(page.data.is_empty());
    }
}
