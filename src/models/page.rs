use serde::{Deserialize, Serialize};

/// One page of a paginated collection endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(alias = "data")]
    pub items: Vec<T>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default, alias = "total")]
    pub total_count: u64,
    #[serde(default)]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    /// Fill in `total_pages` when the backend only reports the count
    pub fn normalized(self) -> Self {
        let page_size = self.page_size;
        self.normalized_with(page_size)
    }

    /// Like `normalized`, using `requested_page_size` when the response
    /// carries no page size of its own
    pub fn normalized_with(mut self, requested_page_size: u32) -> Self {
        let page_size = if self.page_size > 0 {
            self.page_size
        } else {
            requested_page_size
        };
        if self.total_pages == 0 && page_size > 0 && self.total_count > 0 {
            self.total_pages = self.total_count.div_ceil(page_size as u64) as u32;
        }
        if self.page_size == 0 {
            self.page_size = page_size;
        }
        self
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derives_total_pages_from_count() {
        let page: Page<u32> = serde_json::from_value(json!({
            "data": [1, 2, 3],
            "page": 1,
            "pageSize": 3,
            "total": 7
        }))
        .unwrap();
        let page = page.normalized();
        assert_eq!(page.total_pages, 3);
        assert!(page.has_more());
    }

    #[test]
    fn falls_back_to_requested_page_size() {
        let page: Page<u32> = serde_json::from_value(json!({
            "items": [1, 2],
            "page": 1,
            "totalCount": 5
        }))
        .unwrap();
        assert_eq!(page.clone().normalized().total_pages, 0);

        let page = page.normalized_with(2);
        assert_eq!(page.page_size, 2);
        assert_eq!(page.total_pages, 3);
    }
}
