use serde::Serialize;
use utoipa::ToSchema;

/// One page of a listing plus the numbers a client needs to page further.
#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        Self {
            items,
            total,
            total_pages: total_pages(total, limit),
            current_page: page,
        }
    }
}

/// `ceil(total / limit)`; zero items means zero pages.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 7), 4);
    }

    #[test]
    fn page_serializes_camel_case() {
        let page = Page::new(vec![1, 2, 3], 23, 2, 3);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalPages"], 8);
        assert_eq!(json["currentPage"], 2);
        assert_eq!(json["items"].as_array().unwrap().len(), 3);
    }
}
