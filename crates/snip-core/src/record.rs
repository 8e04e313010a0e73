use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// A stored URL mapping.
///
/// Only `deleted` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The generated short code, unique across all owners.
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// The user who created the mapping.
    pub user_id: String,
    /// Whether the record has been soft-deleted.
    pub deleted: bool,
}

/// One entry of a batch shorten request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    /// Caller-supplied identifier echoed back in the matching [`ItemResponse`].
    pub correlation_id: String,
    pub original_url: String,
}

/// One entry of a batch shorten response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub correlation_id: String,
    pub short_code: ShortCode,
}

/// A request to soft-delete one short code on behalf of a user.
///
/// Honoured only when the code belongs to `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletionRequest {
    pub short_code: ShortCode,
    pub user_id: String,
}

impl DeletionRequest {
    pub fn new(short_code: ShortCode, user_id: impl Into<String>) -> Self {
        Self {
            short_code,
            user_id: user_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_items_use_snake_case_fields() {
        let request: ItemRequest = serde_json::from_str(
            r#"{"correlation_id":"1","original_url":"https://example.com"}"#,
        )
        .unwrap();
        assert_eq!(request.correlation_id, "1");
        assert_eq!(request.original_url, "https://example.com");

        let response = ItemResponse {
            correlation_id: "1".to_string(),
            short_code: ShortCode::new_unchecked("abc123"),
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"correlation_id":"1","short_code":"abc123"}"#
        );
    }
}
