//! Page-at-a-time listing.
//!
//! A list call fetches exactly one page. The server's continuation token is
//! surfaced on `Page::page_token`; the caller passes it back through
//! `PageRequest::next` to fetch the following page.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::query::Filters;
use crate::response::{decode_value, json_get_ci};

pub const PAGE_TOKEN: &str = "pageToken";
pub const LIMIT: &str = "limit";
pub const SORT_KEY: &str = "sortkey";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page_token: Option<String>,
    pub limit: Option<u32>,
    pub sort_key: Option<String>,
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Request for the page after the one that returned `page`.
    pub fn next<T>(&self, page: &Page<T>) -> Option<Self> {
        page.page_token.as_ref().map(|token| Self {
            page_token: Some(token.clone()),
            ..self.clone()
        })
    }

    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    pub fn apply(&self, filters: &mut Filters) {
        filters.set(SORT_KEY, self.sort_key.clone());
        filters.set(LIMIT, self.limit);
        filters.set(PAGE_TOKEN, self.page_token.clone());
    }
}

/// One page of results plus the token for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.page_token.is_some()
    }
}

impl Page<Value> {
    /// Split a list response into items and continuation token.
    ///
    /// Accepts both `{"data": [...], "pageToken": "..."}` and a bare array.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let page_token = next_page_token(&value);
        let data = match value {
            Value::Array(items) => items,
            other => match json_get_ci(&other, "data") {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::Null) | None => Vec::new(),
                Some(_) => {
                    return Err(ApiError::Decode {
                        message: "list response `data` member is not an array".to_string(),
                        body: other.to_string(),
                    })
                }
            },
        };
        Ok(Self { data, page_token })
    }

    pub fn decode<U: DeserializeOwned>(self) -> Result<Page<U>, ApiError> {
        let data = self
            .data
            .into_iter()
            .map(decode_value)
            .collect::<Result<Vec<U>, _>>()?;
        Ok(Page {
            data,
            page_token: self.page_token,
        })
    }
}

/// Continuation token of a list response, if the server sent a non-empty one.
pub fn next_page_token(value: &Value) -> Option<String> {
    json_get_ci(value, PAGE_TOKEN)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_sets_only_present_fields() {
        let mut filters = Filters::new();
        PageRequest::first(50).apply(&mut filters);
        assert_eq!(filters.to_params().encode(), "limit=50");
    }

    #[test]
    fn next_carries_limit_and_token() {
        let first = PageRequest::first(2).with_sort_key("DisplayNameAsc");
        let page = Page::<Value> {
            data: Vec::new(),
            page_token: Some("t2".to_string()),
        };
        let next = first.next(&page).unwrap();
        let mut filters = Filters::new();
        next.apply(&mut filters);
        assert_eq!(
            filters.to_params().encode(),
            "sortkey=DisplayNameAsc&limit=2&pageToken=t2"
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::<Value> {
            data: vec![json!(1)],
            page_token: None,
        };
        assert!(!page.has_more());
        assert_eq!(PageRequest::default().next(&page), None);
    }

    #[test]
    fn from_value_reads_envelope_case_insensitively() {
        let page = Page::from_value(json!({"Data": [{"id": "1"}], "PageToken": "abc"})).unwrap();
        assert_eq!(page.data, vec![json!({"id": "1"})]);
        assert_eq!(page.page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn from_value_accepts_bare_arrays_and_blank_tokens() {
        let page = Page::from_value(json!([1, 2, 3])).unwrap();
        assert_eq!(page.data.len(), 3);
        assert_eq!(page.page_token, None);

        let page = Page::from_value(json!({"data": [], "pageToken": ""})).unwrap();
        assert!(!page.has_more());
    }

    #[test]
    fn from_value_rejects_non_array_data() {
        assert!(matches!(
            Page::from_value(json!({"data": {"id": 1}})),
            Err(ApiError::Decode { .. })
        ));
    }

    #[test]
    fn decode_typed_items() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Item {
            id: String,
        }
        let page = Page::from_value(json!({"data": [{"Id": "a"}], "pageToken": "n"}))
            .unwrap()
            .decode::<Item>()
            .unwrap();
        assert_eq!(page.data, vec![Item { id: "a".to_string() }]);
        assert!(page.has_more());
    }
}
