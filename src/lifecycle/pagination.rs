//! Cursor pagination
//!
//! List endpoints return a page of items plus `metadata.next`, a URL whose
//! `page_token` query parameter selects the following page. The token is
//! opaque: it is lifted out of that URL verbatim and replayed, never built
//! or interpreted.

use crate::confluent::models::ListResponse;
use crate::error::ProviderError;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use url::Url;

/// Largest page requested. Kept one under the server's limit of 100 to stay
/// clear of inclusive/exclusive bound mismatches.
pub const LIST_PAGE_SIZE: u32 = 99;

/// Query parameter carrying the token in a `next` URL
const PAGE_TOKEN_PARAM: &str = "page_token";

/// Opaque next-page token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(String);

impl PageToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of one list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub token: Option<PageToken>,
    pub page_size: u32,
}

impl PageCursor {
    fn first() -> Self {
        Self {
            token: None,
            page_size: LIST_PAGE_SIZE,
        }
    }

    /// Query parameters for this page
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("page_size", self.page_size.to_string())];
        if let Some(token) = &self.token {
            query.push((PAGE_TOKEN_PARAM, token.0.clone()));
        }
        query
    }
}

/// One page of a listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The server's `next` link, if any
    pub next: Option<String>,
}

impl<T> From<ListResponse<T>> for Page<T> {
    fn from(response: ListResponse<T>) -> Self {
        Self {
            items: response.data,
            next: response.metadata.next,
        }
    }
}

/// Extract the page token from a `next` URL.
///
/// Returns `None` when the link is empty, cannot be parsed, has no
/// `page_token`, or carries an empty one. A `None` ends pagination.
pub fn extract_page_token(next: &str) -> Option<PageToken> {
    let next = next.trim();
    if next.is_empty() {
        return None;
    }

    // Relative links are resolved against a placeholder base; only the
    // query string matters.
    let url = Url::parse(next)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(next)))
        .ok()?;

    url.query_pairs()
        .find(|(key, _)| key == PAGE_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
        .map(PageToken)
}

/// Fetch every page of a listing and concatenate the items in server order.
///
/// `list_fn` is called with the first cursor (no token), then once per
/// non-empty token. A token that was already requested aborts with
/// [`ProviderError::PaginationLoop`]. Any error discards what was
/// collected so far.
pub async fn fetch_all<T, F, Fut>(mut list_fn: F) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(PageCursor) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut all_items = Vec::new();
    let mut seen_tokens: HashSet<PageToken> = HashSet::new();
    let mut cursor = PageCursor::first();
    let mut pages = 0usize;

    loop {
        let page = list_fn(cursor.clone()).await?;
        pages += 1;
        all_items.extend(page.items);

        let Some(token) = page.next.as_deref().and_then(extract_page_token) else {
            break;
        };

        if !seen_tokens.insert(token.clone()) {
            return Err(ProviderError::PaginationLoop {
                token: token.to_string(),
            });
        }

        cursor = PageCursor {
            token: Some(token),
            page_size: LIST_PAGE_SIZE,
        };
    }

    tracing::debug!("Fetched {} items over {} pages", all_items.len(), pages);
    Ok(all_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn next_url(token: &str) -> Option<String> {
        Some(format!(
            "https://api.confluent.cloud/org/v2/environments?page_size=99&page_token={}",
            token
        ))
    }

    #[test]
    fn test_extract_page_token() {
        assert_eq!(
            extract_page_token("https://api.confluent.cloud/iam/v2/users?page_size=99&page_token=UvmDWOB1iwfAIBPj6EYb"),
            Some(PageToken("UvmDWOB1iwfAIBPj6EYb".into()))
        );
        assert_eq!(
            extract_page_token("/iam/v2/users?page_token=abc%3D%3D"),
            Some(PageToken("abc==".into()))
        );
    }

    #[test]
    fn test_empty_or_missing_token_ends_pagination() {
        assert_eq!(extract_page_token(""), None);
        assert_eq!(extract_page_token("https://api.confluent.cloud/iam/v2/users?page_token="), None);
        assert_eq!(extract_page_token("https://api.confluent.cloud/iam/v2/users?page_size=99"), None);
    }

    #[test]
    fn test_cursor_query() {
        let first = PageCursor::first();
        assert_eq!(first.query(), vec![("page_size", "99".to_string())]);

        let next = PageCursor {
            token: Some(PageToken("t".into())),
            page_size: LIST_PAGE_SIZE,
        };
        assert_eq!(next.query()[1], ("page_token", "t".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_all_concatenates_in_order() {
        let requested = Mutex::new(Vec::new());

        let items = fetch_all(|cursor| {
            requested.lock().unwrap().push(cursor.token.clone());
            async move {
                let page = match cursor.token.as_ref().map(|t| t.as_str()) {
                    None => Page { items: vec![1, 2], next: next_url("p2") },
                    Some("p2") => Page { items: vec![3], next: next_url("p3") },
                    Some("p3") => Page { items: vec![4, 5], next: None },
                    Some(other) => panic!("unexpected token {other}"),
                };
                Ok(page)
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(requested.lock().unwrap().len(), 3);
        assert!(requested.lock().unwrap()[0].is_none());
    }

    #[tokio::test]
    async fn test_present_link_with_empty_token_terminates() {
        let calls = Mutex::new(0);
        let items = fetch_all(|_cursor| {
            *calls.lock().unwrap() += 1;
            async {
                Ok(Page {
                    items: vec!["a"],
                    next: Some("https://api.confluent.cloud/org/v2/environments?page_token=".into()),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec!["a"]);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_repeated_token_is_a_loop() {
        let result: Result<Vec<u8>, _> = fetch_all(|_cursor| async {
            Ok(Page {
                items: vec![0],
                next: next_url("same"),
            })
        })
        .await;

        match result {
            Err(ProviderError::PaginationLoop { token }) => assert_eq!(token, "same"),
            other => panic!("expected pagination loop, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_discards_partial_results() {
        let result: Result<Vec<u8>, _> = fetch_all(|cursor| async move {
            if cursor.token.is_none() {
                Ok(Page { items: vec![1], next: next_url("p2") })
            } else {
                Err(ProviderError::validation("boom"))
            }
        })
        .await;

        assert!(result.is_err());
    }
}
