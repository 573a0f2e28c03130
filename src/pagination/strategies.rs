//! Pagination strategy implementations

use super::types::{NextPage, PaginationState, Paginator};
use crate::decode::extract_path_string;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

// ============================================================================
// Page Token Pagination
// ============================================================================

/// Opaque continuation token pagination
///
/// Each response may carry a token naming the next page. An absent or
/// empty token ends the sequence without another request, as does a token
/// equal to the one just sent.
#[derive(Debug, Clone)]
pub struct PageTokenPaginator {
    /// Query parameter carrying the token
    pub token_param: String,
    /// Response field holding the next token
    pub token_path: String,
    /// Optional page size parameter sent with every request
    pub page_size: Option<(String, u32)>,
}

impl PageTokenPaginator {
    /// Create a new page token paginator
    pub fn new(token_param: impl Into<String>, token_path: impl Into<String>) -> Self {
        Self {
            token_param: token_param.into(),
            token_path: token_path.into(),
            page_size: None,
        }
    }

    /// Listing endpoints take the token as `page_token`
    pub fn listing() -> Self {
        Self::new("page_token", "nextPageToken")
    }

    /// Result row pages take `pageToken` plus an explicit `pageSize`
    pub fn rows(page_size: u32) -> Self {
        Self::new("pageToken", "nextPageToken").with_page_size("pageSize", page_size)
    }

    /// Send a page size parameter with every request
    #[must_use]
    pub fn with_page_size(mut self, param: impl Into<String>, size: u32) -> Self {
        self.page_size = Some((param.into(), size));
        self
    }
}

impl Paginator for PageTokenPaginator {
    fn initial_params(&self, state: &PaginationState) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some((param, size)) = &self.page_size {
            params.insert(param.clone(), size.to_string());
        }
        if let Some(cursor) = &state.cursor {
            params.insert(self.token_param.clone(), cursor.clone());
        }
        params
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count as u64);

        match extract_path_string(body, &self.token_path) {
            Some(token) if state.cursor.as_deref() == Some(token.as_str()) => {
                warn!(
                    token = %token,
                    pages = state.pages,
                    "Server repeated the page token, stopping pagination"
                );
                state.mark_done();
                NextPage::Done
            }
            Some(token) if !token.is_empty() => {
                state.set_cursor(token.clone());
                NextPage::with_param(&self.token_param, token)
            }
            _ => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}
