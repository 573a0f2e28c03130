//! Paginated resource listing

use crate::decode::{JsonDecoder, RecordDecoder};
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::pagination::{PageTokenPaginator, PaginationState, Paginator};
use crate::types::JsonValue;
use futures::stream::{self, Stream, TryStreamExt};
use tracing::debug;

/// Lists a network's collection endpoints page by page
#[derive(Debug, Clone, Copy)]
pub struct ResourceLister<'a> {
    client: &'a HttpClient,
    network_id: &'a str,
}

/// Everything one page fetch needs, cloned per page
#[derive(Clone)]
struct PageRequest<'a> {
    client: &'a HttpClient,
    path: String,
    decoder: JsonDecoder,
    paginator: PageTokenPaginator,
}

impl<'a> ResourceLister<'a> {
    /// Create a lister bound to a network
    pub fn new(client: &'a HttpClient, network_id: &'a str) -> Self {
        Self { client, network_id }
    }

    /// Collection path for a resource
    pub fn resource_path(&self, resource: &str) -> String {
        format!("networks/{}/{resource}", self.network_id)
    }

    /// Lazily yield every element of `resource` across all pages
    ///
    /// Nothing is requested until the stream is polled. The element array is
    /// read from the field named after the resource. A failed page is
    /// yielded as an error and ends the stream. Each call starts over from
    /// the first page.
    pub fn list(&self, resource: &str) -> impl Stream<Item = Result<JsonValue>> + 'a {
        let request = PageRequest {
            client: self.client,
            path: self.resource_path(resource),
            decoder: JsonDecoder::with_path(resource),
            paginator: PageTokenPaginator::listing(),
        };

        stream::try_unfold(Some(PaginationState::new()), move |state| {
            let request = request.clone();
            async move { request.next_page(state).await }
        })
        .map_ok(|records| stream::iter(records.into_iter().map(Ok)))
        .try_flatten()
    }
}

impl PageRequest<'_> {
    /// Fetch the page `state` points at; `None` once the last page was seen
    async fn next_page(
        &self,
        state: Option<PaginationState>,
    ) -> Result<Option<(Vec<JsonValue>, Option<PaginationState>)>> {
        let Some(mut state) = state else {
            return Ok(None);
        };
        let records = self.fetch(&mut state).await?;
        let next = (!state.done).then_some(state);
        Ok(Some((records, next)))
    }

    async fn fetch(&self, state: &mut PaginationState) -> Result<Vec<JsonValue>> {
        let request = RequestConfig::new().queries(self.paginator.initial_params(state));
        let body: JsonValue = self
            .client
            .get_json_with_config(&self.path, request)
            .await?;
        let records = self.decoder.extract(&body);
        let next = self
            .paginator
            .process_response(&body, records.len(), state);
        debug!(
            path = %self.path,
            page = state.pages,
            records = records.len(),
            more = !next.is_done(),
            "Fetched listing page"
        );
        Ok(records)
    }
}
