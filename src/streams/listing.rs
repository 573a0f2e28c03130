//! Collection listing streams

use super::{RecordSink, ResourceLister, StreamContext, TapStream};
use crate::error::Result;
use crate::schema::{orders_schema, placements_schema, reports_schema, JsonSchema};
use async_trait::async_trait;
use futures::TryStreamExt;
use tracing::info;

/// A stream backed by one collection endpoint
#[derive(Debug, Clone)]
pub struct ListingStream {
    resource: &'static str,
    key_properties: &'static [&'static str],
    replication_key: Option<&'static str>,
    schema: fn() -> JsonSchema,
}

impl ListingStream {
    /// `networks/{id}/orders`, incremental on `updateTime`
    pub fn orders() -> Self {
        Self {
            resource: "orders",
            key_properties: &["orderId"],
            replication_key: Some("updateTime"),
            schema: orders_schema,
        }
    }

    /// `networks/{id}/placements`
    pub fn placements() -> Self {
        Self {
            resource: "placements",
            key_properties: &["name"],
            replication_key: None,
            schema: placements_schema,
        }
    }

    /// `networks/{id}/reports`
    pub fn reports() -> Self {
        Self {
            resource: "reports",
            key_properties: &["name"],
            replication_key: None,
            schema: reports_schema,
        }
    }
}

#[async_trait]
impl TapStream for ListingStream {
    fn name(&self) -> &str {
        self.resource
    }

    fn key_properties(&self) -> Vec<String> {
        self.key_properties.iter().map(|k| (*k).to_string()).collect()
    }

    fn replication_key(&self) -> Option<&str> {
        self.replication_key
    }

    fn schema(&self) -> JsonSchema {
        (self.schema)()
    }

    async fn read(&self, ctx: &StreamContext<'_>, sink: &mut dyn RecordSink) -> Result<u64> {
        let lister = ResourceLister::new(ctx.client, ctx.network_id);
        let records = lister.list(self.resource);
        futures::pin_mut!(records);

        let mut count = 0u64;
        while let Some(record) = records.try_next().await? {
            sink.push(record)?;
            count += 1;
        }

        info!(stream = self.resource, records = count, "Listing complete");
        Ok(count)
    }
}
