//! Report results stream

use super::{RecordSink, StreamContext, TapStream};
use crate::error::Result;
use crate::reports::ReportReconciler;
use crate::schema::{report_results_schema, JsonSchema};
use async_trait::async_trait;
use tracing::info;

/// Reconciles the declared reports, runs them and emits their rows
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportResultsStream;

#[async_trait]
impl TapStream for ReportResultsStream {
    fn name(&self) -> &str {
        "report_results"
    }

    fn key_properties(&self) -> Vec<String> {
        vec!["result_name".to_string()]
    }

    fn schema(&self) -> JsonSchema {
        report_results_schema()
    }

    async fn read(&self, ctx: &StreamContext<'_>, sink: &mut dyn RecordSink) -> Result<u64> {
        if ctx.reports.is_empty() {
            info!("No reports declared, nothing to run");
            return Ok(0);
        }

        let reconciler = ReportReconciler::new(ctx.client, ctx.network_id, ctx.reconcile);
        let outcomes = reconciler.reconcile(ctx.reports).await?;

        let mut count = 0u64;
        for result in outcomes.iter().filter_map(|o| o.result()) {
            sink.push(result.to_record())?;
            count += 1;
        }
        Ok(count)
    }
}
