//! Asynchronous report workflow
//!
//! Ensures declared report definitions exist on the service, runs each
//! one, waits for the run operation and collects the result rows.
//!
//! Per report: `PENDING_LOOKUP → (CREATING → CONFIRMING)? → RUN_TRIGGERED →
//! POLLING → ROWS_FETCHING → EMITTED`, or `FAILED` / `SKIPPED`.

mod reconciler;
mod types;

pub use reconciler::{ReportMap, ReportReconciler};
pub use types::{
    report_result_address, Operation, OperationState, ReconcileConfig, ReportDefinition,
    ReportOutcome, ReportResult, ReportStage, SkipReason,
};
