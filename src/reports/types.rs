//! Report workflow types

use crate::decode::extract_path_string;
use crate::error::Error;
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named report specification that should exist remotely
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDefinition {
    /// Reconciliation key
    pub display_name: String,
    /// Dimensions, metrics, filters; passed through untouched
    pub spec: JsonObject,
}

impl ReportDefinition {
    /// Create a definition
    pub fn new(display_name: impl Into<String>, spec: JsonObject) -> Self {
        Self {
            display_name: display_name.into(),
            spec,
        }
    }

    /// Body of the creation request: the spec with `displayName` set to the
    /// reconciliation key
    ///
    /// A `displayName` inside the spec is ignored.
    pub fn creation_body(&self) -> JsonValue {
        let mut body = self.spec.clone();
        body.insert(
            "displayName".to_string(),
            JsonValue::String(self.display_name.clone()),
        );
        JsonValue::Object(body)
    }
}

/// Long-running operation handle as returned by `:run` and operation GETs
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Operation {
    /// Operation address
    #[serde(default)]
    pub name: String,
    /// Whether the operation reached a terminal state
    #[serde(default)]
    pub done: bool,
    /// Service-reported failure payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonValue>,
    /// Completion payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<JsonValue>,
}

/// Where a polled operation stands
#[derive(Debug, Clone, PartialEq)]
pub enum OperationState {
    /// Still running
    Pending,
    /// Finished with a service-reported error
    Failed(JsonValue),
    /// Finished successfully with this payload
    Succeeded(JsonValue),
}

impl Operation {
    /// Classify the latest snapshot
    pub fn state(&self) -> OperationState {
        if !self.done {
            return OperationState::Pending;
        }
        match (&self.error, &self.response) {
            (Some(error), _) => OperationState::Failed(error.clone()),
            (None, Some(response)) => OperationState::Succeeded(response.clone()),
            (None, None) => OperationState::Succeeded(JsonValue::Null),
        }
    }
}

/// Address of the materialized result set inside a completion payload
pub fn report_result_address(response: &JsonValue) -> Option<String> {
    extract_path_string(response, "reportResult").filter(|s| !s.is_empty())
}

/// The record emitted for one completed report run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    /// Result set address
    pub result_name: String,
    /// Service-assigned report id
    pub report_id: String,
    /// Report address, `networks/{network}/reports/{id}`
    pub report_name: String,
    /// UTC completion time, seconds precision
    pub run_time: String,
    /// All result rows in arrival order
    pub rows: Vec<JsonValue>,
}

impl ReportResult {
    /// Convert into a record value
    pub fn to_record(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Pipeline stage of one report within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    Creating,
    Confirming,
    RunTriggered,
    Polling,
    RowsFetching,
}

impl std::fmt::Display for ReportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReportStage::Creating => "creating",
            ReportStage::Confirming => "confirming",
            ReportStage::RunTriggered => "run_triggered",
            ReportStage::Polling => "polling",
            ReportStage::RowsFetching => "rows_fetching",
        };
        f.write_str(name)
    }
}

/// Why a report was skipped for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Creation request did not succeed
    CreationRejected {
        /// HTTP status of the creation response
        status: u16,
    },
    /// Created, but never showed up in the listing
    NotConfirmed {
        /// Listing fetches performed
        attempts: u32,
    },
    /// Operation completed without a result address
    NoResult,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::CreationRejected { status } => {
                write!(f, "creation rejected with HTTP {status}")
            }
            SkipReason::NotConfirmed { attempts } => {
                write!(f, "not visible after {attempts} listing attempts")
            }
            SkipReason::NoResult => write!(f, "operation produced no result"),
        }
    }
}

/// Terminal state of one report within a run
#[derive(Debug)]
pub enum ReportOutcome {
    /// Rows fetched, record ready to emit
    Emitted(ReportResult),
    /// Pipeline failed at `stage`
    Failed {
        display_name: String,
        report_name: Option<String>,
        stage: ReportStage,
        error: Error,
    },
    /// Nothing to emit this run
    Skipped {
        display_name: String,
        reason: SkipReason,
    },
}

impl ReportOutcome {
    /// The emitted record, if any
    pub fn result(&self) -> Option<&ReportResult> {
        match self {
            ReportOutcome::Emitted(result) => Some(result),
            _ => None,
        }
    }

    /// Whether this outcome produced a record
    pub fn is_emitted(&self) -> bool {
        matches!(self, ReportOutcome::Emitted(_))
    }
}

/// Intervals and bounds for the report workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Listing re-fetches after a successful creation
    pub confirm_attempts: u32,
    /// Sleep between confirmation fetches
    pub confirm_interval: Duration,
    /// Sleep between operation polls
    pub poll_interval: Duration,
    /// Wall-clock budget for one operation
    pub poll_timeout: Duration,
    /// Rows requested per fetchRows page
    pub rows_page_size: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            confirm_attempts: 5,
            confirm_interval: Duration::from_secs(2),
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(300),
            rows_page_size: 1000,
        }
    }
}
