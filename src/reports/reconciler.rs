//! Report reconciliation
//!
//! Per run: look up existing reports by display name, create any that are
//! missing and wait for them to become visible, trigger a run, poll the
//! operation to completion and page through the result rows. Reports are
//! processed one after another; one report's failure never stops the next.

use super::types::{
    report_result_address, Operation, OperationState, ReconcileConfig, ReportDefinition,
    ReportOutcome, ReportResult, ReportStage, SkipReason,
};
use crate::decode::{extract_path_string, JsonDecoder, RecordDecoder};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::pagination::{NextPage, PageTokenPaginator, PaginationState, Paginator};
use crate::poll::{poll_until, PollOutcome, PollPolicy};
use crate::types::JsonValue;
use chrono::Utc;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Display name → service-assigned report id
pub type ReportMap = BTreeMap<String, String>;

/// How a definition was resolved to a remote report id
enum Resolution {
    Existing(String),
    Created(String),
    Skipped(SkipReason),
}

/// Drives the report workflow for one network
pub struct ReportReconciler<'a> {
    client: &'a HttpClient,
    network_id: &'a str,
    config: ReconcileConfig,
}

impl<'a> ReportReconciler<'a> {
    /// Create a reconciler bound to a network
    pub fn new(client: &'a HttpClient, network_id: &'a str, config: ReconcileConfig) -> Self {
        Self {
            client,
            network_id,
            config,
        }
    }

    /// Reports collection path
    pub fn reports_path(&self) -> String {
        format!("networks/{}/reports", self.network_id)
    }

    /// Address of one report
    pub fn report_name(&self, report_id: &str) -> String {
        format!("networks/{}/reports/{report_id}", self.network_id)
    }

    /// Run the workflow for every definition, in display name order
    ///
    /// Returns one outcome per definition. Only configuration and
    /// credential errors abort the run.
    pub async fn reconcile(
        &self,
        definitions: &[ReportDefinition],
    ) -> Result<Vec<ReportOutcome>> {
        let mut definitions: Vec<&ReportDefinition> = definitions.iter().collect();
        definitions.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        let mut mapping = self.fetch_existing_reports().await?;
        info!(
            network_id = self.network_id,
            existing = mapping.len(),
            declared = definitions.len(),
            "Reconciling reports"
        );

        let mut outcomes = Vec::with_capacity(definitions.len());
        for definition in definitions {
            match self.process_report(definition, &mut mapping).await {
                ReportOutcome::Failed { error, .. } if error.is_fatal() => return Err(error),
                outcome => outcomes.push(outcome),
            }
        }

        let emitted = outcomes.iter().filter(|o| o.is_emitted()).count();
        info!(
            emitted,
            not_emitted = outcomes.len() - emitted,
            "Report reconciliation finished"
        );
        Ok(outcomes)
    }

    /// Build the display name → id lookup, following page tokens
    ///
    /// A non-200 status or an undecodable page degrades to an empty mapping.
    pub async fn fetch_existing_reports(&self) -> Result<ReportMap> {
        match self.try_fetch_existing_reports().await {
            Ok(Some(mapping)) => Ok(mapping),
            Ok(None) => Ok(ReportMap::new()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "Existing report lookup failed, treating as empty");
                Ok(ReportMap::new())
            }
        }
    }

    async fn try_fetch_existing_reports(&self) -> Result<Option<ReportMap>> {
        let path = self.reports_path();
        let paginator = PageTokenPaginator::listing();
        let decoder = JsonDecoder::with_path("reports");
        let mut state = PaginationState::new();
        let mut mapping = ReportMap::new();

        loop {
            let request = RequestConfig::new().queries(paginator.initial_params(&state));
            let response = self.client.get_with_config(&path, request).await?;
            let status = response.status();
            if status != StatusCode::OK {
                warn!(
                    status = status.as_u16(),
                    "Existing report lookup returned non-200, treating as empty"
                );
                return Ok(None);
            }

            let body: JsonValue = response
                .json()
                .await
                .map_err(|e| Error::malformed(&path, e.to_string()))?;
            let reports = decoder.extract(&body);
            for report in &reports {
                let display_name = extract_path_string(report, "displayName");
                let report_id = extract_path_string(report, "reportId");
                if let (Some(display_name), Some(report_id)) = (display_name, report_id) {
                    mapping.insert(display_name, report_id);
                }
            }

            if paginator
                .process_response(&body, reports.len(), &mut state)
                .is_done()
            {
                break;
            }
        }

        debug!(reports = mapping.len(), pages = state.pages, "Fetched existing reports");
        Ok(Some(mapping))
    }

    /// Run one definition through the pipeline
    pub async fn process_report(
        &self,
        definition: &ReportDefinition,
        mapping: &mut ReportMap,
    ) -> ReportOutcome {
        let display_name = definition.display_name.as_str();

        let report_id = match self.resolve(definition, mapping).await {
            Ok(Resolution::Existing(id) | Resolution::Created(id)) => id,
            Ok(Resolution::Skipped(reason)) => {
                warn!(report = display_name, %reason, "Skipping report for this run");
                return ReportOutcome::Skipped {
                    display_name: display_name.to_string(),
                    reason,
                };
            }
            Err((stage, error)) => return self.failed(display_name, None, stage, error),
        };

        let report_name = self.report_name(&report_id);

        let operation = match self.run_report(&report_name).await {
            Ok(operation) => operation,
            Err(error) => {
                return self.failed(
                    display_name,
                    Some(report_name),
                    ReportStage::RunTriggered,
                    error,
                )
            }
        };

        let response = match self.wait_for_completion(&operation).await {
            Ok(response) => response,
            Err(error) => {
                return self.failed(display_name, Some(report_name), ReportStage::Polling, error)
            }
        };

        let Some(result_name) = report_result_address(&response) else {
            info!(report = %report_name, "Operation finished without a result, nothing to emit");
            return ReportOutcome::Skipped {
                display_name: display_name.to_string(),
                reason: SkipReason::NoResult,
            };
        };

        let rows = match self.fetch_all_rows(&result_name).await {
            Ok(rows) => rows,
            Err(error) => {
                return self.failed(
                    display_name,
                    Some(report_name),
                    ReportStage::RowsFetching,
                    error,
                )
            }
        };

        info!(report = %report_name, rows = rows.len(), "Report run complete");
        ReportOutcome::Emitted(ReportResult {
            result_name,
            report_id,
            report_name,
            run_time: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            rows,
        })
    }

    fn failed(
        &self,
        display_name: &str,
        report_name: Option<String>,
        stage: ReportStage,
        error: Error,
    ) -> ReportOutcome {
        error!(
            report = report_name.as_deref().unwrap_or(display_name),
            %stage,
            error = %error,
            "Failed to process report"
        );
        ReportOutcome::Failed {
            display_name: display_name.to_string(),
            report_name,
            stage,
            error,
        }
    }

    /// Find the remote id, creating the report if it is missing
    ///
    /// Errors carry the stage they were raised in.
    async fn resolve(
        &self,
        definition: &ReportDefinition,
        mapping: &mut ReportMap,
    ) -> std::result::Result<Resolution, (ReportStage, Error)> {
        let display_name = definition.display_name.as_str();
        if let Some(id) = mapping.get(display_name) {
            return Ok(Resolution::Existing(id.clone()));
        }

        info!(report = display_name, "Report missing, creating");
        let status = match self.create_report(definition).await {
            Ok(status) => status,
            Err(Error::HttpStatus { status, .. }) => {
                return Ok(Resolution::Skipped(SkipReason::CreationRejected { status }))
            }
            Err(e) => return Err((ReportStage::Creating, e)),
        };
        if !status.is_success() {
            return Ok(Resolution::Skipped(SkipReason::CreationRejected {
                status: status.as_u16(),
            }));
        }

        let confirmed = self
            .confirm_created(display_name)
            .await
            .map_err(|e| (ReportStage::Confirming, e))?;
        match confirmed {
            PollOutcome::Ready(latest) => {
                mapping.extend(latest);
                match mapping.get(display_name) {
                    Some(id) => Ok(Resolution::Created(id.clone())),
                    None => Ok(Resolution::Skipped(SkipReason::NotConfirmed {
                        attempts: self.config.confirm_attempts,
                    })),
                }
            }
            PollOutcome::Exhausted { attempts } => {
                Ok(Resolution::Skipped(SkipReason::NotConfirmed { attempts }))
            }
        }
    }

    /// POST the creation request, returning its status uninterpreted
    pub async fn create_report(&self, definition: &ReportDefinition) -> Result<StatusCode> {
        let response = self
            .client
            .post_with_config(
                &self.reports_path(),
                RequestConfig::new().json(definition.creation_body()),
            )
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                report = %definition.display_name,
                status = status.as_u16(),
                body = %body,
                "Report creation rejected"
            );
        }
        Ok(status)
    }

    /// Re-fetch the listing until `display_name` shows up
    async fn confirm_created(&self, display_name: &str) -> Result<PollOutcome<ReportMap>> {
        let policy = PollPolicy::attempts(self.config.confirm_attempts, self.config.confirm_interval);
        poll_until(policy, |attempt| async move {
            let latest = self.fetch_existing_reports().await?;
            let visible = latest.contains_key(display_name);
            debug!(report = display_name, attempt, visible, "Confirming report creation");
            Ok(visible.then_some(latest))
        })
        .await
    }

    /// Trigger a run, returning the operation address
    pub async fn run_report(&self, report_name: &str) -> Result<String> {
        let path = format!("{report_name}:run");
        let operation: Operation = self
            .client
            .post_json_with_config(&path, RequestConfig::new())
            .await?;
        if operation.name.is_empty() {
            return Err(Error::malformed(path, "operation has no name"));
        }
        debug!(report = report_name, operation = %operation.name, "Report run triggered");
        Ok(operation.name)
    }

    /// Poll an operation until done, returning its completion payload
    pub async fn wait_for_completion(&self, operation_name: &str) -> Result<JsonValue> {
        let policy = PollPolicy::elapsed(self.config.poll_timeout, self.config.poll_interval);
        let outcome = poll_until(policy, |attempt| async move {
            let operation: Operation = self.client.get_json(operation_name).await?;
            debug!(operation = operation_name, attempt, done = operation.done, "Polled operation");
            Ok(match operation.state() {
                OperationState::Pending => None,
                terminal => Some(terminal),
            })
        })
        .await?;

        match outcome {
            PollOutcome::Ready(OperationState::Failed(payload)) => {
                Err(Error::operation(operation_name, &payload))
            }
            PollOutcome::Ready(OperationState::Succeeded(response)) => Ok(response),
            PollOutcome::Ready(OperationState::Pending) | PollOutcome::Exhausted { .. } => {
                Err(Error::OperationTimeout {
                    operation: operation_name.to_string(),
                    timeout_secs: self.config.poll_timeout.as_secs(),
                })
            }
        }
    }

    /// Page through a result set, accumulating rows in arrival order
    pub async fn fetch_all_rows(&self, result_name: &str) -> Result<Vec<JsonValue>> {
        let path = format!("{result_name}:fetchRows");
        let paginator = PageTokenPaginator::rows(self.config.rows_page_size);
        let decoder = JsonDecoder::with_path("rows");
        let mut state = PaginationState::new();
        let mut rows = Vec::new();

        loop {
            let request = RequestConfig::new().queries(paginator.initial_params(&state));
            let body: JsonValue = self.client.get_json_with_config(&path, request).await?;
            let page = decoder.extract(&body);
            let count = page.len();
            rows.extend(page);

            if let NextPage::Done = paginator.process_response(&body, count, &mut state) {
                break;
            }
        }

        debug!(result = result_name, rows = rows.len(), pages = state.pages, "Fetched result rows");
        Ok(rows)
    }
}
