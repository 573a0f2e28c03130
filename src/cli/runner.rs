//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{connection_specification, TapConfig};
use crate::engine::{Message, SyncConfig, SyncEngine};
use crate::error::{Error, Result};
use crate::output::{JsonLinesSink, MessageSink, ParquetSink};
use crate::state::StateManager;
use crate::streams::{catalog, catalog_entry, select_streams, TapStream};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command, writing messages to stdout
    pub async fn run(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        self.run_with(&mut stdout).await
    }

    /// Run the CLI command, writing messages to `out`
    pub async fn run_with<W: Write + Send>(&self, out: &mut W) -> Result<()> {
        let mut sink = JsonLinesSink::new(out).pretty(self.cli.format == OutputFormat::Pretty);
        match &self.cli.command {
            Commands::Spec => self.spec(&mut sink),
            Commands::Check { config_json } => self.check(config_json.as_deref(), &mut sink).await,
            Commands::Discover { config_json } => {
                self.discover(config_json.as_deref(), &mut sink)
            }
            Commands::Streams => self.streams(&mut sink),
            Commands::Read {
                config_json,
                output,
                ..
            } => {
                let names = self.cli.command.selected_streams();
                self.read(&names, config_json.as_deref(), output.as_deref(), sink)
                    .await
            }
        }
    }

    /// Load configuration
    ///
    /// Inline JSON takes precedence over the `--config` file.
    fn load_config(&self, inline: Option<&str>) -> Result<TapConfig> {
        if let Some(json_str) = inline {
            return TapConfig::from_json(json_str);
        }

        if let Some(path) = &self.cli.config {
            return TapConfig::from_file(path);
        }

        Err(Error::config(
            "No configuration given (use --config or --config-json)",
        ))
    }

    fn has_config(&self, inline: Option<&str>) -> bool {
        inline.is_some() || self.cli.config.is_some()
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    /// Show configuration specification
    fn spec(&self, sink: &mut dyn MessageSink) -> Result<()> {
        sink.emit(&Message::Spec {
            spec: json!({
                "documentationUrl": "https://developers.google.com/ad-manager/api/beta",
                "connectionSpecification": connection_specification(),
            }),
        })
    }

    /// Check connection
    ///
    /// Invalid configuration is an error; a refused connection is reported
    /// as a FAILED status.
    async fn check(&self, config_json: Option<&str>, sink: &mut dyn MessageSink) -> Result<()> {
        let config = self.load_config(config_json)?;
        sink.emit(&Message::info(format!(
            "Checking connection to network {}",
            config.network_id
        )))?;

        let outcome = match config.build_client() {
            Ok(client) => {
                let engine = SyncEngine::new(
                    client,
                    StateManager::in_memory(),
                    SyncConfig::new(&config.network_id),
                );
                engine.check().await
            }
            Err(e) => Err(e),
        };

        let (status, message) = match outcome {
            Ok(network) => {
                let name = network
                    .get("displayName")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&config.network_id);
                ("SUCCEEDED", format!("Connected to network {name}"))
            }
            Err(e) => {
                warn!(error = %e, "Connection check failed");
                ("FAILED", format!("Connection failed: {e}"))
            }
        };

        sink.emit(&Message::ConnectionStatus {
            status: status.to_string(),
            message,
        })
    }

    /// Discover streams
    fn discover(&self, config_json: Option<&str>, sink: &mut dyn MessageSink) -> Result<()> {
        // Schemas are static; a given config is still validated
        if self.has_config(config_json) {
            self.load_config(config_json)?;
        }

        let streams = catalog()
            .iter()
            .map(|stream| catalog_entry(stream.as_ref()))
            .collect();
        sink.emit(&Message::Catalog { streams })
    }

    /// List stream names
    fn streams(&self, sink: &mut dyn MessageSink) -> Result<()> {
        let streams = catalog()
            .iter()
            .map(|stream| stream.name().to_string())
            .collect();
        sink.emit(&Message::Streams { streams })
    }

    /// Read data
    async fn read<W: Write + Send>(
        &self,
        names: &[String],
        config_json: Option<&str>,
        output: Option<&Path>,
        lines: JsonLinesSink<&mut W>,
    ) -> Result<()> {
        let config = self.load_config(config_json)?;
        let streams = select_streams(names)?;
        let state = self.load_state()?;

        let sync_config = SyncConfig::new(&config.network_id)
            .with_reports(config.report_definitions()?)
            .with_reconcile(config.reconcile_config())
            .with_start_date(config.start_date.clone());
        let mut engine = SyncEngine::new(config.build_client()?, state, sync_config);

        match (output, self.cli.format) {
            (Some(dir), format) => {
                let mut sink =
                    ParquetSink::new(dir, lines)?.echo_records(format != OutputFormat::Parquet);
                self.sync(&mut engine, &streams, &mut sink).await
            }
            (None, OutputFormat::Parquet) => Err(Error::config(
                "Parquet format requires --output directory",
            )),
            (None, _) => {
                let mut sink = lines;
                self.sync(&mut engine, &streams, &mut sink).await
            }
        }
    }

    /// Run the engine and finish with the sync summary
    async fn sync(
        &self,
        engine: &mut SyncEngine,
        streams: &[Box<dyn TapStream>],
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let mut summary = engine.run(streams, sink).await?;
        summary.output_files = sink.finish()?;

        if let Some(path) = &self.cli.state {
            engine.state().save_to_file(path).await?;
            info!(path = %path.display(), "State saved");
        }

        sink.emit(&Message::SyncSummary { summary })
    }
}
