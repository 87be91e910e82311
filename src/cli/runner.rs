//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::database::DatabaseEngine;
use crate::engine::Pipeline;
use crate::error::Result;
use crate::loader::{load_config, select_tables, validate_config, ExportConfig, FailurePolicy};
use crate::output::ObjectPublisher;
use crate::template::{load_env_file, TemplateContext};
use serde_json::{json, Value};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                tables,
                keep_going,
                destination,
            } => self.export(tables, *keep_going, destination.as_deref()).await,
            Commands::Check => self.check(),
            Commands::Validate => self.validate(),
            Commands::Tables => self.tables(),
        }
    }

    /// Load the export definition named by `--config`
    fn load(&self) -> Result<ExportConfig> {
        load_config(&self.cli.config)
    }

    /// Template context over the environment, after loading `--env-file`
    fn template_context(&self) -> Result<TemplateContext> {
        load_env_file(&self.cli.env_file)?;
        Ok(TemplateContext::from_env())
    }

    /// Full export run
    async fn export(
        &self,
        tables: &[String],
        keep_going: bool,
        destination: Option<&str>,
    ) -> Result<()> {
        let mut config = select_tables(&self.load()?, tables)?;
        if keep_going {
            config.on_table_error = FailurePolicy::Continue;
        }
        if let Some(url) = destination {
            config.destination.url = url.to_string();
            validate_config(&config)?;
        }

        let publisher = ObjectPublisher::parse(&config.destination.url)?;
        let context = self.template_context()?;
        let pipeline = Pipeline::new(config);

        let report = pipeline.execute(&publisher, &context).await?;

        self.output_message(&json!({
            "type": "REPORT",
            "report": report
        }))
    }

    /// Validate the definition, then open, probe and close the database
    fn check(&self) -> Result<()> {
        let config = self.load()?;
        let context = self.template_context()?;

        tracing::info!("Checking connection for export '{}'", config.name);

        let engine = match DatabaseEngine::open(&config.database, &context) {
            Ok(engine) => engine,
            Err(e) => {
                self.output_status(false, &format!("Failed to connect: {e}"))?;
                return Err(e);
            }
        };

        let probe = engine.check_connection();
        let info = engine.connection_info();
        if let Err(e) = engine.close() {
            tracing::warn!("{}", e);
        }

        match probe {
            Ok(()) => {
                self.output_status(true, &format!("Connection successful ({info})"))
            }
            Err(e) => {
                self.output_status(false, &format!("Connection check failed: {e}"))?;
                Err(e)
            }
        }
    }

    /// Validate export definition
    fn validate(&self) -> Result<()> {
        let config = self.load()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Export '{}' is valid with {} tables",
                    config.name,
                    config.tables.len()
                )
            }
        }))
    }

    /// List configured table mappings
    fn tables(&self) -> Result<()> {
        let config = self.load()?;

        let tables: Vec<Value> = config
            .tables
            .iter()
            .map(|table| {
                json!({
                    "name": table.name,
                    "source_columns": table.source_columns,
                    "destination_columns": table.labels()
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "TABLES",
            "destination": {
                "url": config.destination.url,
                "prefix": config.destination.prefix
            },
            "tables": tables
        }))
    }

    fn output_status(&self, succeeded: bool, message: &str) -> Result<()> {
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": if succeeded { "SUCCEEDED" } else { "FAILED" },
                "message": message
            }
        }))
    }

    /// Output a message
    fn output_message(&self, msg: &Value) -> Result<()> {
        let line = if self.cli.verbose {
            serde_json::to_string_pretty(msg)?
        } else {
            serde_json::to_string(msg)?
        };
        println!("{line}");
        Ok(())
    }
}
