//! Command-line arguments and the configuration derived from them.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colq_core::CompileOptions;

use crate::formatter::OutputFormat;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "colq=info";

/// Where table descriptors come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// The built-in `auth` module.
    Builtin,
    /// A JSON file holding an array of modules.
    File(PathBuf),
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub catalog: CatalogSource,
    /// JSON fixtures for the in-memory store.
    pub data_path: Option<PathBuf>,
    pub format: OutputFormat,
    /// Include soft-deleted rows.
    pub with_deleted: bool,
}

impl CliConfig {
    /// Configuration using the built-in catalog and table output.
    pub fn new() -> Self {
        Self {
            catalog: CatalogSource::Builtin,
            data_path: None,
            format: OutputFormat::Table,
            with_deleted: false,
        }
    }

    /// Load descriptors from a JSON file.
    pub fn with_catalog_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog = CatalogSource::File(path.into());
        self
    }

    /// Set the fixture file.
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Keep soft-deleted rows.
    pub fn with_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }

    /// Compile options implied by this configuration.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            with_deleted: self.with_deleted,
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "colq")]
#[command(version, about = "Encode, inspect and run collection queries", long_about = None)]
pub struct Args {
    /// JSON catalog file (defaults to the built-in auth module).
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// JSON fixture file used by `run`.
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "table", value_enum, global = true)]
    pub format: OutputFormat,

    /// Include soft-deleted rows.
    #[arg(long, global = true)]
    pub with_deleted: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Encode a JSON query (or @file) into its query-string form.
    Encode { json: String },

    /// Decode a query string and print the query.
    Decode { query: String },

    /// Compile a query string and print the SQL.
    Compile {
        entity: String,
        query: String,
        /// Print the counting statement instead.
        #[arg(long)]
        count: bool,
    },

    /// Run a query string against the fixture data.
    Run {
        entity: String,
        query: String,
        /// Attach page metadata.
        #[arg(long)]
        page: bool,
        /// List only soft-deleted rows.
        #[arg(long, conflicts_with = "page")]
        archived: bool,
    },

    /// List catalog tables, or describe one entity.
    Describe { entity: Option<String> },
}

impl Args {
    /// Split arguments into configuration and the command to run.
    pub fn into_config(self) -> (CliConfig, Command) {
        let mut config = CliConfig::new().with_format(self.format);
        if let Some(path) = self.catalog {
            config = config.with_catalog_file(path);
        }
        if let Some(path) = self.data {
            config = config.with_data_path(path);
        }
        if self.with_deleted {
            config = config.with_deleted();
        }
        (config, self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.catalog, CatalogSource::Builtin);
        assert!(config.data_path.is_none());
        assert_eq!(config.format, OutputFormat::Table);
        assert_eq!(config.compile_options(), CompileOptions::default());
    }

    #[test]
    fn test_config_builder() {
        let config = CliConfig::new()
            .with_catalog_file("catalog.json")
            .with_data_path("fixtures.json")
            .with_format(OutputFormat::Json)
            .with_deleted();

        assert_eq!(config.catalog, CatalogSource::File("catalog.json".into()));
        assert_eq!(config.data_path, Some(PathBuf::from("fixtures.json")));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.compile_options().with_deleted);
    }

    #[test]
    fn test_args_into_config() {
        let args = Args::try_parse_from([
            "colq",
            "run",
            "User",
            "w=is_active_:%3D_:true",
            "--data",
            "fixtures.json",
            "--format",
            "json",
            "--page",
        ])
        .unwrap();
        let (config, command) = args.into_config();

        assert_eq!(config.data_path, Some(PathBuf::from("fixtures.json")));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.with_deleted);
        assert_eq!(
            command,
            Command::Run {
                entity: "User".into(),
                query: "w=is_active_:%3D_:true".into(),
                page: true,
                archived: false,
            }
        );
    }

    #[test]
    fn test_page_conflicts_with_archived() {
        let result = Args::try_parse_from(["colq", "run", "User", "", "--page", "--archived"]);
        assert!(result.is_err());
    }
}
