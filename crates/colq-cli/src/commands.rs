//! Command execution.

use std::path::Path;

use colq_core::query::{render_count, render_select, CollectionExecutor, QueryCompiler};
use colq_core::{Catalog, CatalogBuilder, Error, MemoryStore, Module};
use colq_proto::{codec, CollectionQuery};
use tracing::{debug, info, warn};

use crate::config::{CatalogSource, CliConfig, Command};
use crate::error::CliError;
use crate::formatter::Formatter;
use crate::schema::auth_module;

fn read_json(path: &Path) -> Result<serde_json::Value, CliError> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::Json {
        context: path.display().to_string(),
        source,
    })
}

/// Build the catalog the configuration names.
pub fn load_catalog(source: &CatalogSource) -> Result<Catalog, CliError> {
    let modules: Vec<Module> = match source {
        CatalogSource::Builtin => vec![auth_module()],
        CatalogSource::File(path) => {
            serde_json::from_value(read_json(path)?).map_err(|source| CliError::Json {
                context: path.display().to_string(),
                source,
            })?
        }
    };

    let mut builder = CatalogBuilder::new();
    for module in modules {
        builder = builder.register(module)?;
    }
    let catalog = builder.build()?;
    info!(modules = catalog.modules().count(), "catalog loaded");
    Ok(catalog)
}

/// Load fixture rows into an in-memory store.
pub fn load_store(path: &Path) -> Result<MemoryStore, CliError> {
    let store = MemoryStore::from_json(read_json(path)?)?;
    if store.is_empty() {
        warn!(path = %path.display(), "fixture file holds no rows");
    }
    info!(path = %path.display(), "fixtures loaded");
    Ok(store)
}

/// Parse the argument of `encode`: inline JSON, or `@path` to read a file.
fn parse_query_json(input: &str) -> Result<CollectionQuery, CliError> {
    let value = match input.strip_prefix('@') {
        Some(path) => read_json(Path::new(path))?,
        None => serde_json::from_str(input).map_err(|source| CliError::Json {
            context: "query".into(),
            source,
        })?,
    };
    serde_json::from_value(value).map_err(|source| CliError::Json {
        context: "query".into(),
        source,
    })
}

/// Execute a command and return its rendered output.
pub fn execute(
    command: &Command,
    config: &CliConfig,
    catalog: &Catalog,
    store: Option<&MemoryStore>,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    debug!(?command, "executing");
    match command {
        Command::Encode { json } => {
            let query = parse_query_json(json)?;
            query.validate().map_err(Error::from)?;
            Ok(formatter.format_message(&codec::encode(&query)))
        }
        Command::Decode { query } => {
            let query = codec::decode(query)?;
            Ok(formatter.format_query(&query))
        }
        Command::Compile {
            entity,
            query,
            count,
        } => {
            let query = codec::decode(query)?;
            let plan = QueryCompiler::new(catalog).compile(entity, &query, config.compile_options())?;
            let statement = if *count {
                render_count(&plan)
            } else {
                render_select(&plan)
            };
            Ok(formatter.format_statement(&statement))
        }
        Command::Run {
            entity,
            query,
            page,
            archived,
        } => {
            let store = store.ok_or(CliError::MissingData)?;
            let query = codec::decode(query)?;
            let executor = CollectionExecutor::new(catalog, store);
            if *archived {
                Ok(formatter.format_page(&executor.find_archived(entity, &query)?))
            } else if *page {
                Ok(formatter.format_page(&executor.find_page_with(
                    entity,
                    &query,
                    config.compile_options(),
                )?))
            } else {
                let result = executor.find_with(entity, &query, config.compile_options())?;
                Ok(formatter.format_result(&result))
            }
        }
        Command::Describe { entity } => match entity {
            Some(entity) => {
                let table = catalog
                    .table(entity)
                    .ok_or_else(|| Error::UnknownEntity(entity.clone()))?;
                Ok(formatter.format_table(table))
            }
            None => {
                let modules: Vec<_> = catalog
                    .modules()
                    .filter_map(|name| Some((name, catalog.module_tables(name)?)))
                    .collect();
                Ok(formatter.format_tables(&modules))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::JsonFormatter;
    use serde_json::{json, Value};

    fn catalog() -> Catalog {
        load_catalog(&CatalogSource::Builtin).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::from_json(json!({
            "users": [
                {"id": "u1", "username": "alice", "is_active": true, "deleted_at": null},
                {"id": "u2", "username": "bob", "is_active": false, "deleted_at": null},
                {"id": "u3", "username": "carol", "is_active": true, "deleted_at": "2024-05-01T00:00:00Z"}
            ]
        }))
        .unwrap()
    }

    fn run(command: Command, config: &CliConfig) -> Result<String, CliError> {
        let store = store();
        execute(&command, config, &catalog(), Some(&store), &JsonFormatter)
    }

    #[test]
    fn test_encode_then_decode() {
        let config = CliConfig::new();
        let encoded = run(
            Command::Encode {
                json: r#"{"where": [[{"column": "is_active", "operator": "=", "value": "true"}]], "take": 5}"#.into(),
            },
            &config,
        )
        .unwrap();
        let message: Value = serde_json::from_str(&encoded).unwrap();
        let query = message["message"].as_str().unwrap().to_string();
        assert_eq!(query, "w=is_active_:%3D_:true&t=5");

        let decoded: Value = serde_json::from_str(&run(Command::Decode { query }, &config).unwrap()).unwrap();
        assert_eq!(decoded["take"], 5);
    }

    #[test]
    fn test_encode_rejects_invalid_query() {
        let err = run(
            Command::Encode {
                json: r#"{"where": [[{"column": "", "operator": "=", "value": "x"}]]}"#.into(),
            },
            &CliConfig::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Core(Error::Protocol(_))));
    }

    #[test]
    fn test_compile_prints_sql() {
        let output = run(
            Command::Compile {
                entity: "User".into(),
                query: "w=username_:LIKE_:ali".into(),
                count: false,
            },
            &CliConfig::new(),
        )
        .unwrap();
        let statement: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            statement["sql"],
            r#"SELECT "users".* FROM "users" WHERE ("users"."username" LIKE $1) AND ("users"."deleted_at" IS NULL)"#
        );
        assert_eq!(statement["params"], json!(["%ali%"]));
    }

    #[test]
    fn test_run_respects_with_deleted() {
        let output = run(
            Command::Run {
                entity: "User".into(),
                query: "w=is_active_:%3D_:true".into(),
                page: false,
                archived: false,
            },
            &CliConfig::new(),
        )
        .unwrap();
        let result: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(result["total"], 1);

        let output = run(
            Command::Run {
                entity: "User".into(),
                query: "w=is_active_:%3D_:true".into(),
                page: false,
                archived: false,
            },
            &CliConfig::new().with_deleted(),
        )
        .unwrap();
        let result: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(result["total"], 2);
    }

    #[test]
    fn test_run_page_respects_with_deleted() {
        let paged = |config: &CliConfig| {
            let output = run(
                Command::Run {
                    entity: "User".into(),
                    query: "t=1".into(),
                    page: true,
                    archived: false,
                },
                config,
            )
            .unwrap();
            serde_json::from_str::<Value>(&output).unwrap()
        };

        let page = paged(&CliConfig::new());
        assert_eq!(page["total"], 2);
        assert_eq!(page["total_pages"], 2);

        let page = paged(&CliConfig::new().with_deleted());
        assert_eq!(page["total"], 3);
        assert_eq!(page["total_pages"], 3);
        assert_eq!(page["data"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_run_archived_page() {
        let output = run(
            Command::Run {
                entity: "users".into(),
                query: String::new(),
                page: false,
                archived: true,
            },
            &CliConfig::new(),
        )
        .unwrap();
        let page: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(page["total"], 1);
        assert_eq!(page["data"][0]["username"], "carol");
        assert_eq!(page["page"], 1);
    }

    #[test]
    fn test_run_needs_data() {
        let err = execute(
            &Command::Run {
                entity: "User".into(),
                query: String::new(),
                page: false,
                archived: false,
            },
            &CliConfig::new(),
            &catalog(),
            None,
            &JsonFormatter,
        )
        .unwrap_err();
        assert!(matches!(err, CliError::MissingData));
    }

    #[test]
    fn test_describe() {
        let output = run(Command::Describe { entity: None }, &CliConfig::new()).unwrap();
        let modules: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(modules[0]["module"], "auth");
        assert_eq!(modules[0]["tables"].as_array().unwrap().len(), 7);

        let err = run(
            Command::Describe {
                entity: Some("Invoice".into()),
            },
            &CliConfig::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Core(Error::UnknownEntity(_))));
    }
}
