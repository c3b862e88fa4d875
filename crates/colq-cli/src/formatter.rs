//! Output formatters for command results.

use clap::ValueEnum;
use colq_core::catalog::TableDef;
use colq_core::SqlStatement;
use colq_proto::{CollectionQuery, CollectionResult, Page};
use comfy_table::{Cell, Table};
use serde::Serialize;
use serde_json::Value;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a collection result.
    fn format_result(&self, result: &CollectionResult<Value>) -> String;

    /// Format a page with metadata.
    fn format_page(&self, page: &Page<Value>) -> String;

    /// Format a decoded query.
    fn format_query(&self, query: &CollectionQuery) -> String;

    /// Format a rendered statement.
    fn format_statement(&self, statement: &SqlStatement) -> String;

    /// Format a catalog listing, grouped by module.
    fn format_tables(&self, modules: &[(&str, Vec<&TableDef>)]) -> String;

    /// Format one table descriptor in detail.
    fn format_table(&self, table: &TableDef) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_result(&self, result: &CollectionResult<Value>) -> String {
        match &result.items {
            None => format!("total: {}", result.total),
            Some(rows) => format!(
                "{}\n{} row(s), total {}",
                rows_table(rows),
                rows.len(),
                result.total
            ),
        }
    }

    fn format_page(&self, page: &Page<Value>) -> String {
        format!(
            "{}\npage {} of {} ({} per page), total {}",
            rows_table(&page.data),
            page.info.page,
            page.info.total_pages,
            page.info.page_size,
            page.total
        )
    }

    fn format_query(&self, query: &CollectionQuery) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Field", "Value"]);
        if let Ok(Value::Object(fields)) = serde_json::to_value(query) {
            for (field, value) in fields {
                table.add_row(vec![Cell::new(field), Cell::new(cell_text(&value))]);
            }
        }
        table.to_string()
    }

    fn format_statement(&self, statement: &SqlStatement) -> String {
        if statement.params.is_empty() {
            return statement.sql.clone();
        }
        let mut table = Table::new();
        table.set_header(vec!["Param", "Value"]);
        for (i, param) in statement.params.iter().enumerate() {
            table.add_row(vec![format!("${}", i + 1), param.clone()]);
        }
        format!("{}\n{}", statement.sql, table)
    }

    fn format_tables(&self, modules: &[(&str, Vec<&TableDef>)]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Module", "Entity", "Table", "Columns", "Relations", "Soft delete"]);
        for (module, def) in modules
            .iter()
            .flat_map(|(module, tables)| tables.iter().map(move |def| (module, def)))
        {
            table.add_row(vec![
                module.to_string(),
                def.entity.clone(),
                def.table.clone(),
                def.columns.len().to_string(),
                def.relations.len().to_string(),
                def.soft_delete.clone().unwrap_or_default(),
            ]);
        }
        table.to_string()
    }

    fn format_table(&self, def: &TableDef) -> String {
        let mut columns = Table::new();
        columns.set_header(vec!["Column", "Type", "Nullable"]);
        for column in &def.columns {
            columns.add_row(vec![
                column.name.clone(),
                column.column_type.as_str().to_string(),
                if column.nullable { "yes" } else { "no" }.to_string(),
            ]);
        }

        let mut output = format!("{} ({})\n{}", def.entity, def.table, columns);
        if !def.relations.is_empty() {
            let mut relations = Table::new();
            relations.set_header(vec!["Relation", "Target", "Cardinality", "Join"]);
            for relation in &def.relations {
                relations.add_row(vec![
                    relation.name.clone(),
                    relation.target.clone(),
                    format!("{:?}", relation.cardinality),
                    format!("{} = {}.{}", relation.local_key, relation.name, relation.foreign_key),
                ]);
            }
            output.push('\n');
            output.push_str(&relations.to_string());
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// Render rows as a table whose header is the union of their keys.
fn rows_table(rows: &[Value]) -> String {
    if rows.is_empty() {
        return "No results".to_string();
    }

    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(fields) = row {
            for key in fields.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
    }

    let mut table = Table::new();
    table.set_header(headers.iter().map(Cell::new).collect::<Vec<_>>());
    for row in rows {
        table.add_row(
            headers
                .iter()
                .map(|h| Cell::new(row.get(h).map(cell_text).unwrap_or_default()))
                .collect::<Vec<_>>(),
        );
    }
    table.to_string()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl JsonFormatter {
    fn pretty(value: &impl Serialize) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            serde_json::json!({ "error": e.to_string() }).to_string()
        })
    }
}

impl Formatter for JsonFormatter {
    fn format_result(&self, result: &CollectionResult<Value>) -> String {
        Self::pretty(result)
    }

    fn format_page(&self, page: &Page<Value>) -> String {
        Self::pretty(page)
    }

    fn format_query(&self, query: &CollectionQuery) -> String {
        Self::pretty(query)
    }

    fn format_statement(&self, statement: &SqlStatement) -> String {
        Self::pretty(statement)
    }

    fn format_tables(&self, modules: &[(&str, Vec<&TableDef>)]) -> String {
        let listing: Vec<Value> = modules
            .iter()
            .map(|(module, tables)| serde_json::json!({ "module": module, "tables": tables }))
            .collect();
        Self::pretty(&listing)
    }

    fn format_table(&self, table: &TableDef) -> String {
        Self::pretty(table)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({ "message": message }).to_string()
    }
}
