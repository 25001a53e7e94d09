//! Model Builder: maps an [`AnalysisResult`] onto the tabular data model
//! stored in the `DataModelSchema` entry.

use crate::analysis::AnalysisResult;
use crate::error::RustyPbixError;
use regex::Regex;
use serde_json::json;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

pub const REVENUE_TABLE: &str = "Revenue_Analysis";
pub const PRODUCT_TABLE: &str = "Product_Performance";
pub const SUMMARY_TABLE: &str = "Summary_Metrics";

const MODEL_NAME: &str = "BusinessAnalyticsModel";
const COMPATIBILITY_LEVEL: u32 = 1550;
const CULTURE: &str = "en-US";
const CURRENCY_FORMAT: &str = "$#,0";
const AVERAGE_FORMAT: &str = "$#,0.00";
const PERCENT_LITERAL_FORMAT: &str = "0.00\"%\"";

/// `Table[column]` references, and bare `[Measure]` references when the table is empty
static COLUMN_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_]*)\[([^\]]+)\]").expect("Hardcode regex pattern")
});

static COUNTROWS_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"COUNTROWS\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*\)").expect("Hardcode regex pattern")
});

/// Storage type of a model column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataType {
    String,
    Double,
    Int64,
}

impl DataType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Double => "double",
            DataType::Int64 => "int64",
        }
    }

    /// Power Query type used in the `#table` partition literal
    const fn m_type(&self) -> &'static str {
        match self {
            DataType::String => "text",
            DataType::Double => "number",
            DataType::Int64 => "Int64.Type",
        }
    }

    const fn summarize_by(&self) -> &'static str {
        match self {
            DataType::String => "none",
            DataType::Double | DataType::Int64 => "sum",
        }
    }
}

/// A single data value held by a model table.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelValue {
    Text(String),
    Double(f64),
    Integer(u64),
}

impl ModelValue {
    fn to_m_literal(&self) -> String {
        match self {
            ModelValue::Text(text) => format!("\"{}\"", text.replace('"', "\"\"")),
            ModelValue::Double(number) if number.is_finite() => number.to_string(),
            ModelValue::Double(_) => "null".to_owned(),
            ModelValue::Integer(number) => number.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelColumn {
    pub name: String,
    pub data_type: DataType,
    pub format_string: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelTable {
    pub name: String,
    pub columns: Vec<ModelColumn>,
    pub rows: Vec<Vec<ModelValue>>,
}

impl ModelTable {
    fn new(name: &str, columns: &[(&str, DataType, Option<&str>)]) -> Self {
        Self {
            name: name.to_owned(),
            columns: columns
                .iter()
                .map(|(name, data_type, format_string)| ModelColumn {
                    name: (*name).to_owned(),
                    data_type: *data_type,
                    format_string: format_string.map(str::to_owned),
                })
                .collect(),
            rows: vec![],
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    /// Import partition source: a `#table(type table [...], {...})` literal of the rows.
    pub fn m_expression(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| format!("{} = {}", m_identifier(&column.name), column.data_type.m_type()))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = self
            .rows
            .iter()
            .map(|row| format!("{{{}}}", row.iter().map(ModelValue::to_m_literal).collect::<Vec<_>>().join(", ")))
            .collect::<Vec<_>>()
            .join(", ");
        format!("#table(type table [{columns}], {{{rows}}})")
    }

    fn to_json(&self, measures: &[&Measure]) -> Value {
        let columns: Vec<Value> = self
            .columns
            .iter()
            .map(|column| {
                let mut value = json!({
                    "name": column.name,
                    "dataType": column.data_type.as_str(),
                    "sourceColumn": column.name,
                    "summarizeBy": column.data_type.summarize_by(),
                });
                if let Some(format_string) = &column.format_string {
                    value["formatString"] = json!(format_string);
                }
                value
            })
            .collect();
        json!({
            "name": self.name,
            "columns": columns,
            "partitions": [{
                "name": format!("{}_Partition", self.name),
                "mode": "import",
                "source": { "type": "m", "expression": self.m_expression() },
            }],
            "measures": measures.iter().map(|measure| json!({
                "name": measure.name,
                "expression": measure.expression,
                "formatString": measure.format_string,
            })).collect::<Vec<_>>(),
        })
    }
}

/// Quotes a name as `#"..."` unless it is a plain identifier.
fn m_identifier(name: &str) -> String {
    let is_plain = name.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_plain {
        name.to_owned()
    } else {
        format!("#\"{}\"", name.replace('"', "\"\""))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Measure {
    /// Owning table
    pub table: String,
    pub name: String,
    /// DAX expression
    pub expression: String,
    pub format_string: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cardinality {
    OneToMany,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub cardinality: Cardinality,
}

/// Tables, measures and relationships of the packaged model.
#[derive(Clone, Debug, PartialEq)]
pub struct DataModelSchema {
    pub tables: Vec<ModelTable>,
    pub measures: Vec<Measure>,
    pub relationships: Vec<Relationship>,
}

impl DataModelSchema {
    pub fn table(&self, name: &str) -> Option<&ModelTable> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Checks referential integrity: unique names, resolvable measure owners,
    /// relationship endpoints and every reference inside measure expressions.
    pub fn validate(&self) -> Result<(), RustyPbixError> {
        let mut table_names = HashSet::<&str>::new();
        for table in &self.tables {
            if !table_names.insert(&table.name) {
                Err(RustyPbixError::SchemaIntegrityError(format!("duplicate table '{}'", table.name)))?
            }
            let mut column_names = HashSet::<&str>::new();
            for column in &table.columns {
                if !column_names.insert(&column.name) {
                    Err(RustyPbixError::SchemaIntegrityError(format!("duplicate column '{}[{}]'", table.name, column.name)))?
                }
            }
            if let Some(row) = table.rows.iter().position(|row| row.len() != table.columns.len()) {
                Err(RustyPbixError::SchemaIntegrityError(format!("row {} of '{}' does not match its columns", row, table.name)))?
            }
        }

        let column_exists = |table: &str, column: &str| self.table(table).map(|table| table.has_column(column)).unwrap_or(false);
        let mut measure_names = HashSet::<&str>::new();
        for measure in &self.measures {
            if self.table(&measure.table).is_none() {
                Err(RustyPbixError::SchemaIntegrityError(format!(
                    "measure '{}' belongs to undeclared table '{}'",
                    measure.name, measure.table
                )))?
            }
            if !measure_names.insert(&measure.name) {
                Err(RustyPbixError::SchemaIntegrityError(format!("duplicate measure '{}'", measure.name)))?
            }
        }

        for measure in &self.measures {
            for capture in COLUMN_REFERENCE.captures_iter(&measure.expression) {
                let (table, target) = (&capture[1], &capture[2]);
                let resolved = if table.is_empty() {
                    measure_names.contains(target)
                } else {
                    column_exists(table, target)
                };
                if !resolved {
                    Err(RustyPbixError::SchemaIntegrityError(format!(
                        "measure '{}' references unknown '{}'",
                        measure.name,
                        &capture[0]
                    )))?
                }
            }
            for capture in COUNTROWS_REFERENCE.captures_iter(&measure.expression) {
                if self.table(&capture[1]).is_none() {
                    Err(RustyPbixError::SchemaIntegrityError(format!(
                        "measure '{}' counts rows of unknown table '{}'",
                        measure.name,
                        &capture[1]
                    )))?
                }
            }
        }

        for relationship in &self.relationships {
            for (table, column) in [
                (&relationship.from_table, &relationship.from_column),
                (&relationship.to_table, &relationship.to_column),
            ] {
                if !column_exists(table, column) {
                    Err(RustyPbixError::SchemaIntegrityError(format!("relationship endpoint '{table}[{column}]' is not declared")))?
                }
            }
        }
        Ok(())
    }

    /// The `DataModelSchema` document.
    pub fn to_json(&self) -> Value {
        let tables: Vec<Value> = self
            .tables
            .iter()
            .map(|table| {
                let measures: Vec<&Measure> = self.measures.iter().filter(|measure| measure.table == table.name).collect();
                table.to_json(&measures)
            })
            .collect();
        let relationships: Vec<Value> = self
            .relationships
            .iter()
            .map(|relationship| {
                let (from_cardinality, to_cardinality) = match relationship.cardinality {
                    Cardinality::OneToMany => ("one", "many"),
                };
                json!({
                    "name": format!("{}_{}", relationship.from_table, relationship.to_table),
                    "fromTable": relationship.from_table,
                    "fromColumn": relationship.from_column,
                    "fromCardinality": from_cardinality,
                    "toTable": relationship.to_table,
                    "toColumn": relationship.to_column,
                    "toCardinality": to_cardinality,
                    "crossFilteringBehavior": "oneDirection",
                })
            })
            .collect();
        let query_order: Vec<&str> = self.tables.iter().map(|table| table.name.as_str()).collect();
        json!({
            "name": MODEL_NAME,
            "compatibilityLevel": COMPATIBILITY_LEVEL,
            "model": {
                "culture": CULTURE,
                "dataAccessOptions": {
                    "legacyRedirects": true,
                    "returnErrorValuesAsNull": true,
                },
                "tables": tables,
                "relationships": relationships,
                "annotations": [
                    { "name": "PBI_QueryOrder", "value": json!(query_order).to_string() },
                    { "name": "PBI_ProTooling", "value": json!(["DevMode"]).to_string() },
                ],
            },
        })
    }
}

/// A DAX literal for a number; non-finite values become `BLANK()`.
fn dax_literal(number: f64) -> String {
    if number.is_finite() {
        number.to_string()
    } else {
        "BLANK()".to_owned()
    }
}

/// Builds the three fact tables, the fixed measure set and the period relationships.
pub fn build_model(result: &AnalysisResult) -> Result<DataModelSchema, RustyPbixError> {
    let mut revenue = ModelTable::new(REVENUE_TABLE, &[
        ("period", DataType::String, None),
        ("value", DataType::Double, Some(AVERAGE_FORMAT)),
    ]);
    revenue.rows = result
        .revenue_analysis
        .iter()
        .map(|point| vec![ModelValue::Text(point.period.to_owned()), ModelValue::Double(point.value)])
        .collect();

    let mut products = ModelTable::new(PRODUCT_TABLE, &[
        ("entity", DataType::String, None),
        ("value", DataType::Double, Some(AVERAGE_FORMAT)),
        ("margin_percent", DataType::Double, Some("0.00")),
        ("transactions", DataType::Int64, Some("#,0")),
        ("average_value", DataType::Double, Some(AVERAGE_FORMAT)),
    ]);
    products.rows = result
        .product_performance
        .iter()
        .map(|entry| {
            vec![
                ModelValue::Text(entry.entity.to_owned()),
                ModelValue::Double(entry.value),
                ModelValue::Double(entry.margin_percent),
                ModelValue::Integer(entry.transactions),
                ModelValue::Double(entry.average_value),
            ]
        })
        .collect();

    let summary = &result.summary;
    let mut metrics = ModelTable::new(SUMMARY_TABLE, &[
        ("total_revenue", DataType::Double, Some(AVERAGE_FORMAT)),
        ("growth_rate", DataType::Double, Some("0.00")),
        ("total_transactions", DataType::Int64, Some("#,0")),
        ("top_entity", DataType::String, None),
    ]);
    metrics.rows = vec![vec![
        ModelValue::Double(summary.total_revenue),
        ModelValue::Double(summary.growth_rate),
        ModelValue::Integer(summary.total_transactions),
        ModelValue::Text(summary.top_entity.to_owned()),
    ]];

    let measure = |table: &str, name: &str, expression: String, format_string: &str| Measure {
        table: table.to_owned(),
        name: name.to_owned(),
        expression,
        format_string: format_string.to_owned(),
    };
    let measures = vec![
        measure(REVENUE_TABLE, "Total Revenue", format!("SUM({REVENUE_TABLE}[value])"), CURRENCY_FORMAT),
        measure(PRODUCT_TABLE, "Total Sales", format!("SUM({PRODUCT_TABLE}[value])"), CURRENCY_FORMAT),
        measure(
            PRODUCT_TABLE,
            "Average Transaction Value",
            format!("DIVIDE([Total Sales], COUNTROWS({REVENUE_TABLE}))"),
            AVERAGE_FORMAT,
        ),
        measure(SUMMARY_TABLE, "Growth Rate %", dax_literal(summary.growth_rate), PERCENT_LITERAL_FORMAT),
    ];

    let tables = vec![revenue, products, metrics];
    let relationships = period_relationships(&tables);
    let schema = DataModelSchema { tables, measures, relationships };
    schema.validate()?;
    Ok(schema)
}

/// `Revenue_Analysis[period]` relates one-to-many to every other table with a `period` column.
fn period_relationships(tables: &[ModelTable]) -> Vec<Relationship> {
    tables
        .iter()
        .filter(|table| table.name != REVENUE_TABLE && table.has_column("period"))
        .map(|table| Relationship {
            from_table: REVENUE_TABLE.to_owned(),
            from_column: "period".to_owned(),
            to_table: table.name.to_owned(),
            to_column: "period".to_owned(),
            cardinality: Cardinality::OneToMany,
        })
        .collect()
}
