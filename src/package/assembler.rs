//! Package Assembler: serializes the model and layout into the closed set of
//! archive entries, in manifest order and with canonical encodings.

use crate::error::ResultMessage;
use crate::error::RustyPbixError;
use crate::package::content_types::content_types_xml;
use crate::package::layout::ReportLayout;
use crate::package::model::DataModelSchema;
use serde_json::json;
use serde_json::Value;
use tracing::debug;

pub const DATA_MODEL_SCHEMA: &str = "DataModelSchema";
pub const REPORT_LAYOUT: &str = "Report/Layout";
pub const DIAGRAM_LAYOUT: &str = "DiagramLayout";
pub const DIAGRAM_STATE: &str = "DiagramState";
pub const VERSION: &str = "Version";
pub const CONTENT_TYPES: &str = "[Content_Types].xml";
pub const SETTINGS: &str = "Settings";
pub const SECURITY_BINDINGS: &str = "SecurityBindings";
pub const METADATA: &str = "Metadata";

/// Every entry a package holds, in the order they are written.
pub const MANIFEST: [&str; 9] = [
    DATA_MODEL_SCHEMA,
    REPORT_LAYOUT,
    DIAGRAM_LAYOUT,
    DIAGRAM_STATE,
    VERSION,
    CONTENT_TYPES,
    SETTINGS,
    SECURITY_BINDINGS,
    METADATA,
];

const PACKAGE_VERSION: &str = "2.0";

/// The serialized entries of one archive. Built once by [`assemble`] and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Package {
    entries: Vec<(&'static str, Vec<u8>)>,
}

impl Package {
    /// Entries in manifest order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.entries.iter().map(|(name, content)| (*name, content.as_slice()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find(|(entry, _)| *entry == name).map(|(_, content)| content.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pretty-printed JSON with object keys in sorted order.
fn canonical_json(value: &Value) -> Result<Vec<u8>, RustyPbixError> {
    // serde_json::Value keeps object keys in a BTreeMap
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn diagram_layout(model: &DataModelSchema) -> Value {
    let tables: Vec<Value> = model
        .tables
        .iter()
        .enumerate()
        .map(|(index, table)| {
            json!({
                "name": table.name,
                "x": 100 + 250 * index,
                "y": 100,
                "width": 200,
                "height": 200,
            })
        })
        .collect();
    json!({ "version": 1, "diagramLayout": { "tables": tables } })
}

fn diagram_state(model: &DataModelSchema) -> Value {
    let active = model.tables.first().map(|table| table.name.as_str()).unwrap_or_default();
    json!({ "version": 1, "activeTable": active })
}

fn settings() -> Value {
    json!({
        "version": "1.0",
        "settings": {
            "useEnhancedTooltips": true,
            "exportDataMode": 1,
        },
    })
}

fn metadata() -> Value {
    json!({
        "version": "1.0",
        "author": "Business Analytics Automator",
        "description": "Automatically generated business analytics report",
    })
}

fn security_bindings() -> Value {
    json!({ "version": 1, "bindings": [] })
}

/// Validates both inputs, then serializes every manifest entry.
pub fn assemble(model: &DataModelSchema, layout: &ReportLayout) -> Result<Package, RustyPbixError> {
    model.validate().or_serialization("invalid data model")?;
    layout.validate().map_err(|e| RustyPbixError::SerializationError(format!("invalid report layout: {e}")))?;

    let mut entries = Vec::<(&'static str, Vec<u8>)>::with_capacity(MANIFEST.len());
    for name in MANIFEST {
        let content = match name {
            DATA_MODEL_SCHEMA => canonical_json(&model.to_json()),
            REPORT_LAYOUT => canonical_json(&layout.to_json()),
            DIAGRAM_LAYOUT => canonical_json(&diagram_layout(model)),
            DIAGRAM_STATE => canonical_json(&diagram_state(model)),
            VERSION => Ok(PACKAGE_VERSION.as_bytes().to_vec()),
            CONTENT_TYPES => content_types_xml(MANIFEST.into_iter().filter(|entry| *entry != CONTENT_TYPES)),
            SETTINGS => canonical_json(&settings()),
            SECURITY_BINDINGS => canonical_json(&security_bindings()),
            _ => canonical_json(&metadata()),
        }
        .or_serialization(name)?;
        debug!(entry = name, size = content.len(), "serialized package entry");
        entries.push((name, content));
    }
    Ok(Package { entries })
}
