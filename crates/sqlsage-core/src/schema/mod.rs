//! Table and column records as they appear in the hand-editable schema file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod extract;
pub mod merge;
pub mod store;

pub use extract::{extract, ExtractOptions};
pub use merge::merge;
pub use store::{load_saved, load_schema, persist, refresh_schema_file, SavedSchema};

/// Table name -> record, in extraction order.
pub type Schema = IndexMap<String, SchemaRecord>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<ColumnRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_primary_key: bool,
    /// `"table.column"` of the referenced key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<String>>,
}

impl SchemaRecord {
    pub fn column(&self, name: &str) -> Option<&ColumnRecord> {
        self.columns.iter().find(|c| c.name == name)
    }
}
