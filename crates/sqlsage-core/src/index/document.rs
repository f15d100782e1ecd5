use crate::schema::{Schema, SchemaRecord};

/// Searchable text for one table, tagged with the table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDocument {
    pub table_name: String,
    pub content: String,
}

impl SchemaDocument {
    pub fn from_record(table_name: &str, record: &SchemaRecord) -> Self {
        let mut lines = Vec::with_capacity(record.columns.len());
        for c in &record.columns {
            let mut line = format!("- {} ({})", c.name, c.data_type);
            if !c.description.is_empty() {
                line.push_str(&format!(": {}", c.description));
            }
            if let Some(fk) = &c.foreign_key {
                line.push_str(&format!(" [FK: {}]", fk));
            }
            if let Some(samples) = c.samples.as_ref().filter(|s| !s.is_empty()) {
                line.push_str(&format!(": (Ex: {})", samples.join(", ")));
            }
            lines.push(line);
        }

        Self {
            table_name: table_name.to_string(),
            content: format!(
                "Table: {}\nDescription: {}\nColumns:\n{}",
                table_name,
                record.description,
                lines.join("\n")
            ),
        }
    }
}

pub fn documents_for(schema: &Schema) -> Vec<SchemaDocument> {
    schema
        .iter()
        .map(|(name, record)| SchemaDocument::from_record(name, record))
        .collect()
}
