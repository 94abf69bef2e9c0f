//! Verification of the mirror database's field layout.
//!
//! The schema is never created or altered here; a database that lacks a
//! required field fails verification and the run stops before any write.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use playmirror_core::{RemoteError, Status};

use crate::fields::{self, FieldKind};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("could not retrieve the database schema: {0}")]
    Retrieve(#[from] RemoteError),

    #[error("database has no title field")]
    MissingTitle,

    #[error("database has several title fields: {}", .0.join(", "))]
    MultipleTitles(Vec<String>),

    #[error("database schema mismatch: {}", .problems.join("; "))]
    Fields { problems: Vec<String> },
}

/// Field name → type tag, as reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSchema {
    pub fields: BTreeMap<String, String>,
    /// Select options of the status field, name → color.
    pub status_options: BTreeMap<String, String>,
}

impl MirrorSchema {
    /// Parse a database object's `properties`.
    pub fn from_database(body: &Value) -> Result<Self, RemoteError> {
        let props = body
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| RemoteError::malformed("database", "missing `properties`"))?;

        let mut schema = MirrorSchema::default();
        for (name, prop) in props {
            let kind = prop
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if name == fields::STATUS && kind == FieldKind::Select.tag() {
                let options = prop
                    .get("select")
                    .and_then(|s| s.get("options"))
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for opt in options {
                    if let Some(opt_name) = opt.get("name").and_then(Value::as_str) {
                        let color = opt.get("color").and_then(Value::as_str).unwrap_or("default");
                        schema
                            .status_options
                            .insert(opt_name.to_string(), color.to_string());
                    }
                }
            }
            schema.fields.insert(name.clone(), kind);
        }
        Ok(schema)
    }

    /// A schema holding exactly the required fields and a `Name` title.
    pub fn expected() -> Self {
        let mut schema = MirrorSchema::default();
        schema
            .fields
            .insert("Name".to_string(), FieldKind::Title.tag().to_string());
        for (name, kind) in fields::REQUIRED {
            schema.fields.insert(name.to_string(), kind.tag().to_string());
        }
        for status in Status::all() {
            schema.status_options.insert(
                status.display_name().to_string(),
                status.color().to_string(),
            );
        }
        schema
    }

    /// Check the layout and return the name of the title field.
    ///
    /// Missing status options only warn: the store adds select options on
    /// first write.
    pub fn verify(&self) -> Result<String, SchemaError> {
        let titles: Vec<String> = self
            .fields
            .iter()
            .filter(|(_, kind)| kind.as_str() == FieldKind::Title.tag())
            .map(|(name, _)| name.clone())
            .collect();
        let title = match titles.as_slice() {
            [] => return Err(SchemaError::MissingTitle),
            [one] => one.clone(),
            _ => return Err(SchemaError::MultipleTitles(titles)),
        };

        let mut problems = Vec::new();
        for (name, kind) in fields::REQUIRED {
            match self.fields.get(*name) {
                None => problems.push(format!("missing field `{name}` ({kind})")),
                Some(actual) if actual != kind.tag() => {
                    problems.push(format!("field `{name}` is {actual}, expected {kind}"))
                }
                Some(_) => {}
            }
        }
        if !problems.is_empty() {
            return Err(SchemaError::Fields { problems });
        }

        for status in Status::all() {
            match self.status_options.get(status.display_name()) {
                None => tracing::warn!(
                    "status option `{}` not defined yet; it will be created on first use",
                    status.display_name()
                ),
                Some(color) if color != status.color() => tracing::warn!(
                    "status option `{}` is {color}, expected {}",
                    status.display_name(),
                    status.color()
                ),
                Some(_) => {}
            }
        }
        Ok(title)
    }
}
