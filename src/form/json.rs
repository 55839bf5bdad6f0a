use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;

use super::FieldWriter;

/// A form kept as a flat JSON object on disk, one key per field.
#[derive(Debug, Clone)]
pub struct JsonForm {
    path: Utf8PathBuf,
    fields: Map<String, Value>,
    written: HashSet<String>,
}

impl JsonForm {
    /// Opens the form at `path`. A missing file is an empty form.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let fields = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Form file is not a JSON object: {path}"))?,
            Err(err) if err.kind() == ErrorKind::NotFound => Map::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read form file: {path}"));
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            fields,
            written: HashSet::new(),
        })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Value of `field` if it was written since the form was loaded.
    pub fn written(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|_| self.written.contains(field))
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.fields)?;
        fs::write(&self.path, content + "\n")
            .with_context(|| format!("Failed to write form file: {}", self.path))
    }
}

impl FieldWriter for JsonForm {
    fn write_number(&mut self, field: &str, value: f64) {
        let value = Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.written.insert(field.to_owned());
        self.fields.insert(field.to_owned(), value);
    }

    fn write_text(&mut self, field: &str, value: &str) {
        self.written.insert(field.to_owned());
        self.fields.insert(field.to_owned(), Value::String(value.to_owned()));
    }
}
