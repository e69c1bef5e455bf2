//! Form extraction: user input with per-field fallbacks.
//!
//! A field falls back to its configured default only when it is absent or
//! empty. Anything else, whitespace included, is taken verbatim.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::config::{Field, FieldDefaults};

/// Anything that can answer "what was entered under this key".
pub trait FormSource {
    fn value(&self, key: &str) -> Option<&str>;
}

impl FormSource for HashMap<String, String> {
    fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl FormSource for BTreeMap<String, String> {
    fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// The four ticket fields as submitted by the form pages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketForm {
    pub start_place: Option<String>,
    pub end_place: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    /// Browser viewport width, sent by the mobile page.
    pub viewport_width: Option<f32>,
}

impl FormSource for TicketForm {
    fn value(&self, key: &str) -> Option<&str> {
        let value = match key {
            "startPlace" => &self.start_place,
            "endPlace" => &self.end_place,
            "name" => &self.name,
            "date" => &self.date,
            _ => return None,
        };
        value.as_deref()
    }
}

/// Resolved text for the four fields of one generate action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInputs {
    pub start_place: String,
    pub end_place: String,
    pub name: String,
    pub date: String,
}

impl FormInputs {
    pub fn extract(source: &impl FormSource, defaults: &FieldDefaults) -> Self {
        let pick = |field: Field| -> String {
            match source.value(field.form_key()) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => defaults.get(field).to_string(),
            }
        };
        Self {
            start_place: pick(Field::Origin),
            end_place: pick(Field::Destination),
            name: pick(Field::Name),
            date: pick(Field::Date),
        }
    }

    /// Inputs as if every field were left empty.
    pub fn from_defaults(defaults: &FieldDefaults) -> Self {
        Self::extract(&HashMap::<String, String>::new(), defaults)
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Origin => &self.start_place,
            Field::Destination => &self.end_place,
            Field::Name => &self.name,
            Field::Date => &self.date,
        }
    }
}
