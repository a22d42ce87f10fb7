//! Named cell renderers
//!
//! Columns select a renderer by name through `renderView` / `renderEdit` in
//! the configuration. A [`RendererRegistry`] maps those names to
//! [`CellRenderer`] implementations; `date`, `datetime`, `boolean` and
//! `email` are registered by default.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::render::{escape_html, truncate};
use crate::schema::{value_to_string, Row};

/// Converts a cell value to HTML
pub trait CellRenderer: Send + Sync + 'static {
    /// HTML shown in the grid and in read-only places
    ///
    /// The output is inserted as-is, so implementations must escape what they
    /// take from `value` or `row`.
    fn render_view(&self, value: &Value, row: &Row) -> String;

    /// HTML edit control for the field `name`
    ///
    /// The control submitted under `name` should carry the `edit-input` class
    /// so inline edits can detect changes.
    fn render_edit(&self, name: &str, value: &Value, row: &Row) -> String;
}

/// Registry of renderers by name
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn CellRenderer>>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("date", DateRenderer);
        registry.register("datetime", DateTimeRenderer);
        registry.register("boolean", BooleanRenderer);
        registry.register("email", EmailRenderer);
        registry
    }
}

impl RendererRegistry {
    /// Registry with the built-in renderers
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry without any renderers
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Register `renderer` under `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, renderer: impl CellRenderer) {
        self.renderers.insert(name.into(), Arc::new(renderer));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CellRenderer>> {
        self.renderers.get(name)
    }

    /// Look up an optional renderer name, ignoring unknown names
    pub fn resolve(&self, name: Option<&str>) -> Option<&Arc<dyn CellRenderer>> {
        let name = name?;
        let renderer = self.get(name);
        if renderer.is_none() {
            tracing::debug!(renderer = name, "unknown renderer, using default");
        }
        renderer
    }
}

fn text_input(input_type: &str, name: &str, value: &str) -> String {
    format!(
        r#"<input type="{}" name="{}" value="{}" class="edit-input">"#,
        input_type,
        escape_html(name),
        escape_html(value)
    )
}

fn date_part(value: &Value) -> String {
    value_to_string(value).chars().take(10).collect()
}

/// `YYYY-MM-DD HH:MM` with a space or `T` separator, seconds dropped
fn minutes_part(value: &Value, separator: char) -> String {
    value_to_string(value)
        .chars()
        .take(16)
        .enumerate()
        .map(|(index, character)| {
            if index == 10 && (character == ' ' || character == 'T') {
                separator
            } else {
                character
            }
        })
        .collect()
}

/// Truthiness of a stored flag: true, non-zero numbers, "1", "true", "yes"
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "t"
        ),
        _ => false,
    }
}

/// Shows the date part of a date or timestamp
pub struct DateRenderer;

impl CellRenderer for DateRenderer {
    fn render_view(&self, value: &Value, _row: &Row) -> String {
        escape_html(&date_part(value))
    }

    fn render_edit(&self, name: &str, value: &Value, _row: &Row) -> String {
        text_input("date", name, &date_part(value))
    }
}

/// Shows a timestamp to the minute
pub struct DateTimeRenderer;

impl CellRenderer for DateTimeRenderer {
    fn render_view(&self, value: &Value, _row: &Row) -> String {
        escape_html(&minutes_part(value, ' '))
    }

    fn render_edit(&self, name: &str, value: &Value, _row: &Row) -> String {
        text_input("datetime-local", name, &minutes_part(value, 'T'))
    }
}

/// Yes/No display with a select submitting 1 or 0
pub struct BooleanRenderer;

impl CellRenderer for BooleanRenderer {
    fn render_view(&self, value: &Value, _row: &Row) -> String {
        match value {
            Value::Null => String::new(),
            other if is_truthy(other) => r#"<span class="bool-yes">Yes</span>"#.to_string(),
            _ => r#"<span class="bool-no">No</span>"#.to_string(),
        }
    }

    fn render_edit(&self, name: &str, value: &Value, _row: &Row) -> String {
        let truthy = is_truthy(value);
        format!(
            r#"<select name="{}" class="edit-input"><option value="1"{}>Yes</option><option value="0"{}>No</option></select>"#,
            escape_html(name),
            if truthy { " selected" } else { "" },
            if truthy { "" } else { " selected" },
        )
    }
}

/// `mailto:` link
pub struct EmailRenderer;

impl CellRenderer for EmailRenderer {
    fn render_view(&self, value: &Value, _row: &Row) -> String {
        let address = value_to_string(value);
        if address.is_empty() {
            return String::new();
        }
        format!(
            r#"<a href="mailto:{}">{}</a>"#,
            escape_html(&address),
            escape_html(&truncate(&address))
        )
    }

    fn render_edit(&self, name: &str, value: &Value, _row: &Row) -> String {
        text_input("email", name, &value_to_string(value))
    }
}
