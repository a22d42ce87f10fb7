//! Record forms: new, edit, view and duplicate

use serde_json::Value;

use super::{escape_html, record_url, table_url};
use crate::renderers::RendererRegistry;
use crate::schema::{value_to_string, ColumnDescriptor, Row, TableDescriptor, TypeFamily};

/// Name of the hidden field asking the edit handler to return to the view page
pub const RETURN_FIELD: &str = "__return";

/// Which form to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    New,
    Edit,
    View,
    Duplicate,
}

impl FormMode {
    pub fn title(self, table: &TableDescriptor) -> String {
        let verb = match self {
            FormMode::New => "New",
            FormMode::Edit => "Edit",
            FormMode::View => "View",
            FormMode::Duplicate => "Duplicate",
        };
        format!("{} {}", verb, table.display_name)
    }
}

/// Input element type for a column, inferred from its type string and name
pub fn input_type(column: &ColumnDescriptor) -> &'static str {
    let name = column.name.to_ascii_lowercase();
    if name.contains("password") {
        return "password";
    }
    if name.contains("email") && column.type_family().is_textual() {
        return "email";
    }
    match column.type_family() {
        TypeFamily::Integer | TypeFamily::Decimal => "number",
        TypeFamily::Date => "date",
        TypeFamily::DateTime => "datetime-local",
        TypeFamily::Time => "time",
        TypeFamily::Boolean | TypeFamily::LongText | TypeFamily::Text => "text",
    }
}

/// Stored value formatted for an input of [`input_type`]
pub fn input_value(column: &ColumnDescriptor, value: &Value) -> String {
    let text = value_to_string(value);
    match input_type(column) {
        "date" => text.chars().take(10).collect(),
        "datetime-local" => text.replacen(' ', "T", 1).chars().take(19).collect(),
        _ => text,
    }
}

/// Edit control for `column` submitted as `name`
///
/// A configured edit renderer wins; otherwise an input (or a textarea when
/// `multiline` is set and the column holds long text) with the `edit-input` class.
pub fn edit_control(
    column: &ColumnDescriptor,
    name: &str,
    value: &Value,
    row: &Row,
    renderers: &RendererRegistry,
    multiline: bool,
) -> String {
    if let Some(renderer) = renderers.resolve(column.render_edit.as_deref()) {
        return renderer.render_edit(name, value, row);
    }

    if multiline && column.type_family() == TypeFamily::LongText {
        return format!(
            r#"<textarea name="{}" class="edit-input" rows="5">{}</textarea>"#,
            escape_html(name),
            escape_html(&value_to_string(value))
        );
    }

    let input_type = input_type(column);
    let step = if column.type_family() == TypeFamily::Decimal {
        r#" step="any""#
    } else {
        ""
    };
    format!(
        r#"<input type="{}" name="{}" value="{}" class="edit-input"{}>"#,
        input_type,
        escape_html(name),
        escape_html(&input_value(column, value)),
        step
    )
}

/// Everything a record form needs
pub struct RecordForm<'a> {
    pub root: &'a str,
    pub table: &'a TableDescriptor,
    pub mode: FormMode,

    /// Key of the record, for edit and view
    pub id: Option<&'a str>,
    pub row: Option<&'a Row>,
    pub renderers: &'a RendererRegistry,
}

impl RecordForm<'_> {
    fn action(&self) -> String {
        match (self.mode, self.id) {
            (FormMode::Edit | FormMode::View, Some(id)) => {
                record_url(self.root, &self.table.name, "edit", id)
            }
            _ => format!("{}/new", table_url(self.root, &self.table.name)),
        }
    }

    fn value(&self, column: &ColumnDescriptor) -> Value {
        // Duplicates start from the source row without its key
        if self.mode == FormMode::Duplicate && Some(column) == self.table.primary_key() {
            return Value::Null;
        }
        self.row
            .and_then(|row| row.get(&column.name))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn field(&self, column: &ColumnDescriptor, is_key: bool) -> String {
        let empty = Row::new();
        let row = self.row.unwrap_or(&empty);
        let value = self.value(column);

        let control = if is_key {
            let placeholder = match self.mode {
                FormMode::New | FormMode::Duplicate => r#" placeholder="auto""#,
                FormMode::Edit | FormMode::View => "",
            };
            format!(
                r#"<input type="text" name="{}" value="{}" class="key-input" readonly{}>"#,
                escape_html(&column.name),
                escape_html(&value_to_string(&value)),
                placeholder
            )
        } else {
            edit_control(column, &column.name, &value, row, self.renderers, true)
        };

        format!(
            r#"
            <div class="form-group" data-col="{name}">
                <label>{name}</label>
                {control}
            </div>"#,
            name = escape_html(&column.name),
            control = control,
        )
    }

    fn buttons(&self) -> String {
        let back = escape_html(&table_url(self.root, &self.table.name));
        match self.mode {
            FormMode::View => {
                let duplicate = match self.id {
                    Some(id) if self.table.features.duplicate => format!(
                        r#"<a href="{}" class="btn duplicate-btn">Duplicate</a>"#,
                        escape_html(&record_url(self.root, &self.table.name, "duplicate", id))
                    ),
                    _ => String::new(),
                };
                format!(
                    r#"<div class="form-actions view-form-actions">
                <button type="button" id="view-edit-toggle-btn" class="btn edit-btn">Edit</button>
                <input type="submit" id="view-edit-save-btn" value="Save" class="btn btn-primary" hidden>
                {duplicate}
                <a href="{back}" class="back-btn">Back</a>
            </div>"#,
                    duplicate = duplicate,
                    back = back,
                )
            }
            _ => format!(
                r#"<div class="form-actions">
                <input type="submit" value="Save" class="btn btn-primary">
                <a href="{}" class="back-btn">Back</a>
            </div>"#,
                back
            ),
        }
    }
}

/// Render the form for `form.mode`
///
/// The view form starts read-only (`view-mode`); the client script toggles it
/// into an edit form that posts back with `__return=view`.
pub fn render_record_form(form: &RecordForm<'_>) -> String {
    let key = form.table.primary_key();
    let fields: String = form
        .table
        .columns
        .iter()
        .map(|column| form.field(column, Some(column) == key))
        .collect();

    let (form_attributes, extra) = match form.mode {
        FormMode::View => (
            r#" id="view-edit-form" class="record-form view-mode""#,
            format!(r#"<input type="hidden" name="{}" value="view">"#, RETURN_FIELD),
        ),
        _ => (r#" class="record-form""#, String::new()),
    };

    format!(
        r#"<div class="form-wrapper">
        <form method="POST" action="{action}"{form_attributes}>
            {extra}{fields}
            {buttons}
        </form>
    </div>"#,
        action = escape_html(&form.action()),
        form_attributes = form_attributes,
        extra = extra,
        fields = fields,
        buttons = form.buttons(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrudConfig;
    use crate::schema::ColumnInfo;
    use serde_json::json;

    fn posts() -> TableDescriptor {
        TableDescriptor::new(
            &CrudConfig::default(),
            "posts",
            vec![
                ColumnInfo {
                    is_primary_key: true,
                    nullable: false,
                    ..ColumnInfo::new("id", "INTEGER")
                },
                ColumnInfo::new("title", "VARCHAR(200)"),
                ColumnInfo::new("body", "TEXT"),
                ColumnInfo::new("author_email", "VARCHAR(100)"),
                ColumnInfo::new("published_at", "DATETIME"),
                ColumnInfo::new("rating", "DECIMAL(3,1)"),
            ],
        )
    }

    fn row() -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(7));
        row.insert("title".to_string(), json!("Hello <world>"));
        row.insert("body".to_string(), json!("Long text"));
        row.insert("author_email".to_string(), json!("a@b.c"));
        row.insert("published_at".to_string(), json!("2024-05-01 08:30:00"));
        row.insert("rating".to_string(), json!("4.5"));
        row
    }

    #[test]
    fn test_input_type_inference() {
        let table = posts();
        let types: Vec<_> = table.columns.iter().map(input_type).collect();
        assert_eq!(
            types,
            vec!["number", "text", "text", "email", "datetime-local", "number"]
        );
        let published = table.column("published_at").unwrap();
        assert_eq!(
            input_value(published, &json!("2024-05-01 08:30:00")),
            "2024-05-01T08:30:00"
        );
    }

    #[test]
    fn test_edit_form() {
        let table = posts();
        let row = row();
        let registry = RendererRegistry::new();
        let html = render_record_form(&RecordForm {
            root: "",
            table: &table,
            mode: FormMode::Edit,
            id: Some("7"),
            row: Some(&row),
            renderers: &registry,
        });

        assert!(html.contains(r#"action="/posts/edit/7""#));
        assert!(html.contains(r#"name="id" value="7" class="key-input" readonly"#));
        assert!(html.contains("Hello &lt;world&gt;"));
        assert!(html.contains(r#"<textarea name="body""#));
        assert!(html.contains(r#"step="any""#));
        assert!(!html.contains(RETURN_FIELD));
    }

    #[test]
    fn test_view_form_returns_to_view() {
        let table = posts();
        let row = row();
        let registry = RendererRegistry::new();
        let html = render_record_form(&RecordForm {
            root: "/admin",
            table: &table,
            mode: FormMode::View,
            id: Some("7"),
            row: Some(&row),
            renderers: &registry,
        });

        assert!(html.contains(r#"id="view-edit-form""#));
        assert!(html.contains(r#"name="__return" value="view""#));
        assert!(html.contains(r#"href="/admin/posts/duplicate/7""#));
    }

    #[test]
    fn test_duplicate_form_strips_key() {
        let table = posts();
        let row = row();
        let registry = RendererRegistry::new();
        let html = render_record_form(&RecordForm {
            root: "",
            table: &table,
            mode: FormMode::Duplicate,
            id: Some("7"),
            row: Some(&row),
            renderers: &registry,
        });

        assert!(html.contains(r#"action="/posts/new""#));
        assert!(html.contains(r#"name="id" value="" class="key-input" readonly placeholder="auto""#));
        assert!(html.contains("Hello &lt;world&gt;"));
        assert_eq!(FormMode::Duplicate.title(&table), "Duplicate posts");
    }

    #[test]
    fn test_configured_edit_renderer() {
        let config = CrudConfig::from_yaml_str(
            "tables:\n  - name: posts\n    columns:\n      - name: published_at\n        renderEdit: date\n",
        )
        .unwrap();
        let table = TableDescriptor::new(
            &config,
            "posts",
            vec![
                ColumnInfo::new("id", "INTEGER"),
                ColumnInfo::new("published_at", "DATETIME"),
            ],
        );
        let column = table.column("published_at").unwrap();
        let html = edit_control(
            column,
            "value",
            &json!("2024-05-01 08:30:00"),
            &Row::new(),
            &RendererRegistry::new(),
            false,
        );
        assert_eq!(
            html,
            r#"<input type="date" name="value" value="2024-05-01" class="edit-input">"#
        );
    }
}
