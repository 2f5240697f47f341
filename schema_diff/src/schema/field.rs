//! Column definitions

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::element::SchemaElement;
use crate::utils::naming::quote_identifier;

/// One row of `SHOW COLUMNS` output, used to build fields without a full statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub extra: Option<String>,
    /// Part of the primary key (`Key` = `PRI`)
    #[serde(default)]
    pub primary: bool,
}

/// Represents a column of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    field_type: String,
    attributes: String,
    nullable: bool,
    unsigned: bool,
    auto_increment: bool,
    default_value: Option<String>,
    extra: Option<String>,
    raw: String,
}

impl Field {
    /// Create a new nullable field with the given name and type
    pub fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            attributes: String::new(),
            nullable: true,
            unsigned: false,
            auto_increment: false,
            default_value: None,
            extra: None,
            raw: String::new(),
        }
    }

    /// Set the attribute string (`unsigned NOT NULL`, `COLLATE ...`)
    pub fn attributes(mut self, attributes: &str) -> Self {
        self.attributes = attributes.trim().to_string();
        self.refresh_flags();
        self
    }

    /// Set the raw default expression, exactly as it should be rendered
    pub fn default_value(mut self, default: &str) -> Self {
        self.default_value = Some(default.to_string());
        self
    }

    /// Mark the field as AUTO_INCREMENT
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.extra = Some("AUTO_INCREMENT".to_string());
        self
    }

    /// Parse a column line from `SHOW CREATE TABLE` output
    ///
    /// Accepts both `` `name` type, `` and the general form carrying
    /// nullability, `DEFAULT` and `AUTO_INCREMENT`.
    pub fn parse(stmt: &str) -> Result<Self> {
        let raw = stmt.trim();
        let body = raw.trim_end_matches(',').trim_end();
        let err = || Error::parse(raw, raw);

        let rest = body.strip_prefix('`').ok_or_else(err)?;
        let close = rest.find('`').ok_or_else(err)?;
        let name = &rest[..close];
        if name.is_empty() {
            return Err(err());
        }

        let (field_type, tail) = split_type(rest[close + 1..].trim_start()).ok_or_else(err)?;
        let mut field = Field::new(name, field_type);
        field.raw = raw.to_string();

        let mut tail = tail.trim();
        if tail.is_empty() {
            // minimal form: no explicit NOT NULL
            return Ok(field);
        }

        if let Some(stripped) = strip_trailing_keyword(tail, "AUTO_INCREMENT") {
            field.auto_increment = true;
            field.extra = Some("AUTO_INCREMENT".to_string());
            tail = stripped;
        }

        match find_keyword(tail, "DEFAULT") {
            Some(pos) => {
                field.attributes = tail[..pos].trim().to_string();
                let default = tail[pos + "DEFAULT".len()..].trim();
                if default.is_empty() {
                    return Err(err());
                }
                field.default_value = Some(default.to_string());
            }
            None => field.attributes = tail.to_string(),
        }
        field.refresh_flags();

        Ok(field)
    }

    /// Build a field from an introspected column row
    pub fn from_column(column: &ColumnInfo) -> Self {
        let column_type = column.column_type.trim();
        let (field_type, modifiers) = match column_type.split_once(char::is_whitespace) {
            Some((ty, rest)) => (ty, rest.trim()),
            None => (column_type, ""),
        };

        let mut attributes = modifiers.to_string();
        if !column.nullable {
            if !attributes.is_empty() {
                attributes.push(' ');
            }
            attributes.push_str("NOT NULL");
        }

        let mut field = Field::new(&column.name, field_type).attributes(&attributes);
        field.default_value = match &column.default {
            Some(value) => Some(render_default(value)),
            None if column.nullable => Some("NULL".to_string()),
            None => None,
        };

        let extra = column
            .extra
            .as_deref()
            .unwrap_or("")
            .replace("DEFAULT_GENERATED", "");
        let extra = extra.trim();
        if extra.eq_ignore_ascii_case("auto_increment") {
            field = field.auto_increment();
        } else if !extra.is_empty() {
            field.extra = Some(extra.to_uppercase());
        }
        field
    }

    fn refresh_flags(&mut self) {
        let upper = self.attributes.to_uppercase();
        self.nullable = !upper.contains("NOT NULL");
        self.unsigned = upper.contains("UNSIGNED");
        if upper.contains("AUTO_INCREMENT") {
            self.auto_increment = true;
        }
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    pub fn attr_string(&self) -> &str {
        &self.attributes
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn get_default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn has_default_value(&self) -> bool {
        self.default_value.is_some()
    }

    pub fn extra(&self) -> Option<&str> {
        self.extra.as_deref()
    }

    /// `DEFAULT <value>` or an empty string
    pub fn default_definition(&self) -> String {
        self.default_value
            .as_ref()
            .map(|value| format!("DEFAULT {}", value))
            .unwrap_or_default()
    }
}

impl SchemaElement for Field {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_statement(&self) -> &str {
        &self.raw
    }

    fn definition_string(&self) -> String {
        let mut parts = vec![quote_identifier(&self.name), self.field_type.clone()];
        if !self.attributes.is_empty() {
            parts.push(self.attributes.clone());
        }
        if self.default_value.is_some() {
            parts.push(self.default_definition());
        }
        if let Some(extra) = &self.extra {
            if !self.attributes.to_uppercase().contains(&extra.to_uppercase()) {
                parts.push(extra.clone());
            }
        }
        parts.join(" ")
    }
}

/// Split the leading type token (`decimal(10,2)`, `enum('a b','c')`) from the rest
fn split_type(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut in_quote = false;
    for (pos, ch) in text.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth = depth.checked_sub(1)?,
            c if c.is_whitespace() && depth == 0 && !in_quote => {
                return (pos > 0).then(|| (&text[..pos], &text[pos..]));
            }
            _ => {}
        }
    }
    (depth == 0 && !in_quote && !text.is_empty()).then_some((text, ""))
}

/// Byte offset of a whole-word keyword outside of quotes
fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let upper = text.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let mut in_quote = false;
    for (pos, ch) in upper.char_indices() {
        if ch == '\'' {
            in_quote = !in_quote;
            continue;
        }
        if in_quote || !upper[pos..].starts_with(keyword) {
            continue;
        }
        let before_ok = pos == 0 || bytes[pos - 1].is_ascii_whitespace();
        let after = pos + keyword.len();
        let after_ok = after == bytes.len() || bytes[after].is_ascii_whitespace();
        if before_ok && after_ok {
            return Some(pos);
        }
    }
    None
}

/// Strip a trailing whole-word keyword, returning what precedes it
fn strip_trailing_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(keyword.len())?;
    if !text.is_char_boundary(split) || !text[split..].eq_ignore_ascii_case(keyword) {
        return None;
    }
    let head = &text[..split];
    if head.is_empty() || head.ends_with(char::is_whitespace) {
        Some(head.trim_end())
    } else {
        None
    }
}

/// Quote an introspected default value unless it is a keyword expression
fn render_default(value: &str) -> String {
    let upper = value.to_uppercase();
    if upper == "NULL" || upper.starts_with("CURRENT_TIMESTAMP") || value.starts_with("b'") {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}
