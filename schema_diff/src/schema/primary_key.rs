//! Primary key definitions

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::element::SchemaElement;
use crate::utils::naming::{backticked_names, join_identifiers};

/// Represents a primary key constraint
///
/// `field_names` keeps the declared column order, which matters for rendering.
/// Order-independent checks go through [`PrimaryKey::sorted_fields`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKey {
    field_names: Vec<String>,
    raw: String,
}

impl PrimaryKey {
    /// Build a primary key over the given columns
    pub fn new<S: AsRef<str>>(field_names: &[S]) -> Result<Self> {
        if field_names.is_empty() {
            return Err(Error::parse("PRIMARY KEY ()", "primary key without columns"));
        }
        Ok(Self {
            field_names: field_names.iter().map(|f| f.as_ref().to_string()).collect(),
            raw: String::new(),
        })
    }

    /// Parse a `PRIMARY KEY (...)` line
    pub fn parse(stmt: &str) -> Result<Self> {
        let raw = stmt.trim();
        let field_names = backticked_names(raw);
        if field_names.is_empty() {
            return Err(Error::parse(raw, raw));
        }
        Ok(Self {
            field_names,
            raw: raw.to_string(),
        })
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn len(&self) -> usize {
        self.field_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_names.is_empty()
    }

    /// Column names in sorted order
    pub fn sorted_fields(&self) -> Vec<&str> {
        let mut sorted: Vec<&str> = self.field_names.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted
    }

    /// Order-independent signature of the key columns
    pub fn field_signature(&self) -> String {
        self.sorted_fields().join(",")
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.field_names.iter().any(|f| f == name)
    }
}

impl SchemaElement for PrimaryKey {
    fn name(&self) -> &str {
        "PRIMARY"
    }

    fn raw_statement(&self) -> &str {
        &self.raw
    }

    fn definition_string(&self) -> String {
        format!("PRIMARY KEY ({})", join_identifiers(&self.field_names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_keeps_declared_order() {
        let pk = PrimaryKey::parse("PRIMARY KEY (`order_id`,`line_no`),").unwrap();
        assert_eq!(pk.field_names(), ["order_id", "line_no"]);
        assert_eq!(pk.definition_string(), "PRIMARY KEY (`order_id`, `line_no`)");
        assert_eq!(pk.sorted_fields(), vec!["line_no", "order_id"]);
        assert!(pk.contains_field("line_no"));
    }

    #[test]
    fn test_signature_ignores_order() {
        let a = PrimaryKey::parse("PRIMARY KEY (`a`,`b`)").unwrap();
        let b = PrimaryKey::parse("PRIMARY KEY (`b`,`a`)").unwrap();
        assert_eq!(a.field_signature(), b.field_signature());
        assert!(!a.same_definition(&b));
    }

    #[test]
    fn test_parse_without_columns_fails() {
        assert!(matches!(
            PrimaryKey::parse("PRIMARY KEY ()"),
            Err(Error::ParseError { .. })
        ));
        assert!(PrimaryKey::new::<&str>(&[]).is_err());
    }
}
