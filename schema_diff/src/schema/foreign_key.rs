//! Foreign key constraints

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::element::SchemaElement;
use crate::utils::naming::{backticked_names, quote_identifier};

static ON_DELETE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)ON DELETE (RESTRICT|CASCADE|SET NULL|SET DEFAULT|NO ACTION)").expect("valid regex")
});

static ON_UPDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)ON UPDATE (RESTRICT|CASCADE|SET NULL|SET DEFAULT|NO ACTION)").expect("valid regex")
});

/// A single-column foreign key constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    name: String,
    local_column: String,
    referenced_table: String,
    referenced_column: String,
    on_delete: Option<String>,
    on_update: Option<String>,
    raw: String,
}

impl ForeignKey {
    /// Build a constraint without referential actions
    pub fn new(name: &str, local_column: &str, referenced_table: &str, referenced_column: &str) -> Self {
        Self {
            name: name.to_string(),
            local_column: local_column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
            on_delete: None,
            on_update: None,
            raw: String::new(),
        }
    }

    /// Set the `ON DELETE` action
    pub fn on_delete(mut self, action: &str) -> Self {
        self.on_delete = Some(action.to_uppercase());
        self
    }

    /// Set the `ON UPDATE` action
    pub fn on_update(mut self, action: &str) -> Self {
        self.on_update = Some(action.to_uppercase());
        self
    }

    /// Parse a `CONSTRAINT ... FOREIGN KEY ... REFERENCES ...` line
    ///
    /// Only single-column keys referencing a table of the same schema are supported.
    pub fn parse(stmt: &str) -> Result<Self> {
        let raw = stmt.trim();
        let upper = raw.to_uppercase();
        if !upper.contains("FOREIGN KEY") || !upper.contains("REFERENCES") {
            return Err(Error::parse(raw, raw));
        }

        let names = backticked_names(raw);
        let [name, local, table, remote] = names.as_slice() else {
            return Err(Error::parse(raw, raw));
        };

        let mut fk = ForeignKey::new(name, local, table, remote);
        if let Some(caps) = ON_DELETE.captures(raw) {
            fk = fk.on_delete(&caps[1]);
        }
        if let Some(caps) = ON_UPDATE.captures(raw) {
            fk = fk.on_update(&caps[1]);
        }
        fk.raw = raw.to_string();
        Ok(fk)
    }

    pub fn local_column(&self) -> &str {
        &self.local_column
    }

    pub fn referenced_table(&self) -> &str {
        &self.referenced_table
    }

    pub fn referenced_column(&self) -> &str {
        &self.referenced_column
    }

    pub fn references_table(&self, table: &str) -> bool {
        self.referenced_table == table
    }

    pub(crate) fn set_referenced_table(&mut self, table: &str) {
        self.referenced_table = table.to_string();
    }

    /// `DROP FOREIGN KEY` clause for this constraint
    pub fn drop_clause(&self) -> String {
        format!("DROP FOREIGN KEY {}", quote_identifier(&self.name))
    }
}

impl SchemaElement for ForeignKey {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_statement(&self) -> &str {
        &self.raw
    }

    fn definition_string(&self) -> String {
        let mut def = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_identifier(&self.name),
            quote_identifier(&self.local_column),
            quote_identifier(&self.referenced_table),
            quote_identifier(&self.referenced_column)
        );
        if let Some(action) = &self.on_delete {
            def.push_str(" ON DELETE ");
            def.push_str(action);
        }
        if let Some(action) = &self.on_update {
            def.push_str(" ON UPDATE ");
            def.push_str(action);
        }
        def
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_with_actions() {
        let fk = ForeignKey::parse(
            "CONSTRAINT `fk_order_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE ON UPDATE NO ACTION,",
        )
        .unwrap();
        assert_eq!(fk.name(), "fk_order_user");
        assert_eq!(fk.local_column(), "user_id");
        assert_eq!(fk.referenced_table(), "users");
        assert_eq!(fk.referenced_column(), "id");
        assert_eq!(
            fk.definition_string(),
            "CONSTRAINT `fk_order_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE ON UPDATE NO ACTION"
        );
    }

    #[test]
    fn test_builder_matches_parsed() {
        let built = ForeignKey::new("fk_cat", "category_id", "categories", "id").on_delete("set null");
        let parsed = ForeignKey::parse(
            "CONSTRAINT `fk_cat` FOREIGN KEY (`category_id`) REFERENCES `categories` (`id`) ON DELETE SET NULL",
        )
        .unwrap();
        assert!(built.same_definition(&parsed));
        assert_eq!(built.drop_clause(), "DROP FOREIGN KEY `fk_cat`");
    }

    #[rstest]
    #[case("CONSTRAINT `chk_price` CHECK ((`price` > 0))")]
    #[case("CONSTRAINT `fk_pair` FOREIGN KEY (`a`, `b`) REFERENCES `t` (`x`, `y`)")]
    #[case("CONSTRAINT `fk_short` FOREIGN KEY (`a`) REFERENCES (`x`)")]
    fn test_unsupported_constraints(#[case] line: &str) {
        assert!(matches!(ForeignKey::parse(line), Err(Error::ParseError { .. })));
    }
}
