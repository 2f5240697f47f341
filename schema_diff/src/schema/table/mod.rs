//! Table definitions
//!
//! A [`Table`] is built either by parsing `SHOW CREATE TABLE` output or as a
//! shell populated column by column. The alter algorithm lives in [`alter`],
//! the rename heuristic in [`similarity`].

pub mod alter;
pub mod similarity;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::element::{LineKind, SchemaElement};
use crate::schema::field::{ColumnInfo, Field};
use crate::schema::foreign_key::ForeignKey;
use crate::schema::index::Index;
use crate::schema::primary_key::PrimaryKey;
use crate::utils::naming::{first_backticked, quote_identifier, strip_auto_increment};

pub use alter::{diff_tables, AlterOptions, AlterPlan, TableDiff};

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    raw: String,
    /// Normalized source statement; cleared once the model is changed
    statement: Option<String>,
    fields: IndexMap<String, Field>,
    primary_key: Option<PrimaryKey>,
    indexes: IndexMap<String, Index>,
    foreign_keys: IndexMap<String, ForeignKey>,
    options: String,
    pending_rename_from: Option<String>,
}

impl Table {
    /// Create an empty table shell
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            raw: String::new(),
            statement: None,
            fields: IndexMap::new(),
            primary_key: None,
            indexes: IndexMap::new(),
            foreign_keys: IndexMap::new(),
            options: String::new(),
            pending_rename_from: None,
        }
    }

    /// Parse a full `SHOW CREATE TABLE` statement
    pub fn parse(stmt: &str) -> Result<Self> {
        let stmt = stmt.trim().trim_end_matches(';').trim_end();
        let lines: Vec<&str> = stmt.lines().map(str::trim).collect();
        if lines.len() < 2 {
            return Err(Error::parse(stmt, stmt));
        }

        let first = lines[0];
        let last = lines[lines.len() - 1];
        let name = first_backticked(first).ok_or_else(|| Error::parse(first, stmt))?;
        if !last.starts_with(')') {
            return Err(Error::parse(last, stmt));
        }

        let stripped_last = strip_auto_increment(last);
        let mut table = Table::new(&name);
        table.raw = stmt.to_string();
        table.options = stripped_last.trim_start_matches(')').trim().to_string();

        for line in &lines[1..lines.len() - 1] {
            if line.is_empty() {
                continue;
            }
            table.parse_body_line(line).map_err(|e| e.in_statement(stmt))?;
        }

        table.statement = Some(stmt.replace(last, &stripped_last));
        Ok(table)
    }

    fn parse_body_line(&mut self, line: &str) -> Result<()> {
        match LineKind::classify(line) {
            Some(LineKind::Column) => self.add_field(Field::parse(line)?),
            Some(LineKind::PrimaryKey) => {
                self.primary_key = Some(PrimaryKey::parse(line)?);
                Ok(())
            }
            Some(LineKind::Index(_)) => self.add_index(Index::parse(line)?),
            Some(LineKind::ForeignKey) => self.add_foreign_key(ForeignKey::parse(line)?),
            None => Err(Error::parse(line, line)),
        }
    }

    /// Build a table shell from `SHOW COLUMNS` rows
    ///
    /// Only fields and the primary key are known on this path.
    pub fn from_columns(name: &str, columns: &[ColumnInfo]) -> Result<Self> {
        let mut table = Table::new(name);
        for column in columns {
            table.add_field(Field::from_column(column))?;
        }
        let primary: Vec<&str> = columns
            .iter()
            .filter(|c| c.primary)
            .map(|c| c.name.as_str())
            .collect();
        if !primary.is_empty() {
            table.set_primary_key(Some(PrimaryKey::new(&primary)?));
        }
        Ok(table)
    }

    /// Set trailing table options (`ENGINE=InnoDB DEFAULT CHARSET=utf8`)
    pub fn set_options(&mut self, options: &str) {
        self.options = strip_auto_increment(options).trim().to_string();
        self.touch();
    }

    pub fn options(&self) -> &str {
        &self.options
    }

    /// Mark the model as diverged from its source statement
    fn touch(&mut self) {
        self.statement = None;
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Like [`Table::field`], failing with `NotFound`
    pub fn get_field(&self, name: &str) -> Result<&Field> {
        self.fields.get(name).ok_or_else(|| {
            Error::NotFound(format!("table {} has no field called {}", self.name, name))
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Add a field, failing when the name is taken
    pub fn add_field(&mut self, field: Field) -> Result<()> {
        if self.fields.contains_key(field.name()) {
            return Err(Error::duplicate("field", field.name(), &self.name));
        }
        self.fields.insert(field.name().to_string(), field);
        self.touch();
        Ok(())
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Field> {
        let removed = self.fields.shift_remove(name);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn has_primary(&self) -> bool {
        self.primary_key.is_some()
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    pub fn set_primary_key(&mut self, primary_key: Option<PrimaryKey>) {
        self.primary_key = primary_key;
        self.touch();
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values()
    }

    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    /// Add an index, failing when the name is taken
    pub fn add_index(&mut self, index: Index) -> Result<()> {
        if self.indexes.contains_key(index.name()) {
            return Err(Error::duplicate("index", index.name(), &self.name));
        }
        self.indexes.insert(index.name().to_string(), index);
        self.touch();
        Ok(())
    }

    /// Names of the indexes covering a column
    pub fn indexes_with_field(&self, field: &str) -> Vec<String> {
        self.indexes
            .values()
            .filter(|idx| idx.contains_field(field))
            .map(|idx| idx.name().to_string())
            .collect()
    }

    pub fn has_constraint(&self, name: &str) -> bool {
        self.foreign_keys.contains_key(name)
    }

    pub fn constraint(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.get(name)
    }

    pub fn constraints(&self) -> impl Iterator<Item = &ForeignKey> {
        self.foreign_keys.values()
    }

    /// Add a foreign key, failing when the name is taken
    pub fn add_foreign_key(&mut self, fk: ForeignKey) -> Result<()> {
        if self.foreign_keys.contains_key(fk.name()) {
            return Err(Error::duplicate("constraint", fk.name(), &self.name));
        }
        self.foreign_keys.insert(fk.name().to_string(), fk);
        self.touch();
        Ok(())
    }

    pub fn remove_foreign_key(&mut self, name: &str) -> Option<ForeignKey> {
        let removed = self.foreign_keys.shift_remove(name);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Constraints of this table that point at `table`
    pub fn constraints_referencing(&self, table: &str) -> Vec<&ForeignKey> {
        self.foreign_keys
            .values()
            .filter(|fk| fk.references_table(table))
            .collect()
    }

    /// Names of the tables this one references, self-references excluded
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for fk in self.foreign_keys.values() {
            let table = fk.referenced_table();
            if table != self.name && !deps.iter().any(|d| d == table) {
                deps.push(table.to_string());
            }
        }
        deps
    }

    pub fn has_dependencies(&self) -> bool {
        self.foreign_keys
            .values()
            .any(|fk| fk.referenced_table() != self.name)
    }

    /// Sorted, comma separated dependency list used to match rename candidates
    pub fn sorted_dependency_string(&self) -> String {
        let mut deps = self.dependencies();
        deps.sort();
        deps.join(",")
    }

    /// Point constraints at a renamed guardian table
    pub(crate) fn retarget_constraints(&mut self, old: &str, new: &str) {
        let mut changed = false;
        for fk in self.foreign_keys.values_mut() {
            if fk.references_table(old) {
                fk.set_referenced_table(new);
                changed = true;
            }
        }
        if changed {
            self.touch();
        }
    }

    /// Rename the table; the first rename remembers the original name
    pub fn rename(&mut self, new_name: &str) {
        if new_name == self.name {
            return;
        }
        let old = std::mem::replace(&mut self.name, new_name.to_string());
        if self.pending_rename_from.is_none() {
            self.pending_rename_from = Some(old);
        } else if self.pending_rename_from.as_deref() == Some(new_name) {
            self.pending_rename_from = None;
        }
        self.touch();
    }

    pub fn pending_rename_from(&self) -> Option<&str> {
        self.pending_rename_from.as_deref()
    }

    /// `RENAME TABLE` statement for a pending rename
    pub fn rename_query(&self) -> Option<String> {
        self.pending_rename_from.as_ref().map(|old| {
            format!(
                "RENAME TABLE {} TO {};",
                quote_identifier(old),
                quote_identifier(&self.name)
            )
        })
    }

    /// Take the `RENAME TABLE` statement, clearing the pending rename
    pub fn take_rename_query(&mut self) -> Option<String> {
        let query = self.rename_query();
        self.pending_rename_from = None;
        query
    }

    pub fn drop_query(&self) -> String {
        format!("DROP TABLE {};", quote_identifier(&self.name))
    }

    /// Full `CREATE TABLE` statement terminated with a semicolon
    pub fn create_query(&self) -> String {
        format!("{};", self.definition_string())
    }

    /// Body lines rendered from the model, in `SHOW CREATE TABLE` order
    fn body_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.fields.values().map(|f| f.definition_string()).collect();
        if let Some(pk) = &self.primary_key {
            lines.push(pk.definition_string());
        }
        lines.extend(self.indexes.values().map(|idx| idx.definition_string()));
        lines.extend(self.foreign_keys.values().map(|fk| fk.definition_string()));
        lines
    }

    /// Rendering of everything but the table name
    pub fn body_signature(&self) -> String {
        format!("{}\n{}", self.body_lines().join(",\n"), self.options)
    }

    /// `CREATE TABLE` rendered from the current model
    pub fn render_create(&self) -> String {
        let body = self
            .body_lines()
            .iter()
            .map(|line| format!("  {}", line))
            .collect::<Vec<_>>()
            .join(",\n");
        let tail = if self.options.is_empty() {
            ")".to_string()
        } else {
            format!(") {}", self.options)
        };
        format!(
            "CREATE TABLE {} (\n{}\n{}",
            quote_identifier(&self.name),
            body,
            tail
        )
    }
}

impl SchemaElement for Table {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_statement(&self) -> &str {
        &self.raw
    }

    /// The normalized source statement while untouched, the model rendering after
    fn definition_string(&self) -> String {
        self.statement
            .clone()
            .unwrap_or_else(|| self.render_create())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FOOBAR: &str = "CREATE TABLE `foobar` (
  `foobar_id` int(11) NOT NULL AUTO_INCREMENT,
  `owner_id` int(11) NOT NULL,
  `parent_id` int(11) DEFAULT NULL,
  `label` varchar(255) NOT NULL DEFAULT '',
  `notes` text,
  PRIMARY KEY (`foobar_id`),
  UNIQUE KEY `uniq_label` (`label`),
  KEY `idx_owner` (`owner_id`),
  CONSTRAINT `fk_foobar_owner` FOREIGN KEY (`owner_id`) REFERENCES `owners` (`id`),
  CONSTRAINT `fk_foobar_parent` FOREIGN KEY (`parent_id`) REFERENCES `foobar` (`foobar_id`)
) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8";

    #[test]
    fn test_table_parse() {
        let table = Table::parse(FOOBAR).unwrap();
        assert_eq!(table.name(), "foobar");
        assert!(table.has_field("foobar_id"));
        assert_eq!(table.field_count(), 5);
        assert!(table.has_primary());
        assert!(table.index("uniq_label").unwrap().is_unique());
        assert_eq!(table.indexes_with_field("owner_id"), vec!["idx_owner"]);
        assert_eq!(table.options(), "ENGINE=InnoDB DEFAULT CHARSET=utf8");
        assert!(!table.definition_string().contains("AUTO_INCREMENT=42"));
        assert_eq!(table.raw_statement(), FOOBAR);
    }

    #[test]
    fn test_add_existing_field_fails() {
        let mut table = Table::parse(FOOBAR).unwrap();
        let err = table.add_field(Field::new("foobar_id", "int(11)")).unwrap_err();
        assert!(matches!(err, Error::DuplicateName { kind: "field", .. }));
    }

    #[test]
    fn test_dependencies_skip_self_reference() {
        let table = Table::parse(FOOBAR).unwrap();
        assert_eq!(table.dependencies(), vec!["owners"]);
        assert!(table.has_dependencies());
        assert_eq!(table.sorted_dependency_string(), "owners");
    }

    #[test]
    fn test_broken_table() {
        let stmt = "CREATE TABLE `broken` (
  `id` int(11) NOT NULL,
  /*!50100 PARTITION BY HASH (id) */
) ENGINE=InnoDB";
        match Table::parse(stmt) {
            Err(Error::ParseError { line, statement }) => {
                assert_eq!(line, "/*!50100 PARTITION BY HASH (id) */");
                assert_eq!(statement, stmt);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_broken_field_reports_full_statement() {
        let stmt = "CREATE TABLE `broken` (\n  `id` decimal(10,2 NOT NULL\n) ENGINE=InnoDB";
        let err = Table::parse(stmt).unwrap_err();
        assert!(matches!(err, Error::ParseError { ref statement, .. } if statement == stmt));
    }

    #[test]
    fn test_truncated_statement() {
        assert!(Table::parse("CREATE TABLE `t` (").is_err());
        assert!(Table::parse("CREATE TABLE `t` (\n  `id` int(11)").is_err());
    }

    #[test]
    fn test_render_matches_source() {
        let table = Table::parse(FOOBAR).unwrap();
        let mut copy = table.clone();
        copy.touch();
        assert_eq!(copy.definition_string(), table.definition_string());
    }

    #[test]
    fn test_rename_queries() {
        let mut table = Table::parse(FOOBAR).unwrap();
        assert_eq!(table.rename_query(), None);
        table.rename("foobars");
        assert_eq!(table.pending_rename_from(), Some("foobar"));
        assert_eq!(
            table.take_rename_query().as_deref(),
            Some("RENAME TABLE `foobar` TO `foobars`;")
        );
        assert_eq!(table.rename_query(), None);
        assert_eq!(table.drop_query(), "DROP TABLE `foobars`;");
        assert!(table.create_query().starts_with("CREATE TABLE `foobars` ("));
    }

    #[test]
    fn test_from_columns() {
        let columns = vec![
            ColumnInfo {
                name: "id".to_string(),
                column_type: "int(11)".to_string(),
                nullable: false,
                default: None,
                extra: Some("auto_increment".to_string()),
                primary: true,
            },
            ColumnInfo {
                name: "email".to_string(),
                column_type: "varchar(255)".to_string(),
                nullable: false,
                default: None,
                extra: None,
                primary: false,
            },
        ];
        let table = Table::from_columns("users", &columns).unwrap();
        assert_eq!(table.field_names().collect::<Vec<_>>(), vec!["id", "email"]);
        assert_eq!(
            table.primary_key().unwrap().definition_string(),
            "PRIMARY KEY (`id`)"
        );
    }
}
