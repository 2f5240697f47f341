//! Table-to-table alter algorithm

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Table;
use crate::error::Result;
use crate::schema::element::SchemaElement;
use crate::schema::foreign_key::ForeignKey;
use crate::utils::naming::quote_identifier;

/// Switches for a single table comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterOptions {
    /// Drop columns that only exist in the base table
    pub purge: bool,
    /// Diff foreign key constraints
    pub foreign_keys: bool,
}

/// Ordered DDL turning one table into another
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlterPlan {
    table: String,
    foreign_key_statements: Vec<String>,
    clauses: Vec<String>,
}

impl AlterPlan {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_empty(&self) -> bool {
        self.foreign_key_statements.is_empty() && self.clauses.is_empty()
    }

    /// Self-contained constraint statements, each a full `ALTER TABLE`
    pub fn foreign_key_statements(&self) -> &[String] {
        &self.foreign_key_statements
    }

    /// Column, key and index clauses of the main `ALTER TABLE`
    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    /// Constraint statements first, then the main statement
    pub fn statements(&self) -> Vec<String> {
        let mut statements = self.foreign_key_statements.clone();
        if !self.clauses.is_empty() {
            statements.push(wrap_clauses(&self.table, &self.clauses));
        }
        statements
    }

    pub fn to_sql(&self) -> String {
        self.statements().join("\n")
    }
}

/// Result of the non-mutating comparison
#[derive(Debug, Clone, PartialEq)]
pub struct TableDiff {
    pub plan: AlterPlan,
    /// The base table after applying the plan
    pub result: Table,
}

/// Compare `base` against `target` without touching either
pub fn diff_tables(base: &Table, target: &Table, options: AlterOptions) -> Result<TableDiff> {
    let mut result = base.clone();
    let plan = result.compare_to(target, options)?;
    Ok(TableDiff { plan, result })
}

fn wrap_clauses(table: &str, clauses: &[String]) -> String {
    match clauses {
        [single] => format!("ALTER TABLE {} {};", quote_identifier(table), single),
        _ => format!(
            "ALTER TABLE {}\n  {};",
            quote_identifier(table),
            clauses.join(",\n  ")
        ),
    }
}

impl Table {
    /// Compute the DDL turning `self` into `target`, applying it to `self`
    pub fn compare_to(&mut self, target: &Table, options: AlterOptions) -> Result<AlterPlan> {
        let mut plan = AlterPlan::new(&self.name);
        if self.definition_string() == target.definition_string() {
            return Ok(plan);
        }

        if options.foreign_keys {
            plan.foreign_key_statements = self.compare_constraints(target)?;
        }
        self.compare_fields(target, &mut plan.clauses);
        if options.purge {
            self.purge_fields(target, &mut plan.clauses);
        }
        self.compare_primary(target, &mut plan.clauses);
        self.compare_indexes(target, &mut plan.clauses);

        if !plan.is_empty() {
            self.touch();
        }
        debug!(
            table = %self.name,
            constraint_statements = plan.foreign_key_statements.len(),
            clauses = plan.clauses.len(),
            "compared table"
        );
        Ok(plan)
    }

    fn compare_constraints(&mut self, target: &Table) -> Result<Vec<String>> {
        let mut statements = Vec::new();

        for fk in target.foreign_keys.values() {
            let mut clauses = match self.foreign_keys.get(fk.name()).cloned() {
                None => self.ensure_local_column(target, fk)?,
                Some(current) if !current.same_definition(fk) => {
                    let renamed = current.references_table(fk.referenced_table())
                        && current.local_column() != fk.local_column()
                        && self.has_field(current.local_column())
                        && !self.has_field(fk.local_column());
                    let mut clauses = if renamed {
                        self.rename_column(current.local_column(), fk.local_column(), target)?
                    } else {
                        self.ensure_local_column(target, fk)?
                    };
                    clauses.push(current.drop_clause());
                    clauses
                }
                Some(_) => continue,
            };
            clauses.push(format!("ADD {}", fk.definition_string()));
            self.foreign_keys.insert(fk.name().to_string(), fk.clone());
            statements.push(wrap_clauses(&self.name, &clauses));
        }

        let stale: Vec<String> = self
            .foreign_keys
            .keys()
            .filter(|name| !target.has_constraint(name))
            .cloned()
            .collect();
        for name in stale {
            if let Some(fk) = self.foreign_keys.shift_remove(&name) {
                statements.push(wrap_clauses(&self.name, &[fk.drop_clause()]));
            }
        }

        Ok(statements)
    }

    /// Add the constraint's local column (and target indexes on it) when missing
    fn ensure_local_column(&mut self, target: &Table, fk: &ForeignKey) -> Result<Vec<String>> {
        let column = fk.local_column();
        if self.has_field(column) {
            return Ok(Vec::new());
        }

        let field = target.get_field(column)?.clone();
        let mut clauses = vec![format!("ADD COLUMN {}", field.definition_string())];
        self.fields.insert(column.to_string(), field);

        for idx in target.indexes().filter(|idx| idx.contains_field(column)) {
            if !self.has_index(idx.name()) {
                clauses.push(format!("ADD {}", idx.definition_string()));
                self.indexes.insert(idx.name().to_string(), idx.clone());
            }
        }
        Ok(clauses)
    }

    /// Rename a column, dropping the indexes and primary key that cover it
    fn rename_column(&mut self, old: &str, new: &str, target: &Table) -> Result<Vec<String>> {
        let mut field = self.get_field(old)?.clone();
        self.fields.shift_remove(old);
        match target.field(new) {
            Some(definition) => field = definition.clone(),
            None => field.set_name(new),
        }

        let mut clauses = Vec::new();
        for name in self.indexes_with_field(old) {
            clauses.push(format!("DROP INDEX {}", quote_identifier(&name)));
            self.indexes.shift_remove(&name);
        }
        if self.primary_key.as_ref().is_some_and(|pk| pk.contains_field(old)) {
            clauses.push("DROP PRIMARY KEY".to_string());
            self.primary_key = None;
        }
        clauses.push(format!(
            "CHANGE COLUMN {} {}",
            quote_identifier(old),
            field.definition_string()
        ));
        self.fields.insert(new.to_string(), field);
        Ok(clauses)
    }

    fn compare_fields(&mut self, target: &Table, clauses: &mut Vec<String>) {
        for def in target.fields.values() {
            match self.fields.get(def.name()) {
                None => clauses.push(format!("ADD COLUMN {}", def.definition_string())),
                Some(current) if !current.same_definition(def) => clauses.push(format!(
                    "CHANGE COLUMN {} {}",
                    quote_identifier(def.name()),
                    def.definition_string()
                )),
                Some(_) => continue,
            }
            self.fields.insert(def.name().to_string(), def.clone());
        }
    }

    fn purge_fields(&mut self, target: &Table, clauses: &mut Vec<String>) {
        let obsolete: Vec<String> = self
            .fields
            .keys()
            .filter(|name| !target.has_field(name))
            .cloned()
            .collect();

        for name in obsolete {
            for idx in self.indexes_with_field(&name) {
                clauses.push(format!("DROP INDEX {}", quote_identifier(&idx)));
                self.indexes.shift_remove(&idx);
            }
            clauses.push(format!("DROP COLUMN {}", quote_identifier(&name)));
            self.fields.shift_remove(&name);
        }
    }

    fn compare_primary(&mut self, target: &Table, clauses: &mut Vec<String>) {
        let wanted = target.primary_key.as_ref();
        let changed = match (&self.primary_key, wanted) {
            (Some(current), Some(pk)) => !current.same_definition(pk),
            (None, None) => false,
            _ => true,
        };
        if !changed {
            return;
        }

        if self.primary_key.is_some() {
            clauses.push("DROP PRIMARY KEY".to_string());
        }
        if let Some(pk) = wanted {
            clauses.push(format!("ADD {}", pk.definition_string()));
        }
        self.primary_key = wanted.cloned();
    }

    fn compare_indexes(&mut self, target: &Table, clauses: &mut Vec<String>) {
        for idx in target.indexes.values() {
            match self.indexes.get(idx.name()) {
                None => {}
                Some(current) if !current.same_definition(idx) => {
                    clauses.push(format!("DROP INDEX {}", quote_identifier(idx.name())));
                }
                Some(_) => continue,
            }
            clauses.push(format!("ADD {}", idx.definition_string()));
            self.indexes.insert(idx.name().to_string(), idx.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const ORDERS: &str = "CREATE TABLE `orders` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `user_id` int(11) NOT NULL,
  PRIMARY KEY (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8";

    const ORDERS_WITH_TOTAL: &str = "CREATE TABLE `orders` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `user_id` int(11) NOT NULL,
  `total` decimal(10,2) NOT NULL DEFAULT 0,
  PRIMARY KEY (`id`)
) ENGINE=InnoDB AUTO_INCREMENT=1200 DEFAULT CHARSET=utf8";

    const POSTS: &str = "CREATE TABLE `posts` (
  `id` int(11) NOT NULL,
  `owner_id` int(11) NOT NULL,
  `legacy` varchar(20) DEFAULT NULL,
  PRIMARY KEY (`id`),
  KEY `fk_user` (`owner_id`),
  KEY `idx_legacy` (`legacy`),
  CONSTRAINT `fk_user` FOREIGN KEY (`owner_id`) REFERENCES `users` (`id`),
  CONSTRAINT `fk_legacy` FOREIGN KEY (`legacy`) REFERENCES `archive` (`code`)
) ENGINE=InnoDB";

    const POSTS_TARGET: &str = "CREATE TABLE `posts` (
  `id` int(11) NOT NULL,
  `author_id` int(11) NOT NULL,
  `topic_id` int(11) DEFAULT NULL,
  PRIMARY KEY (`id`),
  KEY `fk_user` (`author_id`),
  KEY `fk_topic` (`topic_id`),
  CONSTRAINT `fk_user` FOREIGN KEY (`author_id`) REFERENCES `users` (`id`),
  CONSTRAINT `fk_topic` FOREIGN KEY (`topic_id`) REFERENCES `topics` (`id`)
) ENGINE=InnoDB";

    fn table(stmt: &str) -> Table {
        Table::parse(stmt).unwrap()
    }

    #[test]
    fn test_identical_tables() {
        let mut base = table(POSTS);
        let plan = base.compare_to(&table(POSTS), AlterOptions::default()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.to_sql(), "");
    }

    #[test]
    fn test_add_column() {
        let mut base = table(ORDERS);
        let plan = base
            .compare_to(&table(ORDERS_WITH_TOTAL), AlterOptions::default())
            .unwrap();
        assert_eq!(
            plan.to_sql(),
            "ALTER TABLE `orders` ADD COLUMN `total` decimal(10,2) NOT NULL DEFAULT 0;"
        );
        assert!(base.has_field("total"));
    }

    #[test]
    fn test_change_and_purge() {
        let target = table(
            "CREATE TABLE `orders` (
  `id` bigint(20) NOT NULL AUTO_INCREMENT,
  PRIMARY KEY (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8",
        );
        let mut base = table(
            "CREATE TABLE `orders` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `user_id` int(11) NOT NULL,
  PRIMARY KEY (`id`),
  KEY `idx_user` (`user_id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8",
        );
        let options = AlterOptions {
            purge: true,
            foreign_keys: false,
        };
        let plan = base.compare_to(&target, options).unwrap();
        assert_eq!(
            plan.to_sql(),
            "ALTER TABLE `orders`
  CHANGE COLUMN `id` `id` bigint(20) NOT NULL AUTO_INCREMENT,
  DROP INDEX `idx_user`,
  DROP COLUMN `user_id`;"
        );
    }

    #[test]
    fn test_without_purge_keeps_columns() {
        let mut base = table(ORDERS_WITH_TOTAL);
        let plan = base.compare_to(&table(ORDERS), AlterOptions::default()).unwrap();
        assert!(plan.is_empty());
        assert!(base.has_field("total"));
    }

    #[test]
    fn test_primary_key_change() {
        let mut base = table(ORDERS);
        let target = table(
            "CREATE TABLE `orders` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `user_id` int(11) NOT NULL,
  PRIMARY KEY (`id`,`user_id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8",
        );
        let plan = base.compare_to(&target, AlterOptions::default()).unwrap();
        assert_eq!(
            plan.clauses(),
            ["DROP PRIMARY KEY", "ADD PRIMARY KEY (`id`, `user_id`)"]
        );
    }

    #[test]
    fn test_changed_index_is_recreated() {
        let mut base = table(
            "CREATE TABLE `t` (\n  `a` int(11),\n  `b` int(11),\n  KEY `idx` (`a`)\n) ENGINE=InnoDB",
        );
        let target = table(
            "CREATE TABLE `t` (\n  `a` int(11),\n  `b` int(11),\n  UNIQUE KEY `idx` (`a`,`b`)\n) ENGINE=InnoDB",
        );
        let plan = base.compare_to(&target, AlterOptions::default()).unwrap();
        assert_eq!(plan.clauses(), ["DROP INDEX `idx`", "ADD UNIQUE KEY `idx` (`a`,`b`)"]);
    }

    #[test]
    fn test_constraints_ignored_unless_enabled() {
        let mut base = table(POSTS);
        let plan = base
            .compare_to(&table(POSTS_TARGET), AlterOptions::default())
            .unwrap();
        assert!(plan.foreign_key_statements().is_empty());
        assert!(base.has_constraint("fk_legacy"));
    }

    #[test]
    fn test_constraint_statements() {
        let mut base = table(POSTS);
        let options = AlterOptions {
            purge: false,
            foreign_keys: true,
        };
        let plan = base.compare_to(&table(POSTS_TARGET), options).unwrap();
        assert_eq!(
            plan.foreign_key_statements(),
            [
                "ALTER TABLE `posts`
  DROP INDEX `fk_user`,
  CHANGE COLUMN `owner_id` `author_id` int(11) NOT NULL,
  DROP FOREIGN KEY `fk_user`,
  ADD CONSTRAINT `fk_user` FOREIGN KEY (`author_id`) REFERENCES `users` (`id`);",
                "ALTER TABLE `posts`
  ADD COLUMN `topic_id` int(11) DEFAULT NULL,
  ADD KEY `fk_topic` (`topic_id`),
  ADD CONSTRAINT `fk_topic` FOREIGN KEY (`topic_id`) REFERENCES `topics` (`id`);",
                "ALTER TABLE `posts` DROP FOREIGN KEY `fk_legacy`;",
            ]
        );
        assert_eq!(plan.clauses(), ["ADD KEY `fk_user` (`author_id`)"]);
        assert!(!base.has_field("owner_id"));
        assert!(base.has_field("legacy"));
    }

    #[rstest]
    #[case(ORDERS, ORDERS_WITH_TOTAL, false)]
    #[case(ORDERS_WITH_TOTAL, ORDERS, true)]
    #[case(POSTS, POSTS_TARGET, true)]
    #[case(POSTS_TARGET, POSTS, true)]
    fn test_second_pass_is_empty(#[case] base: &str, #[case] target: &str, #[case] purge: bool) {
        let options = AlterOptions {
            purge,
            foreign_keys: true,
        };
        let target = table(target);
        let mut base = table(base);
        assert!(!base.compare_to(&target, options).unwrap().is_empty());
        assert!(base.compare_to(&target, options).unwrap().is_empty());
    }

    #[test]
    fn test_diff_tables_leaves_inputs_untouched() {
        let base = table(ORDERS);
        let target = table(ORDERS_WITH_TOTAL);
        let diff = diff_tables(&base, &target, AlterOptions::default()).unwrap();
        assert!(!base.has_field("total"));
        assert!(diff.result.has_field("total"));
        assert_eq!(diff.plan.statements().len(), 1);
        assert_eq!(diff.plan.table(), "orders");
    }
}
