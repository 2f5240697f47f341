//! Database-to-database comparison
//!
//! The engine classifies tables, resolves renames, orders `CREATE` statements
//! and computes drops. It mutates the base database into the state the
//! generated SQL would produce.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::{CompareConfig, RenamePolicy};
use crate::error::Result;
use crate::schema::database::Database;
use crate::schema::diff::{ChangeSet, DatabaseDiff, RenameCandidate, ScoredTable, TableRename};
use crate::schema::element::SchemaElement;
use crate::schema::table::{AlterOptions, Table};
use crate::utils::naming::quote_identifier;

/// Compares a base schema against a target schema
#[derive(Debug, Clone, Default)]
pub struct CompareEngine {
    config: CompareConfig,
}

impl CompareEngine {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    pub fn alter_options(&self) -> AlterOptions {
        AlterOptions {
            purge: self.config.purge,
            foreign_keys: self.config.foreign_keys,
        }
    }

    /// Classify every table as added, rename candidate, existing or dropped
    pub fn diff_databases(&self, base: &Database, target: &Database) -> DatabaseDiff {
        let mut diff = DatabaseDiff {
            dropped: base
                .table_names()
                .filter(|name| !target.has_table(name))
                .map(str::to_string)
                .collect(),
            ..Default::default()
        };

        for table in target.tables() {
            let name = table.name();
            if base.has_table(name) {
                diff.existing.push(name.to_string());
                continue;
            }
            if self.config.detect_renames {
                let candidates = self.rename_candidates(base, &diff.dropped, table);
                if !candidates.is_empty() {
                    diff.renames.push(RenameCandidate {
                        table: name.to_string(),
                        candidates,
                    });
                    continue;
                }
            }
            diff.added.push(name.to_string());
        }

        debug!(
            added = diff.added.len(),
            renames = diff.renames.len(),
            existing = diff.existing.len(),
            dropped = diff.dropped.len(),
            "classified tables"
        );
        diff
    }

    fn rename_candidates(&self, base: &Database, pool: &[String], table: &Table) -> Vec<ScoredTable> {
        let signature = table.sorted_dependency_string();
        let mut candidates: Vec<ScoredTable> = pool
            .iter()
            .filter_map(|name| base.table(name))
            .filter(|old| {
                old.sorted_dependency_string() == signature
                    || old.constraints().any(|fk| {
                        table
                            .constraint(fk.name())
                            .is_some_and(|new_fk| new_fk.referenced_table() == fk.referenced_table())
                    })
            })
            .map(|old| ScoredTable {
                name: old.name().to_string(),
                score: old.similarity_score(table),
            })
            .filter(|candidate| candidate.score >= self.config.min_rename_similarity)
            .collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates
    }

    /// Decide pending renames; unresolved candidates become added tables
    ///
    /// Each base table backs at most one rename.
    pub fn resolve_renames(&self, diff: &mut DatabaseDiff) -> Vec<TableRename> {
        let mut claimed: HashSet<String> = HashSet::new();
        let mut renames = Vec::new();

        for pending in std::mem::take(&mut diff.renames) {
            let open: Vec<&ScoredTable> = pending
                .candidates
                .iter()
                .filter(|c| !claimed.contains(&c.name))
                .collect();

            match (self.config.rename_policy, open.as_slice()) {
                (RenamePolicy::Auto, [only]) => {
                    info!(from = %only.name, to = %pending.table, score = only.score, "detected table rename");
                    claimed.insert(only.name.clone());
                    renames.push(TableRename {
                        from: only.name.clone(),
                        to: pending.table.clone(),
                        score: only.score,
                    });
                }
                (_, []) => diff.added.push(pending.table),
                (_, candidates) => {
                    let listed = candidates
                        .iter()
                        .map(|c| format!("{} ({:.2})", c.name, c.score))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let message = format!(
                        "table {} may have been renamed from one of: {}; creating it as a new table",
                        pending.table, listed
                    );
                    warn!("{}", message);
                    diff.warnings.push(message);
                    diff.added.push(pending.table);
                }
            }
        }

        diff.dropped.retain(|name| !claimed.contains(name));
        renames
    }

    /// Order `CREATE TABLE` statements so referenced tables come first
    ///
    /// Statements whose dependencies cannot be met are appended last, each
    /// preceded by a comment naming what is missing.
    pub fn order_create_statements(statements: &[String]) -> Result<Vec<String>> {
        Ok(order_creates(statements)?.0)
    }

    /// Drop base tables dependants-first, dropping referencing constraints before each table
    pub fn drop_statements(&self, base: &mut Database, names: &[String]) -> Result<Vec<String>> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let order: Vec<String> = base
            .sorted_tables()
            .into_iter()
            .rev()
            .map(|t| t.name().to_string())
            .filter(|name| wanted.contains(name.as_str()))
            .collect();

        let mut statements = Vec::with_capacity(order.len());
        for name in order {
            let precursors: Vec<(String, String)> = base
                .foreign_keys_referencing(&name)
                .into_iter()
                .map(|(table, fk)| (table.to_string(), fk.name().to_string()))
                .collect();

            let mut parts = Vec::with_capacity(precursors.len() + 1);
            for (table, constraint) in precursors {
                if let Some(fk) = base
                    .table_mut(&table)
                    .and_then(|t| t.remove_foreign_key(&constraint))
                {
                    parts.push(format!(
                        "ALTER TABLE {} {};",
                        quote_identifier(&table),
                        fk.drop_clause()
                    ));
                }
                base.relink_table(&table)?;
            }

            let table = base.remove_table(&name)?;
            parts.push(table.drop_query());
            debug!(table = %name, constraints = parts.len() - 1, "dropping table");
            statements.push(parts.join("\n"));
        }
        Ok(statements)
    }

    /// Full run: renames and creates, alters, then drops
    pub fn compare(&self, base: &mut Database, target: &Database) -> Result<ChangeSet> {
        let mut diff = self.diff_databases(base, target);
        let mut changes = ChangeSet::default();

        if diff.same_tables() {
            debug!("base and target hold the same tables");
        } else if self.config.create {
            for rename in self.resolve_renames(&mut diff) {
                base.apply_rename(&rename.from, &rename.to)?;
                if let Some(query) = base
                    .table_mut(&rename.to)
                    .and_then(Table::take_rename_query)
                {
                    changes.rename_tables.push(query);
                }
                diff.existing.push(rename.to);
            }

            let missing = diff
                .added
                .iter()
                .map(|name| target.get_table(name).cloned())
                .collect::<Result<Vec<Table>>>()?;
            let statements: Vec<String> = missing.iter().map(Table::create_query).collect();
            let (ordered, warnings) = order_creates(&statements)?;
            changes.create_tables = ordered;
            changes.warnings.extend(warnings);
            base.add_missing_tables(missing)?;
        }
        changes.warnings.append(&mut diff.warnings);

        if self.config.alter {
            let options = self.alter_options();
            for name in &diff.existing {
                let wanted = target.get_table(name)?;
                let Some(current) = base.table_mut(name) else {
                    continue;
                };
                let plan = current.compare_to(wanted, options)?;
                if !plan.is_empty() {
                    changes.alter_tables.push(plan.to_sql());
                }
                if options.foreign_keys {
                    for unresolved in base.relink_table(name)? {
                        let message = format!(
                            "table {} references {}, which is not part of the schema",
                            name, unresolved
                        );
                        warn!("{}", message);
                        changes.warnings.push(message);
                    }
                }
            }
        }

        if self.config.drop {
            changes.drop_tables = self.drop_statements(base, &diff.dropped)?;
        }

        info!(
            renames = changes.rename_tables.len(),
            creates = changes.create_tables.len(),
            alters = changes.alter_tables.len(),
            drops = changes.drop_tables.len(),
            warnings = changes.warnings.len(),
            "comparison complete"
        );
        Ok(changes)
    }
}

/// Fixed-point ordering; returns the statements and one warning per unresolved table
fn order_creates(statements: &[String]) -> Result<(Vec<String>, Vec<String>)> {
    let parsed = statements
        .iter()
        .map(|stmt| Table::parse(stmt))
        .collect::<Result<Vec<Table>>>()?;
    let in_set: HashSet<&str> = parsed.iter().map(|t| t.name()).collect();
    let dependencies: Vec<Vec<String>> = parsed
        .iter()
        .map(|t| {
            t.dependencies()
                .into_iter()
                .filter(|dep| in_set.contains(dep.as_str()))
                .collect()
        })
        .collect();

    let mut resolved: HashSet<&str> = HashSet::new();
    let mut done = vec![false; statements.len()];
    let mut ordered = Vec::with_capacity(statements.len());
    loop {
        let mut progress = false;
        for (i, table) in parsed.iter().enumerate() {
            if done[i] || !dependencies[i].iter().all(|dep| resolved.contains(dep.as_str())) {
                continue;
            }
            resolved.insert(table.name());
            ordered.push(statements[i].clone());
            done[i] = true;
            progress = true;
        }
        if !progress {
            break;
        }
    }

    let mut warnings = Vec::new();
    for (i, table) in parsed.iter().enumerate().filter(|(i, _)| !done[*i]) {
        let unmet: Vec<&str> = dependencies[i]
            .iter()
            .map(String::as_str)
            .filter(|dep| !resolved.contains(dep))
            .collect();
        let unmet = unmet.join(", ");
        let message = format!("table {} might have unmet dependencies on: {}", table.name(), unmet);
        warn!("{}", message);
        warnings.push(message);
        ordered.push(format!(
            "-- Might have unmet dependencies on: {}\n{}",
            unmet, statements[i]
        ));
    }
    Ok((ordered, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create(name: &str, refs: &[&str]) -> String {
        let mut lines = vec!["  `id` int(11) NOT NULL".to_string()];
        for r in refs {
            lines.push(format!("  `{}_id` int(11) DEFAULT NULL", r));
        }
        for r in refs {
            lines.push(format!(
                "  CONSTRAINT `fk_{}_{}` FOREIGN KEY (`{}_id`) REFERENCES `{}` (`id`)",
                name, r, r, r
            ));
        }
        format!(
            "CREATE TABLE `{}` (\n{}\n) ENGINE=InnoDB;",
            name,
            lines.join(",\n")
        )
    }

    #[test]
    fn test_order_puts_guardians_first() {
        let statements = vec![
            create("audit_log", &["users"]),
            create("users", &[]),
            create("sessions", &["users", "devices"]),
        ];
        let ordered = CompareEngine::order_create_statements(&statements).unwrap();
        // `devices` is not being created, so `sessions` only waits for `users`
        assert_eq!(ordered, vec![statements[1].clone(), statements[2].clone(), statements[0].clone()]);
    }

    #[test]
    fn test_order_keeps_unresolvable_statements() {
        let statements = vec![create("a", &["b"]), create("b", &["a"]), create("c", &[])];
        let (ordered, warnings) = order_creates(&statements).unwrap();
        assert_eq!(ordered.len(), statements.len());
        assert_eq!(ordered[0], statements[2]);
        assert_eq!(
            ordered[1],
            format!("-- Might have unmet dependencies on: b\n{}", statements[0])
        );
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_order_rejects_garbage() {
        let statements = vec!["DROP TABLE `x`;".to_string()];
        assert!(CompareEngine::order_create_statements(&statements).is_err());
    }

    #[test]
    fn test_same_tables_leave_nothing_to_create() {
        let mut base = Database::new("shop");
        base.add_table_by_string(&create("users", &[]), false).unwrap();
        let mut target = base.clone();
        let engine = CompareEngine::new(CompareConfig {
            create: true,
            drop: true,
            ..Default::default()
        });
        assert!(engine.diff_databases(&base, &target).same_tables());
        assert!(engine.compare(&mut base, &target).unwrap().is_empty());

        target.add_table_by_string(&create("sessions", &["users"]), false).unwrap();
        target.link_tables().unwrap();
        assert!(!engine.diff_databases(&base, &target).same_tables());
        let changes = engine.compare(&mut base, &target).unwrap();
        assert_eq!(changes.create_tables.len(), 1);
        assert!(base.has_table("sessions"));
    }

    #[test]
    fn test_resolve_renames_claims_once() {
        let engine = CompareEngine::default();
        let mut diff = DatabaseDiff {
            renames: vec![
                RenameCandidate {
                    table: "customers".to_string(),
                    candidates: vec![ScoredTable { name: "clients".to_string(), score: 0.9 }],
                },
                RenameCandidate {
                    table: "buyers".to_string(),
                    candidates: vec![ScoredTable { name: "clients".to_string(), score: 0.8 }],
                },
                RenameCandidate {
                    table: "people".to_string(),
                    candidates: vec![
                        ScoredTable { name: "persons".to_string(), score: 0.9 },
                        ScoredTable { name: "humans".to_string(), score: 0.7 },
                    ],
                },
            ],
            dropped: vec!["clients".to_string(), "persons".to_string(), "humans".to_string()],
            ..Default::default()
        };
        let renames = engine.resolve_renames(&mut diff);
        assert_eq!(renames.len(), 1);
        assert_eq!(renames[0].from, "clients");
        assert_eq!(renames[0].to, "customers");
        assert_eq!(diff.added, vec!["buyers", "people"]);
        assert_eq!(diff.dropped, vec!["persons", "humans"]);
        assert_eq!(diff.warnings.len(), 1);
        assert!(diff.renames.is_empty());
    }

    #[test]
    fn test_report_only_policy_never_renames() {
        let engine = CompareEngine::new(CompareConfig {
            rename_policy: RenamePolicy::ReportOnly,
            ..Default::default()
        });
        let mut diff = DatabaseDiff {
            renames: vec![RenameCandidate {
                table: "customers".to_string(),
                candidates: vec![ScoredTable { name: "clients".to_string(), score: 1.0 }],
            }],
            dropped: vec!["clients".to_string()],
            ..Default::default()
        };
        assert!(engine.resolve_renames(&mut diff).is_empty());
        assert_eq!(diff.added, vec!["customers"]);
        assert_eq!(diff.dropped, vec!["clients"]);
        assert_eq!(diff.warnings.len(), 1);
    }
}
