//! Database model: table arena, dependency graph and sorting

use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::element::SchemaElement;
use crate::schema::foreign_key::ForeignKey;
use crate::schema::table::Table;
use crate::utils::naming::{first_backticked, quote_identifier};

static CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)CHARACTER SET\s+(\w+)").expect("valid regex"));

const DEFAULT_CHARSET: &str = "utf8";

/// Stable handle of a table inside one [`Database`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Guardian/dependant adjacency, always updated in both directions
#[derive(Debug, Clone, Default)]
struct TableLinks {
    guardians: IndexMap<TableId, IndexSet<TableId>>,
    dependants: IndexMap<TableId, IndexSet<TableId>>,
}

impl TableLinks {
    fn link(&mut self, dependant: TableId, guardian: TableId) {
        self.guardians.entry(dependant).or_default().insert(guardian);
        self.dependants.entry(guardian).or_default().insert(dependant);
    }

    /// Drop the outgoing (guardian) edges of a table
    fn unlink_guardians(&mut self, id: TableId) {
        for guardian in self.guardians.shift_remove(&id).unwrap_or_default() {
            if let Some(set) = self.dependants.get_mut(&guardian) {
                set.shift_remove(&id);
            }
        }
    }

    /// Drop every edge touching a table
    fn unlink_all(&mut self, id: TableId) {
        self.unlink_guardians(id);
        for dependant in self.dependants.shift_remove(&id).unwrap_or_default() {
            if let Some(set) = self.guardians.get_mut(&dependant) {
                set.shift_remove(&id);
            }
        }
    }

    fn guardians_of(&self, id: TableId) -> impl Iterator<Item = TableId> + '_ {
        self.guardians.get(&id).into_iter().flatten().copied()
    }

    fn dependants_of(&self, id: TableId) -> impl Iterator<Item = TableId> + '_ {
        self.dependants.get(&id).into_iter().flatten().copied()
    }

    fn clear(&mut self) {
        self.guardians.clear();
        self.dependants.clear();
    }
}

/// One schema: its tables and the foreign key graph between them
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    charset: String,
    drop_existing: bool,
    tables: Vec<Option<Table>>,
    names: IndexMap<String, TableId>,
    links: TableLinks,
    sorted: OnceCell<Vec<TableId>>,
}

impl Database {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            drop_existing: false,
            tables: Vec::new(),
            names: IndexMap::new(),
            links: TableLinks::default(),
            sorted: OnceCell::new(),
        }
    }

    /// Parse `SHOW CREATE DATABASE` output
    pub fn parse(stmt: &str) -> Result<Self> {
        let stmt = stmt.trim();
        let name = first_backticked(stmt).ok_or_else(|| Error::parse(stmt, stmt))?;
        let mut db = Database::new(&name);
        if let Some(caps) = CHARSET.captures(stmt) {
            db.charset = caps[1].to_string();
        }
        Ok(db)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn set_charset(&mut self, charset: &str) {
        self.charset = charset.to_string();
    }

    pub fn drop_existing(&self) -> bool {
        self.drop_existing
    }

    /// Prefix the create statement with `DROP SCHEMA IF EXISTS`
    pub fn set_drop_existing(&mut self, drop: bool) {
        self.drop_existing = drop;
    }

    pub fn definition_string(&self) -> String {
        let name = quote_identifier(&self.name);
        let create = format!(
            "CREATE DATABASE IF NOT EXISTS {} DEFAULT CHARACTER SET {};",
            name, self.charset
        );
        if self.drop_existing {
            format!("DROP SCHEMA IF EXISTS {};\n{}", name, create)
        } else {
            create
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.names.get(name).copied()
    }

    pub fn table_by_id(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn table_by_id_mut(&mut self, id: TableId) -> Option<&mut Table> {
        self.tables.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.table_id(name).and_then(|id| self.table_by_id(id))
    }

    /// Mutable access; callers changing constraints must call [`Database::relink_table`]
    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        let id = self.table_id(name)?;
        self.table_by_id_mut(id)
    }

    /// Like [`Database::table`], failing with `NotFound`
    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.table(name)
            .ok_or_else(|| Error::NotFound(format!("database {} has no table {}", self.name, name)))
    }

    /// Tables in insertion order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.names.values().filter_map(|id| self.table_by_id(*id))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    fn reset_sort(&mut self) {
        self.sorted = OnceCell::new();
    }

    /// Add a table; an existing table of the same name is replaced unless
    /// `ignore_duplicate` is false, in which case that is an error
    pub fn add_table(&mut self, table: Table, ignore_duplicate: bool) -> Result<TableId> {
        self.reset_sort();
        if let Some(id) = self.table_id(table.name()) {
            if !ignore_duplicate {
                return Err(Error::duplicate("table", table.name(), &self.name));
            }
            // Dependants still reference this name, so only outgoing edges change
            self.links.unlink_guardians(id);
            let guardians: Vec<TableId> = table
                .dependencies()
                .iter()
                .filter_map(|dependency| self.table_id(dependency))
                .collect();
            self.tables[id.0 as usize] = Some(table);
            for guardian in guardians {
                self.links.link(id, guardian);
            }
            return Ok(id);
        }

        let id = TableId(self.tables.len() as u32);
        self.names.insert(table.name().to_string(), id);
        self.tables.push(Some(table));
        Ok(id)
    }

    pub fn add_table_by_string(&mut self, stmt: &str, ignore_duplicate: bool) -> Result<TableId> {
        self.add_table(Table::parse(stmt)?, ignore_duplicate)
    }

    /// Build the dependency graph from every table's foreign keys
    pub fn link_tables(&mut self) -> Result<()> {
        self.reset_sort();
        self.links.clear();
        let mut edges = Vec::new();
        for (name, id) in &self.names {
            let Some(table) = self.table_by_id(*id) else {
                continue;
            };
            for dependency in table.dependencies() {
                let guardian = self.table_id(&dependency).ok_or_else(|| {
                    Error::UnresolvedDependency {
                        table: name.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                edges.push((*id, guardian));
            }
        }
        for (dependant, guardian) in edges {
            self.links.link(dependant, guardian);
        }
        debug!(database = %self.name, tables = self.len(), "linked tables");
        Ok(())
    }

    /// Rebuild the guardian links of one table, returning unknown references
    pub fn relink_table(&mut self, name: &str) -> Result<Vec<String>> {
        let id = self
            .table_id(name)
            .ok_or_else(|| Error::NotFound(format!("database {} has no table {}", self.name, name)))?;
        self.reset_sort();
        self.links.unlink_guardians(id);

        let dependencies = self.get_table(name)?.dependencies();
        let mut unresolved = Vec::new();
        for dependency in dependencies {
            match self.table_id(&dependency) {
                Some(guardian) => self.links.link(id, guardian),
                None => unresolved.push(dependency),
            }
        }
        Ok(unresolved)
    }

    /// Tables referenced by `name`
    pub fn guardian_tables(&self, name: &str) -> Vec<&Table> {
        self.table_id(name)
            .map(|id| {
                self.links
                    .guardians_of(id)
                    .filter_map(|g| self.table_by_id(g))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tables referencing `name`
    pub fn dependant_tables(&self, name: &str) -> Vec<&Table> {
        self.table_id(name)
            .map(|id| {
                self.links
                    .dependants_of(id)
                    .filter_map(|d| self.table_by_id(d))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Constraints of other tables pointing at `name`, with their owning table
    pub fn foreign_keys_referencing(&self, name: &str) -> Vec<(&str, &ForeignKey)> {
        self.tables()
            .filter(|table| table.name() != name)
            .flat_map(|table| {
                table
                    .constraints_referencing(name)
                    .into_iter()
                    .map(move |fk| (table.name(), fk))
            })
            .collect()
    }

    /// Tables with guardians ahead of dependants, otherwise in insertion order
    pub fn sorted_tables(&self) -> Vec<&Table> {
        self.sorted
            .get_or_init(|| self.compute_sort())
            .iter()
            .filter_map(|id| self.table_by_id(*id))
            .collect()
    }

    fn compute_sort(&self) -> Vec<TableId> {
        let mut placed = IndexSet::new();
        let mut visiting = HashSet::new();
        for id in self.names.values() {
            self.place(*id, &mut placed, &mut visiting);
        }
        placed.into_iter().collect()
    }

    fn place(&self, id: TableId, placed: &mut IndexSet<TableId>, visiting: &mut HashSet<TableId>) {
        if placed.contains(&id) || !visiting.insert(id) {
            return;
        }
        for guardian in self.links.guardians_of(id) {
            self.place(guardian, placed, visiting);
        }
        placed.insert(id);
    }

    pub fn force_resort(&mut self) {
        self.reset_sort();
    }

    /// `CREATE TABLE` statements in dependency order
    pub fn create_statements(&mut self, force_resort: bool) -> Vec<String> {
        if force_resort {
            self.reset_sort();
        }
        self.sorted_tables()
            .into_iter()
            .map(Table::create_query)
            .collect()
    }

    /// Add tables from another schema, resolving their guardians against this
    /// database and the batch itself
    ///
    /// Every dependency is checked before anything is added.
    pub fn add_missing_tables(&mut self, tables: Vec<Table>) -> Result<Vec<TableId>> {
        let batch: HashSet<&str> = tables.iter().map(|t| t.name()).collect();
        for table in &tables {
            for dependency in table.dependencies() {
                if !self.has_table(&dependency) && !batch.contains(dependency.as_str()) {
                    return Err(Error::UnresolvedDependency {
                        table: table.name().to_string(),
                        dependency,
                    });
                }
            }
        }

        let mut ids = Vec::with_capacity(tables.len());
        let mut names = Vec::with_capacity(tables.len());
        for table in tables {
            names.push(table.name().to_string());
            ids.push(self.add_table(table, true)?);
        }
        for name in &names {
            self.relink_table(name)?;
        }
        self.reset_sort();
        Ok(ids)
    }

    /// Rename a table, keeping its position and retargeting references to it
    pub fn apply_rename(&mut self, old: &str, new: &str) -> Result<TableId> {
        if self.has_table(new) {
            return Err(Error::duplicate("table", new, &self.name));
        }
        let id = self
            .table_id(old)
            .ok_or_else(|| Error::NotFound(format!("database {} has no table {}", self.name, old)))?;

        self.names = std::mem::take(&mut self.names)
            .into_iter()
            .map(|(name, tid)| if tid == id { (new.to_string(), tid) } else { (name, tid) })
            .collect();

        let dependants: Vec<TableId> = self.links.dependants_of(id).collect();
        if let Some(table) = self.table_by_id_mut(id) {
            table.rename(new);
            table.retarget_constraints(old, new);
        }
        for dependant in dependants {
            if let Some(table) = self.table_by_id_mut(dependant) {
                table.retarget_constraints(old, new);
            }
        }
        self.reset_sort();
        Ok(id)
    }

    /// Remove a table after unlinking it in both directions
    pub fn remove_table(&mut self, name: &str) -> Result<Table> {
        let id = self
            .names
            .shift_remove(name)
            .ok_or_else(|| Error::NotFound(format!("database {} has no table {}", self.name, name)))?;
        self.links.unlink_all(id);
        self.reset_sort();
        self.tables[id.0 as usize]
            .take()
            .ok_or_else(|| Error::NotFound(format!("table slot {} is empty", id)))
    }
}
