//! Rename heuristic: how alike are two table definitions

use super::Table;
use crate::schema::element::SchemaElement;
use crate::schema::primary_key::PrimaryKey;

impl Table {
    /// Score in `[0, 1]` estimating whether `other` is a renamed copy of `self`
    ///
    /// Field overlap weighs double; index and primary key similarity make up
    /// the rest. Tables with identical bodies always score 1.0.
    pub fn similarity_score(&self, other: &Table) -> f64 {
        if !self.fields.is_empty() && self.body_signature() == other.body_signature() {
            return 1.0;
        }
        let score = (2.0 * self.field_similarity(other)
            + self.index_similarity(other)
            + self.primary_similarity(other))
            / 400.0;
        score.clamp(0.0, 1.0)
    }

    fn field_similarity(&self, other: &Table) -> f64 {
        let max = self.fields.len().max(other.fields.len());
        if max == 0 {
            return 0.0;
        }
        let shared = self
            .fields
            .keys()
            .filter(|name| other.fields.contains_key(*name))
            .count();
        shared as f64 / max as f64 * 100.0
    }

    fn index_similarity(&self, other: &Table) -> f64 {
        let max = self.indexes.len().max(other.indexes.len());
        if max == 0 {
            return 50.0;
        }
        let total: f64 = other
            .indexes
            .values()
            .map(|theirs| match self.indexes.get(theirs.name()) {
                None => 0.0,
                Some(mine) => {
                    let one_sided = mine
                        .fields()
                        .iter()
                        .filter(|f| !theirs.contains_field(f))
                        .count()
                        + theirs
                            .fields()
                            .iter()
                            .filter(|f| !mine.contains_field(f))
                            .count();
                    100.0 / 2f64.powi(one_sided as i32)
                }
            })
            .sum();
        total / max as f64
    }

    fn primary_similarity(&self, other: &Table) -> f64 {
        match (&self.primary_key, &other.primary_key) {
            (None, None) => 80.0,
            (Some(pk), None) => existing_share(pk, other) * 100.0,
            (None, Some(pk)) => existing_share(pk, self) * 100.0,
            (Some(mine), Some(theirs)) if mine.same_definition(theirs) => 120.0,
            (Some(mine), Some(theirs)) => {
                let same_len = if mine.len() == theirs.len() { 1.0 } else { 0.0 };
                let weights = same_len
                    + overlap(mine, theirs)
                    + overlap(theirs, mine)
                    + existing_share(mine, other)
                    + existing_share(theirs, self);
                weights / 5.0 * 100.0
            }
        }
    }
}

/// Share of `a`'s key columns that are also key columns of `b`
fn overlap(a: &PrimaryKey, b: &PrimaryKey) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let shared = a.field_names().iter().filter(|f| b.contains_field(f)).count();
    shared as f64 / a.len() as f64
}

/// Share of the key columns existing as fields of `table`
fn existing_share(pk: &PrimaryKey, table: &Table) -> f64 {
    if pk.is_empty() {
        return 0.0;
    }
    let existing = pk.field_names().iter().filter(|f| table.has_field(f)).count();
    existing as f64 / pk.len() as f64
}
