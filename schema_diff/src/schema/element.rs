//! Common contract for parsed DDL fragments

use crate::schema::index::IndexKind;

/// Any named fragment of a table definition (field, key, index, constraint, table)
pub trait SchemaElement {
    /// Name of the element
    fn name(&self) -> &str;

    /// The trimmed DDL fragment the element was parsed from (empty for shells)
    fn raw_statement(&self) -> &str;

    /// Canonical DDL rendering, used for comparisons and generated SQL
    fn definition_string(&self) -> String;

    /// Two elements are equivalent when their canonical renderings match
    fn same_definition(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.definition_string() == other.definition_string()
    }
}

/// Kind of a body line in `SHOW CREATE TABLE` output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Column,
    PrimaryKey,
    Index(IndexKind),
    ForeignKey,
}

impl LineKind {
    /// Classify a trimmed body line by its leading marker character
    pub fn classify(line: &str) -> Option<Self> {
        match line.chars().next()? {
            '`' => Some(LineKind::Column),
            'P' => Some(LineKind::PrimaryKey),
            'U' => Some(LineKind::Index(IndexKind::Unique)),
            'F' => Some(LineKind::Index(IndexKind::FullText)),
            'S' => Some(LineKind::Index(IndexKind::Spatial)),
            'I' | 'K' => Some(LineKind::Index(IndexKind::Plain)),
            'C' => Some(LineKind::ForeignKey),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("`id` int(11) NOT NULL,", Some(LineKind::Column))]
    #[case("PRIMARY KEY (`id`),", Some(LineKind::PrimaryKey))]
    #[case("UNIQUE KEY `uniq_email` (`email`),", Some(LineKind::Index(IndexKind::Unique)))]
    #[case("FULLTEXT KEY `ft_body` (`body`),", Some(LineKind::Index(IndexKind::FullText)))]
    #[case("SPATIAL KEY `sp_loc` (`location`),", Some(LineKind::Index(IndexKind::Spatial)))]
    #[case("KEY `idx_user` (`user_id`),", Some(LineKind::Index(IndexKind::Plain)))]
    #[case("INDEX `idx_user` (`user_id`),", Some(LineKind::Index(IndexKind::Plain)))]
    #[case("CONSTRAINT `fk` FOREIGN KEY (`a`) REFERENCES `b` (`id`)", Some(LineKind::ForeignKey))]
    #[case("CHECK (`price` > 0)", Some(LineKind::ForeignKey))]
    #[case("/*!50100 PARTITION BY HASH (id) */", None)]
    #[case("", None)]
    fn test_classify(#[case] line: &str, #[case] expected: Option<LineKind>) {
        assert_eq!(LineKind::classify(line), expected);
    }
}
