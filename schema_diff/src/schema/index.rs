//! Index definitions

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::element::SchemaElement;
use crate::utils::naming::{backticked_names, join_identifiers, quote_identifier};

static INDEX_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^`]*`([^`]+)`[^(]*\((.*)$").expect("valid regex"));

/// Split `cols) options` at the parenthesis closing the column list
///
/// Quoted identifiers and string literals are skipped, so a `COMMENT`
/// containing parentheses stays in the options.
fn split_column_list(text: &str) -> Option<(&str, &str)> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '`' | '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[..i], &text[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Kind of index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    Plain,
    Unique,
    FullText,
    Spatial,
}

impl IndexKind {
    /// Keyword prefix used when rendering the index
    pub fn prefix(&self) -> &'static str {
        match self {
            IndexKind::Plain => "",
            IndexKind::Unique => "UNIQUE ",
            IndexKind::FullText => "FULLTEXT ",
            IndexKind::Spatial => "SPATIAL ",
        }
    }

    fn from_marker(line: &str) -> Self {
        match line.chars().next() {
            Some('U') => IndexKind::Unique,
            Some('F') => IndexKind::FullText,
            Some('S') => IndexKind::Spatial,
            _ => IndexKind::Plain,
        }
    }
}

/// Represents a named index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    name: String,
    kind: IndexKind,
    /// Column names, sorted
    fields: Vec<String>,
    /// Column list exactly as declared, prefix lengths included
    column_expression: String,
    options: Option<String>,
    raw: String,
}

impl Index {
    /// Build an index over whole columns
    pub fn new<S: AsRef<str>>(name: &str, kind: IndexKind, columns: &[S]) -> Self {
        let mut fields: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let column_expression = join_identifiers(&fields).replace(", ", ",");
        fields.sort();
        Self {
            name: name.to_string(),
            kind,
            fields,
            column_expression,
            options: None,
            raw: String::new(),
        }
    }

    /// Parse a `KEY`/`UNIQUE KEY`/`FULLTEXT KEY`/`SPATIAL KEY` line
    pub fn parse(stmt: &str) -> Result<Self> {
        let raw = stmt.trim();
        let body = raw.trim_end_matches(',').trim_end();
        let caps = INDEX_LINE
            .captures(body)
            .ok_or_else(|| Error::parse(raw, raw))?;

        let (columns, rest) = split_column_list(&caps[2]).ok_or_else(|| Error::parse(raw, raw))?;
        let column_expression = columns.trim().to_string();
        let mut fields = backticked_names(&column_expression);
        if fields.is_empty() {
            return Err(Error::parse(raw, raw));
        }
        fields.sort();

        let options = rest.trim();
        Ok(Self {
            name: caps[1].to_string(),
            kind: IndexKind::from_marker(body),
            fields,
            column_expression,
            options: (!options.is_empty()).then(|| options.to_string()),
            raw: raw.to_string(),
        })
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn is_unique(&self) -> bool {
        self.kind == IndexKind::Unique
    }

    pub fn is_full_text(&self) -> bool {
        self.kind == IndexKind::FullText
    }

    /// Sorted column names
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn column_expression(&self) -> &str {
        &self.column_expression
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

impl SchemaElement for Index {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_statement(&self) -> &str {
        &self.raw
    }

    fn definition_string(&self) -> String {
        let mut def = format!(
            "{}KEY {} ({})",
            self.kind.prefix(),
            quote_identifier(&self.name),
            self.column_expression
        );
        if let Some(options) = &self.options {
            def.push(' ');
            def.push_str(options);
        }
        def
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("KEY `idx_user` (`user_id`),", IndexKind::Plain)]
    #[case("UNIQUE KEY `uniq_email` (`email`),", IndexKind::Unique)]
    #[case("FULLTEXT KEY `ft_body` (`body`)", IndexKind::FullText)]
    #[case("SPATIAL KEY `sp_loc` (`location`)", IndexKind::Spatial)]
    fn test_kind_from_marker(#[case] line: &str, #[case] kind: IndexKind) {
        let idx = Index::parse(line).unwrap();
        assert_eq!(idx.kind(), kind);
        assert_eq!(idx.definition_string(), line.trim_end_matches(','));
    }

    #[test]
    fn test_fields_sorted_but_expression_verbatim() {
        let idx = Index::parse("KEY `idx_name` (`last_name`(10),`first_name`) USING BTREE,").unwrap();
        assert_eq!(idx.name(), "idx_name");
        assert_eq!(idx.fields(), ["first_name", "last_name"]);
        assert_eq!(idx.column_expression(), "`last_name`(10),`first_name`");
        assert_eq!(
            idx.definition_string(),
            "KEY `idx_name` (`last_name`(10),`first_name`) USING BTREE"
        );
    }

    #[test]
    fn test_parenthesized_comment_stays_in_options() {
        let line = "KEY `k` (`a`) COMMENT 'x (y)',";
        let idx = Index::parse(line).unwrap();
        assert_eq!(idx.column_expression(), "`a`");
        assert_eq!(idx.fields(), ["a"]);
        assert_eq!(idx.definition_string(), "KEY `k` (`a`) COMMENT 'x (y)'");
    }

    #[test]
    fn test_new_renders_like_parsed() {
        let built = Index::new("uniq_pair", IndexKind::Unique, &["b", "a"]);
        let parsed = Index::parse("UNIQUE KEY `uniq_pair` (`b`,`a`)").unwrap();
        assert!(built.same_definition(&parsed));
        assert_eq!(built.fields(), parsed.fields());
    }

    #[rstest]
    #[case("KEY idx_user (user_id),")]
    #[case("KEY `idx_user`,")]
    #[case("KEY `idx_expr` ((lower(name))),")]
    #[case("KEY `idx_open` (`a`,")]
    fn test_malformed(#[case] line: &str) {
        assert!(matches!(Index::parse(line), Err(Error::ParseError { .. })));
    }
}
