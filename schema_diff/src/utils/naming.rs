//! Identifier utilities for schema_diff
//!
//! Helpers for the backtick-quoted identifiers found in MySQL DDL output.

use once_cell::sync::Lazy;
use regex::Regex;

static BACKTICKED: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));

static AUTO_INCREMENT_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)AUTO_INCREMENT=\d+ ?").expect("valid regex"));

/// Quote an identifier with backticks, doubling embedded backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote and join a list of identifiers: `a`, `b`
pub fn join_identifiers<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| quote_identifier(name.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// All backtick-quoted identifiers in a fragment, in order of appearance
pub fn backticked_names(text: &str) -> Vec<String> {
    BACKTICKED
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// The first backtick-quoted identifier in a fragment
pub fn first_backticked(text: &str) -> Option<String> {
    BACKTICKED.captures(text).map(|caps| caps[1].to_string())
}

/// Remove the environment-specific `AUTO_INCREMENT=<n>` table option
pub fn strip_auto_increment(options: &str) -> String {
    AUTO_INCREMENT_OPTION.replace_all(options, "").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "`users`");
        assert_eq!(quote_identifier("odd`name"), "`odd``name`");
        assert_eq!(join_identifiers(&["a", "b"]), "`a`, `b`");
    }

    #[test]
    fn test_backticked_names() {
        let line = "CONSTRAINT `fk_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)";
        assert_eq!(
            backticked_names(line),
            vec!["fk_user", "user_id", "users", "id"]
        );
        assert_eq!(first_backticked(line).as_deref(), Some("fk_user"));
        assert_eq!(first_backticked("PRIMARY KEY"), None);
    }

    #[test]
    fn test_strip_auto_increment() {
        assert_eq!(
            strip_auto_increment(") ENGINE=InnoDB AUTO_INCREMENT=1523 DEFAULT CHARSET=utf8"),
            ") ENGINE=InnoDB DEFAULT CHARSET=utf8"
        );
        assert_eq!(
            strip_auto_increment(") ENGINE=InnoDB AUTO_INCREMENT=7"),
            ") ENGINE=InnoDB"
        );
    }
}
