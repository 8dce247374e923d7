//! Rewrite neutral `?vN?` tokens into a backend's parameter syntax.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?v([0-9]+)\?").unwrap());

/// `?vN?` → `{prefix}N`, e.g. `$1` for Postgres or `@v1` for SQL Server.
pub fn numbered(text: &str, prefix: &str) -> String {
    TOKEN
        .replace_all(text, |caps: &Captures<'_>| format!("{}{}", prefix, &caps[1]))
        .into_owned()
}

/// `?vN?` → `?`, for drivers that bind by position only.
pub fn positional(text: &str) -> String {
    TOKEN.replace_all(text, "?").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered() {
        assert_eq!(
            numbered("SELECT * FROM t WHERE a = ?v1? AND b = ?v2?", "$"),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
        assert_eq!(numbered("EXEC p ?v1?, ?v12?", "@v"), "EXEC p @v1, @v12");
    }

    #[test]
    fn test_positional() {
        assert_eq!(
            positional("INSERT INTO t VALUES (?v1?, ?v2?)"),
            "INSERT INTO t VALUES (?, ?)"
        );
    }

    #[test]
    fn test_text_without_tokens_is_unchanged() {
        assert_eq!(positional("SELECT '?' AS q"), "SELECT '?' AS q");
        assert_eq!(numbered("SELECT 1", "$"), "SELECT 1");
    }
}
