//! Command allow-list applied to SQL before it reaches a pool.
//!
//! The gate is a lexical prefix classifier: it upper-cases the trimmed SQL
//! text and accepts it when it begins with one of the allowed command tokens
//! followed by a word boundary. Multi-word tokens such as `CREATE TABLE`
//! match any run of whitespace between their words.
//!
//! # Limitations
//!
//! The gate does not parse SQL. It does not notice a second statement after
//! a semicolon, a command hidden behind a leading comment, or a disallowed
//! clause inside a permitted statement. `SELECT 1; DROP TABLE t` passes the
//! default policy. Use [`StatementGuard`](super::statement_guard::StatementGuard)
//! in addition when stacked statements must be refused.

use crate::error::{DbError, DbResult};
use regex::Regex;
use tracing::debug;

/// Read-only commands allowed when no security level is configured.
pub const DEFAULT_COMMANDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "ANALYZE"];

/// Commands added on top of [`DEFAULT_COMMANDS`] by the `extended` level.
pub const EXTENDED_COMMANDS: &[&str] = &[
    "CREATE TABLE",
    "CREATE INDEX",
    "CREATE VIEW",
    "CREATE TEMPORARY TABLE",
    "ALTER TABLE",
    "DROP TABLE",
    "DROP INDEX",
    "DROP VIEW",
    "INSERT",
    "UPDATE",
    "DELETE",
    "REPLACE",
    "TRUNCATE",
    "OPTIMIZE TABLE",
    "REPAIR TABLE",
    "CHECK TABLE",
];

/// Which commands the gate lets through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityPolicy {
    Default,
    Extended,
    Unrestricted,
    /// Upper-cased, trimmed, non-empty tokens in configuration order.
    Custom(Vec<String>),
}

impl SecurityPolicy {
    /// Interpret a security-level selector.
    ///
    /// `default`, `extended` and `all` are recognized case-insensitively; an
    /// unset or blank selector means `default`. Any other value is a
    /// comma-separated custom list, which must name at least one command.
    pub fn from_selector(selector: Option<&str>) -> DbResult<Self> {
        let selector = selector.map(str::trim).unwrap_or("");
        if selector.is_empty() || selector.eq_ignore_ascii_case("default") {
            return Ok(Self::Default);
        }
        if selector.eq_ignore_ascii_case("extended") {
            return Ok(Self::Extended);
        }
        if selector.eq_ignore_ascii_case("all") {
            return Ok(Self::Unrestricted);
        }

        let tokens: Vec<String> = selector
            .split(',')
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(DbError::configuration(format!(
                "Security level '{}' does not name any command",
                selector
            )));
        }
        Ok(Self::Custom(tokens))
    }

    /// The allow-list, or `None` when unrestricted.
    pub fn allowed_commands(&self) -> Option<Vec<String>> {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        match self {
            Self::Default => Some(owned(DEFAULT_COMMANDS)),
            Self::Extended => {
                let mut list = owned(DEFAULT_COMMANDS);
                list.extend(owned(EXTENDED_COMMANDS));
                Some(list)
            }
            Self::Unrestricted => None,
            Self::Custom(tokens) => Some(tokens.clone()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Extended => "extended",
            Self::Unrestricted => "all",
            Self::Custom(_) => "custom",
        }
    }
}

/// A permitted statement and the token that let it through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permit {
    /// `None` under the unrestricted policy.
    pub matched: Option<String>,
}

struct CompiledToken {
    token: String,
    pattern: Regex,
}

/// Evaluates SQL text against a fixed [`SecurityPolicy`].
pub struct CommandGate {
    policy: SecurityPolicy,
    allowed: Vec<String>,
    tokens: Vec<CompiledToken>,
}

impl CommandGate {
    pub fn new(policy: SecurityPolicy) -> DbResult<Self> {
        let allowed = policy.allowed_commands().unwrap_or_default();
        let tokens = allowed
            .iter()
            .map(|token| {
                Ok(CompiledToken {
                    token: token.clone(),
                    pattern: token_pattern(token)?,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        Ok(Self {
            policy,
            allowed,
            tokens,
        })
    }

    /// Build a gate from a raw security-level selector.
    pub fn from_selector(selector: Option<&str>) -> DbResult<Self> {
        Self::new(SecurityPolicy::from_selector(selector)?)
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Allowed tokens in match order; empty when unrestricted.
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Decide whether `sql` may run.
    pub fn check(&self, sql: &str) -> DbResult<Permit> {
        if self.policy == SecurityPolicy::Unrestricted {
            return Ok(Permit { matched: None });
        }

        let normalized = sql.trim().to_uppercase();
        if let Some(hit) = self.tokens.iter().find(|t| t.pattern.is_match(&normalized)) {
            debug!(command = %hit.token, "Command permitted");
            return Ok(Permit {
                matched: Some(hit.token.clone()),
            });
        }

        let command = normalized.split_whitespace().next().unwrap_or("");
        debug!(command = %command, policy = self.policy.name(), "Command rejected");
        Err(DbError::command_rejected(command, self.allowed.clone()))
    }
}

impl std::fmt::Debug for CommandGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandGate")
            .field("policy", &self.policy)
            .finish()
    }
}

/// `^WORD1\s+WORD2\b` with each word escaped.
fn token_pattern(token: &str) -> DbResult<Regex> {
    let body = token
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    // \b only means something after a word character
    let boundary = if token.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
        r"\b"
    } else {
        ""
    };
    Regex::new(&format!("^{}{}", body, boundary))
        .map_err(|e| DbError::configuration(format!("Invalid command token '{}': {}", token, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_keywords_case_insensitive() {
        assert_eq!(SecurityPolicy::from_selector(None).unwrap(), SecurityPolicy::Default);
        assert_eq!(SecurityPolicy::from_selector(Some("  ")).unwrap(), SecurityPolicy::Default);
        assert_eq!(
            SecurityPolicy::from_selector(Some(" DEFAULT ")).unwrap(),
            SecurityPolicy::Default
        );
        assert_eq!(
            SecurityPolicy::from_selector(Some("Extended")).unwrap(),
            SecurityPolicy::Extended
        );
        assert_eq!(
            SecurityPolicy::from_selector(Some("ALL")).unwrap(),
            SecurityPolicy::Unrestricted
        );
    }

    #[test]
    fn test_custom_selector_normalized() {
        let policy = SecurityPolicy::from_selector(Some(" select , create   table,,")).unwrap();
        assert_eq!(
            policy,
            SecurityPolicy::Custom(vec!["SELECT".to_string(), "CREATE TABLE".to_string()])
        );
    }

    #[test]
    fn test_custom_selector_without_tokens_is_error() {
        assert!(matches!(
            SecurityPolicy::from_selector(Some(" , ,")),
            Err(DbError::Configuration { .. })
        ));
    }

    #[test]
    fn test_extended_contains_default() {
        let list = SecurityPolicy::Extended.allowed_commands().unwrap();
        assert_eq!(list.len(), DEFAULT_COMMANDS.len() + EXTENDED_COMMANDS.len());
        assert_eq!(list[0], "SELECT");
    }

    #[test]
    fn test_token_pattern_escapes_and_spaces() {
        let pattern = token_pattern("CREATE TABLE").unwrap();
        assert!(pattern.is_match("CREATE \t\n TABLE X"));
        assert!(!pattern.is_match("CREATE TABLEFOO"));
        let pattern = token_pattern("A.B").unwrap();
        assert!(!pattern.is_match("AXB"));
    }
}
