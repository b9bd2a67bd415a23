//! Configuration sources for database targets and the security level.
//!
//! A source only answers "what is the current text for this key". Parsing
//! and validation happen in [`ConfigStore`](super::ConfigStore), so every
//! reload sees whatever the source holds at that moment.

use crate::error::{DbError, DbResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::debug;

/// Read access to an external key/value configuration medium.
pub trait ConfigSource: Send + Sync {
    /// Return the current value of `key`, or `None` when the key is absent.
    fn read(&self, key: &str) -> DbResult<Option<String>>;

    /// Short description for log messages.
    fn describe(&self) -> String;
}

/// Reads keys from a dotenv file on every call, falling back to the process
/// environment for keys the file does not define.
///
/// The file is parsed with `dotenvy` without touching the process
/// environment, so edits to the file are visible on the next reload.
#[derive(Debug, Clone)]
pub struct EnvFileSource {
    path: PathBuf,
}

impl EnvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_from_file(&self, key: &str) -> DbResult<Option<String>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Env file not found, using process environment");
            return Ok(None);
        }

        let iter = dotenvy::from_path_iter(&self.path).map_err(|e| {
            DbError::configuration(format!(
                "Cannot read env file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        // Later definitions of the same key win, as when sourcing the file in a shell.
        let mut found = None;
        for item in iter {
            let (k, v) = item.map_err(|e| {
                DbError::configuration(format!(
                    "Cannot parse env file {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
            if k == key {
                found = Some(v);
            }
        }
        Ok(found)
    }
}

impl ConfigSource for EnvFileSource {
    fn read(&self, key: &str) -> DbResult<Option<String>> {
        if let Some(value) = self.read_from_file(key)? {
            return Ok(Some(value));
        }
        Ok(std::env::var(key).ok())
    }

    fn describe(&self) -> String {
        format!("env file {} (with process environment fallback)", self.path.display())
    }
}

/// In-memory source whose values can be replaced at runtime.
///
/// Used by tests and by embedders that push configuration from elsewhere.
#[derive(Debug, Default)]
pub struct MemorySource {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source with one key already set.
    pub fn with(key: impl Into<String>, value: impl Into<String>) -> Self {
        let source = Self::new();
        source.set(key, value);
        source
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.into(), value.into());
        }
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.write() {
            values.remove(key);
        }
    }
}

impl ConfigSource for MemorySource {
    fn read(&self, key: &str) -> DbResult<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| DbError::configuration("In-memory configuration lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn describe(&self) -> String {
        "in-memory source".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_source_set_and_remove() {
        let source = MemorySource::with("A", "1");
        assert_eq!(source.read("A").unwrap().as_deref(), Some("1"));
        source.set("A", "2");
        assert_eq!(source.read("A").unwrap().as_deref(), Some("2"));
        source.remove("A");
        assert!(source.read("A").unwrap().is_none());
    }

    #[test]
    fn test_env_file_is_reread_on_every_call() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MCP_TEST_SOURCE_KEY=first").unwrap();
        let source = EnvFileSource::new(file.path());
        assert_eq!(
            source.read("MCP_TEST_SOURCE_KEY").unwrap().as_deref(),
            Some("first")
        );

        std::fs::write(file.path(), "MCP_TEST_SOURCE_KEY=second\n").unwrap();
        assert_eq!(
            source.read("MCP_TEST_SOURCE_KEY").unwrap().as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_env_file_single_quoted_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"MCP_TEST_JSON_KEY='[{{"name":"a"}}]'"#).unwrap();
        let source = EnvFileSource::new(file.path());
        assert_eq!(
            source.read("MCP_TEST_JSON_KEY").unwrap().as_deref(),
            Some(r#"[{"name":"a"}]"#)
        );
    }

    #[test]
    fn test_missing_file_and_key_is_none() {
        let source = EnvFileSource::new("/nonexistent/dir/.env");
        assert!(source.read("MCP_TEST_DEFINITELY_UNSET_KEY_42").unwrap().is_none());
    }
}
