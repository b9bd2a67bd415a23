//! Integration tests for loading targets from a dotenv file.
//!
//! The file is rewritten between loads to check that every reload reads
//! the current contents.

use multi_mysql_mcp::db::{ConfigSource, ConfigStore, EnvFileSource};
use multi_mysql_mcp::error::DbError;
use multi_mysql_mcp::tools::{CommandGate, SecurityPolicy};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const KEY: &str = "MMM_TEST_DATABASES";

fn write_env(file: &mut NamedTempFile, contents: &str) {
    let f = file.as_file_mut();
    f.set_len(0).unwrap();
    std::io::Seek::rewind(f).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f.flush().unwrap();
}

fn env_line(names: &[&str]) -> String {
    let items: Vec<String> = names
        .iter()
        .map(|n| {
            format!(r#"{{"name":"{n}","host":"localhost","user":"app","password":"pw","database":"{n}"}}"#)
        })
        .collect();
    format!("{}='[{}]'\n", KEY, items.join(","))
}

fn store_for(file: &NamedTempFile) -> ConfigStore {
    let source: Arc<dyn ConfigSource> = Arc::new(EnvFileSource::new(file.path()));
    ConfigStore::new(source, KEY)
}

#[test]
fn test_load_from_env_file() {
    let mut file = NamedTempFile::new().unwrap();
    write_env(&mut file, &format!("# targets\n{}", env_line(&["main", "analytics"])));

    let store = store_for(&file);
    let summary = store.load().unwrap();

    assert_eq!(summary.count, 2);
    assert_eq!(summary.default_target, "main");
    assert_eq!(store.names(), vec!["main", "analytics"]);
    let main = store.get("main").unwrap();
    assert_eq!(main.port, 3306);
    assert_eq!(main.connection_limit, 10);
    assert!(main.wait_for_connections);
}

#[test]
fn test_reload_sees_rewritten_file() {
    let mut file = NamedTempFile::new().unwrap();
    write_env(&mut file, &env_line(&["main"]));
    let store = store_for(&file);
    store.load().unwrap();
    assert!(store.get("reporting").is_none());

    write_env(&mut file, &env_line(&["main", "reporting"]));
    store.load().unwrap();

    assert!(store.get("reporting").is_some());
    assert_eq!(store.load_count(), 2);
}

#[test]
fn test_broken_rewrite_keeps_previous_targets() {
    let mut file = NamedTempFile::new().unwrap();
    write_env(&mut file, &env_line(&["main"]));
    let store = store_for(&file);
    store.load().unwrap();

    write_env(&mut file, &format!("{}='[{{\"name\":\"main\"'\n", KEY));
    let err = store.load().unwrap_err();

    assert!(matches!(err, DbError::Configuration { .. }));
    assert_eq!(store.names(), vec!["main"]);
    assert_eq!(store.load_count(), 2);
}

#[test]
fn test_empty_list_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write_env(&mut file, &format!("{}='[]'\n", KEY));

    let store = store_for(&file);

    assert!(matches!(store.load(), Err(DbError::Configuration { .. })));
    assert!(store.is_empty());
}

#[test]
fn test_missing_key_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write_env(&mut file, "OTHER_KEY=1\n");

    let store = store_for(&file);
    let err = store.load().unwrap_err();

    assert!(err.to_string().contains(KEY));
}

#[test]
fn test_security_level_read_from_same_file() {
    let mut file = NamedTempFile::new().unwrap();
    write_env(
        &mut file,
        &format!("{}MMM_TEST_SECURITY_LEVEL=select,insert\n", env_line(&["main"])),
    );
    let source = EnvFileSource::new(file.path());

    let selector = source.read("MMM_TEST_SECURITY_LEVEL").unwrap();
    let gate = CommandGate::from_selector(selector.as_deref()).unwrap();

    assert_eq!(
        gate.policy(),
        &SecurityPolicy::Custom(vec!["SELECT".into(), "INSERT".into()])
    );
}

#[test]
fn test_absent_security_level_means_default() {
    let mut file = NamedTempFile::new().unwrap();
    write_env(&mut file, &env_line(&["main"]));
    let source = EnvFileSource::new(file.path());

    let selector = source.read("MMM_TEST_SECURITY_LEVEL_UNSET").unwrap();
    let gate = CommandGate::from_selector(selector.as_deref()).unwrap();

    assert_eq!(gate.policy(), &SecurityPolicy::Default);
}
