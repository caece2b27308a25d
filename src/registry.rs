//! Account registry: symbol → account ids, used to format alert payloads.
//!
//! Grounded in `original_source/include/AutoSaveJsonMap.hpp`: a reader-writer
//! protected map that persists itself to JSON on every write and loads
//! best-effort on startup.

use crate::orderbook::OrderBookError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Reader-writer protected `symbol -> account ids` map, durably mirrored to
/// a JSON file on every successful write (spec.md §6 "Persistence").
#[derive(Debug)]
pub struct AccountRegistry {
    path: PathBuf,
    data: RwLock<HashMap<String, Vec<String>>>,
}

impl AccountRegistry {
    /// Loads from `path` if it exists; a missing file is not an error, just
    /// an empty registry (mirrors `AutoSaveJsonMap`'s constructor).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OrderBookError> {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn accounts_for(&self, symbol: &str) -> Option<Vec<String>> {
        let guard = self.data.read().expect("registry lock poisoned");
        guard.get(symbol).cloned()
    }

    /// Inserts or replaces a symbol's account list and saves the full map.
    pub fn set(&self, symbol: String, accounts: Vec<String>) -> Result<(), OrderBookError> {
        let mut guard = self.data.write().expect("registry lock poisoned");
        guard.insert(symbol, accounts);
        self.save_locked(&guard)
    }

    fn save_locked(&self, data: &HashMap<String, Vec<String>>) -> Result<(), OrderBookError> {
        // `AutoSaveJsonMap.hpp` writes its dump with 4-space indentation;
        // `to_string_pretty`'s default is 2, so the formatter is built by hand.
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(data, &mut serializer)?;
        fs::write(&self.path, buf)?;
        Ok(())
    }
}

/// Formats an alert payload per spec.md §4.4/§6:
/// `"<SYMBOL#ACC1,ACC2,...>"`, or empty if the symbol has no registered
/// accounts.
pub fn format_account(symbol: &str, registry: &AccountRegistry) -> String {
    match registry.accounts_for(symbol) {
        Some(accounts) if !accounts.is_empty() => {
            format!("<{}#{}>", symbol, accounts.join(","))
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let registry = AccountRegistry::load(dir.path().join("nope.json")).unwrap();
        assert!(registry.accounts_for("600519").is_none());
    }

    #[test]
    fn set_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let registry = AccountRegistry::load(&path).unwrap();
        registry
            .set("600519".to_string(), vec!["acc1".to_string(), "acc2".to_string()])
            .unwrap();

        let reloaded = AccountRegistry::load(&path).unwrap();
        assert_eq!(
            reloaded.accounts_for("600519"),
            Some(vec!["acc1".to_string(), "acc2".to_string()])
        );
    }

    #[test]
    fn format_account_builds_wire_payload() {
        let dir = tempdir().unwrap();
        let registry = AccountRegistry::load(dir.path().join("accounts.json")).unwrap();
        registry
            .set("600xxx".to_string(), vec!["acc1".to_string(), "acc2".to_string()])
            .unwrap();
        assert_eq!(format_account("600xxx", &registry), "<600xxx#acc1,acc2>");
    }

    #[test]
    fn format_account_unregistered_symbol_is_empty() {
        let dir = tempdir().unwrap();
        let registry = AccountRegistry::load(dir.path().join("accounts.json")).unwrap();
        assert_eq!(format_account("999999", &registry), "");
    }

    #[test]
    fn persisted_file_uses_four_space_indentation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let registry = AccountRegistry::load(&path).unwrap();
        registry
            .set("600519".to_string(), vec!["acc1".to_string()])
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let first_indented_line = contents
            .lines()
            .find(|line| line.starts_with(' '))
            .expect("pretty-printed JSON has at least one indented line");
        assert!(first_indented_line.starts_with("    "));
        assert!(!first_indented_line.starts_with("      "));
    }
}
