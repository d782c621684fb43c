//! In-memory collection of mod records indexed by identity

use std::collections::HashMap;

use crate::catalog::{Catalog, ModRecord};
use crate::installers::{InstallState, ModLayout};
use crate::logging::log_warning;

/// Owns every [`ModRecord`] of one game. Insertion order is display order.
#[derive(Debug, Default, Clone)]
pub struct ModRegistry {
    records: Vec<ModRecord>,
    index: HashMap<String, usize>,
}

impl ModRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loaded catalog. Later duplicates of an identity are
    /// dropped, as are records whose name or plugin file is not a plain file name.
    pub fn from_catalog(catalog: Catalog) -> Self {
        let mut registry = Self::default();
        for record in catalog {
            if let Some(field) = record.invalid_path_field() {
                log_warning(&format!(
                    "Catalog entry {:?} ignored: unusable {}",
                    record.name, field
                ));
                continue;
            }
            let name = record.name.clone();
            if !registry.add(record) {
                log_warning(&format!("Duplicate catalog entry '{}' ignored", name));
            }
        }
        registry
    }

    /// Append a record. Returns false (and leaves the registry unchanged)
    /// when the identity is already present.
    pub fn add(&mut self, record: ModRecord) -> bool {
        if self.index.contains_key(&record.name) {
            return false;
        }
        self.index.insert(record.name.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn find(&self, name: &str) -> Option<&ModRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn all(&self) -> &[ModRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_catalog(self) -> Catalog {
        self.records
    }

    /// Mutate one record in place. Identity is restored afterwards so the
    /// index can never go stale.
    pub(crate) fn update_with<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut ModRecord) -> R,
    ) -> Option<R> {
        let &i = self.index.get(name)?;
        let record = &mut self.records[i];
        let result = f(record);
        record.name = name.to_string();
        Some(result)
    }

    /// Number of installed mods that declare a dependency on `dll_name`.
    ///
    /// When this drops to zero after an uninstall, the shared file is no
    /// longer needed by anything.
    pub fn count_installed_requiring(&self, dll_name: &str, layout: &ModLayout) -> usize {
        self.records
            .iter()
            .filter(|r| r.requires_dll(dll_name))
            .filter(|r| InstallState::probe(layout, r).is_installed())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, TestGame};

    fn requiring(name: &str, dll: &str) -> ModRecord {
        let mut r = record(name);
        r.required_dlls = vec![dll.to_string()];
        r
    }

    #[test]
    fn test_add_and_find() {
        let mut registry = ModRegistry::new();
        assert!(registry.add(record("A")));
        assert!(registry.add(record("B")));
        assert!(!registry.add(record("A")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("B").map(|r| r.name.as_str()), Some("B"));
        assert!(registry.find("C").is_none());
    }

    #[test]
    fn test_from_catalog_keeps_order_and_drops_duplicates() {
        let mut dup = record("A");
        dup.description = "second".to_string();
        let registry = ModRegistry::from_catalog(vec![record("C"), record("A"), dup, record("B")]);

        let names: Vec<&str> = registry.all().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        assert_ne!(registry.find("A").unwrap().description, "second");
    }

    #[test]
    fn test_from_catalog_drops_unusable_paths() {
        let mut empty = record("Empty");
        empty.name = String::new();
        let mut nested = record("Nested");
        nested.name = "data/Nested".to_string();
        let mut escaping = record("Escaping");
        escaping.plugin_file = "..".to_string();

        let registry =
            ModRegistry::from_catalog(vec![empty, record("Kept"), nested, escaping]);

        let names: Vec<&str> = registry.all().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Kept"]);
    }

    #[test]
    fn test_update_with_cannot_change_identity() {
        let mut registry = ModRegistry::from_catalog(vec![record("A")]);
        registry.update_with("A", |r| {
            r.name = "Renamed".to_string();
            r.latest_version = Some("1.0".to_string());
        });

        let a = registry.find("A").unwrap();
        assert_eq!(a.name, "A");
        assert_eq!(a.latest_version.as_deref(), Some("1.0"));
        assert!(registry.update_with("Missing", |_| ()).is_none());
    }

    #[test]
    fn test_count_installed_requiring() {
        let game = TestGame::new();
        let registry = ModRegistry::from_catalog(vec![
            requiring("Installed", "Shared.dll"),
            requiring("Disabled", "Shared.dll"),
            requiring("CatalogOnly", "Shared.dll"),
            requiring("OtherDep", "Other.dll"),
            record("NoDeps"),
        ]);

        assert_eq!(registry.count_installed_requiring("Shared.dll", &game.layout), 0);

        game.place_enabled(registry.find("Installed").unwrap());
        game.place_disabled(registry.find("Disabled").unwrap());
        game.place_enabled(registry.find("OtherDep").unwrap());
        game.place_enabled(registry.find("NoDeps").unwrap());

        assert_eq!(registry.count_installed_requiring("Shared.dll", &game.layout), 2);
        assert_eq!(registry.count_installed_requiring("Other.dll", &game.layout), 1);
        assert_eq!(registry.count_installed_requiring("Missing.dll", &game.layout), 0);
    }
}
