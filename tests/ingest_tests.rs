//! Ingestion pipeline tests.
//!
//! These drive the ingestor against an in-memory store and a recording
//! registry, covering file-level isolation, id conflicts and incremental
//! updates.

use oracle_tables::builtin::builtin_tables;
use oracle_tables::store::MemoryStore;
use oracle_tables::validate::{DuplicateScope, ErrorKind};
use oracle_tables::{Registry, TableDefinition, TableIngestor, TableRegistry};
use std::collections::BTreeMap;
use std::path::Path;

#[cfg(test)]
mod tests {
    use super::*;

    /// Registry fake that records every mutation.
    #[derive(Default)]
    struct RecordingRegistry {
        tables: BTreeMap<String, TableDefinition>,
        calls: Vec<String>,
    }

    impl TableRegistry for RecordingRegistry {
        fn add_table(&mut self, table: TableDefinition) {
            self.calls.push(format!("add:{}", table.id));
            self.tables.insert(table.id.clone(), table);
        }

        fn remove_table(&mut self, id: &str) -> bool {
            self.calls.push(format!("remove:{}", id));
            self.tables.remove(id).is_some()
        }

        fn clear_all_custom(&mut self) {
            self.calls.push("clear".to_string());
            self.tables.clear();
        }
    }

    impl RecordingRegistry {
        fn ids(&self) -> Vec<&str> {
            self.tables.keys().map(String::as_str).collect()
        }
    }

    fn table_json(id: &str) -> String {
        format!(
            r#"{{"id":"{}","name":"T","category":"C","type":"Standard","diceType":"d6",
               "entries":[{{"range":[1,3],"result":"lo"}},{{"range":[4,6],"result":"hi"}}]}}"#,
            id
        )
    }

    fn ingestor(store: &MemoryStore) -> TableIngestor<&MemoryStore, RecordingRegistry> {
        let builtin_ids = builtin_tables().into_iter().map(|t| t.id);
        TableIngestor::new("tables", store, RecordingRegistry::default(), builtin_ids)
    }

    fn ids(tables: &[TableDefinition]) -> Vec<&str> {
        tables.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_scenario_a_single_table_file() {
        let store = MemoryStore::new();
        store.write("tables/a.json", table_json("t1"));
        let mut ingestor = ingestor(&store);

        let accepted = ingestor.reload_all();

        assert_eq!(ids(&accepted), vec!["t1"]);
        assert!(ingestor.all_errors().is_empty());
        assert_eq!(ingestor.registry().ids(), vec!["t1"]);
        let loaded = ingestor.loaded_file(Path::new("tables/a.json")).unwrap();
        assert_eq!(
            loaded.tables[0].provenance.as_ref().unwrap().loaded_at,
            loaded.loaded_at
        );
    }

    #[test]
    fn test_scenario_d_array_with_missing_name() {
        let store = MemoryStore::new();
        store.write(
            "tables/pair.json",
            format!(
                r#"[{}, {{"id":"t2","category":"C","type":"Tool","diceType":"d6",
                     "entries":[{{"range":[1,6],"result":"x"}}]}}]"#,
                table_json("t1")
            ),
        );
        let mut ingestor = ingestor(&store);

        let accepted = ingestor.reload_all();

        assert_eq!(ids(&accepted), vec!["t1"]);
        let errors = ingestor.all_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::MissingField);
        assert_eq!(errors[0].field.as_deref(), Some("name"));
        assert_eq!(errors[0].table_id.as_deref(), Some("t2"));
        assert_eq!(errors[0].element, Some(1));
    }

    #[test]
    fn test_partial_failure_isolation() {
        let store = MemoryStore::new();
        let broken = table_json("broken").replace("[4,6]", "[5,6]");
        store.write(
            "tables/mixed.json",
            format!("[{}, {}, {}]", table_json("a"), broken, table_json("c")),
        );
        let mut ingestor = ingestor(&store);

        let accepted = ingestor.reload_all();

        assert_eq!(ids(&accepted), vec!["a", "c"]);
        let errors = ingestor.all_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors
            .iter()
            .all(|e| e.table_id.as_deref() == Some("broken") && e.element == Some(1)));
        assert_eq!(errors[0].kind, ErrorKind::RangeCoverage);
    }

    #[test]
    fn test_builtin_collision_always_rejected() {
        let store = MemoryStore::new();
        store.write("tables/a.json", table_json("mythic-event-focus"));
        store.write("tables/b.json", table_json("mine"));
        let mut ingestor = ingestor(&store);

        let accepted = ingestor.reload_all();

        assert_eq!(ids(&accepted), vec!["mine"]);
        let errors = ingestor.all_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::DuplicateId(DuplicateScope::Builtin));
        assert_eq!(errors[0].table_id.as_deref(), Some("mythic-event-focus"));

        // Still rejected when arriving through a watcher event.
        store.write("tables/c.json", table_json("mythic-scene-adjustment"));
        ingestor.handle_create(Path::new("tables/c.json"));
        assert!(!ingestor.registry().ids().contains(&"mythic-scene-adjustment"));
    }

    #[test]
    fn test_cross_file_conflict_first_file_wins() {
        let store = MemoryStore::new();
        store.write("tables/b.json", table_json("shared"));
        store.write("tables/a.json", table_json("shared"));
        let mut ingestor = ingestor(&store);

        for _ in 0..2 {
            let accepted = ingestor.reload_all();
            assert_eq!(accepted.len(), 1);
            assert_eq!(
                accepted[0].provenance.as_ref().unwrap().source,
                Path::new("tables/a.json")
            );

            let errors = ingestor.all_errors();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].file, Path::new("tables/b.json"));
            assert_eq!(
                errors[0].kind,
                ErrorKind::DuplicateId(DuplicateScope::CrossFile)
            );
            assert!(errors[0].message.contains("tables/a.json"));
        }
    }

    #[test]
    fn test_conflict_loser_waits_for_its_own_change_after_owner_delete() {
        let store = MemoryStore::new();
        store.write("tables/a.json", table_json("shared"));
        store.write("tables/b.json", table_json("shared"));
        let mut ingestor = ingestor(&store);
        ingestor.reload_all();

        store.remove(Path::new("tables/a.json"));
        ingestor.handle_delete(Path::new("tables/a.json"));

        assert!(ingestor.registry().ids().is_empty());
        assert_eq!(ingestor.all_errors().len(), 1);
        assert_eq!(ingestor.all_errors()[0].file, Path::new("tables/b.json"));

        ingestor.handle_modify(Path::new("tables/b.json"));
        assert_eq!(ingestor.registry().ids(), vec!["shared"]);
        assert!(ingestor.all_errors().is_empty());
    }

    #[test]
    fn test_duplicate_within_file() {
        let store = MemoryStore::new();
        store.write(
            "tables/dupes.json",
            format!("[{}, {}]", table_json("same"), table_json("same")),
        );
        let mut ingestor = ingestor(&store);

        let accepted = ingestor.reload_all();

        assert_eq!(ids(&accepted), vec!["same"]);
        let errors = ingestor.all_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::DuplicateId(DuplicateScope::InFile));
        assert_eq!(errors[0].element, Some(1));
    }

    #[test]
    fn test_reload_all_is_idempotent() {
        let store = MemoryStore::new();
        store.write("tables/a.json", table_json("a"));
        store.write("tables/bad.json", "{ not json");
        store.write("tables/nested/deeper/c.json", table_json("c"));
        let mut ingestor = ingestor(&store);

        let first_ids: Vec<String> = ingestor.reload_all().into_iter().map(|t| t.id).collect();
        let first_errors = ingestor.all_errors();
        let second_ids: Vec<String> = ingestor.reload_all().into_iter().map(|t| t.id).collect();
        let second_errors = ingestor.all_errors();

        assert_eq!(first_ids, vec!["a", "c"]);
        assert_eq!(first_ids, second_ids);
        assert_eq!(first_errors, second_errors);
        assert_eq!(ingestor.registry().ids(), vec!["a", "c"]);
    }

    #[test]
    fn test_modify_retracts_before_adding() {
        let store = MemoryStore::new();
        store.write("tables/a.json", table_json("x"));
        let mut ingestor = ingestor(&store);
        ingestor.reload_all();

        store.write("tables/a.json", table_json("y"));
        ingestor.handle_modify(Path::new("tables/a.json"));

        assert_eq!(ingestor.registry().ids(), vec!["y"]);
        let calls = &ingestor.registry().calls;
        assert_eq!(&calls[calls.len() - 2..], &["remove:x", "add:y"]);
        assert_eq!(ids(&ingestor.custom_tables()), vec!["y"]);
    }

    #[test]
    fn test_modify_to_broken_file_leaves_no_stale_tables() {
        let store = MemoryStore::new();
        store.write("tables/a.json", table_json("x"));
        let mut ingestor = ingestor(&store);
        ingestor.reload_all();

        store.write("tables/a.json", "[");
        ingestor.handle_modify(Path::new("tables/a.json"));

        assert!(ingestor.registry().ids().is_empty());
        let errors = ingestor.all_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Parse);
        assert!(errors[0].message.starts_with("syntax error: "));

        // Fixing the file clears its ledger entry.
        store.write("tables/a.json", table_json("x"));
        ingestor.handle_modify(Path::new("tables/a.json"));
        assert!(ingestor.all_errors().is_empty());
        assert_eq!(ingestor.registry().ids(), vec!["x"]);
    }

    #[test]
    fn test_delete_retracts_and_forgets() {
        let store = MemoryStore::new();
        store.write("tables/a.json", format!("[{}, {{}}]", table_json("x")));
        let mut ingestor = ingestor(&store);
        ingestor.reload_all();
        assert!(!ingestor.all_errors().is_empty());

        store.remove(Path::new("tables/a.json"));
        ingestor.handle_delete(Path::new("tables/a.json"));

        assert!(ingestor.registry().ids().is_empty());
        assert!(ingestor.all_errors().is_empty());
        assert!(ingestor.loaded_file(Path::new("tables/a.json")).is_none());
        assert_eq!(ingestor.tracked_files().count(), 0);
    }

    #[test]
    fn test_create_on_tracked_file_replaces_its_tables() {
        let store = MemoryStore::new();
        store.write("tables/a.json", table_json("x"));
        let mut ingestor = ingestor(&store);
        ingestor.reload_all();

        ingestor.handle_create(Path::new("tables/a.json"));

        assert_eq!(ingestor.registry().ids(), vec!["x"]);
        assert!(ingestor.all_errors().is_empty());
    }

    #[test]
    fn test_read_failure_is_recorded() {
        let store = MemoryStore::new();
        store.write("tables/a.json", table_json("a"));
        store.write("tables/locked.json", table_json("b"));
        store.make_unreadable("tables/locked.json");
        let mut ingestor = ingestor(&store);

        let accepted = ingestor.reload_all();

        assert_eq!(ids(&accepted), vec!["a"]);
        let errors = ingestor.all_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Io);
        assert!(errors[0].message.starts_with("read failed: "));
        assert!(ingestor
            .loaded_file(Path::new("tables/locked.json"))
            .is_some_and(|file| file.tables.is_empty()));
    }

    #[test]
    fn test_non_json_files_are_ignored() {
        let store = MemoryStore::new();
        store.write("tables/readme.md", "# tables");
        store.write("tables/a.json", table_json("a"));
        store.write("elsewhere/b.json", table_json("b"));
        let mut ingestor = ingestor(&store);

        assert_eq!(ids(&ingestor.reload_all()), vec!["a"]);
        assert_eq!(ingestor.tracked_files().count(), 1);
    }

    #[test]
    fn test_missing_root_is_created() {
        let store = MemoryStore::new();
        let mut ingestor = ingestor(&store);

        assert!(ingestor.reload_all().is_empty());
        assert!(ingestor.take_notices().is_empty());
        assert!(ingestor.all_errors().is_empty());
        assert!(oracle_tables::store::FileStore::exists(&store, Path::new("tables")));
    }

    #[test]
    fn test_unusable_root_raises_notice() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let mut ingestor = ingestor(&store);

        assert!(ingestor.reload_all().is_empty());

        let notices = ingestor.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("tables"));
        assert!(ingestor.take_notices().is_empty());

        let errors = ingestor.all_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::FolderCreate);

        // Recovers once the folder can be created.
        store.set_read_only(false);
        store.write("tables/a.json", table_json("a"));
        assert_eq!(ids(&ingestor.reload_all()), vec!["a"]);
        assert!(ingestor.all_errors().is_empty());
    }

    #[test]
    fn test_with_real_registry() {
        let store = MemoryStore::new();
        store.write("tables/a.json", table_json("mine"));
        let registry = Registry::new(builtin_tables());
        let builtin_ids = registry.builtin_ids();
        let mut ingestor = TableIngestor::new("tables", &store, registry, builtin_ids);

        ingestor.reload_all();

        let registry = ingestor.registry();
        assert!(registry.get("mine").is_some_and(|t| t.is_custom()));
        assert!(registry.get("mythic-event-focus").is_some_and(|t| !t.is_custom()));
        assert_eq!(registry.len(), builtin_tables().len() + 1);
    }
}
