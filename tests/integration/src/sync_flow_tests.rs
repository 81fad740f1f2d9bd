//! Sync flow tests
//!
//! End-to-end scenarios across configuration, mapping sources, the engine
//! and the poller, all over the filesystem-backed stores.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use vaultsync_core::{
    ConflictLog, MappingOutcome, Poller, Resolution, StopHandle, SyncConfig, SyncDirection,
    SyncEngine, SyncStateStore, find_mapping,
};
use vaultsync_test_utils::{ManualSleeper, TestWorkspace};

const BASE: u64 = 1_700_000_000;
/// Far enough ahead of any real write that the edit is never within tolerance.
const LATER: u64 = BASE + 4_000_000_000;

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Write `sync.toml` with a CSV mapping table next to it.
fn write_table_config(ws: &TestWorkspace, rows: &[(&str, &str)]) -> PathBuf {
    write_table(&ws.root().join("mappings.csv"), rows);
    let config = format!(
        "sync_interval = 60\nstate_file = '{}'\nconflict_log = '{}'\n\n[documents]\nroot = '{}'\n\n[vault]\nroot = '{}'\n\n[mappings]\nsource = \"table\"\npath = '{}'\n",
        ws.state_file().display(),
        ws.conflict_log().display(),
        ws.docs_root().display(),
        ws.vault_root().display(),
        ws.root().join("mappings.csv").display(),
    );
    let path = ws.root().join("sync.toml");
    fs::write(&path, config).unwrap();
    path
}

fn write_table(path: &Path, rows: &[(&str, &str)]) {
    let mut table = String::from("doc_id,vault_path\n");
    for (doc_id, vault_path) in rows {
        table.push_str(&format!("{doc_id},{vault_path}\n"));
    }
    fs::write(path, table).unwrap();
}

fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn load(config: &Path) -> SyncConfig {
    SyncConfig::load_with(Some(config), |_| None).unwrap()
}

fn outcomes(engine: &mut SyncEngine, config: &SyncConfig) -> Vec<(String, MappingOutcome)> {
    let mappings = config.mapping_source().load().unwrap();
    engine
        .run_cycle(&mappings)
        .unwrap()
        .entries
        .into_iter()
        .map(|e| (e.target_path, e.outcome))
        .collect()
}

// =============================================================================
// Polling
// =============================================================================

mod polling {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edits_between_cycles_flow_both_ways() {
        let ws = TestWorkspace::new();
        ws.write_doc("D1", "<p>one</p>");
        ws.write_doc("D2", "<h1>Two</h1>");
        ws.set_doc_mtime("D1", BASE);
        ws.set_doc_mtime("D2", BASE);
        let config_path = write_table_config(&ws, &[("D1", "notes/one.md"), ("D2", "notes/two.md")]);
        let config = load(&config_path);

        // Between the first and second cycle: edit one side and add a row.
        let table = ws.root().join("mappings.csv");
        let one = ws.vault_path("notes/one.md");
        let three_doc = ws.doc_path("D3");
        let sleeper = ManualSleeper::new().on_sleep(move |n| {
            if n == 1 {
                fs::write(&one, "one, edited in the vault").unwrap();
                set_mtime(&one, LATER);
                fs::write(&three_doc, "<p>three</p>").unwrap();
                write_table(
                    &table,
                    &[("D1", "notes/one.md"), ("D2", "notes/two.md"), ("D3", "three.md")],
                );
            }
        });

        let mut engine = SyncEngine::from_config(&config);
        let source = config.mapping_source();
        let summary = Poller::new(config.interval())
            .with_sleeper(sleeper.clone())
            .with_max_cycles(3)
            .run(&mut engine, source.as_ref(), &StopHandle::new())
            .unwrap();

        assert_eq!(summary.cycles, 3);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(60); 2]);
        assert_eq!(ws.read_vault("notes/two.md").unwrap(), "# Two");
        assert_eq!(ws.read_vault("three.md").unwrap(), "three");
        assert!(ws.read_doc("D1").contains("<p>one, edited in the vault</p>"));

        // The last cycle sees nothing but its own writes.
        let last = summary.last_report.unwrap();
        assert!(last.is_clean());
        assert!(
            last.entries
                .iter()
                .all(|e| e.outcome == MappingOutcome::Unchanged),
            "{:?}",
            last.entries
        );

        let state = SyncStateStore::load(ws.state_file());
        assert_eq!(state.len(), 3);
        assert_eq!(
            state.get("notes/one.md").unwrap().last_sync_direction,
            SyncDirection::FileToDoc
        );
    }

    #[test]
    fn restarted_engine_resumes_from_persisted_state() {
        let ws = TestWorkspace::new();
        ws.write_doc("D1", "<p>alpha</p>");
        ws.write_doc("D2", "<p>beta</p>");
        ws.set_doc_mtime("D1", BASE);
        ws.set_doc_mtime("D2", BASE);
        let config = load(&write_table_config(&ws, &[("D1", "a.md"), ("D2", "b.md")]));

        let first = outcomes(&mut SyncEngine::from_config(&config), &config);
        assert!(
            first
                .iter()
                .all(|(_, o)| *o == MappingOutcome::Synced(SyncDirection::DocToFile))
        );

        ws.write_doc("D2", "<p>beta, revised</p>");
        ws.set_doc_mtime("D2", LATER);

        let second = outcomes(&mut SyncEngine::from_config(&config), &config);
        assert_eq!(
            second,
            vec![
                ("a.md".to_string(), MappingOutcome::Unchanged),
                (
                    "b.md".to_string(),
                    MappingOutcome::Synced(SyncDirection::DocToFile)
                ),
            ]
        );
        assert_eq!(ws.read_vault("b.md").unwrap(), "beta, revised");
    }
}

// =============================================================================
// Conflicts
// =============================================================================

mod conflicts {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn conflict_stands_until_one_side_is_resolved() {
        let ws = TestWorkspace::new();
        ws.write_doc("D1", "<p>v1</p>");
        ws.write_doc("D2", "<p>bystander</p>");
        ws.set_doc_mtime("D1", BASE);
        ws.set_doc_mtime("D2", BASE);
        let config = load(&write_table_config(&ws, &[("D1", "a.md"), ("D2", "b.md")]));
        let mut engine = SyncEngine::from_config(&config);
        outcomes(&mut engine, &config);

        ws.write_doc("D1", "<p>doc v2</p>");
        ws.set_doc_mtime("D1", LATER);
        ws.write_vault("a.md", "file v2");
        ws.set_vault_mtime("a.md", LATER + 120);

        for _ in 0..2 {
            let cycle = outcomes(&mut engine, &config);
            assert_eq!(cycle[0], ("a.md".to_string(), MappingOutcome::Conflict));
            assert_eq!(cycle[1], ("b.md".to_string(), MappingOutcome::Unchanged));
        }
        assert_eq!(ws.read_vault("a.md").unwrap(), "file v2");
        assert_eq!(ws.read_doc("D1"), "<p>doc v2</p>");

        let log = ConflictLog::open(ws.conflict_log());
        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].doc_snapshot_hint.split(' ').next(), Some("\"doc"));
        assert_eq!(log.pending_count(&SyncStateStore::load(ws.state_file())), 1);

        // Discarding the vault copy lets the document win.
        fs::remove_file(ws.vault_path("a.md")).unwrap();
        let cycle = outcomes(&mut engine, &config);
        assert_eq!(
            cycle[0],
            (
                "a.md".to_string(),
                MappingOutcome::Synced(SyncDirection::DocToFile)
            )
        );
        assert_eq!(ws.read_vault("a.md").unwrap(), "doc v2");

        let cycle = outcomes(&mut engine, &config);
        assert_eq!(cycle[0], ("a.md".to_string(), MappingOutcome::Unchanged));
        assert_eq!(log.pending_count(engine.state()), 0);
    }

    #[test]
    fn keeping_the_file_pushes_it_on_the_next_cycle() {
        let ws = TestWorkspace::new();
        ws.write_doc("D1", "<p>v1</p>");
        ws.set_doc_mtime("D1", BASE);
        let config = load(&write_table_config(&ws, &[("D1", "a.md")]));
        let mut engine = SyncEngine::from_config(&config);
        outcomes(&mut engine, &config);

        ws.write_doc("D1", "<p>doc v2</p>");
        ws.set_doc_mtime("D1", LATER);
        ws.write_vault("a.md", "file v2");
        ws.set_vault_mtime("a.md", LATER + 120);
        assert_eq!(
            outcomes(&mut engine, &config),
            vec![("a.md".to_string(), MappingOutcome::Conflict)]
        );

        let mappings = config.mapping_source().load().unwrap();
        let mapping = find_mapping(&mappings, "a.md").unwrap();
        assert_eq!(
            engine.resolve(mapping, Resolution::KeepFile).unwrap(),
            SyncDirection::FileToDoc
        );

        assert_eq!(
            outcomes(&mut engine, &config),
            vec![(
                "a.md".to_string(),
                MappingOutcome::Synced(SyncDirection::FileToDoc)
            )]
        );
        assert!(ws.read_doc("D1").contains("<p>file v2</p>"));
        assert_eq!(ws.read_vault("a.md").unwrap(), "file v2");

        assert_eq!(
            outcomes(&mut engine, &config),
            vec![("a.md".to_string(), MappingOutcome::Unchanged)]
        );
        let log = ConflictLog::open(ws.conflict_log());
        assert_eq!(log.entries().unwrap().len(), 1);
        assert_eq!(log.pending_count(engine.state()), 0);
    }
}
