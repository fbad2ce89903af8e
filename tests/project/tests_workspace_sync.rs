//! File-system deltas applied through `apply_workspace_changes`.

use std::path::PathBuf;
use std::sync::Arc;

use ned::NedError;
use ned::project::{NedFoldersProvider, ProjectDescription, WorkspaceChange};
use ned::resources::{MemoryFs, NedResources, ResourcesConfig};

use crate::helpers::engine_helpers::{ROOT, demo, loaded_engine, path};

#[test]
fn test_added_changed_removed() {
    let (engine, fs) = loaded_engine(&[("A.ned", "simple A;")]);

    fs.write(path("B.ned"), "simple B;");
    fs.write(path("A.ned"), "simple A2;");
    engine
        .apply_workspace_changes(&[
            WorkspaceChange::Added(path("B.ned")),
            WorkspaceChange::Changed(path("A.ned")),
        ])
        .unwrap();
    assert!(engine.get_type("B", &demo()).is_some());
    assert!(engine.get_type("A2", &demo()).is_some());
    assert!(engine.get_type("A", &demo()).is_none());

    engine
        .apply_workspace_changes(&[WorkspaceChange::Removed(path("B.ned"))])
        .unwrap();
    assert!(engine.file_id(path("B.ned")).is_none());
    assert!(engine.get_type("B", &demo()).is_none());
}

#[test]
fn test_connected_files_are_not_reread() {
    let (engine, fs) = loaded_engine(&[("A.ned", "simple A;")]);
    engine.connect(path("A.ned")).unwrap();
    engine.set_text(path("A.ned"), "simple Edited;").unwrap();

    fs.write(path("A.ned"), "simple OnDisk;");
    engine
        .apply_workspace_changes(&[WorkspaceChange::Changed(path("A.ned"))])
        .unwrap();
    assert_eq!(engine.file_text(path("A.ned")).as_deref(), Some("simple Edited;"));
}

#[test]
fn test_non_ned_changes_are_ignored() {
    let (engine, fs) = loaded_engine(&[("A.ned", "simple A;")]);
    fs.write(path("README.txt"), "docs");
    engine
        .apply_workspace_changes(&[WorkspaceChange::Added(path("README.txt"))])
        .unwrap();
    assert_eq!(engine.files(), vec![path("A.ned")]);
}

#[test]
fn test_failures_are_collected() {
    let (engine, fs) = loaded_engine(&[("A.ned", "simple A;")]);
    fs.write(path("C.ned"), "simple C;");
    let err = engine
        .apply_workspace_changes(&[
            WorkspaceChange::Added(path("Gone1.ned")),
            WorkspaceChange::Added(path("C.ned")),
            WorkspaceChange::Added(path("Gone2.ned")),
        ])
        .unwrap_err();
    match err {
        NedError::Batch(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected a batch error, got {other:?}"),
    }
    assert!(engine.get_type("C", &demo()).is_some());
}

#[test]
fn test_nedfolders_change_rebuilds_projects() {
    let fs = Arc::new(MemoryFs::new());
    fs.write(path("Top.ned"), "simple Top;");
    fs.write(path("src/Inner.ned"), "simple Inner;");
    let provider = NedFoldersProvider::new(vec![ProjectDescription::new("demo", ROOT)]);
    let engine =
        NedResources::new(fs.clone(), Arc::new(provider), ResourcesConfig::manual()).unwrap();
    assert_eq!(engine.read_missing_files().unwrap(), 2);
    assert_eq!(engine.source_folders(&demo()), vec![PathBuf::from(ROOT)]);

    fs.write(path(".nedfolders"), "src\n");
    engine
        .apply_workspace_changes(&[WorkspaceChange::Added(path(".nedfolders"))])
        .unwrap();

    assert_eq!(engine.source_folders(&demo()), vec![path("src")]);
    assert_eq!(engine.files(), vec![path("src/Inner.ned")]);
    assert!(engine.get_type("Inner", &demo()).is_some());
    assert!(engine.get_type("Top", &demo()).is_none());
    assert_eq!(engine.source_folder_for(path("src/Inner.ned")), Some(path("src")));
}

#[test]
fn test_projects_changed_loads_new_folders() {
    let fs = Arc::new(MemoryFs::new());
    fs.write(path(".nedfolders"), "src\n");
    fs.write(path("src/A.ned"), "simple A;");
    fs.write(path("more/B.ned"), "simple B;");
    let provider = NedFoldersProvider::new(vec![ProjectDescription::new("demo", ROOT)]);
    let engine =
        NedResources::new(fs.clone(), Arc::new(provider), ResourcesConfig::manual()).unwrap();
    assert_eq!(engine.read_missing_files().unwrap(), 1);

    fs.write(path(".nedfolders"), "src\nmore\n");
    engine
        .apply_workspace_changes(&[WorkspaceChange::ProjectsChanged])
        .unwrap();
    assert!(engine.get_type("B", &demo()).is_some());
    assert_eq!(engine.files().len(), 2);
}

#[test]
fn test_background_read() {
    let (engine, fs) = loaded_engine(&[("A.ned", "simple A;")]);
    fs.write(path("B.ned"), "simple B;");
    fs.write(path("C.ned"), "simple C;");

    let handle = engine.schedule_read_missing_files().unwrap();
    assert_eq!(handle.join().unwrap().unwrap(), 2);
    assert!(engine.get_type("C", &demo()).is_some());
}
