//! Loading projects from a real directory tree.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use ned::ProjectId;
use ned::project::{NedFoldersProvider, ProjectDescription};
use ned::resources::{NedResources, RealFs, ResourcesConfig};

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn engine_for(projects: Vec<ProjectDescription>) -> NedResources {
    NedResources::new(
        Arc::new(RealFs),
        Arc::new(NedFoldersProvider::new(projects)),
        ResourcesConfig::manual(),
    )
    .unwrap()
}

#[test]
fn test_load_projects_from_disk() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("lib");
    let app = dir.path().join("app");

    write(&lib, ".nedfolders", "# sources\nsrc\n");
    write(&lib, "src/package.ned", "package lib;");
    write(&lib, "src/queues/Queue.ned", "package lib.queues; simple Queue { gates: input in; }");
    write(&lib, "docs/Ignored.ned", "simple Ignored;");
    write(&app, "App.ned", "import lib.queues.Queue; network App { submodules: q: Queue; }");

    let engine = engine_for(vec![
        ProjectDescription::new("lib", &lib),
        ProjectDescription::new("app", &app).with_references(["lib"]),
    ]);
    assert_eq!(engine.read_missing_files().unwrap(), 3);

    let lib_id = ProjectId::new("lib");
    let app_id = ProjectId::new("app");
    assert!(engine.get_type("lib.queues.Queue", &lib_id).is_some());
    assert!(engine.get_type("Ignored", &lib_id).is_none());
    assert!(engine.get_type("App", &app_id).is_some());
    assert_eq!(
        engine.expected_package_for(lib.join("src/queues/Queue.ned")).as_deref(),
        Some("lib.queues")
    );

    engine.validate_all_files();
    assert!(engine.all_diagnostics().is_empty(), "{:?}", engine.all_diagnostics());
}

#[test]
fn test_invalid_nedfolders_skips_project() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good");
    let bad = dir.path().join("bad");
    write(&good, "A.ned", "simple A;");
    write(&bad, ".nedfolders", "../outside\n");
    write(&bad, "B.ned", "simple B;");

    let engine = engine_for(vec![
        ProjectDescription::new("good", &good),
        ProjectDescription::new("bad", &bad),
    ]);
    assert_eq!(engine.projects(), vec![ProjectId::new("good")]);
    assert_eq!(engine.read_missing_files().unwrap(), 1);
    assert!(engine.project_for(bad.join("B.ned")).is_none());
}

#[test]
fn test_edits_survive_disk_changes_until_disconnect() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("demo");
    write(&root, "A.ned", "simple A;");
    let engine = engine_for(vec![ProjectDescription::new("demo", &root)]);
    engine.read_missing_files().unwrap();

    let file = root.join("A.ned");
    engine.connect(&file).unwrap();
    engine.set_text(&file, "simple Edited;").unwrap();
    fs::write(&file, "simple Saved;").unwrap();

    engine.disconnect(&file).unwrap();
    assert!(engine.get_type("Saved", &ProjectId::new("demo")).is_some());
    assert!(engine.get_type("Edited", &ProjectId::new("demo")).is_none());
}
