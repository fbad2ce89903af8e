//! Project tables, duplicates and rehash.

use std::collections::BTreeSet;
use std::sync::Arc;

use rstest::rstest;

use ned::FileId;
use ned::hir::{DefIndex, ProjectTable};
use ned::parser::parse;
use ned::project::ProjectConfig;
use ned::resources::{MemoryFs, NedResources};

use crate::helpers::engine_helpers::{demo, engine_with_projects, loaded_engine, path, qnames};

const SOURCES: &[(&str, &str)] = &[
    ("a/A.ned", "package a; simple Alpha; channel Wire; moduleinterface IAlpha;"),
    ("a/B.ned", "package a; module Box { types: simple Inner; } network World;"),
    ("b/Dup1.ned", "package b; simple Twin;"),
    ("b/Dup2.ned", "package b; simple Twin; channelinterface IWire;"),
];

/// Canonical names computed directly from the parsed sources.
fn expected_components(sources: &[(&str, &str)]) -> BTreeSet<String> {
    let mut index = DefIndex::new();
    let mut table = ProjectTable::seeded(index.builtins());
    for (i, (_, text)) in sources.iter().enumerate() {
        let tree = parse(text).file;
        for def in index.set_file(FileId::new(i as u32), &tree, Some(demo())) {
            table.register(def.clone());
        }
    }
    table.component_names().map(|q| q.to_string()).collect()
}

#[test]
fn test_components_match_sources() {
    let (engine, _fs) = loaded_engine(SOURCES);
    let actual: BTreeSet<String> = qnames(&engine).into_iter().collect();
    assert_eq!(actual, expected_components(SOURCES));
    assert!(actual.contains("a.Alpha"));
    assert!(actual.contains("ned.IdealChannel"));
    assert!(!actual.contains("b.Twin"));
}

#[test]
fn test_duplicates_are_excluded_and_reserved() {
    let (engine, _fs) = loaded_engine(SOURCES);
    let project = demo();

    let duplicates = engine.duplicates(&project);
    let twins = &duplicates["b.Twin"];
    assert_eq!(twins.len(), 2);
    assert!(engine.get_type("b.Twin", &project).is_none());

    let reserved = engine.reserved_qnames(&project);
    assert!(reserved.contains("b.Twin"));
    assert!(reserved.contains("a.Alpha"));
    assert!(reserved.contains("a.Box.Inner"));

    assert_eq!(engine.reserved_names(&project, "b"), vec!["IWire", "Twin"]);
}

#[test]
fn test_removing_one_duplicate_restores_the_other() {
    let (engine, _fs) = loaded_engine(SOURCES);
    assert!(engine.forget(path("b/Dup1.ned")));
    let twin = engine.get_type("b.Twin", &demo()).unwrap();
    assert_eq!(twin.file(), engine.file_id(path("b/Dup2.ned")).unwrap());
    assert!(engine.duplicates(&demo()).is_empty());
}

#[test]
fn test_kind_filters() {
    let (engine, _fs) = loaded_engine(SOURCES);
    let project = demo();

    let modules = engine.module_qnames(&project);
    assert!(modules.contains("a.Alpha"));
    assert!(modules.contains("a.Box"));
    assert!(!modules.contains("a.World"));
    assert!(engine.network_qnames(&project).contains("a.World"));
    assert!(engine.channel_qnames(&project).contains("a.Wire"));
    assert!(engine.channel_qnames(&project).contains("ned.DatarateChannel"));
    assert!(engine.module_interface_qnames(&project).contains("a.IAlpha"));
    assert!(engine.channel_interface_qnames(&project).contains("b.IWire"));
}

#[test]
fn test_bulk_load_rehashes_once() {
    let (engine, _fs) = loaded_engine(SOURCES);
    assert_eq!(engine.rehash_count(), 1);

    // Queries on an unchanged model do not rehash
    engine.types(&demo());
    engine.get_type("a.Alpha", &demo());
    assert_eq!(engine.rehash_count(), 1);

    // Several invalidations collapse into one rehash
    engine.invalidate();
    engine.invalidate();
    engine.types(&demo());
    assert_eq!(engine.rehash_count(), 2);
}

#[test]
fn test_all_types_include_duplicates() {
    let (engine, _fs) = loaded_engine(SOURCES);
    let twins = engine
        .all_types()
        .iter()
        .filter(|d| d.qualified_name == "b.Twin")
        .count();
    assert_eq!(twins, 2);
    assert!(engine.all_types().iter().all(|d| !d.is_builtin()));

    let all = engine.all_type_qnames();
    assert!(all.contains("b.Twin"));
    assert!(all.contains("a.Alpha"));
    assert!(!all.contains("a.Box.Inner"));
    assert!(!all.contains("ned.IdealChannel"));
}

#[test]
fn test_referenced_projects_are_visible() {
    let fs = Arc::new(MemoryFs::new());
    fs.write("/ws/lib/Lib.ned", "package lib; simple Worker;");
    fs.write("/ws/app/App.ned", "package app; import lib.Worker; module App { submodules: w: Worker; }");
    fs.write("/ws/other/Other.ned", "simple Other;");
    let engine = engine_with_projects(
        fs,
        vec![
            ProjectConfig::new("lib", "/ws/lib"),
            ProjectConfig::new("app", "/ws/app").with_references(["lib"]),
            ProjectConfig::new("other", "/ws/other"),
        ],
    );
    assert_eq!(engine.read_missing_files().unwrap(), 3);

    assert!(engine.get_type("lib.Worker", &"app".into()).is_some());
    assert!(engine.get_type("app.App", &"lib".into()).is_none());
    assert!(engine.get_type("lib.Worker", &"other".into()).is_none());

    let ctx = engine.file_context("/ws/app/App.ned").unwrap();
    assert_eq!(engine.lookup("Worker", ctx).unwrap().qualified_name, "lib.Worker");
    assert_eq!(engine.project_for("/ws/app/App.ned"), Some("app".into()));
    assert_eq!(
        engine.project_files(&"lib".into()),
        vec![std::path::PathBuf::from("/ws/lib/Lib.ned")]
    );
}

const START: &[(&str, &str)] = &[
    ("a/A.ned", "package a; simple Alpha;"),
    ("b/Dup1.ned", "package b; simple Twin;"),
    ("b/Dup2.ned", "package b; simple Solo;"),
    ("x/Gone.ned", "package x; simple Gone;"),
];

const FINAL: &[(&str, &str)] = &[
    ("a/A.ned", "package a; simple Alpha; channel Wire;"),
    ("b/Dup1.ned", "package b; simple Twin;"),
    ("b/Dup2.ned", "package b; simple Twin; simple Solo;"),
    ("c/C.ned", "package c; network Net;"),
];

fn final_text(name: &str) -> &'static str {
    FINAL
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, text)| *text)
        .unwrap()
}

fn add_c(engine: &NedResources, fs: &MemoryFs) {
    fs.write(path("c/C.ned"), final_text("c/C.ned"));
    engine.read_file(path("c/C.ned")).unwrap();
}

fn edit_in_place(engine: &NedResources, fs: &MemoryFs) {
    engine.set_text(path("a/A.ned"), final_text("a/A.ned")).unwrap();
    engine.set_text(path("b/Dup2.ned"), final_text("b/Dup2.ned")).unwrap();
    assert!(engine.forget(path("x/Gone.ned")));
    add_c(engine, fs);
}

fn broken_then_fixed(engine: &NedResources, fs: &MemoryFs) {
    engine.connect(path("a/A.ned")).unwrap();
    engine.set_text(path("a/A.ned"), "package a; simple Alpha {").unwrap();
    // The duplicate appears, goes away, and comes back
    engine.set_text(path("b/Dup2.ned"), "package b; simple Twin;").unwrap();
    engine.set_text(path("b/Dup2.ned"), "package b; simple Solo;").unwrap();
    engine.set_text(path("b/Dup2.ned"), final_text("b/Dup2.ned")).unwrap();
    add_c(engine, fs);
    assert!(engine.forget(path("x/Gone.ned")));
    engine.set_text(path("a/A.ned"), final_text("a/A.ned")).unwrap();
}

fn through_disk_and_disconnect(engine: &NedResources, fs: &MemoryFs) {
    engine.connect(path("b/Dup2.ned")).unwrap();
    engine.set_text(path("b/Dup2.ned"), "package b; simple Twin; simple Extra {").unwrap();
    fs.write(path("b/Dup2.ned"), final_text("b/Dup2.ned"));
    engine.disconnect(path("b/Dup2.ned")).unwrap();

    fs.write(path("a/A.ned"), final_text("a/A.ned"));
    engine.read_file(path("a/A.ned")).unwrap();
    assert!(engine.forget(path("b/Dup1.ned")));
    engine.read_file(path("b/Dup1.ned")).unwrap();
    add_c(engine, fs);
    assert!(engine.forget(path("x/Gone.ned")));
}

fn removal_first(engine: &NedResources, fs: &MemoryFs) {
    assert!(engine.forget(path("x/Gone.ned")));
    add_c(engine, fs);
    engine.connect(path("a/A.ned")).unwrap();
    engine.set_text(path("a/A.ned"), "package a; simple Renamed;").unwrap();
    engine.set_text(path("b/Dup2.ned"), final_text("b/Dup2.ned")).unwrap();
    fs.write(path("a/A.ned"), final_text("a/A.ned"));
    engine.disconnect(path("a/A.ned")).unwrap();
}

#[rstest]
#[case::edit_in_place(edit_in_place)]
#[case::broken_then_fixed(broken_then_fixed)]
#[case::through_disk_and_disconnect(through_disk_and_disconnect)]
#[case::removal_first(removal_first)]
fn test_tables_depend_only_on_final_files(#[case] steps: fn(&NedResources, &MemoryFs)) {
    let (engine, fs) = loaded_engine(START);
    steps(&engine, &fs);
    engine.rehash_if_needed();

    let actual: BTreeSet<String> = qnames(&engine).into_iter().collect();
    assert_eq!(actual, expected_components(FINAL));

    let (fresh, _) = loaded_engine(FINAL);
    let duplicates: Vec<_> = engine.duplicates(&demo()).keys().cloned().collect();
    let fresh_duplicates: Vec<_> = fresh.duplicates(&demo()).keys().cloned().collect();
    assert_eq!(duplicates, vec!["b.Twin"]);
    assert_eq!(duplicates, fresh_duplicates);
    assert_eq!(engine.duplicates(&demo())["b.Twin"].len(), 2);
    assert_eq!(engine.reserved_qnames(&demo()), fresh.reserved_qnames(&demo()));
    assert!(!engine.is_broken(path("a/A.ned")));
}
