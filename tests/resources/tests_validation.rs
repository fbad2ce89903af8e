//! Validation passes and published diagnostics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use ned::hir::codes;
use ned::parser::Severity;
use ned::project::{ProjectConfig, StaticProjects};
use ned::resources::{ChangeEvent, MemoryFs, NedResources, ResourcesConfig};

use crate::helpers::engine_helpers::{ROOT, engine_with_projects, loaded_engine, messages, path};
use crate::helpers::event_recorder::EventRecorder;
use crate::helpers::gate::Gate;

#[test]
fn test_clean_workspace_has_no_diagnostics() {
    let (engine, _fs) = loaded_engine(&[
        ("Node.ned", "simple Node { gates: input in; output out; }"),
        (
            "Net.ned",
            "network Net { submodules: a: Node; b: Node; connections: a.out --> b.in; }",
        ),
    ]);
    engine.validate_all_files();
    assert!(engine.all_diagnostics().is_empty(), "{:?}", engine.all_diagnostics());
}

#[test]
fn test_duplicates_reported_against_both_files() {
    let (engine, _fs) = loaded_engine(&[("a.ned", "simple Foo;"), ("b.ned", "simple Foo;")]);
    engine.validate_all_files();

    let a = engine.diagnostics(path("a.ned"));
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].code, codes::DUPLICATE_DEFINITION);
    assert_eq!(
        a[0].message.as_ref(),
        format!("simple module 'Foo' already defined in {}", path("b.ned").display())
    );
    assert_eq!(
        messages(&engine, "b.ned"),
        vec![format!("simple module 'Foo' already defined in {}", path("a.ned").display())]
    );
}

#[test]
fn test_duplicates_across_referenced_projects() {
    let fs = Arc::new(MemoryFs::new());
    fs.write("/ws/app/A.ned", "simple Foo;");
    fs.write("/ws/lib/B.ned", "simple Foo;");
    fs.write("/ws/tool/T.ned", "simple Tool;");
    let engine = engine_with_projects(
        fs,
        vec![
            ProjectConfig::new("lib", "/ws/lib"),
            ProjectConfig::new("app", "/ws/app").with_references(["lib"]),
            ProjectConfig::new("tool", "/ws/tool").with_references(["lib"]),
        ],
    );
    engine.read_missing_files().unwrap();
    // Only app sees the conflict; lib and tool each see one Foo.
    assert!(engine.get_type("Foo", &"lib".into()).is_some());
    assert!(engine.get_type("Foo", &"app".into()).is_none());
    engine.validate_all_files();

    let texts = |file: &str| -> Vec<String> {
        engine
            .diagnostics(file)
            .iter()
            .map(|d| d.message.to_string())
            .collect()
    };
    assert_eq!(
        texts("/ws/app/A.ned"),
        vec!["simple module 'Foo' already defined in /ws/lib/B.ned"]
    );
    assert_eq!(
        texts("/ws/lib/B.ned"),
        vec!["simple module 'Foo' already defined in /ws/app/A.ned"]
    );
    assert!(texts("/ws/tool/T.ned").is_empty());
}

#[test]
fn test_builtin_redefinition() {
    let (engine, _fs) = loaded_engine(&[("ned/Ideal.ned", "package ned; channel IdealChannel;")]);
    engine.validate_all_files();
    assert_eq!(
        messages(&engine, "ned/Ideal.ned"),
        vec!["channel 'ned.IdealChannel' is a built-in type and cannot be redefined"]
    );
}

#[test]
fn test_unresolved_references_and_cycles() {
    let (engine, _fs) = loaded_engine(&[
        ("Bad.ned", "simple A extends Missing; module M { submodules: x: Nope; }"),
        ("Cycle.ned", "simple P extends Q; simple Q extends P;"),
    ]);
    engine.validate_all_files();

    let bad = messages(&engine, "Bad.ned");
    assert!(bad.contains(&"no such type: 'Missing'".to_string()));
    assert!(bad.contains(&"no such type: 'Nope'".to_string()));
    let cycle = messages(&engine, "Cycle.ned");
    assert!(cycle.contains(&"cycle in the inheritance chain of 'P'".to_string()));
    assert!(cycle.contains(&"cycle in the inheritance chain of 'Q'".to_string()));
}

#[test]
fn test_package_mismatch_is_a_warning() {
    let (engine, _fs) = loaded_engine(&[
        ("sub/Wrong.ned", "package other; simple W;"),
        ("sub/Right.ned", "package sub; simple R;"),
    ]);
    assert_eq!(engine.expected_package_for(path("sub/Wrong.ned")).as_deref(), Some("sub"));
    engine.validate_all_files();

    let wrong = engine.diagnostics(path("sub/Wrong.ned"));
    assert_eq!(wrong.len(), 1);
    assert_eq!(wrong[0].code, codes::PACKAGE_MISMATCH);
    assert_eq!(wrong[0].severity, Severity::Warning);
    assert!(engine.diagnostics(path("sub/Right.ned")).is_empty());
}

#[test]
fn test_root_package_file_sets_prefix() {
    let (engine, _fs) = loaded_engine(&[
        ("package.ned", "package org.demo;"),
        ("net/Net.ned", "package org.demo.net; network Net;"),
    ]);
    assert_eq!(engine.expected_package_for(path("package.ned")), None);
    assert_eq!(
        engine.expected_package_for(path("net/Net.ned")).as_deref(),
        Some("org.demo.net")
    );
    engine.validate_all_files();
    assert!(engine.all_diagnostics().is_empty(), "{:?}", engine.all_diagnostics());
}

#[test]
fn test_broken_file_gets_no_semantic_diagnostics() {
    let (engine, _fs) = loaded_engine(&[("Broken.ned", "simple A extends Missing {")]);
    engine.validate_all_files();
    assert!(engine.diagnostics(path("Broken.ned")).is_empty());
    assert!(!engine.syntax_diagnostics(path("Broken.ned")).is_empty());
}

#[test]
fn test_fixing_a_file_clears_its_diagnostics() {
    let (engine, _fs) = loaded_engine(&[("A.ned", "simple A extends Missing;")]);
    engine.validate_all_files();
    assert_eq!(messages(&engine, "A.ned"), vec!["no such type: 'Missing'"]);

    engine.set_text(path("A.ned"), "simple Missing; simple A extends Missing;").unwrap();
    engine.validate_all_files();
    assert!(messages(&engine, "A.ned").is_empty());
}

#[test]
fn test_diagnostics_follow_their_node() {
    let (engine, _fs) = loaded_engine(&[("A.ned", "simple A extends Missing;")]);
    engine.validate_all_files();
    let id = engine.file_id(path("A.ned")).unwrap();
    let (recorder, _) = EventRecorder::attach(&engine);

    engine.set_text(path("A.ned"), "\n\nsimple A extends Missing;").unwrap();
    let diags = engine.diagnostics(path("A.ned"));
    assert_eq!(diags.len(), 1);
    let node = diags[0].node.unwrap();
    let tree = engine.file_tree(path("A.ned")).unwrap();
    assert_eq!(Some(diags[0].span), tree.find_span(node));
    assert_eq!(diags[0].span.start.line, 2);
    assert!(recorder.events().contains(&ChangeEvent::DiagnosticsChanged(id)));
}

#[test]
fn test_validation_pass_is_bracketed() {
    let (engine, _fs) = loaded_engine(&[("a.ned", "simple Foo;"), ("b.ned", "simple Foo;")]);
    let (recorder, _) = EventRecorder::attach(&engine);
    engine.validate_all_files();

    recorder.assert_balanced();
    assert_eq!(recorder.events().first(), Some(&ChangeEvent::Begin));
    assert_eq!(recorder.events().last(), Some(&ChangeEvent::End));
    assert_eq!(recorder.count(|e| matches!(e, ChangeEvent::DiagnosticsChanged(_))), 2);

    // Nothing changed, nothing republished
    recorder.clear();
    engine.validate_all_files();
    assert_eq!(recorder.count(|e| matches!(e, ChangeEvent::DiagnosticsChanged(_))), 0);
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < Duration::from_secs(5) {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_background_validation_after_quiet_period() {
    let fs = Arc::new(MemoryFs::new());
    fs.write(path("A.ned"), "simple A extends Missing;");
    let engine = NedResources::new(
        fs,
        Arc::new(StaticProjects::new(vec![ProjectConfig::new("demo", ROOT)])),
        ResourcesConfig::new().with_validation_delay(Some(Duration::from_millis(20))),
    )
    .unwrap();
    engine.read_missing_files().unwrap();

    assert!(wait_until(|| !engine.diagnostics(path("A.ned")).is_empty()));

    engine.set_text(path("A.ned"), "simple A;").unwrap();
    assert!(wait_until(|| engine.diagnostics(path("A.ned")).is_empty()));

    engine.dispose();
    engine.dispose();
}

#[test]
fn test_validation_passes_do_not_overlap() {
    let fs = Arc::new(MemoryFs::new());
    fs.write(path("A.ned"), "simple A extends Missing;");
    fs.write(path("B.ned"), "simple B extends Missing;");
    let engine = Arc::new(
        NedResources::new(
            fs,
            Arc::new(StaticProjects::new(vec![ProjectConfig::new("demo", ROOT)])),
            ResourcesConfig::new().with_validation_delay(Some(Duration::from_millis(100))),
        )
        .unwrap(),
    );
    let (recorder, _) = EventRecorder::attach(&engine);

    // Hold the background pass after its first published file
    let gate = Gate::new();
    let worker_gate = gate.clone();
    let held = Arc::new(AtomicBool::new(false));
    engine.add_change_listener(move |event| {
        let on_worker = thread::current().name() == Some("ned-validation");
        if on_worker
            && matches!(event, ChangeEvent::DiagnosticsChanged(_))
            && !held.swap(true, Ordering::SeqCst)
        {
            worker_gate.block();
        }
    });
    engine.read_missing_files().unwrap();
    gate.wait_reached();

    let foreground = {
        let engine = engine.clone();
        thread::spawn(move || engine.validate_all_files())
    };
    thread::sleep(Duration::from_millis(50));
    gate.release();
    foreground.join().unwrap();

    recorder.assert_balanced();
    assert_eq!(recorder.max_depth(), 1);
    assert_eq!(recorder.count(|e| matches!(e, ChangeEvent::DiagnosticsChanged(_))), 2);
    assert_eq!(messages(&engine, "B.ned"), vec!["no such type: 'Missing'"]);
    engine.dispose();
}
