//! Change events and begin/end bracketing.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use ned::project::{ProjectConfig, StaticProjects};
use ned::resources::{ChangeEvent, MemoryFs, NedResources, ResourcesConfig};

use crate::helpers::engine_helpers::{ROOT, demo, engine_with_projects, loaded_engine, path};
use crate::helpers::event_recorder::EventRecorder;
use crate::helpers::gate::{Gate, GatedFs};

fn is_begin(e: &ChangeEvent) -> bool {
    *e == ChangeEvent::Begin
}

fn is_end(e: &ChangeEvent) -> bool {
    *e == ChangeEvent::End
}

#[test]
fn test_bracket_closed_on_ok() {
    let (engine, _fs) = loaded_engine(&[("A.ned", "simple A;")]);
    let (recorder, _) = EventRecorder::attach(&engine);

    let value = engine.run_with_begin_end(|| 42);
    assert_eq!(value, 42);
    assert_eq!(recorder.events(), vec![ChangeEvent::Begin, ChangeEvent::End]);
}

#[test]
fn test_bracket_closed_on_err() {
    let (engine, _fs) = loaded_engine(&[("A.ned", "simple A;")]);
    let (recorder, _) = EventRecorder::attach(&engine);

    let result: Result<(), String> = engine.run_with_begin_end(|| Err("failed".to_string()));
    assert!(result.is_err());
    assert_eq!(recorder.count(is_begin), 1);
    assert_eq!(recorder.count(is_end), 1);
}

#[test]
fn test_bracket_closed_on_panic() {
    let (engine, _fs) = loaded_engine(&[("A.ned", "simple A;")]);
    let (recorder, _) = EventRecorder::attach(&engine);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        engine.run_with_begin_end(|| panic!("boom"));
    }));
    assert!(outcome.is_err());
    assert_eq!(recorder.count(is_begin), 1);
    assert_eq!(recorder.count(is_end), 1);

    // The engine stays usable
    assert!(engine.get_type("A", &demo()).is_some());
}

#[test]
fn test_nested_brackets_each_close() {
    let (engine, _fs) = loaded_engine(&[("A.ned", "simple A;")]);
    let (recorder, _) = EventRecorder::attach(&engine);

    engine.run_with_begin_end(|| {
        engine.run_with_begin_end(|| {
            engine.set_text(path("A.ned"), "simple A; simple B;").unwrap();
        });
    });
    recorder.assert_balanced();
    assert_eq!(recorder.events().first(), Some(&ChangeEvent::Begin));
    assert_eq!(recorder.events().last(), Some(&ChangeEvent::End));
}

#[test]
fn test_bulk_load_sends_single_model_change() {
    let fs = Arc::new(MemoryFs::new());
    for name in ["A.ned", "B.ned", "C.ned"] {
        fs.write(path(name), "simple X;");
    }
    let engine = engine_with_projects(fs, vec![ProjectConfig::new("demo", ROOT)]);
    let (recorder, _) = EventRecorder::attach(&engine);

    assert_eq!(engine.read_missing_files().unwrap(), 3);
    assert_eq!(recorder.events(), vec![ChangeEvent::ModelChanged(None)]);

    // A second call finds nothing to load and stays silent
    recorder.clear();
    assert_eq!(engine.read_missing_files().unwrap(), 0);
    assert!(recorder.events().is_empty());
}

#[test]
fn test_edits_during_background_read_keep_their_events() {
    let files = MemoryFs::new();
    files.write(path("A.ned"), "simple A;");
    files.write(path("Slow.ned"), "simple Slow;");
    let gate = Gate::new();
    let fs = Arc::new(GatedFs::new(files, path("Slow.ned"), gate.clone()));
    let engine = NedResources::new(
        fs,
        Arc::new(StaticProjects::new(vec![ProjectConfig::new("demo", ROOT)])),
        ResourcesConfig::manual(),
    )
    .unwrap();
    let a = engine.read_file(path("A.ned")).unwrap();
    let (recorder, _) = EventRecorder::attach(&engine);

    // The read of Slow.ned is held while this thread edits and brackets
    let handle = engine.run_with_begin_end(|| {
        let handle = engine.schedule_read_missing_files().unwrap();
        gate.wait_reached();
        engine.set_text(path("A.ned"), "simple A; simple B;").unwrap();
        engine.run_with_begin_end(|| {});
        handle
    });
    gate.release();
    assert_eq!(handle.join().unwrap().unwrap(), 1);

    recorder.assert_balanced();
    assert_eq!(recorder.count(is_begin), 3);
    assert_eq!(recorder.count(|e| *e == ChangeEvent::TreeMerged(a)), 1);
    assert_eq!(recorder.count(|e| matches!(e, ChangeEvent::FileLoaded(_))), 0);
    assert_eq!(recorder.events().last(), Some(&ChangeEvent::ModelChanged(None)));
    assert!(engine.get_type("Slow", &demo()).is_some());
    assert!(engine.get_type("B", &demo()).is_some());
}

#[test]
fn test_edit_events_are_ordered_and_bracketed() {
    let (engine, _fs) = loaded_engine(&[("A.ned", "simple A;")]);
    let id = engine.file_id(path("A.ned")).unwrap();
    let (recorder, _) = EventRecorder::attach(&engine);

    engine.set_text(path("A.ned"), "simple A; simple B;").unwrap();
    assert_eq!(
        recorder.events(),
        vec![
            ChangeEvent::Begin,
            ChangeEvent::TreeMerged(id),
            ChangeEvent::ModelChanged(Some(id)),
            ChangeEvent::End,
        ]
    );
}

#[test]
fn test_file_load_and_removal_events() {
    let (engine, fs) = loaded_engine(&[("A.ned", "simple A;")]);
    let (recorder, _) = EventRecorder::attach(&engine);

    fs.write(path("B.ned"), "simple B;");
    let id = engine.read_file(path("B.ned")).unwrap();
    assert_eq!(
        recorder.events(),
        vec![ChangeEvent::FileLoaded(id), ChangeEvent::ModelChanged(Some(id))]
    );

    recorder.clear();
    engine.forget(path("B.ned"));
    assert_eq!(recorder.events(), vec![ChangeEvent::FileRemoved(path("B.ned"))]);
}

#[test]
fn test_removed_listener_is_not_called() {
    let (engine, _fs) = loaded_engine(&[("A.ned", "simple A;")]);
    let (recorder, id) = EventRecorder::attach(&engine);
    assert!(engine.remove_change_listener(id));
    assert!(!engine.remove_change_listener(id));

    engine.set_text(path("A.ned"), "simple A; simple B;").unwrap();
    assert!(recorder.events().is_empty());
}

#[test]
fn test_listener_may_query_the_engine() {
    let (engine, _fs) = loaded_engine(&[("A.ned", "simple A;")]);
    let engine = Arc::new(engine);
    let weak: Weak<NedResources> = Arc::downgrade(&engine);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();

    engine.add_change_listener(move |event| {
        if let (ChangeEvent::ModelChanged(_), Some(engine)) = (event, weak.upgrade()) {
            counter.store(engine.types(&demo()).len(), Ordering::SeqCst);
        }
    });

    let before = engine.types(&demo()).len();
    engine.set_text(path("A.ned"), "simple A; simple B;").unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), before + 1);
}
