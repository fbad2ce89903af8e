//! Editor connections and text edits.

use ned::NedError;

use crate::helpers::engine_helpers::{demo, loaded_engine, path};

const QUEUE: &str = "simple Queue { gates: input in; }\n";

#[test]
fn test_connect_counts_editors() {
    let (engine, _fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    let file = path("Queue.ned");

    let id = engine.connect(&file).unwrap();
    assert_eq!(engine.file_id(&file), Some(id));
    assert_eq!(engine.connect(&file).unwrap(), id);
    assert_eq!(engine.connect_count(&file), 2);

    engine.disconnect(&file).unwrap();
    assert!(engine.has_connected_editor(&file));
    engine.disconnect(&file).unwrap();
    assert!(!engine.has_connected_editor(&file));

    let err = engine.disconnect(&file).unwrap_err();
    assert!(matches!(err, NedError::NotConnected(_)));
}

#[test]
fn test_connect_loads_unread_file() {
    let (engine, fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    let file = path("Sink.ned");
    fs.write(&file, "simple Sink;");

    assert!(engine.file_id(&file).is_none());
    engine.connect(&file).unwrap();
    assert_eq!(engine.connect_count(&file), 1);
    assert!(engine.get_type("Sink", &demo()).is_some());
}

#[test]
fn test_connect_rejects_non_ned_files() {
    let (engine, fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    fs.write(path("notes.txt"), "hello");
    fs.write("/elsewhere/Other.ned", "simple Other;");

    assert!(matches!(
        engine.connect(path("notes.txt")),
        Err(NedError::NotNedFile(_))
    ));
    assert!(matches!(
        engine.connect("/elsewhere/Other.ned"),
        Err(NedError::NotNedFile(_))
    ));
    assert!(!engine.is_ned_file("/elsewhere/Other.ned"));
    assert!(engine.is_ned_file(path("Upper.NED")));
}

#[test]
fn test_last_disconnect_reverts_to_disk() {
    let (engine, _fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    let file = path("Queue.ned");
    engine.connect(&file).unwrap();

    engine.set_text(&file, "simple Edited;").unwrap();
    assert!(engine.get_type("Edited", &demo()).is_some());
    assert!(engine.get_type("Queue", &demo()).is_none());

    engine.disconnect(&file).unwrap();
    assert_eq!(engine.file_text(&file).as_deref(), Some(QUEUE));
    assert!(engine.get_type("Queue", &demo()).is_some());
    assert!(engine.get_type("Edited", &demo()).is_none());
}

#[test]
fn test_disk_reads_refused_while_connected() {
    let (engine, fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    let file = path("Queue.ned");
    engine.connect(&file).unwrap();
    fs.write(&file, "simple FromDisk;");

    assert!(matches!(
        engine.read_file(&file),
        Err(NedError::EditorConnected(_))
    ));
    assert_eq!(engine.file_text(&file).as_deref(), Some(QUEUE));
}

#[test]
fn test_set_text_requires_loaded_file() {
    let (engine, _fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    let err = engine.set_text(path("Missing.ned"), "simple M;").unwrap_err();
    assert!(matches!(err, NedError::NotLoaded(_)));
}

#[test]
fn test_read_file_reports_io_errors() {
    let (engine, _fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    let err = engine.read_file(path("Gone.ned")).unwrap_err();
    assert!(matches!(err, NedError::Io { .. }));
    assert!(err.to_string().contains("Gone.ned"));
}

#[test]
fn test_edit_preserves_node_ids() {
    let (engine, _fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    let file = path("Queue.ned");
    let before = engine.file_tree(&file).unwrap();
    let queue_node = before.types[0].node;

    engine
        .set_text(&file, "simple Queue { gates: input in; output out; }\nsimple Sink;\n")
        .unwrap();
    let after = engine.file_tree(&file).unwrap();
    assert_eq!(after.types[0].node, queue_node);
    assert_eq!(after.types[0].gates.len(), 2);
    assert_ne!(after.types[1].node, queue_node);
}

#[test]
fn test_whitespace_edit_does_not_invalidate() {
    let (engine, _fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    let file = path("Queue.ned");
    let serial = engine.change_serial();
    let old_span = engine.file_tree(&file).unwrap().types[0].span;

    engine.set_text(&file, "\n\nsimple Queue { gates: input in; }\n").unwrap();
    assert_eq!(engine.change_serial(), serial);
    let new_span = engine.file_tree(&file).unwrap().types[0].span;
    assert_eq!(new_span.start.line, old_span.start.line + 2);
}

#[test]
fn test_syntax_errors_exclude_file_until_fixed() {
    let (engine, _fs) = loaded_engine(&[("Queue.ned", QUEUE), ("Sink.ned", "simple Sink;")]);
    let file = path("Queue.ned");
    let good_tree = engine.file_tree(&file).unwrap();

    engine.set_text(&file, "simple Queue { gates: input in;").unwrap();
    assert!(engine.is_broken(&file));
    assert!(!engine.syntax_diagnostics(&file).is_empty());
    assert!(engine.get_type("Queue", &demo()).is_none());
    assert!(engine.get_type("Sink", &demo()).is_some());
    // The last good tree is kept
    assert_eq!(engine.file_tree(&file).unwrap().types, good_tree.types);

    engine.set_text(&file, QUEUE).unwrap();
    assert!(!engine.is_broken(&file));
    assert!(engine.syntax_diagnostics(&file).is_empty());
    assert!(engine.get_type("Queue", &demo()).is_some());
}

#[test]
fn test_forget() {
    let (engine, _fs) = loaded_engine(&[("Queue.ned", QUEUE)]);
    let file = path("Queue.ned");
    assert!(engine.forget(&file));
    assert!(!engine.forget(&file));
    assert!(engine.file_id(&file).is_none());
    assert!(engine.get_type("Queue", &demo()).is_none());
    assert!(engine.files().is_empty());
}
