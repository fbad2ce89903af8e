//! Property lookup through `package.ned` chains and position queries.

use std::sync::Arc;

use ned::ProjectId;
use ned::parser::Property;
use ned::project::ProjectConfig;
use ned::resources::MemoryFs;

use crate::helpers::engine_helpers::{engine_with_projects, loaded_engine, path};

#[test]
fn test_file_property_wins() {
    let (engine, _fs) = loaded_engine(&[
        ("package.ned", "package org; @namespace(top); @license(GPL);"),
        ("net/Net.ned", "package org.net; @namespace(own); network Net;"),
    ]);
    let net = path("net/Net.ned");
    assert_eq!(engine.simple_property_for(&net, "namespace").as_deref(), Some("own"));
    assert_eq!(engine.simple_property_for(&net, "license").as_deref(), Some("GPL"));
}

#[test]
fn test_nearest_package_file_wins() {
    let (engine, _fs) = loaded_engine(&[
        ("package.ned", "package org; @namespace(top);"),
        ("a/package.ned", "package org.a; @namespace(middle);"),
        ("a/b/Deep.ned", "package org.a.b; simple Deep;"),
        ("c/Side.ned", "package org.c; simple Side;"),
    ]);
    assert_eq!(
        engine.simple_property_for(path("a/b/Deep.ned"), "namespace").as_deref(),
        Some("middle")
    );
    assert_eq!(
        engine.simple_property_for(path("c/Side.ned"), "namespace").as_deref(),
        Some("top")
    );
    let folder = engine.folder_property_for(path("a"), "namespace").unwrap();
    assert_eq!(folder.simple_value(), Some("middle"));
    assert!(engine.property_for(path("c/Side.ned"), "license").is_none());
}

#[test]
fn test_search_stops_at_the_source_folder() {
    let fs = Arc::new(MemoryFs::new());
    fs.write("/ws/p/src/package.ned", "package p; @namespace(inside);");
    fs.write("/ws/p/src/x/X.ned", "package p.x; simple X;");
    let engine = engine_with_projects(
        fs,
        vec![ProjectConfig::new("p", "/ws/p").with_source_folders(["src"])],
    );
    assert_eq!(engine.read_missing_files().unwrap(), 2);

    assert_eq!(
        engine.simple_property_for("/ws/p/src/x/X.ned", "namespace").as_deref(),
        Some("inside")
    );
    assert!(engine.folder_property_for("/ws/p", "namespace").is_none());
    assert!(engine.project(&ProjectId::new("p")).is_some());
}

#[test]
fn test_property_values_by_key() {
    let (engine, _fs) = loaded_engine(&[(
        "package.ned",
        "package org; @statistic[delay](source=delay; record=mean,max);",
    )]);
    let tree = engine.file_tree(path("package.ned")).unwrap();
    let statistic: &Property = &tree.properties[0];
    assert_eq!(statistic.index.as_deref(), Some("delay"));
    assert_eq!(statistic.values("record"), ["mean", "max"]);
    // Indexed properties are not file-level defaults
    assert!(engine.property_for(path("package.ned"), "statistic").is_none());
}

#[test]
fn test_element_at_position() {
    let (engine, _fs) = loaded_engine(&[(
        "Net.ned",
        "network Net\n{\n  submodules:\n    q: Queue;\n}\nsimple Queue;",
    )]);
    let tree = engine.file_tree(path("Net.ned")).unwrap();
    let net = &tree.types[0];
    let queue_ref = net.submodules[0].type_ref.node;
    assert_eq!(engine.element_at(path("Net.ned"), 3, 8), Some(queue_ref));
    assert_eq!(engine.element_at(path("Net.ned"), 1, 0), Some(net.node));
    assert_eq!(engine.element_at(path("Net.ned"), 5, 2), Some(tree.types[1].node));
    assert_eq!(engine.element_at(path("Net.ned"), 40, 0), None);
    assert_eq!(engine.element_at(path("Missing.ned"), 0, 0), None);
}
