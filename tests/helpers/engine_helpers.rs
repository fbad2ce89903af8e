//! Engines over an in-memory file system.

use std::path::PathBuf;
use std::sync::Arc;

use ned::ProjectId;
use ned::hir::Diagnostic;
use ned::project::{ProjectConfig, StaticProjects};
use ned::resources::{MemoryFs, NedResources, ResourcesConfig};

/// Root of the default test project.
pub const ROOT: &str = "/ws/demo";

pub fn demo() -> ProjectId {
    ProjectId::new("demo")
}

/// Absolute path of `name` inside the default project.
pub fn path(name: &str) -> PathBuf {
    PathBuf::from(ROOT).join(name)
}

/// An engine without background validation over the given projects.
pub fn engine_with_projects(fs: Arc<MemoryFs>, projects: Vec<ProjectConfig>) -> NedResources {
    NedResources::new(
        fs,
        Arc::new(StaticProjects::new(projects)),
        ResourcesConfig::manual(),
    )
    .expect("engine should start")
}

/// A single-project engine with `files` (relative to [`ROOT`]) on disk and
/// loaded.
pub fn loaded_engine(files: &[(&str, &str)]) -> (NedResources, Arc<MemoryFs>) {
    let fs = Arc::new(MemoryFs::new());
    for (name, text) in files {
        fs.write(path(name), *text);
    }
    let engine = engine_with_projects(fs.clone(), vec![ProjectConfig::new("demo", ROOT)]);
    let loaded = engine.read_missing_files().expect("files should load");
    assert_eq!(loaded, files.len());
    (engine, fs)
}

/// Messages of the published diagnostics of `name`.
pub fn messages(engine: &NedResources, name: &str) -> Vec<String> {
    engine
        .diagnostics(path(name))
        .iter()
        .map(|d: &Diagnostic| d.message.to_string())
        .collect()
}

/// Qualified names of the canonical types of the default project.
pub fn qnames(engine: &NedResources) -> Vec<String> {
    engine
        .type_qnames(&demo())
        .into_iter()
        .map(|q| q.to_string())
        .collect()
}
