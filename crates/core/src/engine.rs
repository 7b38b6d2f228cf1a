//! Engine lifecycle: a two-state machine around the registry.
//!
//! `Created` holds the mutable registry and accepts registrations;
//! `start` scans the resource root, loads the catalog matches, seals the
//! registry into the shared [`AppContext`] and fires `OnStart`. After that
//! the engine is `Started` and registration is an error. `start` is
//! idempotent.

use crate::context::AppContext;
use crate::error::{Result, SwitchboardError};
use crate::events::LifecycleEvent;
use crate::registry::Registry;
use crate::resource::{Resource, ResourceCatalog, ResourceScanner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

enum EngineState {
    Created(Registry),
    Started(Arc<AppContext>),
}

impl Default for EngineState {
    fn default() -> Self {
        EngineState::Created(Registry::new())
    }
}

pub struct Engine {
    root: PathBuf,
    catalog: ResourceCatalog,
    state: EngineState,
}

impl Engine {
    pub fn new(root: impl Into<PathBuf>, catalog: ResourceCatalog) -> Self {
        Engine {
            root: root.into(),
            catalog,
            state: EngineState::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, EngineState::Started(_))
    }

    /// The shared context, once started.
    pub fn app(&self) -> Option<&Arc<AppContext>> {
        match &self.state {
            EngineState::Started(app) => Some(app),
            EngineState::Created(_) => None,
        }
    }

    /// Registers a resource directly, bypassing the scanner. Fails once the
    /// engine has started.
    pub fn register(&mut self, name: &str, resource: Resource) -> Result<()> {
        match &mut self.state {
            EngineState::Created(registry) => registry.register(name, resource),
            EngineState::Started(_) => Err(SwitchboardError::Sealed(name.to_string())),
        }
    }

    /// Attaches a lifecycle listener. Fails once the engine has started.
    pub fn on<F>(&mut self, event: LifecycleEvent, listener: F) -> Result<()>
    where
        F: Fn(&Arc<AppContext>) + Send + Sync + 'static,
    {
        match &mut self.state {
            EngineState::Created(registry) => {
                registry.on(event, listener);
                Ok(())
            }
            EngineState::Started(_) => Err(SwitchboardError::Sealed("listener".to_string())),
        }
    }

    /// Scans the resource root, seals the registry and fires `OnStart`.
    /// Calling it again returns the already-started context.
    pub fn start(&mut self) -> Result<Arc<AppContext>> {
        match std::mem::take(&mut self.state) {
            EngineState::Started(app) => {
                self.state = EngineState::Started(Arc::clone(&app));
                Ok(app)
            }
            EngineState::Created(mut registry) => {
                let descriptors = match ResourceScanner::scan(&self.root) {
                    Ok(descriptors) => descriptors,
                    Err(err) => {
                        // a failed start leaves the engine Created
                        self.state = EngineState::Created(registry);
                        return Err(err);
                    }
                };
                registry.load(&descriptors, &self.catalog);
                let app = Arc::new(registry.seal(self.root.clone()));
                self.state = EngineState::Started(Arc::clone(&app));
                info!(
                    "started with {} resources from {}",
                    app.len(),
                    self.root.display()
                );
                app.emit(LifecycleEvent::OnStart);
                Ok(app)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Handler;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn root_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            fs::File::create(dir.path().join(file)).unwrap();
        }
        dir
    }

    #[test]
    fn test_start_loads_scanned_resources() {
        let root = root_with(&["command.square.txt"]);
        let catalog = ResourceCatalog::new().with("square", Resource::Command(Handler::value(9)));
        let mut engine = Engine::new(root.path(), catalog);

        assert!(!engine.is_started());
        assert!(engine.app().is_none());
        let app = engine.start().unwrap();
        assert!(engine.is_started());
        assert!(app.lookup("square").is_some());
    }

    #[test]
    fn test_start_is_idempotent_and_fires_on_start_once() {
        let root = root_with(&[]);
        let mut engine = Engine::new(root.path(), ResourceCatalog::new());
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        engine
            .on(LifecycleEvent::OnStart, move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let first = engine.start().unwrap();
        let second = engine.start().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_direct_registrations_survive_start() {
        let root = root_with(&[]);
        let mut engine = Engine::new(root.path(), ResourceCatalog::new());
        engine
            .register("bundled", Resource::Command(Handler::value("ok")))
            .unwrap();

        let app = engine.start().unwrap();
        assert!(app.lookup("bundled").is_some());
    }

    #[test]
    fn test_registration_after_start_is_sealed() {
        let root = root_with(&[]);
        let mut engine = Engine::new(root.path(), ResourceCatalog::new());
        engine.start().unwrap();

        let err = engine
            .register("late", Resource::Command(Handler::value(1)))
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::Sealed(_)));
        assert_eq!(err.to_string(), "registry is sealed, cannot register late");
        assert!(engine.on(LifecycleEvent::OnStart, |_| {}).is_err());
    }

    #[test]
    fn test_scan_failure_leaves_the_engine_created() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("missing");
        let mut engine = Engine::new(&root, ResourceCatalog::new());

        assert!(engine.start().is_err());
        assert!(!engine.is_started());
        // still Created: registration keeps working, and a later start
        // succeeds once the root exists
        engine
            .register("retry", Resource::Command(Handler::value(1)))
            .unwrap();
        fs::create_dir(&root).unwrap();
        let app = engine.start().unwrap();
        assert!(app.lookup("retry").is_some());
    }
}
