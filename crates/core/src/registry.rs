//! Mutable registration phase of the engine lifecycle.
//!
//! Everything lands in one flat table keyed by name, so a later
//! registration under the same name replaces the earlier one regardless of
//! kind. `seal` converts the registry into the immutable [`AppContext`].

use crate::context::AppContext;
use crate::error::{Result, SwitchboardError};
use crate::events::{EventBus, LifecycleEvent};
use crate::resource::{Registered, Resource, ResourceCatalog, ResourceDescriptor, ResourceKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Default)]
pub struct Registry {
    table: HashMap<String, Registered>,
    bus: EventBus,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource under `name`, replacing any earlier entry.
    ///
    /// Plugins are constructed here: the constructor runs against this
    /// registry and its instance is what gets stored. A constructor error
    /// aborts the registration and leaves the table as it was.
    pub fn register(&mut self, name: &str, resource: Resource) -> Result<()> {
        match resource {
            Resource::Command(handler) => {
                info!("{name}: command, {} contract", handler.contract());
                self.table
                    .insert(name.to_string(), Registered::Command(handler));
            }
            Resource::Hook(handler) => {
                info!("{name}: hook, {} contract", handler.contract());
                self.table
                    .insert(name.to_string(), Registered::Hook(handler));
            }
            Resource::Plugin(ctor) => {
                let instance = ctor(self)?;
                info!("{name}: plugin constructed");
                self.table
                    .insert(name.to_string(), Registered::Plugin(instance));
            }
        }
        Ok(())
    }

    /// Attaches a lifecycle listener. Listeners survive `seal` and fire for
    /// the life of the process.
    pub fn on<F>(&mut self, event: LifecycleEvent, listener: F)
    where
        F: Fn(&Arc<AppContext>) + Send + Sync + 'static,
    {
        self.bus.on(event, listener);
    }

    pub fn lookup(&self, name: &str) -> Option<&Registered> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Registers every scanned descriptor that the catalog implements.
    ///
    /// Plugins go last so their constructors can see the commands and hooks
    /// scanned alongside them. A descriptor without an implementation, a
    /// kind mismatch, or a failing plugin constructor is logged and
    /// skipped; the rest of the batch still loads.
    pub fn load(&mut self, descriptors: &[ResourceDescriptor], catalog: &ResourceCatalog) {
        let (plugins, direct): (Vec<_>, Vec<_>) = descriptors
            .iter()
            .partition(|d| d.kind == ResourceKind::Plugin);
        for descriptor in direct.into_iter().chain(plugins) {
            if let Err(err) = self.load_one(descriptor, catalog) {
                warn!("skipping {} {}: {err}", descriptor.kind, descriptor.name);
            }
        }
    }

    fn load_one(&mut self, descriptor: &ResourceDescriptor, catalog: &ResourceCatalog) -> Result<()> {
        let Some(resource) = catalog.resolve(&descriptor.name) else {
            return Err(SwitchboardError::Resource(format!(
                "no implementation for {} {}",
                descriptor.kind, descriptor.name
            )));
        };
        if resource.kind() != descriptor.kind {
            return Err(SwitchboardError::Resource(format!(
                "{} is declared as a {} but implemented as a {}",
                descriptor.name,
                descriptor.kind,
                resource.kind()
            )));
        }
        self.register(&descriptor.name, resource)
    }

    /// Freezes the registry into the shared application context.
    pub fn seal(self, root: PathBuf) -> AppContext {
        AppContext::new(self.table, self.bus, root)
    }
}
