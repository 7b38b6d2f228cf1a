//! Resource model: what the scanner discovers and the registry stores.

pub mod catalog;
pub mod scanner;

pub use catalog::ResourceCatalog;
pub use scanner::ResourceScanner;

use crate::context::CallContext;
use crate::registry::Registry;
use futures::future::BoxFuture;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Classification of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Publicly invocable through the dispatch endpoint.
    Command,
    /// Lifecycle override, invoked directly by the engine, never dispatched.
    Hook,
    /// Shared stateful instance, constructed once at startup.
    Plugin,
}

impl ResourceKind {
    /// Maps the first segment of a `<kind>.<name>.<ext>` filename.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "command" => Some(ResourceKind::Command),
            "hook-source" => Some(ResourceKind::Hook),
            "plugin" => Some(ResourceKind::Plugin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Command => "command",
            ResourceKind::Hook => "hook",
            ResourceKind::Plugin => "plugin",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered file classified by kind and name, prior to registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub name: String,
    pub source: PathBuf,
}

/// Handler failures cross this boundary as plain boxed errors; the dispatch
/// engine renders them into the reply text.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// `Ok(None)` is the "no return" case.
pub type HandlerResult = Result<Option<Value>, HandlerError>;

pub type SyncFn = Arc<dyn Fn(&CallContext, Value) -> HandlerResult + Send + Sync>;
pub type AsyncFn = Arc<dyn Fn(CallContext, Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A registered implementation, tagged by its invocation contract. The tag
/// is declared at registration; dispatch never probes the result.
#[derive(Clone)]
pub enum Handler {
    /// Runs to completion on the dispatching task.
    Sync(SyncFn),
    /// Returns a future the dispatch engine awaits.
    Async(AsyncFn),
    /// A plain value served as the result without invocation.
    Value(Value),
}

impl Handler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&CallContext, Value) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    pub fn async_fn<F>(f: F) -> Self
    where
        F: Fn(CallContext, Value) -> BoxFuture<'static, HandlerResult> + Send + Sync + 'static,
    {
        Handler::Async(Arc::new(f))
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Handler::Value(value.into())
    }

    pub fn contract(&self) -> &'static str {
        match self {
            Handler::Sync(_) => "sync",
            Handler::Async(_) => "async",
            Handler::Value(_) => "value",
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Value(value) => f.debug_tuple("Value").field(value).finish(),
            other => f.write_str(other.contract()),
        }
    }
}

/// The constructed plugin instance shared by every request.
pub type SharedPlugin = Arc<dyn Any + Send + Sync>;

/// Builds the plugin instance. Runs once per registration, against the
/// registry, so it can inspect prior registrations, add its own, and attach
/// event listeners.
pub type PluginCtor = Arc<dyn Fn(&mut Registry) -> Result<SharedPlugin, HandlerError> + Send + Sync>;

/// Registration input: a value paired with its kind.
#[derive(Clone)]
pub enum Resource {
    Command(Handler),
    Hook(Handler),
    Plugin(PluginCtor),
}

impl Resource {
    pub fn plugin<F>(ctor: F) -> Self
    where
        F: Fn(&mut Registry) -> Result<SharedPlugin, HandlerError> + Send + Sync + 'static,
    {
        Resource::Plugin(Arc::new(ctor))
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Command(_) => ResourceKind::Command,
            Resource::Hook(_) => ResourceKind::Hook,
            Resource::Plugin(_) => ResourceKind::Plugin,
        }
    }
}

/// What the command table stores: handlers as given, plugins as their
/// constructed instance.
#[derive(Clone)]
pub enum Registered {
    Command(Handler),
    Hook(Handler),
    Plugin(SharedPlugin),
}

impl Registered {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Registered::Command(_) => ResourceKind::Command,
            Registered::Hook(_) => ResourceKind::Hook,
            Registered::Plugin(_) => ResourceKind::Plugin,
        }
    }
}
