//! Shared and per-request execution contexts.
//!
//! `AppContext` is the long-lived state every request reads; `Exchange` is
//! the per-request transport binding carried alongside it, never stored on
//! it; `CallContext` hands both to handler code.

use crate::events::{EventBus, LifecycleEvent};
use crate::resource::{Handler, HandlerError, Registered, ResourceKind, SharedPlugin};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Sealed engine state: the command table, the event bus, and the resource
/// root. Immutable for the life of the process once built.
pub struct AppContext {
    table: HashMap<String, Registered>,
    bus: EventBus,
    root: PathBuf,
}

impl AppContext {
    pub(crate) fn new(table: HashMap<String, Registered>, bus: EventBus, root: PathBuf) -> Self {
        AppContext { table, bus, root }
    }

    pub fn lookup(&self, name: &str) -> Option<&Registered> {
        self.table.get(name)
    }

    /// Every registered resource as `(name, kind)`, in no particular order.
    pub fn resources(&self) -> impl Iterator<Item = (&str, ResourceKind)> {
        self.table
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.kind()))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn plugin(&self, name: &str) -> Option<SharedPlugin> {
        match self.lookup(name)? {
            Registered::Plugin(instance) => Some(Arc::clone(instance)),
            _ => None,
        }
    }

    /// Downcast accessor for a plugin instance.
    pub fn plugin_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.plugin(name)?.downcast::<T>().ok()
    }

    /// Fires a lifecycle event to its listeners, synchronously, in
    /// registration order.
    pub fn emit(self: &Arc<Self>, event: LifecycleEvent) {
        self.bus.emit(event, self);
    }

    /// A call context bound to no transport, for invoking hooks outside a
    /// request.
    pub fn detached_call(self: &Arc<Self>) -> CallContext {
        CallContext::new(Arc::clone(self), Arc::new(Exchange::detached()))
    }
}

/// Per-request transport binding: request headers in, staged response
/// headers out. The transport applies the staged headers when it writes
/// the reply.
pub struct Exchange {
    headers: HashMap<String, String>,
    staged: Mutex<Vec<(String, String)>>,
}

impl Exchange {
    /// Binds an exchange to a request's headers. Header names are matched
    /// case-insensitively.
    pub fn new(headers: impl IntoIterator<Item = (String, String)>) -> Self {
        Exchange {
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
            staged: Mutex::new(Vec::new()),
        }
    }

    /// An exchange with no request behind it.
    pub fn detached() -> Self {
        Self::new([])
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Stages a response header.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut staged) = self.staged.lock() {
            staged.push((name.into(), value.into()));
        }
    }

    /// Stages a `Set-Cookie` response header.
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.set_header("set-cookie", format!("{name}={value}"));
    }

    /// Snapshot of the staged response headers, in staging order.
    pub fn staged(&self) -> Vec<(String, String)> {
        self.staged.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

/// Re-entrant `invoke` calls deeper than this fail instead of recursing
/// forever.
pub const MAX_INVOKE_DEPTH: u32 = 32;

/// What every handler executes against: the shared engine state plus this
/// request's exchange.
#[derive(Clone)]
pub struct CallContext {
    app: Arc<AppContext>,
    exchange: Arc<Exchange>,
    depth: u32,
}

impl CallContext {
    pub fn new(app: Arc<AppContext>, exchange: Arc<Exchange>) -> Self {
        CallContext {
            app,
            exchange,
            depth: 0,
        }
    }

    pub fn app(&self) -> &AppContext {
        &self.app
    }

    pub(crate) fn shared_app(&self) -> &Arc<AppContext> {
        &self.app
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn plugin_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.app.plugin_as(name)
    }

    /// Invokes another public command by name and returns its raw result.
    ///
    /// Only synchronous commands can be re-entered this way: an async
    /// target, an unknown or non-command name, a no-return, or exceeding
    /// [`MAX_INVOKE_DEPTH`] is a handler error.
    pub fn invoke(&self, name: &str, parameter: Value) -> Result<Value, HandlerError> {
        if self.depth >= MAX_INVOKE_DEPTH {
            return Err(format!("invoke depth limit ({MAX_INVOKE_DEPTH}) reached at {name}").into());
        }
        let Some(entry) = self.app.lookup(name) else {
            return Err(format!("command {name} is not defined").into());
        };
        let Registered::Command(handler) = entry else {
            return Err(format!("command {name} is private").into());
        };
        match handler {
            Handler::Sync(f) => match f(&self.child(), parameter)? {
                Some(value) => Ok(value),
                None => Err(format!("command {name} no return").into()),
            },
            Handler::Value(value) => Ok(value.clone()),
            Handler::Async(_) => {
                Err(format!("command {name} is asynchronous, it cannot be invoked inline").into())
            }
        }
    }

    /// Invokes a hook resource directly, outside the public dispatch path.
    pub fn invoke_hook(&self, name: &str, parameter: Value) -> Result<Option<Value>, HandlerError> {
        let Some(entry) = self.app.lookup(name) else {
            return Err(format!("hook {name} is not defined").into());
        };
        let Registered::Hook(handler) = entry else {
            return Err(format!("{name} is not a hook").into());
        };
        match handler {
            Handler::Sync(f) => f(&self.child(), parameter),
            Handler::Value(value) => Ok(Some(value.clone())),
            Handler::Async(_) => {
                Err(format!("hook {name} is asynchronous, it cannot be invoked inline").into())
            }
        }
    }

    fn child(&self) -> CallContext {
        CallContext {
            app: Arc::clone(&self.app),
            exchange: Arc::clone(&self.exchange),
            depth: self.depth + 1,
        }
    }
}
