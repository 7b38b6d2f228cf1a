//! Lifecycle event bus.
//!
//! An ordered list of callbacks per lifecycle point, invoked synchronously
//! in registration order. A panicking listener propagates; there is no
//! de-registration.

use crate::context::AppContext;
use std::sync::Arc;

/// The three points the engine fires around its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The registry has been built and sealed.
    OnStart,
    /// A command has been resolved and authorized, and is about to run.
    BeforeExec,
    /// A command invocation has returned (for async handlers: before the
    /// returned future settles).
    AfterExec,
}

pub type Listener = Box<dyn Fn(&Arc<AppContext>) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    on_start: Vec<Listener>,
    before_exec: Vec<Listener>,
    after_exec: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, event: LifecycleEvent, listener: F)
    where
        F: Fn(&Arc<AppContext>) + Send + Sync + 'static,
    {
        self.listeners_mut(event).push(Box::new(listener));
    }

    pub fn emit(&self, event: LifecycleEvent, app: &Arc<AppContext>) {
        for listener in self.listeners(event) {
            listener(app);
        }
    }

    pub fn listener_count(&self, event: LifecycleEvent) -> usize {
        self.listeners(event).len()
    }

    fn listeners(&self, event: LifecycleEvent) -> &[Listener] {
        match event {
            LifecycleEvent::OnStart => &self.on_start,
            LifecycleEvent::BeforeExec => &self.before_exec,
            LifecycleEvent::AfterExec => &self.after_exec,
        }
    }

    fn listeners_mut(&mut self, event: LifecycleEvent) -> &mut Vec<Listener> {
        match event {
            LifecycleEvent::OnStart => &mut self.on_start,
            LifecycleEvent::BeforeExec => &mut self.before_exec,
            LifecycleEvent::AfterExec => &mut self.after_exec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn empty_app() -> Arc<AppContext> {
        Arc::new(Registry::new().seal(PathBuf::from(".")))
    }

    #[test]
    fn test_listeners_fire_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.on(LifecycleEvent::BeforeExec, move |_| {
                seen.lock().unwrap().push(tag);
            });
        }

        bus.emit(LifecycleEvent::BeforeExec, &empty_app());
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_events_are_independent() {
        let count = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        let counter = Arc::clone(&count);
        bus.on(LifecycleEvent::OnStart, move |_| {
            *counter.lock().unwrap() += 1;
        });

        let app = empty_app();
        bus.emit(LifecycleEvent::BeforeExec, &app);
        bus.emit(LifecycleEvent::AfterExec, &app);
        assert_eq!(*count.lock().unwrap(), 0);
        bus.emit(LifecycleEvent::OnStart, &app);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_emit_without_listeners_is_a_no_op() {
        let bus = EventBus::new();
        bus.emit(LifecycleEvent::AfterExec, &empty_app());
        assert_eq!(bus.listener_count(LifecycleEvent::AfterExec), 0);
    }
}
