//! Demo resource set served by default.
//!
//! The names here are activated by the marker files under `demos/`:
//! `sum`, `Iam`, `whoami` and `stat` commands, the `on_start` hook and the
//! `hit_counter` plugin. `square` is registered directly by
//! [`demo_engine`], bypassing the scanner, as a bundled command.

use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use switchboard_core::Result;
use switchboard_core::context::CallContext;
use switchboard_core::engine::Engine;
use switchboard_core::events::LifecycleEvent;
use switchboard_core::registry::Registry;
use switchboard_core::resource::{
    Handler, HandlerError, HandlerResult, Resource, ResourceCatalog, ResourceKind, SharedPlugin,
};
use tracing::{info, warn};

pub const SESSION_COOKIE: &str = "switchboard-session";

/// Request counters kept across the life of the server by the
/// `hit_counter` plugin.
#[derive(Debug, Default)]
pub struct HitCounter {
    dispatched: AtomicU64,
    completed: AtomicU64,
}

impl HitCounter {
    /// Commands that reached execution (`BeforeExec`).
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Invocations that returned (`AfterExec`).
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

/// Implementations for the resource names shipped under `demos/`.
pub fn demo_catalog() -> ResourceCatalog {
    ResourceCatalog::new()
        .with("sum", Resource::Command(Handler::sync(sum)))
        .with("Iam", Resource::Command(Handler::sync(iam)))
        .with("whoami", Resource::Command(Handler::sync(whoami)))
        .with("stat", Resource::Command(Handler::sync(stat)))
        .with("on_start", Resource::Hook(Handler::sync(on_start)))
        .with("hit_counter", Resource::plugin(hit_counter))
}

/// An engine over `root` resolving against the demo catalog, with the
/// bundled `square` command pre-registered.
pub fn demo_engine(root: PathBuf) -> Result<Engine> {
    let mut engine = Engine::new(root, demo_catalog());
    engine.register("square", Resource::Command(Handler::sync(square)))?;
    Ok(engine)
}

fn square(_ctx: &CallContext, param: Value) -> HandlerResult {
    if let Some(n) = param.as_i64() {
        if let Some(squared) = n.checked_mul(n) {
            return Ok(Some(json!(squared)));
        }
    }
    let x = param.as_f64().ok_or("square expects a number")?;
    Ok(Some(json!(x * x)))
}

/// Adds up an array. An element that is itself an array is taken as a
/// nested `[command, argument]` call whose result joins the sum.
fn sum(ctx: &CallContext, param: Value) -> HandlerResult {
    let Value::Array(items) = param else {
        return Ok(Some(json!(0)));
    };
    let mut total = 0f64;
    for item in items {
        let value = match item {
            Value::Array(call) => {
                let mut call = call.into_iter();
                let name = match call.next() {
                    Some(Value::String(name)) => name,
                    _ => return Err("nested calls need a command name".into()),
                };
                ctx.invoke(&name, call.next().unwrap_or(Value::Null))?
            }
            other => other,
        };
        total += value
            .as_f64()
            .ok_or_else(|| format!("sum expects numbers, got {value}"))?;
    }
    Ok(Some(collapse(total)))
}

fn iam(ctx: &CallContext, param: Value) -> HandlerResult {
    match param {
        Value::String(name) => {
            ctx.exchange().set_cookie(SESSION_COOKIE, &name);
            Ok(Some(json!({
                "info": format!("Welcome {name}, now you can check command [\"whoami\"]"),
                "body": name
            })))
        }
        _ => Ok(Some(json!({
            "code": "error",
            "info": "absent parameter, example : [\"Iam\", \"Julien\"]",
            "body": false
        }))),
    }
}

fn whoami(ctx: &CallContext, _param: Value) -> HandlerResult {
    match ctx.exchange().header("cookie") {
        Some(cookie) => {
            let session = cookie.split('=').nth(1).unwrap_or_default();
            Ok(Some(json!({
                "info": format!("You are {session}, try [\"stat\"] command"),
                "body": session
            })))
        }
        None => Ok(Some(json!({"info": "You are not connected", "body": false}))),
    }
}

fn stat(ctx: &CallContext, _param: Value) -> HandlerResult {
    let hits = ctx
        .plugin_as::<HitCounter>("hit_counter")
        .ok_or("hit_counter plugin is not loaded")?;
    let (mut commands, mut hooks, mut plugins) = (0, 0, 0);
    for (_, kind) in ctx.app().resources() {
        match kind {
            ResourceKind::Command => commands += 1,
            ResourceKind::Hook => hooks += 1,
            ResourceKind::Plugin => plugins += 1,
        }
    }
    Ok(Some(json!({
        "dispatched": hits.dispatched(),
        "completed": hits.completed(),
        "commands": commands,
        "hooks": hooks,
        "plugins": plugins,
    })))
}

fn on_start(ctx: &CallContext, _param: Value) -> HandlerResult {
    info!("serving resources from {}", ctx.app().root().display());
    info!(r#"try: curl -d '["sum", [1, 2, ["square", 3]]]' http://localhost:8000"#);
    Ok(None)
}

/// Counts dispatches over the event bus and runs the `on_start` hook when
/// the engine comes up.
fn hit_counter(registry: &mut Registry) -> std::result::Result<SharedPlugin, HandlerError> {
    let counter = Arc::new(HitCounter::default());

    let hits = Arc::clone(&counter);
    registry.on(LifecycleEvent::BeforeExec, move |_| {
        hits.dispatched.fetch_add(1, Ordering::Relaxed);
    });
    let hits = Arc::clone(&counter);
    registry.on(LifecycleEvent::AfterExec, move |_| {
        hits.completed.fetch_add(1, Ordering::Relaxed);
    });
    registry.on(LifecycleEvent::OnStart, |app| {
        // the hook is optional; a tree without the marker file skips it
        if app.lookup("on_start").is_some() {
            if let Err(err) = app.detached_call().invoke_hook("on_start", Value::Null) {
                warn!("on_start hook failed: {err}");
            }
        }
    });

    Ok(counter as SharedPlugin)
}

/// JSON numbers sum as floats; render whole results as integers.
fn collapse(total: f64) -> Value {
    if total.is_finite() && total.fract() == 0.0 {
        json!(total as i64)
    } else {
        json!(total)
    }
}
