//! Per-request dispatch: parse, session init, resolve, execute, format.
//!
//! Every request runs this pipeline to a terminal outcome. All failures
//! short-circuit into a `{code: "error", info}` reply, with one exception:
//! an async handler whose future settles to an error has already passed the
//! reply window (`AfterExec` fired when the future was created), so the
//! engine logs it and returns [`DispatchOutcome::Silent`]: no reply at all,
//! and the transport leaves the client waiting.

use crate::context::{AppContext, CallContext, Exchange};
use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::events::LifecycleEvent;
use crate::resource::{Handler, Registered};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Hook name checked during session initialization.
pub const SESSION_START_HOOK: &str = "session_start";

/// Request-level failures, rendered verbatim into the reply `info`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Not JSON valid : [{0}]")]
    NotJson(String),
    #[error("Not object")]
    NotObject,
    #[error("Not array")]
    NotArray,
    #[error("Command is not string")]
    CommandNotString,
    #[error("Unable to initialize session : {0}")]
    SessionInit(String),
    #[error("Command {0} is not defined")]
    NotDefined(String),
    #[error("Command {0} is private")]
    Private(String),
    #[error("Unable to execute command {0} : {1}")]
    Execution(String, String),
    #[error("Command {0} no return")]
    NoReturn(String),
}

/// What the transport does with a finished dispatch.
#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Serialize the envelope and answer the request.
    Reply(ResponseEnvelope),
    /// Answer nothing; the connection stays parked.
    Silent,
}

/// Decodes a request body into its `[command, parameter]` pair.
pub fn parse_request(raw: &[u8]) -> Result<RequestEnvelope, DispatchError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|err| DispatchError::NotJson(err.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        // null is grouped with objects: both report "Not array"
        Value::Object(_) | Value::Null => return Err(DispatchError::NotArray),
        _ => return Err(DispatchError::NotObject),
    };
    let mut items = items.into_iter();
    let command = match items.next() {
        Some(Value::String(command)) => command,
        _ => return Err(DispatchError::CommandNotString),
    };
    let parameter = items.next().unwrap_or(Value::Null);
    Ok(RequestEnvelope { command, parameter })
}

/// One request's trip through the pipeline.
pub struct Dispatch {
    ctx: CallContext,
    response: ResponseEnvelope,
}

impl Dispatch {
    /// Runs a request body against the application and returns the outcome.
    pub async fn run(
        app: Arc<AppContext>,
        exchange: Arc<Exchange>,
        body: &[u8],
    ) -> DispatchOutcome {
        let dispatch = Dispatch {
            ctx: CallContext::new(app, exchange),
            response: ResponseEnvelope::new(),
        };
        match dispatch.process(body).await {
            Ok(outcome) => outcome,
            Err(err) => DispatchOutcome::Reply(ResponseEnvelope::error(err.to_string())),
        }
    }

    async fn process(mut self, body: &[u8]) -> Result<DispatchOutcome, DispatchError> {
        let request = parse_request(body)?;
        debug!("dispatching {}", request.command);
        self.init_session().await?;

        let Some(entry) = self.ctx.app().lookup(&request.command).cloned() else {
            return Err(DispatchError::NotDefined(request.command));
        };
        let Registered::Command(handler) = entry else {
            return Err(DispatchError::Private(request.command));
        };

        self.emit(LifecycleEvent::BeforeExec);
        match handler {
            Handler::Sync(f) => match f(&self.ctx, request.parameter) {
                Ok(result) => {
                    self.emit(LifecycleEvent::AfterExec);
                    match result {
                        Some(value) => self.response.absorb(&request.command, value),
                        None => return Err(DispatchError::NoReturn(request.command)),
                    }
                }
                Err(err) => {
                    warn!("command {} failed: {err}", request.command);
                    return Err(DispatchError::Execution(request.command, err.to_string()));
                }
            },
            Handler::Async(f) => {
                let pending = f(self.ctx.clone(), request.parameter);
                // The reply window closes when the future is handed over,
                // not when it settles.
                self.emit(LifecycleEvent::AfterExec);
                match pending.await {
                    Ok(Some(value)) => self.response.absorb(&request.command, value),
                    Ok(None) => return Err(DispatchError::NoReturn(request.command)),
                    Err(err) => {
                        error!("command {} rejected after reply window: {err}", request.command);
                        return Ok(DispatchOutcome::Silent);
                    }
                }
            }
            Handler::Value(value) => {
                self.response.absorb(&request.command, value);
                self.emit(LifecycleEvent::AfterExec);
            }
        }
        Ok(DispatchOutcome::Reply(self.response))
    }

    /// Runs the `session_start` hook if one is registered, or stages the
    /// permissive CORS defaults.
    async fn init_session(&self) -> Result<(), DispatchError> {
        let Some(entry) = self.ctx.app().lookup(SESSION_START_HOOK).cloned() else {
            let exchange = self.ctx.exchange();
            exchange.set_header("Access-Control-Allow-Origin", "*");
            exchange.set_header("Access-Control-Allow-Headers", "*");
            return Ok(());
        };
        let Registered::Hook(handler) = entry else {
            return Err(DispatchError::SessionInit(format!(
                "{SESSION_START_HOOK} is not a hook"
            )));
        };
        let result = match handler {
            Handler::Sync(f) => f(&self.ctx, Value::Null),
            Handler::Async(f) => f(self.ctx.clone(), Value::Null).await,
            Handler::Value(_) => Err(format!("{SESSION_START_HOOK} hook is not callable").into()),
        };
        result
            .map(|_| ())
            .map_err(|err| DispatchError::SessionInit(err.to_string()))
    }

    fn emit(&self, event: LifecycleEvent) {
        self.ctx.shared_app().emit(event);
    }
}
