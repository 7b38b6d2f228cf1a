use serde_json::{Value, json};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use switchboard_core::context::Exchange;
use switchboard_core::dispatch::{Dispatch, DispatchOutcome};

/// One-shot dispatch against a local engine, no server involved.
pub async fn run(
    root: PathBuf,
    command: String,
    parameter: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let mut engine = crate::demo::demo_engine(root)?;
    let app = engine.start()?;

    let parameter = match parameter {
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        None => Value::Null,
    };
    let body = serde_json::to_vec(&json!([command, parameter]))?;

    match Dispatch::run(app, Arc::new(Exchange::detached()), &body).await {
        DispatchOutcome::Reply(envelope) => {
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(())
        }
        DispatchOutcome::Silent => Err(format!("command {command} answered nothing").into()),
    }
}
