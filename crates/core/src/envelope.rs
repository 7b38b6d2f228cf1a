//! Request and response envelopes of the wire protocol.

use serde::Serialize;
use serde_json::{Number, Value};

/// The `[command, parameter]` pair carried by a request body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub command: String,
    pub parameter: Value,
}

/// `code` and `info` accept strings or numbers; anything else a handler
/// supplies for them is ignored on merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnvelopeField {
    Text(String),
    Number(Number),
}

impl EnvelopeField {
    pub fn text(value: impl Into<String>) -> Self {
        EnvelopeField::Text(value.into())
    }

    /// Validated conversion from an arbitrary JSON value.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(EnvelopeField::Text(text.clone())),
            Value::Number(number) => Some(EnvelopeField::Number(number.clone())),
            _ => None,
        }
    }
}

/// The `{code, info, body}` reply triple.
///
/// Engine-generated errors carry no `body`; every handler-produced reply
/// does. Fields a handler leaves unset keep their previous values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub code: EnvelopeField,
    pub info: EnvelopeField,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ResponseEnvelope {
    /// The envelope every request starts from, before any handler runs.
    pub fn new() -> Self {
        ResponseEnvelope {
            code: EnvelopeField::text("success"),
            info: EnvelopeField::text("process..."),
            body: Some(Value::Object(serde_json::Map::new())),
        }
    }

    /// A bodyless `{code: "error", info}` reply.
    pub fn error(info: impl Into<String>) -> Self {
        ResponseEnvelope {
            code: EnvelopeField::text("error"),
            info: EnvelopeField::text(info),
            body: None,
        }
    }

    pub fn set_body(&mut self, body: Value) -> &mut Self {
        self.body = Some(body);
        self
    }

    pub fn set_code(&mut self, code: &Value) -> &mut Self {
        if let Some(field) = EnvelopeField::from_value(code) {
            self.code = field;
        }
        self
    }

    pub fn set_info(&mut self, info: &Value) -> &mut Self {
        if let Some(field) = EnvelopeField::from_value(info) {
            self.info = field;
        }
        self
    }

    /// Merges a handler result into the envelope.
    ///
    /// A result shaped `{code?, info?, body?}` contributes whichever of the
    /// three fields it carries; the rest keep their prior values. Any other
    /// result becomes the whole `body`, with `code` forced to `success` and
    /// `info` to `<command> executed`.
    pub fn absorb(&mut self, command: &str, result: Value) {
        let mut merged = false;
        if let Value::Object(fields) = &result {
            if let Some(body) = fields.get("body") {
                self.set_body(body.clone());
                merged = true;
            }
            if let Some(info) = fields.get("info") {
                self.set_info(info);
                merged = true;
            }
            if let Some(code) = fields.get("code") {
                self.set_code(code);
                merged = true;
            }
        }
        if !merged {
            self.set_body(result);
            self.code = EnvelopeField::text("success");
            self.info = EnvelopeField::text(format!("{command} executed"));
        }
    }
}

impl Default for ResponseEnvelope {
    fn default() -> Self {
        Self::new()
    }
}
