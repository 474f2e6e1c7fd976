//! The external meal interpreter.
//!
//! The interpreter turns a free-text meal description into either a food
//! breakdown or a clarification request. Its raw JSON is converted into an
//! [`Interpretation`] exactly once, here, so downstream code matches on a
//! closed set of outcomes.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum InterpreterFault {
    #[error("interpreter timed out")]
    Timeout,
    #[error("interpreter unreachable: {0}")]
    Transport(String),
    #[error("interpreter returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("interpreter payload malformed: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for InterpreterFault {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InterpreterFault::Timeout
        } else if e.is_decode() {
            InterpreterFault::Malformed(e.to_string())
        } else {
            InterpreterFault::Transport(e.to_string())
        }
    }
}

/// One food the interpreter recognised.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodDetail {
    pub food: String,
    /// The measurement when the interpreter gave one, otherwise the quantity.
    pub quantity_or_measurement: Option<String>,
    pub calories: f64,
    pub protein: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Clarification { suggestions: Vec<String> },
    Breakdown { summary: String, details: Vec<FoodDetail> },
    /// Parsed as JSON but matches neither known shape.
    Unrecognized,
}

#[derive(Deserialize)]
struct ClarificationWire {
    #[serde(alias = "needsClarification")]
    needs_clarification: bool,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct BreakdownWire {
    summary: String,
    #[serde(default)]
    details: Vec<DetailWire>,
}

#[derive(Deserialize)]
struct DetailWire {
    food: String,
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default)]
    measurement: Option<String>,
    calories: f64,
    protein: f64,
}

impl From<DetailWire> for FoodDetail {
    fn from(d: DetailWire) -> Self {
        let measurement = d
            .measurement
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        let quantity = match d.quantity {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        };
        Self {
            food: d.food,
            quantity_or_measurement: measurement.or(quantity),
            calories: d.calories,
            protein: d.protein,
        }
    }
}

impl Interpretation {
    /// Clarification is checked first; a payload carrying both shapes is a clarification.
    pub fn from_value(value: Value) -> Self {
        if let Ok(c) = serde_json::from_value::<ClarificationWire>(value.clone()) {
            if c.needs_clarification {
                return Interpretation::Clarification {
                    suggestions: c.suggestions,
                };
            }
        }
        match serde_json::from_value::<BreakdownWire>(value) {
            Ok(b) if !b.summary.trim().is_empty() => Interpretation::Breakdown {
                summary: b.summary,
                details: b.details.into_iter().map(FoodDetail::from).collect(),
            },
            _ => Interpretation::Unrecognized,
        }
    }
}

#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, utterance: &str) -> Result<Interpretation, InterpreterFault>;
}

/// Interpreter reached over HTTP: `POST {url}` with `{"message": ...}`.
#[derive(Clone, Debug)]
pub struct HttpInterpreter {
    client: reqwest::Client,
    url: String,
}

impl HttpInterpreter {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build interpreter http client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Interpreter for HttpInterpreter {
    #[instrument(skip(self, utterance), fields(url = %self.url))]
    async fn interpret(&self, utterance: &str) -> Result<Interpretation, InterpreterFault> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "message": utterance }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InterpreterFault::Status {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }

        let value: Value = resp.json().await?;
        debug!(%status, "interpreter replied");
        Ok(Interpretation::from_value(value))
    }
}
