use tracing::warn;

use crate::chat::transcript::{BreakdownItem, EntryKind, Reply};
use crate::interpreter::{Interpretation, InterpreterFault};

pub const APOLOGY_TEXT: &str =
    "Sorry, I couldn't process that. Please try again with a different description.";

pub fn clarification_text(utterance: &str) -> String {
    format!(
        "I'm not sure what you mean by \"{utterance}\". Could you be more specific? Here are some suggestions:"
    )
}

/// Turns whatever the interpreter produced into exactly one system reply.
/// Faults are logged and replaced with the apology; they never escape.
pub fn classify(utterance: &str, outcome: Result<Interpretation, InterpreterFault>) -> Reply {
    match outcome {
        Ok(Interpretation::Clarification { suggestions }) => Reply {
            text: clarification_text(utterance),
            kind: EntryKind::Clarification { suggestions },
        },
        Ok(Interpretation::Breakdown { summary, details }) => Reply {
            text: summary,
            kind: EntryKind::Breakdown {
                breakdown_items: details
                    .into_iter()
                    .map(|d| BreakdownItem {
                        label: d.food,
                        quantity_or_measurement: d.quantity_or_measurement,
                        calories: d.calories,
                        protein: d.protein,
                    })
                    .collect(),
            },
        },
        Ok(Interpretation::Unrecognized) => {
            warn!("interpreter reply matched no known shape");
            apology()
        }
        Err(fault) => {
            warn!(error = %fault, "interpreter call failed");
            apology()
        }
    }
}

pub fn apology() -> Reply {
    Reply {
        text: APOLOGY_TEXT.to_string(),
        kind: EntryKind::Error,
    }
}
