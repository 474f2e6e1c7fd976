use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SubmitMessageRequest {
    #[serde(default)]
    pub message: String,
}
