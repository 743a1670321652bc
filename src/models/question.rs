use serde::{Deserialize, Serialize};

/// `POST /recommend` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

/// `POST /recommend` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    /// Subject of the bearer token.
    pub mbr_id: String,
    pub question: String,
    /// The question re-encoded as `{"question": ...}`.
    pub wrapped_question: String,
    pub answer: String,
}
