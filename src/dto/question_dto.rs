use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AskQuestionPayload {
    #[validate(length(min = 3, max = 1000))]
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerQuestionPayload {
    #[validate(length(min = 1, max = 2000))]
    pub answer: String,
}
