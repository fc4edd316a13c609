//! Answer synthesis from retrieved context.

use super::generate::{Generator, Result};
use crate::provider::Message;
use serde::{Deserialize, Serialize};

/// Reply used both when nothing relevant was retrieved and when the model
/// finds the context insufficient.
pub const NO_ANSWER: &str = "The uploaded PDF does not contain an answer to this question.";

const SYSTEM_PROMPT: &str = "You are an AI assistant that answers questions about a PDF document.";

/// How an [`Answer`] was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The model answered from the retrieved context.
    Answered,
    /// Context was retrieved but the model found no answer in it.
    Declined,
    /// No chunk met the relevance threshold; the model was not called.
    NoRelevantContent,
}

/// Final result of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    /// Chunks used as context, most relevant first
    pub sources: Vec<String>,
    pub outcome: AnswerOutcome,
}

impl Answer {
    /// The canned reply for a question with no relevant chunks.
    pub fn no_relevant_content(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: NO_ANSWER.to_string(),
            sources: Vec::new(),
            outcome: AnswerOutcome::NoRelevantContent,
        }
    }
}

/// Asks the generative model to answer strictly from retrieved chunks.
#[derive(Clone)]
pub struct Answerer {
    generator: Generator,
}

impl Answerer {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    /// Answers `question` from `sources`, given most relevant first.
    ///
    /// Empty `sources` short-circuit to the canned reply without calling the
    /// model. Model failures are returned as errors, never as the canned reply.
    pub async fn answer(&self, question: &str, sources: Vec<String>) -> Result<Answer> {
        let context = sources.join(" ");
        if context.trim().is_empty() {
            return Ok(Answer::no_relevant_content(question));
        }

        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(build_prompt(&context, question)),
        ];
        let reply = self.generator.generate(messages).await?;
        let answer = reply.trim().to_string();

        let outcome = if is_decline(&answer) {
            AnswerOutcome::Declined
        } else {
            AnswerOutcome::Answered
        };

        Ok(Answer {
            question: question.to_string(),
            answer,
            sources,
            outcome,
        })
    }
}

fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question using ONLY the information from the context below.\n\
         If the answer is NOT present in the context, reply exactly:\n\
         \"{NO_ANSWER}\"\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:"
    )
}

/// Models often wrap the canned reply in quotes.
fn is_decline(answer: &str) -> bool {
    answer.trim_matches(|c: char| c == '"' || c.is_whitespace()) == NO_ANSWER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_context_and_question() {
        let prompt = build_prompt("Paris is in France.", "Where is Paris?");
        assert!(prompt.contains("Context:\nParis is in France."));
        assert!(prompt.contains("Question:\nWhere is Paris?"));
        assert!(prompt.contains(NO_ANSWER));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_decline_detection() {
        assert!(is_decline(NO_ANSWER));
        assert!(is_decline(&format!("\"{}\"\n", NO_ANSWER)));
        assert!(!is_decline("Paris."));
    }

    #[test]
    fn test_no_relevant_content_answer() {
        let answer = Answer::no_relevant_content("Why?");
        assert_eq!(answer.answer, NO_ANSWER);
        assert!(answer.sources.is_empty());
        assert_eq!(answer.outcome, AnswerOutcome::NoRelevantContent);
    }

    #[test]
    fn test_answer_serializes_outcome() {
        let json = serde_json::to_value(Answer::no_relevant_content("q")).unwrap();
        assert_eq!(json["outcome"], "no_relevant_content");
        assert_eq!(json["sources"], serde_json::json!([]));
    }
}
