//! Rule-based replies with a question-answering fallback.

use crate::answer::QuestionAnswering;

pub const GREETING: &str = "Hello! How can I help you today?";
pub const STATUS: &str = "I'm just a bot, but I'm here to help you!";
pub const FAREWELL: &str = "Goodbye! Have a great day!";
pub const IDENTITY: &str = "I am Beso Chatbot, here to assist you.";
pub const HELP_PROMPT: &str = "Sure! How can I assist you today?";
pub const UNKNOWN_ANSWER: &str = "I'm sorry, I don't know the answer to that.";
pub const APOLOGY: &str = "Sorry, I couldn't process that question.";

/// Keyword rules in priority order. A rule fires when the lowercased input
/// contains any of its keywords; the first firing rule wins.
const RULES: &[(&[&str], &str)] = &[
    (&["hello", "hi"], GREETING),
    (&["how are you"], STATUS),
    (&["bye", "goodbye"], FAREWELL),
    (&["name"], IDENTITY),
    (&["help"], HELP_PROMPT),
];

/// Canned reply for `input`, if any keyword rule matches.
pub fn match_rule(input: &str) -> Option<&'static str> {
    let normalized = input.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| normalized.contains(k)))
        .map(|&(_, reply)| reply)
}

pub struct ResponseDispatcher {
    answers: Box<dyn QuestionAnswering>,
}

impl ResponseDispatcher {
    pub fn new(answers: Box<dyn QuestionAnswering>) -> Self {
        Self { answers }
    }

    /// Reply to one message. Never fails: lookup errors become [`APOLOGY`].
    pub async fn respond(&self, input: &str) -> String {
        if let Some(reply) = match_rule(input) {
            return reply.to_string();
        }

        match self.answers.answer(input).await {
            Ok(Some(answer)) => answer,
            Ok(None) => UNKNOWN_ANSWER.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "question lookup failed");
                APOLOGY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::AnswerError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Canned {
        Answer(&'static str),
        Nothing,
        Fail,
    }

    struct FakeAnswers {
        reply: Canned,
        asked: Mutex<Vec<String>>,
    }

    impl FakeAnswers {
        fn new(reply: Canned) -> Self {
            Self { reply, asked: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl QuestionAnswering for FakeAnswers {
        async fn answer(&self, question: &str) -> Result<Option<String>, AnswerError> {
            self.asked.lock().unwrap().push(question.to_string());
            match self.reply {
                Canned::Answer(text) => Ok(Some(text.to_string())),
                Canned::Nothing => Ok(None),
                Canned::Fail => Err(AnswerError::Status(503)),
            }
        }
    }

    fn dispatcher(reply: Canned) -> ResponseDispatcher {
        ResponseDispatcher::new(Box::new(FakeAnswers::new(reply)))
    }

    #[test]
    fn test_rules_match_by_containment() {
        assert_eq!(match_rule("hello there"), Some(GREETING));
        assert_eq!(match_rule("HI"), Some(GREETING));
        assert_eq!(match_rule("so, how are you?"), Some(STATUS));
        assert_eq!(match_rule("bye now"), Some(FAREWELL));
        assert_eq!(match_rule("Goodbye"), Some(FAREWELL));
        assert_eq!(match_rule("what's your name"), Some(IDENTITY));
        assert_eq!(match_rule("I need help"), Some(HELP_PROMPT));
        assert_eq!(match_rule("xyz123 unmatched"), None);
    }

    #[test]
    fn test_rule_priority() {
        // Greeting outranks everything that follows it
        assert_eq!(match_rule("hi, how are you, bye"), Some(GREETING));
        // Status outranks farewell
        assert_eq!(match_rule("how are you? bye"), Some(STATUS));
        // Farewell outranks identity and help
        assert_eq!(match_rule("bye, name, help"), Some(FAREWELL));
        // "hi" is a plain substring: "this" counts
        assert_eq!(match_rule("this"), Some(GREETING));
    }

    #[tokio::test]
    async fn test_rule_reply_skips_lookup() {
        let answers = FakeAnswers::new(Canned::Fail);
        let d = ResponseDispatcher { answers: Box::new(answers) };
        assert_eq!(d.respond("hello there").await, GREETING);
        assert_eq!(d.respond("bye now").await, FAREWELL);
    }

    #[tokio::test]
    async fn test_fallback_answer() {
        let d = dispatcher(Canned::Answer("Forty-two."));
        assert_eq!(d.respond("xyz123 unmatched").await, "Forty-two.");
    }

    #[tokio::test]
    async fn test_fallback_passes_raw_input() {
        let answers = std::sync::Arc::new(FakeAnswers::new(Canned::Nothing));

        struct Shared(std::sync::Arc<FakeAnswers>);

        #[async_trait]
        impl QuestionAnswering for Shared {
            async fn answer(&self, question: &str) -> Result<Option<String>, AnswerError> {
                self.0.answer(question).await
            }
        }

        let d = ResponseDispatcher::new(Box::new(Shared(answers.clone())));
        d.respond("Quantum Chromodynamics?").await;
        assert_eq!(*answers.asked.lock().unwrap(), vec!["Quantum Chromodynamics?".to_string()]);
    }

    #[tokio::test]
    async fn test_fallback_without_answer() {
        let d = dispatcher(Canned::Nothing);
        assert_eq!(d.respond("xyz123 unmatched").await, UNKNOWN_ANSWER);
    }

    #[tokio::test]
    async fn test_fallback_failure_apologizes() {
        let d = dispatcher(Canned::Fail);
        assert_eq!(d.respond("xyz123 unmatched").await, APOLOGY);
    }
}
