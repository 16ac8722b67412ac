use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::answer::AnswerMailbox;
use crate::bus::{Message, MessageBus};
use crate::llm::{CompletionError, CompletionProvider};

/// Deterministic answer used when the model produces nothing usable.
pub const NO_GENERATION_FALLBACK: &str = "No response generated.";

/// Turns retrieved context plus a query into an answer.
///
/// Payload contract: `{retrieved_context, query}`. Builds the prompt,
/// invokes the injected completion provider, and delivers the answer to
/// the mailbox under the message's trace ID. A `NoGeneration` result
/// delivers the fallback answer instead of failing; any other provider
/// error propagates to the dispatching caller.
pub struct SynthesisStage {
    provider: Arc<dyn CompletionProvider>,
    mailbox: Arc<AnswerMailbox>,
}

impl SynthesisStage {
    pub fn register(
        bus: &MessageBus,
        provider: Arc<dyn CompletionProvider>,
        mailbox: Arc<AnswerMailbox>,
    ) {
        let stage = Self { provider, mailbox };
        bus.register(super::SYNTHESIS, Arc::new(move |msg| stage.handle(msg)));
    }

    fn handle(&self, message: Message) -> Result<()> {
        let query = message.str_field("query")?;
        let context = message.str_list_field("retrieved_context")?;

        let prompt = build_prompt(&context, query);
        let answer = match self.provider.complete(&prompt) {
            Ok(text) => text,
            Err(CompletionError::NoGeneration) => {
                warn!(trace_id = %message.trace_id, "Model produced no generation, using fallback");
                NO_GENERATION_FALLBACK.to_string()
            }
            Err(e) => return Err(e.into()),
        };

        info!(trace_id = %message.trace_id, "Answer synthesized");
        self.mailbox.deliver(&message.trace_id, answer);
        Ok(())
    }
}

fn build_prompt(context: &[String], query: &str) -> String {
    format!("Context:\n{}\n\nQuestion: {}", context.join("\n\n"), query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MessageKind;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Provider returning a canned result and recording its prompts.
    struct ScriptedProvider {
        result: fn() -> Result<String, CompletionError>,
        prompts: Mutex<Vec<String>>,
    }

    impl CompletionProvider for ScriptedProvider {
        fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.result)()
        }
    }

    fn scripted(result: fn() -> Result<String, CompletionError>) -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider {
            result,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn result_message(trace_id: &str) -> Message {
        let mut payload = serde_json::Map::new();
        payload.insert(
            "retrieved_context".to_string(),
            serde_json::json!(["alpha beta", "gamma delta"]),
        );
        payload.insert("query".to_string(), "what is alpha?".into());
        Message::new(
            super::super::RETRIEVAL,
            super::super::SYNTHESIS,
            MessageKind::RetrievalResult,
            trace_id,
            payload,
        )
    }

    #[test]
    fn test_answer_is_delivered_to_trace() {
        let bus = MessageBus::new();
        let mailbox = Arc::new(AnswerMailbox::new());
        let provider = scripted(|| Ok("Alpha is the first letter.".to_string()));
        SynthesisStage::register(&bus, provider.clone(), Arc::clone(&mailbox));

        let handle = mailbox.register("trace-answer");
        bus.dispatch(result_message("trace-answer")).unwrap();

        let answer = handle.wait(Duration::from_millis(10)).unwrap();
        assert_eq!(answer, "Alpha is the first letter.");

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            "Context:\nalpha beta\n\ngamma delta\n\nQuestion: what is alpha?"
        );
    }

    #[test]
    fn test_no_generation_delivers_fallback() {
        let bus = MessageBus::new();
        let mailbox = Arc::new(AnswerMailbox::new());
        let provider = scripted(|| Err(CompletionError::NoGeneration));
        SynthesisStage::register(&bus, provider, Arc::clone(&mailbox));

        let handle = mailbox.register("trace-fallback");
        bus.dispatch(result_message("trace-fallback")).unwrap();

        let answer = handle.wait(Duration::from_millis(10)).unwrap();
        assert_eq!(answer, NO_GENERATION_FALLBACK);
    }

    #[test]
    fn test_provider_failure_propagates() {
        let bus = MessageBus::new();
        let mailbox = Arc::new(AnswerMailbox::new());
        let provider = scripted(|| {
            Err(CompletionError::Api {
                status: 500,
                body: "server error".to_string(),
            })
        });
        SynthesisStage::register(&bus, provider, Arc::clone(&mailbox));

        let handle = mailbox.register("trace-error");
        assert!(bus.dispatch(result_message("trace-error")).is_err());
        // Nothing was delivered.
        assert!(handle.wait(Duration::from_millis(10)).is_err());
    }

    #[test]
    fn test_empty_context_still_answers() {
        let bus = MessageBus::new();
        let mailbox = Arc::new(AnswerMailbox::new());
        let provider = scripted(|| Ok("answer".to_string()));
        SynthesisStage::register(&bus, provider.clone(), Arc::clone(&mailbox));

        let mut payload = serde_json::Map::new();
        payload.insert("retrieved_context".to_string(), serde_json::json!([]));
        payload.insert("query".to_string(), "lonely question".into());
        let message = Message::new(
            super::super::RETRIEVAL,
            super::super::SYNTHESIS,
            MessageKind::RetrievalResult,
            "trace-empty",
            payload,
        );

        let handle = mailbox.register("trace-empty");
        bus.dispatch(message).unwrap();
        assert_eq!(handle.wait(Duration::from_millis(10)).unwrap(), "answer");

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts[0], "Context:\n\n\nQuestion: lonely question");
    }
}
