//! One chat session: its history, context, model choice, parameter
//! overrides, and the cached latest response.

use parking_lot::Mutex;

use llmfs_domain::config::{ConfigStore, ModelParameters};
use llmfs_domain::error::Result;
use llmfs_domain::message::{Conversation, Message, Role};
use llmfs_providers::ChatBackend;

/// A single multi-turn conversation addressed as `/conversations/<id>`.
///
/// One mutex guards all mutable state, so operations on a session observe a
/// total order; concurrent writers interleave whole operations, never
/// half-applied ones.
pub struct Session {
    id: String,
    state: Mutex<SessionState>,
}

struct SessionState {
    conversation: Conversation,
    model_name: String,
    /// Session-level parameter overrides, layered on top of the effective
    /// model parameters at query time.
    params: ModelParameters,
    latest_response: String,
}

impl Session {
    pub fn new(id: impl Into<String>, default_model: &str) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(SessionState {
                conversation: Conversation::default(),
                model_name: default_model.to_owned(),
                params: ModelParameters::default(),
                latest_response: String::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn latest_response(&self) -> String {
        self.state.lock().latest_response.clone()
    }

    pub fn context(&self) -> String {
        self.state.lock().conversation.context.clone()
    }

    pub fn set_context(&self, context: impl Into<String>) {
        self.state.lock().conversation.context = context.into();
        tracing::debug!(session = %self.id, "context replaced");
    }

    pub fn model(&self) -> String {
        self.state.lock().model_name.clone()
    }

    pub fn set_model(&self, model: impl Into<String>) {
        let model = model.into();
        tracing::debug!(session = %self.id, model = %model, "model selected");
        self.state.lock().model_name = model;
    }

    pub fn params(&self) -> ModelParameters {
        self.state.lock().params.clone()
    }

    pub fn merge_params(&self, params: &ModelParameters) {
        self.state.lock().params.merge(params);
        tracing::debug!(session = %self.id, "session parameters updated");
    }

    /// Number of messages currently in the history.
    pub fn history_len(&self) -> usize {
        self.state.lock().conversation.len()
    }

    /// Render the transcript: an optional `[SYSTEM]` block from the
    /// session-level system prompt, then `[USER]`/`[AI]` blocks in insertion
    /// order.
    pub fn formatted_history(&self) -> String {
        let state = self.state.lock();
        let mut out = String::new();

        if let Some(prompt) = state.params.system_prompt.as_deref() {
            out.push_str("[SYSTEM]\n");
            out.push_str(prompt);
            out.push_str("\n\n");
        }

        for msg in &state.conversation.messages {
            let tag = match msg.role {
                Role::User => "[USER]\n",
                Role::Assistant => "[AI]\n",
                // System turns are carried separately from the transcript view.
                Role::System => continue,
            };
            out.push_str(tag);
            out.push_str(&msg.content);
            out.push_str("\n\n");
        }
        out
    }

    /// Append a user prompt, run the conversation query, and append the
    /// assistant's answer.
    ///
    /// The session lock is held across the LLM call, serialising the
    /// session. On failure the user message is rolled back so the history is
    /// exactly as it was before the call.
    pub fn add_prompt(
        &self,
        prompt: &str,
        config: &ConfigStore,
        llm: &dyn ChatBackend,
    ) -> Result<String> {
        let mut state = self.state.lock();

        let model = config.resolve_model(&state.model_name);
        let effective = config.model_params(&model).merged(&state.params);

        state.conversation.push(Message::now(Role::User, prompt));

        match llm.conversation_query(&model, &effective, &state.conversation) {
            Ok(response) => {
                state
                    .conversation
                    .push(Message::now(Role::Assistant, response.clone()));
                state.latest_response = response.clone();
                tracing::info!(
                    session = %self.id,
                    model = %model,
                    turns = state.conversation.len(),
                    "prompt answered"
                );
                Ok(response)
            }
            Err(e) => {
                state.conversation.messages.pop();
                tracing::error!(session = %self.id, model = %model, error = %e, "prompt failed");
                Err(e)
            }
        }
    }

    /// Seed a fresh session with one exchange, without calling the LLM.
    /// Used to archive stateless `/models` queries as conversations.
    pub fn populate(&self, prompt: &str, response: &str) {
        let mut state = self.state.lock();
        state.conversation.push(Message::now(Role::User, prompt));
        state
            .conversation
            .push(Message::now(Role::Assistant, response));
        state.latest_response = response.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmfs_domain::config::MountConfig;
    use llmfs_domain::error::Error;

    struct ScriptedBackend {
        models: Vec<String>,
        response: std::result::Result<String, ()>,
    }

    impl ChatBackend for ScriptedBackend {
        fn models(&self) -> &[String] {
            &self.models
        }

        fn simple_query(
            &self,
            _model: &str,
            _prompt: &str,
            _params: &ModelParameters,
        ) -> Result<String> {
            self.response
                .clone()
                .map_err(|_| Error::backend("llm", "scripted failure"))
        }

        fn conversation_query(
            &self,
            _model: &str,
            _params: &ModelParameters,
            _conversation: &Conversation,
        ) -> Result<String> {
            self.response
                .clone()
                .map_err(|_| Error::backend("llm", "scripted failure"))
        }
    }

    fn store() -> ConfigStore {
        ConfigStore::new(MountConfig::default())
    }

    fn backend(response: std::result::Result<&str, ()>) -> ScriptedBackend {
        ScriptedBackend {
            models: vec!["m0".into()],
            response: response.map(str::to_owned),
        }
    }

    #[test]
    fn add_prompt_appends_both_turns() {
        let session = Session::new("s", "m0");
        let config = store();
        let llm = backend(Ok("hello"));

        let answer = session.add_prompt("hi", &config, &llm).unwrap();
        assert_eq!(answer, "hello");
        assert_eq!(session.latest_response(), "hello");
        assert_eq!(session.history_len(), 2);

        let history = session.formatted_history();
        assert!(history.contains("[USER]\nhi\n\n"));
        assert!(history.contains("[AI]\nhello\n\n"));
    }

    #[test]
    fn failed_prompt_rolls_back_the_user_turn() {
        let session = Session::new("s", "m0");
        let config = store();
        let llm = backend(Err(()));

        let before = session.formatted_history();
        assert!(session.add_prompt("hi", &config, &llm).is_err());
        assert_eq!(session.history_len(), 0);
        assert_eq!(session.formatted_history(), before);
        assert_eq!(session.latest_response(), "");
    }

    #[test]
    fn system_prompt_override_shows_in_history() {
        let session = Session::new("s", "m0");
        session.merge_params(&ModelParameters {
            temperature: None,
            system_prompt: Some("be brief".into()),
        });
        assert!(session
            .formatted_history()
            .starts_with("[SYSTEM]\nbe brief\n\n"));
    }

    #[test]
    fn populate_seeds_one_exchange() {
        let session = Session::new("s", "m0");
        session.populate("2+2?", "4");
        assert_eq!(session.latest_response(), "4");
        assert_eq!(session.history_len(), 2);
    }
}
