//! The turn orchestration loop implementation.
//!
//! One turn = one user input processed to completion. The runner interleaves
//! chat-completion calls with sequential tool dispatch, pushes progress events
//! to the client as they happen, and persists the turn's messages as a single
//! batch at the end. Events stream over an mpsc channel; dropping the sender
//! closes the stream after the terminal `done`.

use parley_core::backend::{ChatBackend, ChatRequest};
use parley_core::event::StreamEvent;
use parley_core::message::{ConversationId, Message};
use parley_core::tool::ToolRegistry;
use parley_core::HistoryStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default bound on backend calls per turn.
pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Instructions sent as the leading system message when the config provides
/// no override.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a document analysis assistant. \
You answer questions about documents, datasets, and extraction configs by \
calling the available tools against the extraction service. Prefer looking \
data up over guessing; cite concrete values from tool results. When a tool \
returns an error, read it, adjust your arguments, and try again or explain \
the problem to the user.";

/// The orchestrator for one conversation turn.
///
/// Holds the collaborators a turn needs and the per-run tuning knobs. Cheap
/// to clone; each `run_stream` call spawns an independent task.
#[derive(Clone)]
pub struct TurnRunner {
    /// The chat-completion backend
    backend: Arc<dyn ChatBackend>,

    /// The model to request
    model: String,

    /// Sampling temperature
    temperature: f32,

    /// Max tokens per backend response
    max_tokens: Option<u32>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Persisted conversation history
    history: Arc<dyn HistoryStore>,

    /// Leading system message content
    system_prompt: String,

    /// Optional extra context appended to the system prompt
    project_context: Option<String>,

    /// Maximum backend calls per turn
    max_rounds: u32,
}

impl TurnRunner {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        history: Arc<dyn HistoryStore>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            tools,
            history,
            system_prompt: system_prompt.into(),
            project_context: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Set the maximum number of backend calls per turn.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Append project-scoped context to the system prompt.
    pub fn with_project_context(mut self, context: impl Into<String>) -> Self {
        self.project_context = Some(context.into());
        self
    }

    /// Run one turn, streaming events to the returned receiver.
    ///
    /// The turn executes on a spawned task. The receiver yields zero or more
    /// (`tool_call`, `status`, `tool_result`) triples, then `message` or
    /// `error`, then always exactly one `done` before the channel closes.
    pub fn run_stream(
        &self,
        conversation: ConversationId,
        user_messages: Vec<Message>,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel::<StreamEvent>(64);
        let runner = self.clone();
        tokio::spawn(async move {
            runner.run_turn(conversation, user_messages, tx).await;
        });
        rx
    }

    fn system_message(&self) -> Message {
        match &self.project_context {
            Some(ctx) => Message::system(format!("{}\n\n{ctx}", self.system_prompt)),
            None => Message::system(&self.system_prompt),
        }
    }

    async fn run_turn(
        &self,
        conversation: ConversationId,
        user_messages: Vec<Message>,
        tx: mpsc::Sender<StreamEvent>,
    ) {
        info!(
            conversation = conversation.as_str(),
            inputs = user_messages.len(),
            "Starting turn"
        );

        // Context is rebuilt from persisted history every turn. A failed load
        // is logged and treated as an empty history rather than killing the
        // stream.
        let history = match self.history.load(&conversation).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(conversation = conversation.as_str(), error = %e, "History load failed");
                Vec::new()
            }
        };

        let mut context = Vec::with_capacity(history.len() + user_messages.len() + 1);
        context.push(self.system_message());
        context.extend(history);
        context.extend(user_messages.iter().cloned());

        // Everything the turn produces, persisted as one batch at the end.
        let mut turn_messages = user_messages;

        let tool_definitions = self.tools.definitions();
        let mut client_gone = false;

        for round in 1..=self.max_rounds {
            debug!(
                conversation = conversation.as_str(),
                round = round,
                context_len = context.len(),
                "Turn round"
            );

            let request = ChatRequest {
                model: self.model.clone(),
                messages: context.clone(),
                tools: tool_definitions.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let response = match self.backend.complete(request).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(conversation = conversation.as_str(), error = %e, "Backend call failed");
                    let _ = tx
                        .send(StreamEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                    break;
                }
            };

            let calls = response.message.tool_calls().to_vec();

            if calls.is_empty() {
                // Final text answer for the turn.
                let content = response.message.content().to_string();
                turn_messages.push(response.message);
                let _ = tx.send(StreamEvent::Message { content }).await;
                break;
            }

            context.push(response.message.clone());
            turn_messages.push(response.message);

            // Tools run one at a time, in request order. Each result lands in
            // context before the next backend call.
            for call in &calls {
                // Decode once; the decoded value feeds both the event and
                // dispatch. An undecodable payload becomes an error result
                // the model can react to.
                let (arguments, decode_error) =
                    match serde_json::from_str::<serde_json::Value>(&call.arguments) {
                        Ok(value) => (value, None),
                        Err(e) => (
                            serde_json::Value::String(call.arguments.clone()),
                            Some(e.to_string()),
                        ),
                    };

                let announced = tx
                    .send(StreamEvent::ToolCall {
                        tool_name: call.name.clone(),
                        arguments: arguments.clone(),
                    })
                    .await
                    .is_ok()
                    && tx
                        .send(StreamEvent::Status {
                            message: format!("Calling {}…", call.name),
                        })
                        .await
                        .is_ok();
                if !announced {
                    client_gone = true;
                }

                let result = match decode_error {
                    Some(e) => format!("Error: invalid tool arguments: {e}"),
                    None => self.tools.dispatch(&call.name, arguments).await,
                };

                if tx
                    .send(StreamEvent::ToolResult {
                        tool_name: call.name.clone(),
                        result: result.clone(),
                    })
                    .await
                    .is_err()
                {
                    client_gone = true;
                }

                let msg = Message::tool_result(&call.id, &call.name, result);
                context.push(msg.clone());
                turn_messages.push(msg);
            }

            if round == self.max_rounds {
                warn!(
                    conversation = conversation.as_str(),
                    rounds = round,
                    "Round cap reached, ending turn without final message"
                );
            }
        }

        if client_gone {
            debug!(
                conversation = conversation.as_str(),
                "Client disconnected mid-turn"
            );
        }

        // The batch is written whether the turn succeeded, failed, or the
        // client went away. A storage failure loses the turn but must not
        // crash the stream.
        if let Err(e) = self.history.append_batch(&conversation, &turn_messages).await {
            warn!(conversation = conversation.as_str(), error = %e, "Failed to persist turn");
        }

        let _ = tx.send(StreamEvent::Done).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::backend::{ChatResponse, ToolDefinition, Usage};
    use parley_core::error::{BackendError, ToolError};
    use parley_core::message::ToolCall;
    use parley_core::Tool;
    use parley_history::InMemoryStore;
    use std::sync::Mutex;

    /// One scripted backend reply.
    enum Scripted {
        Text(&'static str),
        Calls(Vec<ToolCall>),
        Fail(BackendError),
    }

    /// A backend that replays a fixed script, one entry per `complete` call,
    /// repeating the last entry when the script runs out. Records every
    /// request it sees.
    struct ScriptedBackend {
        script: Mutex<Vec<Scripted>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls_made(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
            self.requests.lock().unwrap().push(request);
            let mut script = self.script.lock().unwrap();
            let entry = if script.len() > 1 {
                script.remove(0)
            } else {
                match script.first() {
                    Some(Scripted::Text(s)) => Scripted::Text(s),
                    Some(Scripted::Calls(calls)) => Scripted::Calls(calls.clone()),
                    Some(Scripted::Fail(e)) => Scripted::Fail(e.clone()),
                    None => Scripted::Fail(BackendError::NoChoices),
                }
            };
            let message = match entry {
                Scripted::Text(s) => Message::assistant(s),
                Scripted::Calls(calls) => Message::assistant_with_calls("", calls),
                Scripted::Fail(e) => return Err(e),
            };
            Ok(ChatResponse {
                message,
                model: "scripted-model".into(),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
            })
        }
    }

    /// A tool that echoes its `text` argument.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
            match arguments["text"].as_str() {
                Some(text) => Ok(text.to_string()),
                None => Err(ToolError::InvalidArguments("Missing 'text'".into())),
            }
        }
    }

    fn registry_with_echo() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        Arc::new(registry)
    }

    fn runner(
        backend: Arc<ScriptedBackend>,
        tools: Arc<ToolRegistry>,
        history: Arc<InMemoryStore>,
    ) -> TurnRunner {
        TurnRunner::new(
            backend,
            "scripted-model",
            tools,
            history,
            DEFAULT_SYSTEM_PROMPT,
        )
    }

    async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    #[tokio::test]
    async fn plain_answer_emits_message_then_done() {
        let backend = Arc::new(ScriptedBackend::new(vec![Scripted::Text("Hello!")]));
        let history = Arc::new(InMemoryStore::new());
        let runner = runner(backend.clone(), registry_with_echo(), history.clone());

        let conv = ConversationId::new();
        let events = collect(runner.run_stream(conv.clone(), vec![Message::user("hi")])).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Message { content } if content == "Hello!"));
        assert!(matches!(events[1], StreamEvent::Done));

        let stored = history.load(&conv).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].content(), "hi");
        assert_eq!(stored[1].content(), "Hello!");
    }

    #[tokio::test]
    async fn tool_round_emits_call_status_result_in_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Scripted::Calls(vec![call("call_1", "echo", r#"{"text":"pong"}"#)]),
            Scripted::Text("It said pong."),
        ]));
        let history = Arc::new(InMemoryStore::new());
        let runner = runner(backend.clone(), registry_with_echo(), history.clone());

        let conv = ConversationId::new();
        let events = collect(runner.run_stream(conv.clone(), vec![Message::user("ping?")])).await;

        assert_eq!(events.len(), 5);
        assert!(
            matches!(&events[0], StreamEvent::ToolCall { tool_name, arguments }
                if tool_name == "echo" && arguments["text"] == "pong")
        );
        assert!(matches!(&events[1], StreamEvent::Status { message }
            if message == "Calling echo…"));
        assert!(matches!(&events[2], StreamEvent::ToolResult { tool_name, result }
            if tool_name == "echo" && result == "pong"));
        assert!(matches!(&events[3], StreamEvent::Message { content }
            if content == "It said pong."));
        assert!(matches!(events[4], StreamEvent::Done));

        // user + assistant(call) + tool + assistant(final)
        let stored = history.load(&conv).await.unwrap();
        assert_eq!(stored.len(), 4);
        assert_eq!(stored[1].tool_calls()[0].id, "call_1");
        assert_eq!(stored[2].tool_call_id(), Some("call_1"));
        assert_eq!(stored[2].content(), "pong");
        assert_eq!(stored[3].content(), "It said pong.");
    }

    #[tokio::test]
    async fn sibling_calls_run_in_request_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Scripted::Calls(vec![
                call("call_a", "echo", r#"{"text":"first"}"#),
                call("call_b", "echo", r#"{"text":"second"}"#),
            ]),
            Scripted::Text("done"),
        ]));
        let history = Arc::new(InMemoryStore::new());
        let runner = runner(backend.clone(), registry_with_echo(), history.clone());

        let conv = ConversationId::new();
        let events = collect(runner.run_stream(conv.clone(), vec![Message::user("go")])).await;

        let results: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ToolResult { result, .. } => Some(result.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(results, vec!["first", "second"]);

        let stored = history.load(&conv).await.unwrap();
        assert_eq!(stored[2].tool_call_id(), Some("call_a"));
        assert_eq!(stored[3].tool_call_id(), Some("call_b"));
    }

    #[tokio::test]
    async fn backend_failure_emits_error_then_done_and_persists_input() {
        let backend = Arc::new(ScriptedBackend::new(vec![Scripted::Fail(
            BackendError::Api {
                status_code: 500,
                message: "upstream exploded".into(),
            },
        )]));
        let history = Arc::new(InMemoryStore::new());
        let runner = runner(backend.clone(), registry_with_echo(), history.clone());

        let conv = ConversationId::new();
        let events = collect(runner.run_stream(conv.clone(), vec![Message::user("hi")])).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Error { message }
            if message.contains("LLM API error") && message.contains("500")));
        assert!(matches!(events[1], StreamEvent::Done));

        // The user input still lands in history even though the turn failed.
        let stored = history.load(&conv).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content(), "hi");
    }

    #[tokio::test]
    async fn round_cap_stops_a_tool_calling_loop_silently() {
        // The script never yields text, so the runner must hit the cap.
        let backend = Arc::new(ScriptedBackend::new(vec![Scripted::Calls(vec![call(
            "call_n",
            "echo",
            r#"{"text":"again"}"#,
        )])]));
        let history = Arc::new(InMemoryStore::new());
        let runner =
            runner(backend.clone(), registry_with_echo(), history.clone()).with_max_rounds(3);

        let conv = ConversationId::new();
        let events = collect(runner.run_stream(conv.clone(), vec![Message::user("loop")])).await;

        assert_eq!(backend.calls_made(), 3);

        // Three triples and a done; no message, no error.
        assert_eq!(events.len(), 10);
        assert!(!events
            .iter()
            .any(|e| matches!(e, StreamEvent::Message { .. } | StreamEvent::Error { .. })));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));

        // user + 3 × (assistant + tool)
        let stored = history.load(&conv).await.unwrap();
        assert_eq!(stored.len(), 7);
    }

    #[tokio::test]
    async fn unknown_tool_becomes_result_text_not_failure() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Scripted::Calls(vec![call("call_1", "does_not_exist", "{}")]),
            Scripted::Text("recovered"),
        ]));
        let history = Arc::new(InMemoryStore::new());
        let runner = runner(backend.clone(), registry_with_echo(), history.clone());

        let conv = ConversationId::new();
        let events = collect(runner.run_stream(conv.clone(), vec![Message::user("hm")])).await;

        assert!(events.iter().any(|e| matches!(e,
            StreamEvent::ToolResult { result, .. } if result == "unknown tool: does_not_exist")));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));

        let stored = history.load(&conv).await.unwrap();
        assert_eq!(stored[2].content(), "unknown tool: does_not_exist");
    }

    #[tokio::test]
    async fn undecodable_arguments_become_an_error_result() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Scripted::Calls(vec![call("call_1", "echo", "{not json")]),
            Scripted::Text("ok"),
        ]));
        let history = Arc::new(InMemoryStore::new());
        let runner = runner(backend.clone(), registry_with_echo(), history.clone());

        let conv = ConversationId::new();
        let events = collect(runner.run_stream(conv, vec![Message::user("x")])).await;

        // The raw string still travels on the tool_call event.
        assert!(events.iter().any(|e| matches!(e,
            StreamEvent::ToolCall { arguments, .. } if arguments.as_str() == Some("{not json"))));
        assert!(events.iter().any(|e| matches!(e,
            StreamEvent::ToolResult { result, .. }
                if result.starts_with("Error: invalid tool arguments"))));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn history_is_replayed_into_the_next_turn() {
        let backend = Arc::new(ScriptedBackend::new(vec![Scripted::Text("answer")]));
        let history = Arc::new(InMemoryStore::new());
        let conv = ConversationId::new();
        history
            .append_batch(
                &conv,
                &[Message::user("earlier"), Message::assistant("noted")],
            )
            .await
            .unwrap();

        let runner = runner(backend.clone(), registry_with_echo(), history.clone());
        let _ = collect(runner.run_stream(conv.clone(), vec![Message::user("now")])).await;

        let request = &backend.requests.lock().unwrap()[0];
        // system + 2 history + 1 new user
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[1].content(), "earlier");
        assert_eq!(request.messages[3].content(), "now");
    }

    #[tokio::test]
    async fn project_context_lands_in_the_system_message() {
        let backend = Arc::new(ScriptedBackend::new(vec![Scripted::Text("ok")]));
        let history = Arc::new(InMemoryStore::new());
        let runner = runner(backend.clone(), registry_with_echo(), history)
            .with_project_context("All documents are Brazilian legal filings.");

        let _ = collect(runner.run_stream(ConversationId::new(), vec![Message::user("q")])).await;

        let request = &backend.requests.lock().unwrap()[0];
        let system = request.messages[0].content();
        assert!(system.contains("Brazilian legal filings"));
        assert!(system.contains("document analysis assistant"));
    }

    #[tokio::test]
    async fn tool_definitions_travel_on_every_request() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Scripted::Calls(vec![call("call_1", "echo", r#"{"text":"a"}"#)]),
            Scripted::Text("done"),
        ]));
        let history = Arc::new(InMemoryStore::new());
        let runner = runner(backend.clone(), registry_with_echo(), history);

        let _ = collect(runner.run_stream(ConversationId::new(), vec![Message::user("q")])).await;

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        for request in requests.iter() {
            let names: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(names, vec!["echo"]);
        }
    }

    #[test]
    fn definitions_are_plain_tool_definitions() {
        let registry = registry_with_echo();
        let defs: Vec<ToolDefinition> = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }
}
