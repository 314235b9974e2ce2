//! Interactive chat loop: terminal rendering of session callbacks plus the
//! conversation history carried across turns.
//!
//! This is the consumer side of the engine's callback contract. Content is
//! printed exactly as flushed, append-only; tool calls render as a spinner
//! while executing and a one-line summary once resolved.

use std::io::Write as _;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::client::BackendClient;
use crate::logging;
use crate::models::{ChatMessage, ChatRequest};
use crate::stream::{
    LogObserver, SessionOutcome, SessionSlot, StreamHandler, ToolCall, ToolStatus, run_session,
};
use crate::utils::{format_params, truncate_with_ellipsis};

/// Max characters of a tool result shown inline.
const RESULT_DISPLAY_LIMIT: usize = 200;
/// Max characters of a parameter list shown in the spinner label.
const PARAMS_DISPLAY_LIMIT: usize = 80;

// === Terminal rendering ===

/// Renders callbacks onto the terminal and accumulates the assistant's
/// visible message for the history.
struct TerminalHandler {
    transcript: String,
    spinner: Option<ProgressBar>,
}

impl TerminalHandler {
    fn new() -> Self {
        Self {
            transcript: String::new(),
            spinner: None,
        }
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn tool_label(call: &ToolCall) -> String {
        let params = format_params(&call.params);
        if params.is_empty() {
            call.name.clone()
        } else {
            format!(
                "{}({})",
                call.name,
                truncate_with_ellipsis(&params, PARAMS_DISPLAY_LIMIT, "…")
            )
        }
    }
}

impl StreamHandler for TerminalHandler {
    fn on_content(&mut self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
        self.transcript.push_str(text);
    }

    fn on_tool_call(&mut self, call: &ToolCall) {
        match call.status {
            ToolStatus::Pending | ToolStatus::Executing => {
                self.clear_spinner();
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::with_template("{spinner} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner.enable_steady_tick(Duration::from_millis(120));
                spinner.set_message(format!("running {}", Self::tool_label(call)));
                self.spinner = Some(spinner);
            }
            ToolStatus::Completed => {
                self.clear_spinner();
                let elapsed = call
                    .duration()
                    .map(|d| format!(" [{:.1}s]", d.num_milliseconds() as f64 / 1000.0))
                    .unwrap_or_default();
                let result = call.result.as_deref().unwrap_or_default();
                println!(
                    "{}",
                    format!(
                        "✔ {}{elapsed} {}",
                        Self::tool_label(call),
                        truncate_with_ellipsis(result, RESULT_DISPLAY_LIMIT, "...")
                    )
                    .green()
                    .dimmed()
                );
            }
            ToolStatus::Failed => {
                self.clear_spinner();
                let error = call.error.as_deref().unwrap_or("unknown error");
                println!(
                    "{}",
                    format!("✘ {} failed: {error}", Self::tool_label(call)).red()
                );
            }
        }
    }

    fn on_error(&mut self, message: &str) {
        self.clear_spinner();
        eprintln!("{}", format!("stream error: {message}").red());
    }

    fn on_complete(&mut self, outcome: SessionOutcome) {
        self.clear_spinner();
        match outcome {
            SessionOutcome::Completed => {
                if !self.transcript.ends_with('\n') {
                    println!();
                }
            }
            SessionOutcome::Cancelled => {
                println!("{}", "— cancelled —".yellow());
            }
            SessionOutcome::Failed => {}
        }
    }
}

// === Chat loop ===

/// One conversation against the backend, turn by turn.
pub struct ChatLoop {
    client: BackendClient,
    history: Vec<ChatMessage>,
    tools: Vec<String>,
    deep_research: bool,
    slot: SessionSlot,
}

impl ChatLoop {
    #[must_use]
    pub fn new(client: BackendClient, tools: Vec<String>, deep_research: bool) -> Self {
        Self {
            client,
            history: Vec::new(),
            tools,
            deep_research,
            slot: SessionSlot::new(),
        }
    }

    /// Interactive loop. Ctrl-C during a turn cancels the turn; Ctrl-C or
    /// Ctrl-D at the prompt exits.
    pub async fn run_repl(&mut self) -> Result<()> {
        let mode = if self.deep_research {
            "deep research"
        } else {
            "regular"
        };
        println!(
            "{} ({mode} mode, tools: {})",
            "deepresearch".bold(),
            if self.tools.is_empty() {
                "none".to_string()
            } else {
                self.tools.join(", ")
            }
        );
        println!("{}", "Type a question, or 'exit' to quit.".dimmed());

        let mut editor = DefaultEditor::new()?;
        loop {
            match editor.readline("you> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if matches!(line, "exit" | "quit") {
                        break;
                    }
                    let _ = editor.add_history_entry(line);
                    if let Err(err) = self.run_turn(line).await {
                        eprintln!("{}", format!("error: {err:#}").red());
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Run one turn: send the conversation, reconcile the stream, record
    /// the assistant's message if the turn completed naturally.
    pub async fn run_turn(&mut self, prompt: &str) -> Result<SessionOutcome> {
        self.history.push(ChatMessage::user(prompt));
        let request = ChatRequest {
            messages: self.history.clone(),
            tools: self.tools.clone(),
            deep_research_mode: self.deep_research,
        };

        let transport = self.client.stream_chat(&request).await?;
        let cancel = self.slot.begin()?;
        let mut handler = TerminalHandler::new();

        let report = {
            let driver = run_session(transport, &mut handler, &LogObserver, cancel.clone());
            tokio::pin!(driver);
            loop {
                tokio::select! {
                    report = &mut driver => break report,
                    _ = tokio::signal::ctrl_c() => {
                        cancel.cancel();
                    }
                }
            }
        };
        self.slot.end();

        if report.outcome == SessionOutcome::Completed && !handler.transcript.is_empty() {
            // Cancelled and failed turns are not recorded: their content was
            // never confirmed and must not steer the next request.
            self.history.push(ChatMessage::assistant(handler.transcript.clone()));
        }

        logging::info(format!(
            "Session {} finished: {:?} with {} tool call(s)",
            report.session_id,
            report.outcome,
            report.tool_calls.len()
        ));
        Ok(report.outcome)
    }

    /// Conversation history accumulated so far.
    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}
