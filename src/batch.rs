use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use clap::ValueEnum;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::error::CommandError;
use crate::executor::Execute;
use crate::session::Session;
use crate::translate::translate;

/// Output of every command run so far. Only ever appended to.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry` and return its position.
    pub fn append(&self, entry: impl Into<String>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push(entry.into());
        entries.len() - 1
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which order to present a batch's outcomes in.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum)]
pub enum TranscriptOrder {
    /// The order the commands finished in
    #[default]
    Arrival,
    /// The order the commands were written in
    Source,
}

/// What happened to one line of a batch.
#[derive(Debug)]
pub struct LineOutcome {
    /// Index of the line among the non-blank lines of the batch.
    pub index: usize,
    /// Position of this outcome's entry in the transcript.
    pub position: usize,
    pub command: String,
    pub result: Result<Value, CommandError>,
}

impl LineOutcome {
    /// Transcript text for this outcome: the compact response JSON or `Error: <message>`.
    pub fn render(&self) -> String {
        render(&self.result)
    }
}

pub fn render(result: &Result<Value, CommandError>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(err) => format!("Error: {err}"),
    }
}

/// Outcomes of one batch, one per non-blank line.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<LineOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcomes in the order the lines were written.
    pub fn source_order(&self) -> impl Iterator<Item = &LineOutcome> {
        self.outcomes.iter()
    }

    /// Outcomes in the order they reached the transcript.
    pub fn arrival_order(&self) -> impl Iterator<Item = &LineOutcome> {
        let mut arrived: Vec<&LineOutcome> = self.outcomes.iter().collect();
        arrived.sort_by_key(|outcome| outcome.position);
        arrived.into_iter()
    }

    pub fn render(&self, order: TranscriptOrder) -> Vec<String> {
        match order {
            TranscriptOrder::Arrival => self.arrival_order().map(LineOutcome::render).collect(),
            TranscriptOrder::Source => self.source_order().map(LineOutcome::render).collect(),
        }
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }
}

/// Split `text` into commands, dropping empty and whitespace-only lines.
pub fn split_commands(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs batches of commands concurrently against an executor.
pub struct BatchRunner<E: Execute> {
    executor: Arc<E>,
    session: Option<Session>,
    transcript: Transcript,
}

impl<E: Execute> BatchRunner<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
            session: None,
            transcript: Transcript::new(),
        }
    }

    /// Record logins and created disks in `session`.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Run every non-blank line of `text` as its own task.
    ///
    /// Each outcome is appended to the transcript as soon as its line finishes, so the
    /// transcript follows completion order. A failing line never affects the others.
    pub async fn run(&self, text: &str) -> BatchReport {
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();

        for (index, command) in split_commands(text).into_iter().enumerate() {
            let executor = Arc::clone(&self.executor);
            let session = self.session.clone();
            let transcript = self.transcript.clone();

            let task_command = command.clone();
            let handle = tasks.spawn(async move {
                let result = run_line(executor.as_ref(), session.as_ref(), &task_command).await;
                let position = transcript.append(render(&result));
                LineOutcome {
                    index,
                    position,
                    command: task_command,
                    result,
                }
            });
            pending.insert(handle.id(), (index, command));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    let Some((index, command)) = pending.remove(&err.id()) else {
                        error!(%err, "unknown command task failed");
                        continue;
                    };
                    error!(%err, %command, "command task failed");
                    let result = Err(CommandError::TaskFailed {
                        reason: err.to_string(),
                    });
                    let position = self.transcript.append(render(&result));
                    outcomes.push(LineOutcome {
                        index,
                        position,
                        command,
                        result,
                    });
                }
            }
        }

        outcomes.sort_by_key(|outcome| outcome.index);
        BatchReport { outcomes }
    }
}

async fn run_line<E: Execute>(
    executor: &E,
    session: Option<&Session>,
    command: &str,
) -> Result<Value, CommandError> {
    let result = execute_line(executor, session, command).await;
    if let Err(err) = &result {
        warn!(%command, %err, "command failed");
    }
    result
}

async fn execute_line<E: Execute>(
    executor: &E,
    session: Option<&Session>,
    command: &str,
) -> Result<Value, CommandError> {
    let request = translate(command)?.ok_or_else(|| CommandError::unsupported(command))?;
    debug!(verb = %request.verb(), endpoint = request.endpoint(), "translated command");

    let response = executor.execute(request.clone()).await?;

    if let Some(session) = session {
        if let Err(err) = session.observe(&request) {
            warn!(%err, "could not update session");
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_commands_drops_blank_lines() {
        // Arrange
        let input = "mkdisk -size=1\n\n   \n\tfdisk -size=2\r\nrep -id=1\n";

        // Assert
        assert_eq!(
            split_commands(input),
            vec!["mkdisk -size=1", "\tfdisk -size=2", "rep -id=1"]
        );
    }

    #[test]
    fn test_transcript_append_returns_position() {
        let transcript = Transcript::new();

        assert!(transcript.is_empty());
        assert_eq!(transcript.append("first"), 0);
        assert_eq!(transcript.append(String::from("second")), 1);
        assert_eq!(transcript.entries(), vec!["first", "second"]);
    }

    #[test]
    fn test_render_outcomes() {
        let ok: Result<Value, CommandError> = Ok(serde_json::json!({"message": "ok"}));
        let unsupported: Result<Value, CommandError> = Err(CommandError::unsupported("foo"));

        assert_eq!(render(&ok), r#"{"message":"ok"}"#);
        assert_eq!(
            render(&unsupported),
            "Error: command not valid or unsupported"
        );
    }
}
