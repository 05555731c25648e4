use miette::{IntoDiagnostic, Result};
use tracing::warn;

use crate::batch::BatchRunner;
use crate::executor::Execute;

static DEFAULT_PROMPT_INDICATOR: &str = "$ ";
static EXIT_COMMAND: &str = "exit";

/// Interactive loop: every line typed is run as a batch of one.
pub struct Repl<I, O, E>
where
    I: std::io::BufRead,
    O: std::io::Write,
    E: Execute,
{
    input_stream: I,
    output_stream: O,
    runner: BatchRunner<E>,
}

impl<I, O, E> Repl<I, O, E>
where
    I: std::io::BufRead,
    O: std::io::Write,
    E: Execute,
{
    pub fn new(input_stream: I, output_stream: O, runner: BatchRunner<E>) -> Self {
        Self {
            input_stream,
            output_stream,
            runner,
        }
    }

    /// `user@diskcmd$ ` once somebody logged in, `$ ` before that.
    fn prompt(&self) -> String {
        let user = self
            .runner
            .session()
            .map(|session| session.logged_user())
            .transpose()
            .unwrap_or_else(|err| {
                warn!(%err, "could not read logged in user");
                None
            })
            .flatten();

        match user {
            Some(user) => format!("{user}@diskcmd{DEFAULT_PROMPT_INDICATOR}"),
            None => DEFAULT_PROMPT_INDICATOR.to_string(),
        }
    }

    /// Run until `exit` or end of input.
    ///
    /// Reading a line blocks the calling thread, as the input stream is a plain
    /// [`std::io::BufRead`]. Only the commands of a line run on the runtime, so drive this
    /// from a multi-threaded runtime or a task that may block.
    pub async fn run(&mut self) -> Result<()> {
        let mut buffer = String::new();

        loop {
            let prompt = self.prompt();
            self.output_stream
                .write_all(prompt.as_bytes())
                .into_diagnostic()?;
            self.output_stream.flush().into_diagnostic()?;

            buffer.clear();
            if self.input_stream.read_line(&mut buffer).into_diagnostic()? == 0 {
                break;
            }

            let line = buffer.trim();
            if line == EXIT_COMMAND {
                break;
            }
            if line.is_empty() {
                continue;
            }

            let report = self.runner.run(line).await;
            for outcome in report.source_order() {
                writeln!(self.output_stream, "{}", outcome.render()).into_diagnostic()?;
            }
        }

        Ok(())
    }

    pub fn into_runner(self) -> BatchRunner<E> {
        self.runner
    }
}
