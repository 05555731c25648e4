pub mod batch;
pub mod cli;
pub mod command;
pub mod disks;
pub mod error;
pub mod executor;
pub mod parser;
pub mod repl;
pub mod session;
pub mod translate;

pub use batch::{BatchReport, BatchRunner, Transcript};
pub use command::{RequestBody, TranslatedRequest, Verb};
pub use error::{CommandError, ExecuteError};
pub use executor::{Execute, HttpExecutor};
pub use translate::translate;
