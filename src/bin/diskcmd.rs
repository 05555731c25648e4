use std::io::{self, Read, Write};
use std::path::Path;

use clap::Parser;
use diskcmd::{
    batch::BatchRunner,
    cli::{Action, DiskCmdCli},
    disks,
    executor::HttpExecutor,
    repl::Repl,
    session::{FileStore, Session},
};
use miette::{IntoDiagnostic, Result};
use tracing::info;

fn read_script(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path).into_diagnostic(),
        _ => {
            let mut script = String::new();
            io::stdin().read_to_string(&mut script).into_diagnostic()?;
            Ok(script)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DiskCmdCli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(io::stderr)
        .init();

    let session = Session::new(FileStore::open(&cli.store)?);
    let executor = HttpExecutor::new(cli.base_url.clone());
    info!(base_url = %executor.base_url(), "using disk management API");

    match cli.action {
        Action::Run { file, order } => {
            let script = read_script(file.as_deref())?;
            let runner = BatchRunner::new(executor).with_session(session);
            let report = runner.run(&script).await;
            info!(
                commands = report.len(),
                failures = report.failures(),
                "batch finished"
            );

            let mut stdout = io::stdout().lock();
            for entry in report.render(order) {
                writeln!(stdout, "{entry}").into_diagnostic()?;
            }
        }
        Action::Repl => {
            let runner = BatchRunner::new(executor).with_session(session);
            let mut repl = Repl::new(io::stdin().lock(), io::stdout(), runner);
            repl.run().await?;
        }
        Action::Disks { partitions } => {
            let mut stdout = io::stdout().lock();
            disks::show(&session, &executor, partitions, &mut stdout).await?;
        }
    }

    Ok(())
}
