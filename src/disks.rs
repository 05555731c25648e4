use std::io::Write;

use miette::{IntoDiagnostic, Result};
use serde::Deserialize;
use serde_json::Value;
use tabled::{Table, Tabled};
use tracing::warn;

use crate::command::{ReadMbrBody, RequestBody, TranslatedRequest};
use crate::error::CommandError;
use crate::executor::Execute;
use crate::session::Session;

/// One entry of the partition table returned by `/api/readmbr`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Tabled)]
pub struct PartitionRow {
    #[serde(default)]
    #[tabled(display = "display_value")]
    pub name: Value,
    #[serde(rename = "type", default)]
    #[tabled(rename = "type", display = "display_value")]
    pub kind: Value,
    #[serde(default)]
    #[tabled(display = "display_value")]
    pub size: Value,
    #[serde(default)]
    #[tabled(display = "display_value")]
    pub start: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct DiskRow {
    pub disk: String,
    pub path: String,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// File name of a disk path.
pub fn disk_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Ask the server for the partitions of the disk at `path`.
///
/// A `null` or otherwise unexpected body is treated as a disk without partitions.
pub async fn partitions<E: Execute>(
    executor: &E,
    path: &str,
) -> Result<Vec<PartitionRow>, CommandError> {
    let request = TranslatedRequest::new(RequestBody::ReadMbr(ReadMbrBody {
        path: path.to_string(),
    }));
    let body = executor.execute(request).await?;

    if body.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(body).unwrap_or_else(|err| {
        warn!(%err, %path, "unexpected partition table");
        Vec::new()
    }))
}

/// Write the disks remembered by `session`, with their partitions when requested.
///
/// A disk whose partitions cannot be read gets its error printed and the listing goes on.
pub async fn show<E, W>(
    session: &Session,
    executor: &E,
    with_partitions: bool,
    out: &mut W,
) -> Result<()>
where
    E: Execute,
    W: Write,
{
    let disks = session.disks()?;
    if disks.is_empty() {
        writeln!(out, "No disks created yet.").into_diagnostic()?;
        return Ok(());
    }

    if !with_partitions {
        let rows = disks.iter().map(|path| DiskRow {
            disk: disk_name(path).to_string(),
            path: path.clone(),
        });
        writeln!(out, "{}", Table::new(rows)).into_diagnostic()?;
        return Ok(());
    }

    for path in &disks {
        writeln!(out, "Disk: {} ({path})", disk_name(path)).into_diagnostic()?;
        match partitions(executor, path).await {
            Ok(rows) if rows.is_empty() => {
                writeln!(out, "No partitions found.").into_diagnostic()?;
            }
            Ok(rows) => writeln!(out, "{}", Table::new(rows)).into_diagnostic()?,
            Err(err) => writeln!(out, "Error: {err}").into_diagnostic()?,
        }
    }

    Ok(())
}
