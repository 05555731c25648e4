use tracing::trace;

use crate::command::{
    FdiskCreateBody, FdiskDeleteBody, FdiskResizeBody, LoginBody, MakeDiskBody, MakeFsBody,
    MountBody, ReadMbrBody, ReportBody, RequestBody, TranslatedRequest, UnmountBody, Verb,
};
use crate::error::CommandError;
use crate::parser::{self, ArgumentMap, Numeric};

/// Partition fit used by `fdisk` when `-fit` is not given.
pub const DEFAULT_PARTITION_FIT: &str = "w";
/// Filesystem used by `mkfs` when `-fs` is not given.
pub const DEFAULT_FILESYSTEM: &str = "2fs";

/// Turn one command line into a request.
///
/// Returns `Ok(None)` when the line does not start with a known verb. Required
/// arguments that are missing are reported as [`CommandError::MissingArgument`], naming
/// the first missing field in body order.
pub fn translate(line: &str) -> Result<Option<TranslatedRequest>, CommandError> {
    let Some(verb) = Verb::detect(line) else {
        return Ok(None);
    };

    let args = CommandArguments {
        verb,
        line,
        arguments: parser::extract(line),
    };
    trace!(%verb, arguments = args.arguments.len(), "extracted arguments");

    let body = match verb {
        Verb::MakeDisk => RequestBody::MakeDisk(MakeDiskBody {
            size: args.integer("size")?,
            fit: args.lowered("fit")?,
            unit: args.lowered("unit")?,
            path: args.verbatim("path")?,
        }),
        Verb::Fdisk => fdisk(&args)?,
        Verb::Mount => RequestBody::Mount(MountBody {
            path: args.verbatim("path")?,
            name: args.lowered("name")?,
        }),
        Verb::Unmount => RequestBody::Unmount(UnmountBody {
            id: args.verbatim("id")?,
        }),
        Verb::MakeFs => RequestBody::MakeFs(MakeFsBody {
            id: args.verbatim("id")?,
            kind: args.lowered("type")?,
            fs: args.lowered_or("fs", DEFAULT_FILESYSTEM),
        }),
        Verb::Login => RequestBody::Login(LoginBody {
            user: args.verbatim("user")?,
            pass: args.verbatim("pass")?,
            id: args.verbatim("id")?,
        }),
        Verb::ReadMbr => RequestBody::ReadMbr(ReadMbrBody {
            path: args.verbatim("path")?,
        }),
        Verb::Report => RequestBody::Report(ReportBody {
            name: args.verbatim("name")?,
            path: args.verbatim("path")?,
            id: args.verbatim("id")?,
            path_file_ls: args.verbatim_or("path_file_ls", ""),
        }),
    };

    Ok(Some(TranslatedRequest::new(body)))
}

/// `fdisk` picks its shape by priority: `-delete` beats `-add`, which beats creation.
/// Only the fields of the chosen shape are read.
fn fdisk(args: &CommandArguments<'_>) -> Result<RequestBody, CommandError> {
    if let Some(mode) = args.arguments.present("delete") {
        return Ok(RequestBody::FdiskDelete(FdiskDeleteBody {
            delete: mode.to_lowercase(),
            path: args.verbatim("path")?,
            name: args.lowered("name")?,
        }));
    }

    if let Some(add) = args.arguments.present("add") {
        return Ok(RequestBody::FdiskResize(FdiskResizeBody {
            add: parser::parse_integer(add),
            unit: args.lowered("unit")?,
            path: args.verbatim("path")?,
            name: args.lowered("name")?,
        }));
    }

    Ok(RequestBody::FdiskCreate(FdiskCreateBody {
        size: args.optional_integer("size"),
        path: args.verbatim("path")?,
        name: args.lowered("name")?,
        unit: args.lowered("unit")?,
        kind: args.lowered("type")?,
        fit: args.lowered_or("fit", DEFAULT_PARTITION_FIT),
    }))
}

/// Arguments of a line together with what is needed to report a missing one.
struct CommandArguments<'a> {
    verb: Verb,
    line: &'a str,
    arguments: ArgumentMap,
}

impl CommandArguments<'_> {
    fn required(&self, field: &'static str) -> Result<&str, CommandError> {
        self.arguments
            .get(field)
            .ok_or_else(|| CommandError::missing_argument(self.verb, field, self.line))
    }

    fn verbatim(&self, field: &'static str) -> Result<String, CommandError> {
        self.required(field).map(str::to_string)
    }

    fn lowered(&self, field: &'static str) -> Result<String, CommandError> {
        self.required(field).map(str::to_lowercase)
    }

    fn integer(&self, field: &'static str) -> Result<Numeric, CommandError> {
        self.required(field).map(parser::parse_integer)
    }

    fn optional_integer(&self, field: &str) -> Numeric {
        self.arguments.get(field).and_then(parser::parse_integer)
    }

    fn verbatim_or(&self, field: &str, default: &str) -> String {
        self.arguments.present(field).unwrap_or(default).to_string()
    }

    fn lowered_or(&self, field: &str, default: &str) -> String {
        self.arguments
            .present(field)
            .map_or_else(|| default.to_string(), str::to_lowercase)
    }
}
