use std::fmt;

use reqwest::Method;
use serde::Serialize;

use crate::parser::Numeric;

/// The commands understood by the disk management API.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Verb {
    /// Create a new virtual disk
    MakeDisk,
    /// Create, delete or resize a partition
    Fdisk,
    /// Mount a partition
    Mount,
    /// Unmount a mounted partition by id
    Unmount,
    /// Format a mounted partition
    MakeFs,
    /// Log a user into a mounted partition
    Login,
    /// Read the partition table of a disk
    ReadMbr,
    /// Generate a report
    Report,
}

impl Verb {
    /// Dispatch order. A line is matched against these keywords front to back and the
    /// first keyword the line starts with wins.
    pub const ALL: [Verb; 8] = [
        Verb::MakeDisk,
        Verb::Fdisk,
        Verb::Mount,
        Verb::Unmount,
        Verb::MakeFs,
        Verb::Login,
        Verb::ReadMbr,
        Verb::Report,
    ];

    pub const fn keyword(self) -> &'static str {
        match self {
            Verb::MakeDisk => "mkdisk",
            Verb::Fdisk => "fdisk",
            Verb::Mount => "mount",
            Verb::Unmount => "unmount",
            Verb::MakeFs => "mkfs",
            Verb::Login => "login",
            Verb::ReadMbr => "readmbr",
            Verb::Report => "rep",
        }
    }

    pub const fn endpoint(self) -> &'static str {
        match self {
            Verb::MakeDisk => "/api/mkdisk",
            Verb::Fdisk => "/api/fdisk",
            Verb::Mount => "/api/mount",
            Verb::Unmount => "/api/unmount",
            Verb::MakeFs => "/api/mkfs",
            Verb::Login => "/api/login",
            Verb::ReadMbr => "/api/readmbr",
            Verb::Report => "/api/rep",
        }
    }

    /// Find the verb `command` starts with.
    pub fn detect(command: &str) -> Option<Verb> {
        Self::ALL
            .into_iter()
            .find(|verb| command.starts_with(verb.keyword()))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MakeDiskBody {
    pub size: Numeric,
    pub fit: String,
    pub unit: String,
    pub path: String,
}

/// `fdisk -delete=...`
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FdiskDeleteBody {
    /// Either `fast` or `full`, not checked here.
    pub delete: String,
    pub path: String,
    pub name: String,
}

/// `fdisk -add=...`, grows or shrinks a partition.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FdiskResizeBody {
    pub add: Numeric,
    pub unit: String,
    pub path: String,
    pub name: String,
}

/// Plain `fdisk`, creates a partition.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FdiskCreateBody {
    pub size: Numeric,
    pub path: String,
    pub name: String,
    pub unit: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub fit: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MountBody {
    pub path: String,
    pub name: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct UnmountBody {
    pub id: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MakeFsBody {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub fs: String,
}

#[derive(Clone, Eq, PartialEq, Serialize)]
pub struct LoginBody {
    pub user: String,
    pub pass: String,
    pub id: String,
}

impl fmt::Debug for LoginBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginBody")
            .field("user", &self.user)
            .field("pass", &"***")
            .field("id", &self.id)
            .finish()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ReadMbrBody {
    pub path: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ReportBody {
    pub name: String,
    pub path: String,
    pub id: String,
    pub path_file_ls: String,
}

/// Every request shape the API accepts. Serializes to the bare JSON body.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    MakeDisk(MakeDiskBody),
    FdiskDelete(FdiskDeleteBody),
    FdiskResize(FdiskResizeBody),
    FdiskCreate(FdiskCreateBody),
    Mount(MountBody),
    Unmount(UnmountBody),
    MakeFs(MakeFsBody),
    Login(LoginBody),
    ReadMbr(ReadMbrBody),
    Report(ReportBody),
}

impl RequestBody {
    pub const fn verb(&self) -> Verb {
        match self {
            RequestBody::MakeDisk(_) => Verb::MakeDisk,
            RequestBody::FdiskDelete(_)
            | RequestBody::FdiskResize(_)
            | RequestBody::FdiskCreate(_) => Verb::Fdisk,
            RequestBody::Mount(_) => Verb::Mount,
            RequestBody::Unmount(_) => Verb::Unmount,
            RequestBody::MakeFs(_) => Verb::MakeFs,
            RequestBody::Login(_) => Verb::Login,
            RequestBody::ReadMbr(_) => Verb::ReadMbr,
            RequestBody::Report(_) => Verb::Report,
        }
    }
}

/// A command line turned into an API call.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TranslatedRequest {
    body: RequestBody,
}

impl TranslatedRequest {
    pub fn new(body: RequestBody) -> Self {
        Self { body }
    }

    pub fn verb(&self) -> Verb {
        self.body.verb()
    }

    pub fn endpoint(&self) -> &'static str {
        self.verb().endpoint()
    }

    /// Every endpoint of the API is a `POST`.
    pub fn method(&self) -> Method {
        Method::POST
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn into_body(self) -> RequestBody {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_verbs() {
        // Arrange
        let inputs = [
            "mkdisk -size=1",
            "fdisk -size=1",
            "mount -path=/a",
            "unmount -id=341A",
            "mkfs -id=341A",
            "login -user=root",
            "readmbr -path=/a",
            "rep -name=mbr",
            "foobar -x=1",
            "MKDISK -size=1",
            "",
        ];
        let outputs = [
            Some(Verb::MakeDisk),
            Some(Verb::Fdisk),
            Some(Verb::Mount),
            Some(Verb::Unmount),
            Some(Verb::MakeFs),
            Some(Verb::Login),
            Some(Verb::ReadMbr),
            Some(Verb::Report),
            None,
            None,
            None,
        ];

        for (input, output) in inputs.iter().zip(outputs.iter()) {
            // Assert
            assert_eq!(Verb::detect(input), *output, "input {input:?}");
        }
    }

    #[test]
    fn test_detect_is_prefix_based() {
        assert_eq!(Verb::detect("report -name=mbr"), Some(Verb::Report));
        assert_eq!(Verb::detect("mkdisk2 -size=1"), Some(Verb::MakeDisk));
    }

    #[test]
    fn test_every_endpoint_lives_under_api() {
        for verb in Verb::ALL {
            assert_eq!(verb.endpoint(), format!("/api/{}", verb.keyword()));
        }
    }

    #[test]
    fn test_body_serializes_flat() -> Result<(), serde_json::Error> {
        let request = TranslatedRequest::new(RequestBody::MakeFs(MakeFsBody {
            id: "341A".into(),
            kind: "full".into(),
            fs: "2fs".into(),
        }));

        assert_eq!(request.endpoint(), "/api/mkfs");
        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            serde_json::to_value(request.body())?,
            json!({"id": "341A", "type": "full", "fs": "2fs"})
        );

        Ok(())
    }

    #[test]
    fn test_not_a_number_serializes_as_null() -> Result<(), serde_json::Error> {
        let body = RequestBody::FdiskResize(FdiskResizeBody {
            add: None,
            unit: "k".into(),
            path: "/a".into(),
            name: "p1".into(),
        });

        assert_eq!(
            serde_json::to_value(&body)?,
            json!({"add": null, "unit": "k", "path": "/a", "name": "p1"})
        );

        Ok(())
    }

    #[test]
    fn test_login_debug_hides_password() {
        let body = LoginBody {
            user: "root".into(),
            pass: "secret".into(),
            id: "341A".into(),
        };

        let debug = format!("{body:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("root"));
    }
}
