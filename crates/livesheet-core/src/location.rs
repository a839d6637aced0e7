//! Remote document and worksheet addressing

use crate::error::{Error, Result};
use std::fmt;

/// Where a document lives in the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DriveScope {
    /// A specific drive, by drive identifier
    Drive(String),
    /// The default drive of a user identity (id or principal name)
    User(String),
}

impl DriveScope {
    /// URL prefix of the drive, relative to the API base
    pub fn drive_prefix(&self) -> String {
        match self {
            DriveScope::Drive(id) => format!("/drives/{}", urlencoding::encode(id)),
            DriveScope::User(id) => format!("/users/{}/drive", urlencoding::encode(id)),
        }
    }
}

/// A remote file: storage scope plus a slash-separated path from the drive root.
///
/// Immutable once constructed; the path is normalized (no leading, trailing
/// or repeated slashes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentLocation {
    scope: DriveScope,
    path: String,
}

impl DocumentLocation {
    /// Create a location from a full path such as `Clientes/Acme/Factura.xlsx`
    pub fn new(scope: DriveScope, path: impl AsRef<str>) -> Result<Self> {
        let path = normalize_path(path.as_ref());
        if path.is_empty() {
            return Err(Error::InvalidLocation("empty document path".into()));
        }
        Ok(Self { scope, path })
    }

    /// Create a location from a folder path and a file name
    pub fn in_folder(scope: DriveScope, folder: &str, file_name: &str) -> Result<Self> {
        if file_name.contains('/') || file_name.trim().is_empty() {
            return Err(Error::InvalidLocation(format!(
                "invalid file name '{file_name}'"
            )));
        }
        Self::new(scope, format!("{folder}/{file_name}"))
    }

    pub fn scope(&self) -> &DriveScope {
        &self.scope
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name component of the path
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// URL of the drive item, relative to the API base (`/drives/x/root:/a/b.xlsx:`)
    pub fn item_path(&self) -> String {
        format!(
            "{}/root:/{}:",
            self.scope.drive_prefix(),
            encode_path(&self.path)
        )
    }

    /// URL of the item's workbook resource, relative to the API base
    pub fn workbook_path(&self) -> String {
        format!("{}/workbook", self.item_path())
    }

    /// Refer to a worksheet of this document by name
    pub fn sheet(&self, name: impl Into<String>) -> WorksheetRef {
        WorksheetRef::named(self.clone(), name)
    }

    /// Refer to the document's first worksheet
    pub fn first_sheet(&self) -> WorksheetRef {
        WorksheetRef::first(self.clone())
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            DriveScope::Drive(id) => write!(f, "drive:{id}:/{}", self.path),
            DriveScope::User(id) => write!(f, "user:{id}:/{}", self.path),
        }
    }
}

/// A worksheet of a remote document. `sheet: None` means the first sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorksheetRef {
    pub location: DocumentLocation,
    pub sheet: Option<String>,
}

impl WorksheetRef {
    pub fn named(location: DocumentLocation, sheet: impl Into<String>) -> Self {
        Self {
            location,
            sheet: Some(sheet.into()),
        }
    }

    pub fn first(location: DocumentLocation) -> Self {
        Self {
            location,
            sheet: None,
        }
    }

    /// URL of the named worksheet resource, or `None` if the sheet is unresolved
    pub fn worksheet_path(&self) -> Option<String> {
        self.sheet.as_ref().map(|name| {
            format!(
                "{}/worksheets/{}",
                self.location.workbook_path(),
                urlencoding::encode(name)
            )
        })
    }
}

impl fmt::Display for WorksheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(name) => write!(f, "{}[{name}]", self.location),
            None => write!(f, "{}[first]", self.location),
        }
    }
}

/// Join path pieces, dropping empty segments.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(str::trim)
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
