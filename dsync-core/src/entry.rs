//! Remote listing entries

use crate::RemotePath;
use serde::{Deserialize, Serialize};

/// Entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
    Unknown,
}

/// One entry of a remote listing
///
/// `path` is the raw string the store returned. Directories end with `/`.
/// Stores that know the real type of an entry fill in `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub path: String,
    pub kind: Option<EntryKind>,
}

impl ListingEntry {
    /// An entry whose kind must be guessed from its shape.
    pub fn raw(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: None }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: Some(EntryKind::File) }
    }

    /// A directory entry; the path is given a trailing `/` if missing.
    pub fn directory(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self { path, kind: Some(EntryKind::Directory) }
    }

    pub fn kind(&self) -> EntryKind {
        classify_entry(self)
    }

    pub fn remote_path(&self) -> RemotePath {
        RemotePath::new(&self.path)
    }
}

/// Decide whether a listing entry is a file or a directory.
///
/// An explicit kind from the store always wins. Otherwise the shape of the
/// path decides: a trailing `/` marks a directory, any `.` in the path marks
/// a file, anything else is `Unknown`.
///
/// The shape rule misreads dotted directory names listed without a trailing
/// separator (`/data.v2/x` with no `/` is taken as a file) and never
/// recognizes extensionless files (`/output/README` is `Unknown`).
pub fn classify_entry(entry: &ListingEntry) -> EntryKind {
    if let Some(kind) = entry.kind {
        return kind;
    }
    if entry.path.ends_with('/') {
        EntryKind::Directory
    } else if entry.path.contains('.') {
        EntryKind::File
    } else {
        EntryKind::Unknown
    }
}
