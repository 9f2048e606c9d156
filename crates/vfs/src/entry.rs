//! Directory entry model shared by both backends.

use std::fmt;
use std::fs::Metadata;

use chrono::{DateTime, Utc};

use crate::error::VfsError;
use crate::size::FileSize;

/// Timestamp format used in listings (UTC).
pub const MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Directory,
    File,
}

impl EntryType {
    /// Derive the entry type from local filesystem metadata.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        if metadata.is_dir() {
            EntryType::Directory
        } else {
            EntryType::File
        }
    }

    /// Parse the entry type from an MLSD `type` fact.
    ///
    /// Only `dir` and `file` (case-insensitive) are recognized; anything
    /// else, including `cdir`/`pdir`, is an unrecoverable parse error.
    pub fn parse_mlsd_fact(fact: &str) -> Result<Self, VfsError> {
        match fact.to_ascii_lowercase().as_str() {
            "dir" => Ok(EntryType::Directory),
            "file" => Ok(EntryType::File),
            other => Err(VfsError::Parse(format!(
                "unrecognized entry type fact: {other}"
            ))),
        }
    }

    /// Single-letter code used in listing payloads.
    pub fn as_code(&self) -> &'static str {
        match self {
            EntryType::Directory => "D",
            EntryType::File => "F",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A single entry of a directory listing.
///
/// Created per listing call and discarded after response serialization;
/// entries carry no persisted identity.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Entry kind.
    pub entry_type: EntryType,
    /// Entry name (not the full path).
    pub name: String,
    /// Size in bytes with its formatted rendering.
    pub size: FileSize,
    /// Last modification time, UTC, formatted `YYYY-MM-DD HH:MM:SS`.
    pub modified: String,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// Render a UTC timestamp in the listing format.
pub fn format_modified(time: DateTime<Utc>) -> String {
    time.format(MODIFIED_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entry_type_codes() {
        assert_eq!(EntryType::Directory.to_string(), "D");
        assert_eq!(EntryType::File.to_string(), "F");
    }

    #[test]
    fn test_parse_mlsd_fact() {
        assert_eq!(EntryType::parse_mlsd_fact("dir").unwrap(), EntryType::Directory);
        assert_eq!(EntryType::parse_mlsd_fact("file").unwrap(), EntryType::File);
        assert_eq!(EntryType::parse_mlsd_fact("FILE").unwrap(), EntryType::File);
    }

    #[test]
    fn test_parse_mlsd_fact_rejects_unknown() {
        for fact in ["cdir", "pdir", "link", ""] {
            assert!(matches!(
                EntryType::parse_mlsd_fact(fact),
                Err(VfsError::Parse(_))
            ));
        }
    }

    #[test]
    fn test_format_modified() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 5).unwrap();
        assert_eq!(format_modified(time), "2024-01-01 12:30:05");
    }

    #[test]
    fn test_entry_kind_helpers() {
        let entry = DirEntry {
            entry_type: EntryType::File,
            name: "B.mp4".to_string(),
            size: FileSize::new(1024),
            modified: "2024-01-01 00:00:00".to_string(),
        };
        assert!(entry.is_file());
        assert!(!entry.is_directory());
    }
}
