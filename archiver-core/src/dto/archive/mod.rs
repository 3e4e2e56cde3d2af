//! Archive DTOs

use serde::{Deserialize, Serialize};

/// A file in the archive store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveList {
    pub archives: Vec<Archive>,
}

/// Request to rename an archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameArchive {
    pub name: String,
}
