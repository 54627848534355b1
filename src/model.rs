// Shared data model used across state, input handling, and rendering.
// - Defines app enums (focus targets, tabs, convert form fields, sort order).
// - Defines playlist entries with identifiers stable across reloads.
use std::{cmp::Ordering, path::PathBuf, time::SystemTime};

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub id: Uuid,
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size_bytes: Option<u64>,
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Left,
    RightTop,
    RightBottom,
}

impl Focus {
    pub fn next_window(self) -> Self {
        match self {
            Self::Left => Self::RightTop,
            Self::RightTop => Self::RightBottom,
            Self::RightBottom => Self::Left,
        }
    }

    pub fn previous_window(self) -> Self {
        match self {
            Self::Left => Self::RightBottom,
            Self::RightTop => Self::Left,
            Self::RightBottom => Self::RightTop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightTab {
    Convert,
    Renames,
}

impl RightTab {
    pub const ALL: [Self; 2] = [Self::Convert, Self::Renames];

    pub fn next(self) -> Self {
        match self {
            Self::Convert => Self::Renames,
            Self::Renames => Self::Convert,
        }
    }

    pub fn number(self) -> usize {
        match self {
            Self::Convert => 1,
            Self::Renames => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Convert => "Convert",
            Self::Renames => "Renames",
        }
    }

    pub fn from_number(number: usize) -> Option<Self> {
        match number {
            1 => Some(Self::Convert),
            2 => Some(Self::Renames),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertField {
    Format,
    FrameSize,
    Rotation,
    AudioBitrate,
    Volume,
    Normalize,
    Output,
}

impl ConvertField {
    pub const ALL: [Self; 7] = [
        Self::Format,
        Self::FrameSize,
        Self::Rotation,
        Self::AudioBitrate,
        Self::Volume,
        Self::Normalize,
        Self::Output,
    ];

    /// Fields that only apply to video output.
    pub fn is_video_only(self) -> bool {
        matches!(self, Self::FrameSize | Self::Rotation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    NameAsc,
    NameDesc,
    DateAsc,
    DateDesc,
}

impl SortOrder {
    pub fn next(self) -> Self {
        match self {
            Self::NameAsc => Self::NameDesc,
            Self::NameDesc => Self::DateAsc,
            Self::DateAsc => Self::DateDesc,
            Self::DateDesc => Self::NameAsc,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NameAsc => "name ↑",
            Self::NameDesc => "name ↓",
            Self::DateAsc => "date ↑",
            Self::DateDesc => "date ↓",
        }
    }
}

/// Directories first, then `order`. Names compare without extension or case.
pub fn compare_entries(a: &FileEntry, b: &FileEntry, order: SortOrder) -> Ordering {
    b.is_dir.cmp(&a.is_dir).then_with(|| match order {
        SortOrder::NameAsc => compare_names(a, b),
        SortOrder::NameDesc => compare_names(b, a),
        SortOrder::DateAsc => a.modified.cmp(&b.modified).then_with(|| compare_names(a, b)),
        SortOrder::DateDesc => b.modified.cmp(&a.modified).then_with(|| compare_names(a, b)),
    })
}

fn compare_names(a: &FileEntry, b: &FileEntry) -> Ordering {
    sort_key(a)
        .cmp(&sort_key(b))
        .then_with(|| a.name.cmp(&b.name))
}

fn sort_key(entry: &FileEntry) -> String {
    let name = if entry.is_dir {
        entry.name.as_str()
    } else {
        entry
            .name
            .rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty())
            .map_or(entry.name.as_str(), |(stem, _)| stem)
    };
    name.to_lowercase()
}
