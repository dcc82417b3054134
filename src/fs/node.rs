//! File descriptors and storage usage types.

use serde::{Deserialize, Serialize};

/// Coarse file category derived from the extension, used to pick an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Pdf,
    Image,
    Video,
    Word,
    Excel,
    Archive,
    Text,
    Audio,
    /// Anything not listed above
    Other,
}

impl FileKind {
    /// Classify a filename by its (case-insensitive) extension.
    pub fn from_name(filename: &str) -> Self {
        let ext = match filename.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return FileKind::Other,
        };
        match ext.as_str() {
            "pdf" => FileKind::Pdf,
            "jpg" | "jpeg" | "png" | "gif" => FileKind::Image,
            "mp4" | "avi" | "mov" => FileKind::Video,
            "doc" | "docx" => FileKind::Word,
            "xls" | "xlsx" => FileKind::Excel,
            "zip" | "rar" => FileKind::Archive,
            "txt" => FileKind::Text,
            "mp3" => FileKind::Audio,
            _ => FileKind::Other,
        }
    }

    /// Font Awesome icon name for this kind.
    pub fn icon(&self) -> &'static str {
        match self {
            FileKind::Pdf => "fa-file-pdf",
            FileKind::Image => "fa-file-image",
            FileKind::Video => "fa-file-video",
            FileKind::Word => "fa-file-word",
            FileKind::Excel => "fa-file-excel",
            FileKind::Archive => "fa-file-archive",
            FileKind::Text => "fa-file-alt",
            FileKind::Audio => "fa-file-audio",
            FileKind::Other => "fa-file",
        }
    }
}

/// A file stored in a volume, as shown in the dashboard listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name (never empty after filtering)
    pub name: String,
    /// Human-readable size, e.g. "1.5 MB"
    pub size_display: String,
    /// Human-readable modification date, when the server provides one
    #[serde(default)]
    pub modified_display: Option<String>,
}

impl FileEntry {
    pub fn kind(&self) -> FileKind {
        FileKind::from_name(&self.name)
    }

    /// Modification date, or a placeholder when unknown.
    pub fn modified_or_unknown(&self) -> &str {
        self.modified_display.as_deref().unwrap_or("Unknown date")
    }
}

/// How full a volume is, for colouring the usage bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLevel {
    /// 70 % or less
    Normal,
    /// Above 70 %
    Warning,
    /// Above 90 %
    Critical,
}

impl UsageLevel {
    pub fn from_percent(percent: u8) -> Self {
        if percent > 90 {
            UsageLevel::Critical
        } else if percent > 70 {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }
}

/// Storage usage snapshot reported by `GET /api/vm/{name}/storage`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageInfo {
    /// Used storage in MB
    pub used_mb: f64,
    /// Volume capacity in MB
    pub limit_mb: f64,
    /// Remaining space in MB
    pub available_mb: f64,
    #[serde(default)]
    pub used_bytes: Option<u64>,
    #[serde(default)]
    pub limit_bytes: Option<u64>,
    #[serde(default)]
    pub available_bytes: Option<u64>,
    #[serde(default)]
    pub file_count: Option<u64>,
}

impl StorageInfo {
    /// Snapshot from the three figures the Quota Guard needs.
    pub fn new(used_mb: f64, limit_mb: f64, available_mb: f64) -> Self {
        Self {
            used_mb,
            limit_mb,
            available_mb,
            ..Default::default()
        }
    }

    /// Usage as a whole percentage, capped at 100.
    pub fn usage_percent(&self) -> u8 {
        if self.limit_mb <= 0.0 {
            return 0;
        }
        ((self.used_mb / self.limit_mb) * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn level(&self) -> UsageLevel {
        UsageLevel::from_percent(self.usage_percent())
    }

    /// Used space formatted the way the session stores it, e.g. "123MB".
    pub fn used_display(&self) -> String {
        format!("{}MB", self.used_mb.round() as i64)
    }

    /// One-line summary, e.g. "Used: 12.5MB / Total: 500MB".
    pub fn summary(&self) -> String {
        format!("Used: {:.1}MB / Total: {:.0}MB", self.used_mb, self.limit_mb)
    }
}

/// What the user intends to do with an uploaded file.
///
/// Only storing is implemented server-side; the choice is echoed back in
/// the upload confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadOption {
    #[default]
    StoreOnly,
    ShareOnly,
    StoreAndShare,
}

impl UploadOption {
    pub fn label(&self) -> &'static str {
        match self {
            UploadOption::StoreOnly => "Store only",
            UploadOption::ShareOnly => "Share only",
            UploadOption::StoreAndShare => "Store & share",
        }
    }
}

impl std::str::FromStr for UploadOption {
    type Err = crate::error::CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "store_only" => Ok(UploadOption::StoreOnly),
            "share_only" => Ok(UploadOption::ShareOnly),
            "store_and_share" => Ok(UploadOption::StoreAndShare),
            other => Err(crate::error::CloudError::validation(
                "option",
                format!("Unknown upload option: {}", other),
            )),
        }
    }
}

/// Bytes to (fractional) megabytes.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}
