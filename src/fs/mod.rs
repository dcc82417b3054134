//! Volume contents: file listing, storage usage and the upload quota guard.

mod listing;
pub(crate) mod node;
pub mod quota;

pub use listing::filter_listing;
pub use node::{bytes_to_mb, FileEntry, FileKind, StorageInfo, UploadOption, UsageLevel};
pub use quota::{check_size, check_upload, UploadCheck};
