//! Client-side upload quota guard.
//!
//! Advisory only: the server re-validates every upload.

use crate::error::{CloudError, Result};
use crate::fs::node::{bytes_to_mb, StorageInfo};

/// Figures of an upload the guard approved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadCheck {
    /// Candidate size in MB
    pub file_mb: f64,
    /// Projected usage after the upload in MB
    pub new_total_mb: f64,
}

/// Reject files above the absolute cap, whatever the quota.
pub fn check_size(candidate_bytes: u64, max_upload_mb: f64) -> Result<f64> {
    let file_mb = bytes_to_mb(candidate_bytes);
    if file_mb > max_upload_mb {
        return Err(CloudError::FileTooLarge {
            size_mb: file_mb,
            max_mb: max_upload_mb,
        });
    }
    Ok(file_mb)
}

/// Validate a candidate upload against a storage snapshot.
///
/// Checks, in order: absolute cap, space still available, projected total
/// against the limit. The last two are evaluated independently since the
/// server figures are not guaranteed to be consistent with each other.
pub fn check_upload(
    snapshot: &StorageInfo,
    candidate_bytes: u64,
    max_upload_mb: f64,
) -> Result<UploadCheck> {
    let file_mb = check_size(candidate_bytes, max_upload_mb)?;

    if file_mb > snapshot.available_mb {
        return Err(CloudError::InsufficientSpace {
            available_mb: snapshot.available_mb,
            file_mb,
            deficit_mb: file_mb - snapshot.available_mb,
        });
    }

    let new_total_mb = snapshot.used_mb + file_mb;
    if new_total_mb > snapshot.limit_mb {
        return Err(CloudError::QuotaExceeded {
            limit_mb: snapshot.limit_mb,
            new_total_mb,
        });
    }

    Ok(UploadCheck {
        file_mb,
        new_total_mb,
    })
}
