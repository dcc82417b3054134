//! # nickcloud
//!
//! Rust client library and session controller for the Nick Cloud storage service.
//!
//! ## Features
//!
//! - **Registration**: two-step volume creation (request a code, then confirm it).
//!   - The pending form can be serialized and resumed in another process.
//! - **Authentication**: login/logout against a named volume, with HTTP proxy support.
//! - **Dashboard data**:
//!   - Storage usage and file listing, loaded concurrently.
//!   - Malformed listing entries are filtered out.
//!   - Late responses are dropped so they never overwrite newer state.
//! - **File Operations**:
//!   - Upload with a client-side quota check before any bytes are sent.
//!   - Download to a local directory, delete and ghost-file cleanup.
//! - **Runtime**: an actor (`CloudHandle`) that serializes commands and refreshes
//!   the dashboard listing periodically.
//!
//! Handlers never render anything. They publish [`UiEvent`]s that a presentation
//! layer subscribes to.
//!
//! ## Example: Basic Usage
//!
//! ```no_run
//! use nickcloud::{ClientConfig, CloudHandle, UploadOption};
//!
//! # async fn example() -> nickcloud::Result<()> {
//! let cloud = CloudHandle::connect(ClientConfig::from_env()?)?;
//!
//! // Login opens the dashboard and loads storage and files
//! cloud.login("my-vm", "password123").await?;
//!
//! let snap = cloud.snapshot().await?;
//! for file in &snap.session.files {
//!     println!("{} ({})", file.name, file.size_display);
//! }
//!
//! // Upload is rejected locally if it would not fit
//! cloud.upload_file("notes.txt", UploadOption::StoreOnly).await?;
//!
//! cloud.download("notes.txt", ".").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Volume Registration
//!
//! ```no_run
//! use nickcloud::{ClientConfig, Controller};
//!
//! # async fn example() -> nickcloud::Result<()> {
//! let mut ctl = Controller::connect(ClientConfig::default())?;
//!
//! // Step 1: validate the form and request a confirmation code
//! let sent = ctl.register("my-vm", "me@example.com", "password123", 500).await?;
//! if let Some(code) = sent.test_code {
//!     println!("Server is in test mode, code: {}", code);
//! }
//!
//! // Step 2: confirm with the code received by email
//! let name = ctl.confirm("123456").await?;
//! println!("Created {}", name);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod notify;
pub mod session;

// Re-export commonly used types
pub use api::{ApiClient, CloudApi};
pub use config::ClientConfig;
pub use error::{CloudError, Result};
pub use fs::{FileEntry, FileKind, StorageInfo, UploadOption, UsageLevel};
pub use notify::{FormId, MessageKind, Notice, NoticeLevel, Notifier, UiEvent};
pub use session::{
    AuthState, CloudHandle, Confirm, Controller, PendingRegistration, SearchOutcome, Session,
    Snapshot, View,
};
