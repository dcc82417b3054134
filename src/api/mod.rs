//! Nick Cloud API client and wire types.

pub mod client;
pub mod types;

pub use client::{ApiClient, CloudApi};
pub use types::{
    Cleaned, CodeSent, Deleted, LoginInfo, LoginRequest, RegisterVmRequest, Registered, Reply,
    SendCodeRequest, ServiceStatus, Uploaded,
};
