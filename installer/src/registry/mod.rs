//! Marketplace registry access.
//!
//! # Sub-modules
//!
//! - [`client`] - The [`Registry`](client::Registry) trait and the `ureq`
//!   backed Marketplace implementation.
//! - [`error`] - Registry lookup and artifact download errors.
//! - [`query`] - Extension query request and response model.
//! - [`version`] - The selected latest stable version.

pub mod client;
pub mod error;
pub mod query;
pub mod version;

pub use client::{MarketplaceClient, Registry};
pub use error::{DownloadError, RegistryError};
pub use version::VersionInfo;
