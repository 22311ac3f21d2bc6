//! VSIX installer library.
//!
//! This crate resolves a VS Code extension and its transitive dependencies
//! from an extension registry and installs them into a host editor,
//! dependencies first. It is used by the `vsix-installer` CLI binary and can
//! be consumed programmatically for testing or custom installation
//! workflows.
//!
//! # Modules
//!
//! - [`artifact`] - Downloaded package handles and embedded manifest reading
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered TOML, environment and flag configuration
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types naming the failing package and phase
//! - [`executor`] - External command execution
//! - [`host`] - Host editor abstraction and the `code` CLI implementation
//! - [`identifier`] - Validated `publisher.name` identifiers
//! - [`installer`] - Draining a work list into the host
//! - [`output`] - Progress and result formatting
//! - [`pipeline`] - Resolve-then-install orchestration
//! - [`registry`] - Registry abstraction and the Marketplace client
//! - [`resolver`] - Depth-first dependency resolution
//! - [`worklist`] - Ordered, de-duplicated queue of resolved artifacts

pub mod artifact;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod executor;
pub mod host;
pub mod identifier;
pub mod installer;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod worklist;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
