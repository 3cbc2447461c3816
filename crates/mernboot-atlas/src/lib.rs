//! MongoDB Atlas gateway for MERNBoot
//!
//! This crate implements the `AtlasGateway` trait on top of the official
//! `atlas` CLI.
//!
//! # Requirements
//!
//! - `atlas` CLI installed (it is installed on demand with winget on Windows
//!   and Homebrew on macOS)
//! - Authentication is managed through `atlas auth login`
//!
//! # Example
//!
//! ```ignore
//! use mernboot_atlas::AtlasProvider;
//! use mernboot_provision::AtlasGateway;
//!
//! let provider = AtlasProvider::new();
//! if !provider.is_installed().await {
//!     provider.install().await?;
//! }
//! let profiles = provider.list_profiles().await?;
//! ```

pub mod cli;
pub mod error;
pub mod parse;
pub mod provider;

pub use cli::{AtlasCli, CommandOutput, OutputMode};
pub use error::{AtlasError, Result};
pub use provider::{AtlasProvider, default_install_command};
