//! # refnote-core
//!
//! Core types, traits, and abstractions for the refnote library.
//!
//! This crate provides the note/file data model, the inline file-reference
//! codec, and the collaborator traits that the db and api crates depend on.

pub mod config;
pub mod error;
pub mod files;
pub mod logging;
pub mod models;
pub mod refs;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{FileLimits, NotesConfig, StorageConfig};
pub use error::{Error, Result};
pub use files::{format_size, is_allowed_type, is_image, mime_type_for, sanitize_filename};
pub use models::*;
pub use refs::{decode_references, encode_reference, next_file_no, render_segments, FileRef, Segment};
pub use traits::{Authenticator, NullProfileLookup, ProfileLookup};
