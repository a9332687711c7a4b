//! Midips: IPS patch creation and application in Rust.
//!
//! The crate provides:
//! - A buffered big-endian byte stream over files or memory (`stream`)
//! - The IPS hunk model, diff engine, and codec (`ips`)
//! - In-memory helpers (`engine`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use midips::engine;
//! use midips::ips::{ApplyOptions, CreateOptions};
//!
//! let source = b"hello old world";
//! let target = b"hello new world";
//!
//! let patch = engine::create_patch(source, target, &CreateOptions::default()).unwrap();
//! let patched = engine::apply_patch(&patch, source, &ApplyOptions::default()).unwrap();
//! assert_eq!(patched, target);
//! ```

pub mod engine;
pub mod error;
pub mod io;
pub mod ips;
pub mod stream;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{PatchError, Result};
