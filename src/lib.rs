//! Oxibps: BPS binary patch application in Rust.
//!
//! The crate provides:
//! - A pure-Rust BPS engine (`bps`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! let source = std::fs::read("game.sfc").unwrap();
//! let patch = std::fs::read("translation.bps").unwrap();
//!
//! let target = oxibps::bps::apply(&source, &patch).unwrap();
//! std::fs::write("game-patched.sfc", target).unwrap();
//! ```

pub mod bps;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use bps::{PatchError, apply};
