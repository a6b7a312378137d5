//! Library target for the `spool` package.
//!
//! The primary deliverable of this package is the `spool` CLI binary
//! (`src/main.rs`). This library exists so CI can run `cargo test -p spool --doc`
//! for feature/doctype validation.

#[doc(hidden)]
pub use spool_engine;
