//! Hooks into external build tools.
//!
//! - `runner`: the command-backed frontend build (`$WEBSTAGE_*` variables,
//!   argument substitution, execution through `Cmd`)

mod runner;

pub use runner::*;
