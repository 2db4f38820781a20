//! Utility modules shared by the pipeline and the CLI.

pub mod exec;
pub mod path;
pub mod plural;
pub mod size;

pub use plural::plural_count;
