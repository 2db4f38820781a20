//! Configuration section definitions.
//!
//! Each module corresponds to a section in `webstage.toml`:
//!
//! | Module     | TOML Section         | Purpose                              |
//! |------------|----------------------|--------------------------------------|
//! | `build`    | `[build]`            | Tree paths, placement, extensions    |
//! | `build`    | `[build.frontend]`   | Frontend build command               |
//! | `firmware` | `[firmware]`         | Firmware size limits, upload hints   |

pub mod build;
mod firmware;

// Re-export section configs
pub use build::{BuildSectionConfig, FrontendConfig, Placement};
pub use firmware::FirmwareConfig;
