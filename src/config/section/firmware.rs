//! `[firmware]` section configuration.
//!
//! Used by `webstage check` after the firmware binary is linked.
//!
//! # Example
//!
//! ```toml
//! [firmware]
//! path = ".pio/build/esp12e/firmware.bin"
//! flash_size = 4194304      # 4 MB flash chip
//! ota_limit = 1048576       # Largest image OTA can take
//! upload_hints = ["Serial: pio run -t upload"]
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::size::MIB;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const FIELD_FLASH_SIZE: FieldPath = FieldPath::new("firmware.flash_size");
const FIELD_OTA_LIMIT: FieldPath = FieldPath::new("firmware.ota_limit");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// Firmware binary (overridden by the `check` positional argument).
    pub path: Option<PathBuf>,

    /// Flash chip size in bytes.
    pub flash_size: u64,

    /// Largest firmware image an OTA update accepts, in bytes.
    pub ota_limit: u64,

    /// Upload commands printed after the size report.
    pub upload_hints: Vec<String>,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            path: None,
            flash_size: 4 * MIB,
            ota_limit: MIB,
            upload_hints: vec![
                "Serial: pio run -t upload".into(),
                "OTA:    pio run -t upload --upload-port <IP_ADDRESS>".into(),
            ],
        }
    }
}

impl FirmwareConfig {
    /// Validate firmware limits.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.flash_size == 0 {
            diag.error(FIELD_FLASH_SIZE, "flash size must be greater than zero");
            return;
        }
        if self.ota_limit > self.flash_size {
            diag.error_with_hint(
                FIELD_OTA_LIMIT,
                format!(
                    "OTA limit ({} bytes) exceeds flash size ({} bytes)",
                    self.ota_limit, self.flash_size
                ),
                "OTA needs room for two images; the limit is usually under half the flash",
            );
        }
    }
}
