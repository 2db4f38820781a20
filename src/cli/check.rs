//! `check` command: firmware size report after linking.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    config::{FirmwareConfig, ProjectConfig},
    log,
    logger::{status_success, status_warning},
    utils::size::{MIB, group_thousands, kib},
};

/// PlatformIO build output, searched when no firmware path is configured.
const PIO_BUILD_DIR: &str = ".pio/build";
const FIRMWARE_FILE: &str = "firmware.bin";

/// Size figures of a firmware image against its flash limits.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareInfo {
    pub path: PathBuf,
    pub size: u64,
    pub flash_size: u64,
    pub ota_limit: u64,
}

impl FirmwareInfo {
    /// Combine an image size with the configured limits.
    pub fn inspect(path: &Path, size: u64, firmware: &FirmwareConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            size,
            flash_size: firmware.flash_size,
            ota_limit: firmware.ota_limit,
        }
    }

    /// Share of flash taken by the image, in percent.
    #[allow(clippy::cast_precision_loss)]
    pub fn usage_percent(&self) -> f64 {
        self.size as f64 / self.flash_size as f64 * 100.0
    }

    /// Whether the image is too large for an OTA update.
    pub fn exceeds_ota(&self) -> bool {
        self.size > self.ota_limit
    }

    pub fn report_lines(&self) -> Vec<String> {
        vec![
            format!("Firmware: {}", self.path.display()),
            format!(
                "Size: {} bytes ({})",
                group_thousands(self.size),
                kib(self.size)
            ),
            format!(
                "Flash usage: {:.1}% of {}",
                self.usage_percent(),
                flash_label(self.flash_size)
            ),
        ]
    }

    pub fn ota_warning(&self) -> Option<String> {
        self.exceeds_ota().then(|| {
            format!(
                "firmware exceeds the {} OTA limit, OTA updates may fail",
                flash_label(self.ota_limit)
            )
        })
    }
}

/// `4194304` -> `"4MB"`, other sizes in KB.
fn flash_label(bytes: u64) -> String {
    if bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        kib(bytes)
    }
}

/// First `.pio/build/<env>/firmware.bin` under `root`, by env name.
fn find_firmware(root: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<_> = fs::read_dir(root.join(PIO_BUILD_DIR))
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path().join(FIRMWARE_FILE))
        .filter(|path| path.is_file())
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Print the firmware report. Returns false when no firmware was found.
pub fn check(config: &ProjectConfig) -> bool {
    let path = config
        .firmware
        .path
        .clone()
        .or_else(|| find_firmware(config.get_root()));

    let Some(path) = path else {
        status_warning(&format!(
            "no firmware found (looked in {}/*/{})",
            PIO_BUILD_DIR, FIRMWARE_FILE
        ));
        return false;
    };

    let size = match fs::metadata(&path) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => {
            status_warning(&format!("firmware not found: {}", path.display()));
            return false;
        }
    };

    let info = FirmwareInfo::inspect(&config.root_relative(&path), size, &config.firmware);
    for line in info.report_lines() {
        log!("firmware"; "{}", line);
    }
    match info.ota_warning() {
        Some(warning) => status_warning(&warning),
        None => status_success("firmware fits the OTA limit"),
    }

    if !config.firmware.upload_hints.is_empty() {
        log!("upload"; "options:");
        for hint in &config.firmware.upload_hints {
            println!("  {hint}");
        }
    }
    true
}
