//! `init` command: write a commented default `webstage.toml`.

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::config::ConfigError;

/// Default configuration with every key at its default value.
///
/// Optional keys are commented out so the parsed file equals
/// `ProjectConfig::default()`.
pub const CONFIG_TEMPLATE: &str = r#"# webstage configuration
# Paths are relative to this file.

[build]
# Frontend build output, copied into `staging`
source = "web-ui/dist"
# Staged copy shipped in the filesystem image
staging = "data/www"
# Where `.gz` artifacts are written
output = "data"
# "flatten": output/<name>.gz  "mirror": output/<relative path>.gz
placement = "flatten"
# File name suffixes to compress (case-sensitive)
extensions = [".html", ".css", ".js", ".json"]
# Warn when compressed artifacts exceed this many bytes
# budget = 1048576
upload_hint = "pio run --target uploadfs"

[build.frontend]
enable = true
dir = "web-ui"
# `$WEBSTAGE_ROOT`, `$WEBSTAGE_SOURCE_DIR`, `$WEBSTAGE_STAGING_DIR` and
# `$WEBSTAGE_OUTPUT_DIR` are substituted and exported
command = ["npm", "run", "build"]
# Kill the build after this many seconds
# timeout = 300
# Hide the tool's output of successful builds
quiet = false
pty = false

[firmware]
# Defaults to the first .pio/build/*/firmware.bin
# path = ".pio/build/esp12e/firmware.bin"
flash_size = 4194304
ota_limit = 1048576
upload_hints = [
    "Serial: pio run -t upload",
    "OTA:    pio run -t upload --upload-port <IP_ADDRESS>",
]
"#;

/// Write the default config to `path`, refusing to overwrite.
pub fn write_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()).into());
    }
    fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config file '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectConfig, test_parse_config};
    use tempfile::TempDir;

    #[test]
    fn test_template_matches_defaults() {
        let parsed = test_parse_config(CONFIG_TEMPLATE);
        let default = ProjectConfig::default();

        assert_eq!(format!("{parsed:?}"), format!("{default:?}"));
    }

    #[test]
    fn test_write_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("webstage.toml");

        write_config(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);

        fs::write(&path, "[build]\n").unwrap();
        let err = write_config(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[build]\n");
    }
}
