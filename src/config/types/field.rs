//! Config field path used in diagnostics.

use owo_colors::OwoColorize;
use std::fmt;

/// A dotted path to a config field, e.g. `build.frontend.command`.
///
/// Sections declare their paths as constants so diagnostics and
/// messages always name the same key the user writes in `webstage.toml`.
///
/// ```ignore
/// const COMMAND: FieldPath = FieldPath::new("build.frontend.command");
/// diag.error(COMMAND, "must not be empty");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(pub &'static str);

impl FieldPath {
    #[inline]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_args!("`{}`", self.0).bright_blue())
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        self.0
    }
}
