// src/config/model.rs

use serde::Deserialize;

/// Configuration exactly as read from TOML.
///
/// ```toml
/// [shell]
/// banner = true
/// prompt = "$ "
/// show_cwd = true
///
/// [exec]
/// search_path = "/usr/bin:/bin"
/// ```
///
/// Every section is optional. Turn it into a [`ConfigFile`] with
/// `ConfigFile::try_from`, which validates it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub shell: ShellSection,

    #[serde(default)]
    pub exec: ExecSection,
}

/// Validated configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub shell: ShellSection,
    pub exec: ExecSection,
}

impl ConfigFile {
    /// Build without validation. Callers outside `validate.rs` should go
    /// through `TryFrom<RawConfigFile>`.
    pub(crate) fn new_unchecked(shell: ShellSection, exec: ExecSection) -> Self {
        Self { shell, exec }
    }
}

/// `[shell]` section: what the user sees at the prompt.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShellSection {
    /// Print the startup banner.
    #[serde(default = "default_true")]
    pub banner: bool,

    /// Appended after the working directory.
    #[serde(default = "default_prompt")]
    pub prompt: String,

    #[serde(default = "default_true")]
    pub show_cwd: bool,
}

fn default_true() -> bool {
    true
}

fn default_prompt() -> String {
    "$ ".to_string()
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            banner: true,
            prompt: default_prompt(),
            show_cwd: true,
        }
    }
}

/// `[exec]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecSection {
    /// Colon-separated directories searched for commands. `None` means
    /// `$PATH`.
    #[serde(default)]
    pub search_path: Option<String>,
}
