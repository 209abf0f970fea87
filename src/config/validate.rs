// src/config/validate.rs

use std::path::Path;

use crate::config::model::{ConfigFile, ExecSection, RawConfigFile, ShellSection};
use crate::errors::{Result, ShellError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ShellError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_shell(&raw.shell)?;
        validate_exec(&raw.exec)?;
        Ok(ConfigFile::new_unchecked(raw.shell, raw.exec))
    }
}

fn validate_shell(shell: &ShellSection) -> Result<()> {
    if shell.prompt.contains(['\n', '\r']) {
        return Err(ShellError::ConfigError(
            "[shell].prompt must not contain a newline".to_string(),
        ));
    }
    Ok(())
}

fn validate_exec(exec: &ExecSection) -> Result<()> {
    let Some(search_path) = exec.search_path.as_deref() else {
        return Ok(());
    };

    for dir in search_path.split(':') {
        if !Path::new(dir).is_absolute() {
            return Err(ShellError::ConfigError(format!(
                "[exec].search_path entry '{dir}' is not an absolute path"
            )));
        }
    }
    Ok(())
}
