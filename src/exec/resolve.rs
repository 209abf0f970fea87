// src/exec/resolve.rs

//! Command resolution against the search path.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};

/// Finds the executable behind a command name.
///
/// Names containing a `/` are taken as paths; anything else is searched for
/// in the configured search path, or `$PATH` when none is configured.
#[derive(Debug, Clone, Default)]
pub struct CommandResolver {
    search_path: Option<OsString>,
}

impl CommandResolver {
    pub fn new(search_path: Option<impl Into<OsString>>) -> Self {
        Self {
            search_path: search_path.map(Into::into),
        }
    }

    /// Resolve using `$PATH` at lookup time.
    pub fn from_env() -> Self {
        Self { search_path: None }
    }

    pub fn resolve(&self, cmd: &str) -> Option<PathBuf> {
        if cmd.is_empty() {
            return None;
        }

        if cmd.contains('/') {
            let path = PathBuf::from(cmd);
            return is_executable(&path).then_some(path);
        }

        let search = self
            .search_path
            .clone()
            .or_else(|| env::var_os("PATH"))?;

        env::split_paths(&search)
            .map(|dir| dir.join(cmd))
            .find(|probe| is_executable(probe))
    }
}

fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn finds_executables_in_the_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("frob");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = CommandResolver::new(Some(dir.path().as_os_str()));
        assert_eq!(resolver.resolve("frob"), Some(tool));
        assert_eq!(resolver.resolve("nope"), None);
    }

    #[test]
    fn ignores_files_without_execute_permission() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::write(&data, "x").unwrap();
        fs::set_permissions(&data, fs::Permissions::from_mode(0o644)).unwrap();

        let resolver = CommandResolver::new(Some(dir.path().as_os_str()));
        assert_eq!(resolver.resolve("data"), None);
        assert_eq!(resolver.resolve(data.to_str().unwrap()), None);
    }

    #[test]
    fn slash_names_are_paths() {
        let resolver = CommandResolver::new(Some(""));
        assert_eq!(resolver.resolve("/bin/sh"), Some(PathBuf::from("/bin/sh")));
        assert_eq!(resolver.resolve(""), None);
    }
}
