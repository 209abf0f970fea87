#![allow(dead_code)]

use std::path::PathBuf;

use pssh::config::{ConfigFile, RawConfigFile};
use pssh::types::{Pipeline, Stage};

/// Builder for `ConfigFile` to simplify test setup. Starts with the banner
/// and the working-directory prompt turned off so output stays predictable.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.shell.banner = false;
        config.shell.show_cwd = false;
        Self { config }
    }

    pub fn with_banner(mut self, banner: bool) -> Self {
        self.config.shell.banner = banner;
        self
    }

    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.config.shell.prompt = prompt.to_string();
        self
    }

    pub fn with_search_path(mut self, path: &str) -> Self {
        self.config.exec.search_path = Some(path.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Pipeline`, for arguments the line parser cannot express
/// (quoted words, for instance).
#[derive(Default)]
pub struct PipelineBuilder {
    pipeline: Pipeline,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pipeline.stages.push(Stage::new(argv));
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.pipeline.input = Some(path.into());
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.pipeline.output = Some(path.into());
        self
    }

    pub fn background(mut self) -> Self {
        self.pipeline.background = true;
        self
    }

    pub fn build(self) -> Pipeline {
        self.pipeline
    }
}
