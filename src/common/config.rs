use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use crate::model::size_policy::Corner;
use crate::model::stacking::StackingLevel;

const DEFAULT_CONFIG: &str = include_str!("../../groupwm.default.toml");

fn home_dir() -> PathBuf { dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")) }

pub fn data_dir() -> PathBuf { home_dir().join(".groupwm") }
pub fn layout_file() -> PathBuf { data_dir().join("layout.ron") }
pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home_dir().join(".config"))
        .join("groupwm")
        .join("config.toml")
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Focus newly attached regions unless the attach request says otherwise.
    #[serde(default = "yes")]
    pub switch_to_new: bool,
    /// Warp the pointer when focus falls back to a group itself.
    #[serde(default = "yes")]
    pub warp_enabled: bool,
    /// Tier used when an attach request does not name one.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub default_level: StackingLevel,
    #[serde(default)]
    pub status_display: Option<StatusDisplaySettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            switch_to_new: true,
            warp_enabled: true,
            default_level: StackingLevel::NORMAL,
            status_display: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy, Default)]
#[serde(deny_unknown_fields)]
pub struct StatusDisplaySettings {
    #[serde(default)]
    pub position: Corner,
    #[serde(default)]
    pub fullsize: bool,
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.default_level.is_modal() {
            issues.push(format!(
                "default_level must be below the modal tiers, got {}",
                self.default_level
            ));
        }

        issues
    }
}

fn yes() -> bool { true }

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// The configuration shipped with the binary.
    pub fn embedded() -> anyhow::Result<Config> { Self::parse(DEFAULT_CONFIG) }

    /// Reads `path` if it exists, otherwise falls back to the embedded config.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Self::embedded() }
    }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<Config>(buf) {
            Ok(config) => Ok(config),
            Err(e) => bail!("{e}"),
        }
    }
}
