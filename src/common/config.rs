use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::layout_engine::{AutomaticScheme, ChildPolarity, Tightness};
use crate::model::geometry::{Padding, Rect};

pub fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lowm").join("lowmrc.toml"))
}

/// Global layout settings, read once at startup and consulted by every
/// world operation.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub padding: Padding,
    #[serde(default)]
    pub monocle_padding: Padding,
    #[serde(default = "default_window_gap")]
    pub window_gap: i32,
    #[serde(default = "default_border_width")]
    pub border_width: u32,
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,
    #[serde(default)]
    pub initial_polarity: ChildPolarity,
    #[serde(default)]
    pub automatic_scheme: AutomaticScheme,
    /// Re-derive the surviving sibling's split after a removal.
    #[serde(default = "yes")]
    pub removal_adjustment: bool,
    #[serde(default)]
    pub directional_focus_tightness: Tightness,
    #[serde(default = "no")]
    pub borderless_monocle: bool,
    #[serde(default = "no")]
    pub gapless_monocle: bool,
    /// Switch to monocle while a desktop holds a single tiled window.
    #[serde(default = "no")]
    pub single_monocle: bool,
    #[serde(default = "no")]
    pub borderless_singleton: bool,
    #[serde(default = "yes")]
    pub center_pseudo_tiled: bool,
    #[serde(default = "no")]
    pub honor_size_hints: bool,
    #[serde(default = "no")]
    pub remove_disabled_monitors: bool,
    #[serde(default = "no")]
    pub remove_unplugged_monitors: bool,
    #[serde(default = "no")]
    pub merge_overlapping_monitors: bool,
    #[serde(default = "yes")]
    pub record_history: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            padding: Padding::default(),
            monocle_padding: Padding::default(),
            window_gap: default_window_gap(),
            border_width: default_border_width(),
            split_ratio: default_split_ratio(),
            initial_polarity: ChildPolarity::default(),
            automatic_scheme: AutomaticScheme::default(),
            removal_adjustment: yes(),
            directional_focus_tightness: Tightness::default(),
            borderless_monocle: no(),
            gapless_monocle: no(),
            single_monocle: no(),
            borderless_singleton: no(),
            center_pseudo_tiled: yes(),
            honor_size_hints: no(),
            remove_disabled_monitors: no(),
            remove_unplugged_monitors: no(),
            merge_overlapping_monitors: no(),
            record_history: yes(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            issues.push(format!(
                "split_ratio must lie strictly between 0 and 1, got {}",
                self.split_ratio
            ));
        }

        if self.window_gap < 0 {
            issues.push(format!("window_gap must be non-negative, got {}", self.window_gap));
        }

        for (name, p) in [("padding", &self.padding), ("monocle_padding", &self.monocle_padding)] {
            if p.top < 0 || p.right < 0 || p.bottom < 0 || p.left < 0 {
                issues.push(format!("{name} must be non-negative, got {p:?}"));
            }
        }

        issues
    }
}

/// An output the dry-run tools should create at startup.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    pub name: String,
    pub rect: Rect,
    #[serde(default)]
    pub primary: bool,
    #[serde(default = "default_desktop_names")]
    pub desktops: Vec<String>,
}

impl OutputSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.rect.is_empty() {
            issues.push(format!("output {:?} has an empty rectangle", self.name));
        }
        if self.desktops.is_empty() {
            issues.push(format!("output {:?} needs at least one desktop", self.name));
        }
        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    outputs: Vec<OutputSettings>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Config {
    pub settings: Settings,
    pub outputs: Vec<OutputSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            settings: Settings::default(),
            outputs: vec![OutputSettings {
                name: "default".to_owned(),
                rect: Rect::new(0, 0, 1920, 1080),
                primary: true,
                desktops: default_desktop_names(),
            }],
        }
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let file = ConfigFile {
            settings: self.settings.clone(),
            outputs: self.outputs.clone(),
        };
        let toml_string = toml::to_string_pretty(&file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();
        for output in &self.outputs {
            issues.extend(output.validate());
        }
        if self.outputs.iter().filter(|o| o.primary).count() > 1 {
            issues.push("more than one output is marked primary".to_owned());
        }
        issues
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let file = match toml::from_str::<ConfigFile>(buf) {
            Ok(file) => file,
            Err(e) => bail!("{}", e.to_string().trim_end()),
        };
        let outputs = if file.outputs.is_empty() {
            Config::default().outputs
        } else {
            file.outputs
        };
        Ok(Config { settings: file.settings, outputs })
    }
}

fn yes() -> bool { true }

fn no() -> bool { false }

fn default_window_gap() -> i32 { 6 }

fn default_border_width() -> u32 { 1 }

fn default_split_ratio() -> f64 { 0.5 }

fn default_desktop_names() -> Vec<String> { vec!["Desktop".to_owned()] }
