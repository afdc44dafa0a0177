use crate::ingest::MAX_HEADER_ROW;
use crate::RenderOptions;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Application settings, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub render: RenderOptions,
    /// Header row used when the caller does not pick one
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    /// Rows shown in the post-upload preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_header_row() -> usize { 16 }
fn default_preview_rows() -> usize { 5 }

impl Default for Config {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            header_row: default_header_row(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text).context("Invalid configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to load config '{}'", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.header_row > MAX_HEADER_ROW {
            bail!(
                "header_row must be between 0 and {} (got {})",
                MAX_HEADER_ROW,
                self.header_row
            );
        }
        if self.render.width == 0 || self.render.height == 0 {
            bail!("render width and height must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.header_row, 16);
        assert_eq!(config.preview_rows, 5);
        assert_eq!(config.render, RenderOptions { width: 800, height: 600 });
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_render_section() {
        let config = Config::from_json(r#"{"render": {"width": 1024}, "header_row": 0}"#).unwrap();
        assert_eq!(config.render.width, 1024);
        assert_eq!(config.render.height, 600);
        assert_eq!(config.header_row, 0);
    }

    #[test]
    fn test_rejects_header_row_over_limit() {
        let err = Config::from_json(r#"{"header_row": 101}"#).unwrap_err();
        assert!(err.to_string().contains("header_row"));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(Config::from_json("{not json").is_err());
    }
}
