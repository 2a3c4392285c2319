use crate::cli::{Args, Command, OutputFormat};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Defaults shared by several runs, e.g. a dataset's crop geometry.
/// Every field is optional; command-line values always win.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub extensions: Option<String>,
    pub recursive: Option<bool>,
    pub aspect_ratio: Option<f64>,
    pub resize: Option<String>,
    pub output_format: Option<String>,
    pub jobs: Option<usize>,
    pub draw_boxes: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl Args {
    /// Load the configuration file, if any, and fill in options left unset
    pub fn load_and_merge_config(&mut self) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let config = ConfigFile::load(&config_path)?;
            self.merge_from_config(config)?;

            if self.verbose && !self.json_progress {
                eprintln!("Loaded configuration from: {}", config_path.display());
            }
        }
        Ok(())
    }

    fn merge_from_config(&mut self, config: ConfigFile) -> Result<()> {
        match &mut self.command {
            Command::Annotate(annotate) => {
                if annotate.extensions_str.is_none() {
                    annotate.extensions_str = config.extensions;
                }
                if !annotate.recursive {
                    annotate.recursive = config.recursive.unwrap_or(false);
                }
            }
            Command::Crop(crop) => {
                if crop.aspect_ratio.is_none() {
                    crop.aspect_ratio = config.aspect_ratio.map(|r| r.to_string());
                }
                if crop.resize.is_none() {
                    crop.resize = config.resize;
                }
                if crop.output_format.is_none() {
                    if let Some(format) = config.output_format {
                        let parsed = OutputFormat::from_str(&format, true)
                            .map_err(|e| anyhow::anyhow!("Invalid outputFormat in config: {}", e))?;
                        crop.output_format = Some(parsed);
                    }
                }
                if crop.jobs.is_none() {
                    crop.jobs = config.jobs;
                }
                if !crop.draw_boxes {
                    crop.draw_boxes = config.draw_boxes.unwrap_or(false);
                }
            }
            Command::Split(_) | Command::Inspect(_) => {}
        }
        Ok(())
    }
}
