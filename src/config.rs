//! Configuration records.
//!
//! `Settings` is the top-level record read from the optional `--config` JSON
//! file. Every field carries a serde default, so a partial file only overrides
//! what it names. `PreprocessorConfig` mirrors the `preprocessor_config.json`
//! shipped next to Hugging Face image classifiers.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::processor::{Layout, ResizeMode};

pub const AESTHETIC_REPO: &str = "cafeai/cafe_aesthetic";
pub const TAGGER_REPO: &str = "Thouph/eva02-vit-large-448-8046";
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// CLIP normalization constants used by the tagger.
pub const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
pub const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hub: HubConfig,
    pub runtime: RuntimeConfig,
    pub scorer: ScorerConfig,
    pub tagger: TaggerConfig,
}

impl Settings {
    /// Reads and validates a settings file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings: Settings = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings file {:?}", path))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.tagger.validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Overrides the hub cache directory (otherwise `HF_HOME` or the default).
    pub cache_dir: Option<PathBuf>,
    /// Draw download progress bars.
    pub progress: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Cuda,
    TensorRT,
    CoreML,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub device: DeviceKind,
    pub device_id: i32,
    /// Intra-op threads for ONNX Runtime; the CPU count when unset.
    pub intra_threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub repo_id: String,
    pub model_file: String,
    pub preprocessor_file: String,
    /// Local model file, used instead of the hub when set.
    pub model_path: Option<PathBuf>,
    /// Local preprocessor config, used instead of the hub when set.
    pub preprocessor_path: Option<PathBuf>,
    /// Which logit of the classifier output carries the aesthetic class.
    pub logit_index: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            repo_id: AESTHETIC_REPO.to_string(),
            model_file: "model.onnx".to_string(),
            preprocessor_file: "preprocessor_config.json".to_string(),
            model_path: None,
            preprocessor_path: None,
            logit_index: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub repo_id: String,
    pub model_file: String,
    pub tags_file: String,
    pub model_path: Option<PathBuf>,
    pub tags_path: Option<PathBuf>,
    pub threshold: f32,
    /// `[height, width]` of the model input.
    pub input_size: [u32; 2],
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    pub resize: ResizeMode,
    pub layout: Layout,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            repo_id: TAGGER_REPO.to_string(),
            model_file: "model.onnx".to_string(),
            tags_file: "tags_8041.json".to_string(),
            model_path: None,
            tags_path: None,
            threshold: DEFAULT_THRESHOLD,
            input_size: [448, 448],
            mean: CLIP_MEAN.to_vec(),
            std: CLIP_STD.to_vec(),
            resize: ResizeMode::Stretch,
            layout: Layout::Nchw,
        }
    }
}

impl TaggerConfig {
    /// Applies a threshold given on the command line over the file value.
    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        if let Some(threshold) = threshold {
            self.threshold = threshold;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)?;
        anyhow::ensure!(
            self.input_size.iter().all(|&d| d > 0),
            "Tagger input size must be non-zero, got {:?}",
            self.input_size
        );
        anyhow::ensure!(
            self.mean.len() == 3 && self.std.len() == 3,
            "Tagger mean and std must have 3 channels"
        );
        anyhow::ensure!(
            self.std.iter().all(|&s| s != 0.0),
            "Tagger std must not contain zeros"
        );
        Ok(())
    }
}

pub fn validate_threshold(threshold: f32) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&threshold),
        "Threshold must be between 0 and 1, got {}",
        threshold
    );
    Ok(())
}

/// The subset of a Hugging Face `preprocessor_config.json` this crate reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessorConfig {
    #[serde(default)]
    pub image_mean: Option<Vec<f32>>,
    #[serde(default)]
    pub image_std: Option<Vec<f32>>,
    #[serde(default = "default_true")]
    pub do_normalize: bool,
    pub size: SizeSpec,
    #[serde(default)]
    pub do_center_crop: bool,
    #[serde(default)]
    pub crop_size: Option<SizeSpec>,
}

fn default_true() -> bool {
    true
}

/// The `size` entry comes in several shapes depending on the processor version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    Square(u32),
    HeightWidth { height: u32, width: u32 },
    ShortestEdge { shortest_edge: u32 },
}

impl SizeSpec {
    /// `(height, width)` of the resized image.
    pub fn dims(&self) -> (u32, u32) {
        match *self {
            SizeSpec::Square(s) | SizeSpec::ShortestEdge { shortest_edge: s } => (s, s),
            SizeSpec::HeightWidth { height, width } => (height, width),
        }
    }

    /// The edge length the shorter image side is resized to before cropping.
    ///
    /// A bare integer means a shortest edge in older processor configs.
    pub fn shortest_edge(&self) -> Option<u32> {
        match *self {
            SizeSpec::Square(s) | SizeSpec::ShortestEdge { shortest_edge: s } => Some(s),
            SizeSpec::HeightWidth { .. } => None,
        }
    }
}

impl PreprocessorConfig {
    /// The crop applied after resizing, if any. A missing `crop_size` crops to `size`.
    pub fn crop(&self) -> Option<SizeSpec> {
        self.do_center_crop
            .then(|| self.crop_size.clone().unwrap_or_else(|| self.size.clone()))
    }

    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        let json = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read preprocessor config {:?}", config_path))?;
        let config: PreprocessorConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse preprocessor config {:?}", config_path))?;
        Ok(config)
    }
}
