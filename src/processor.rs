//! This module provides tools for preprocessing images before they are fed into a model.
//!
//! It defines the `ImageProcessor` trait for turning a decoded image into a model
//! input tensor and a concrete implementation, `ImagePreprocessor`, which handles
//! resizing, rescaling to `[0, 1]`, per-channel normalization, and tensor layout.

use anyhow::Result;
use image::{imageops::FilterType, DynamicImage, Rgb, RgbImage};
use ndarray::{Array, Array3, Axis, Ix4};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    config::{PreprocessorConfig, SizeSpec},
    error::ProcessError,
};

/// Opens and decodes an image file.
pub fn open_image(path: &Path) -> Result<DynamicImage, ProcessError> {
    image::open(path).map_err(|source| ProcessError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// A trait for processing images into tensors suitable for model input.
pub trait ImageProcessor {
    /// Processes a single image into a 4D tensor with a batch dimension of one.
    fn process(&self, image: &DynamicImage) -> Result<Array<f32, Ix4>>;
}

/// How the image is fitted to the model input size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Resize straight to the target size, ignoring the aspect ratio.
    #[default]
    Stretch,
    /// Keep the aspect ratio and pad the remainder with gray.
    Letterbox,
    /// Resize the shorter side, keeping the aspect ratio, then cut the target
    /// size out of the middle.
    #[serde(rename = "center_crop")]
    CenterCrop,
}

/// Memory layout of the produced tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Nchw,
    Nhwc,
}

/// A preprocessor that resizes and normalizes images.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    pub height: u32,
    pub width: u32,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    pub layout: Layout,
    pub resize: ResizeMode,
    /// Shorter-side length before a center crop; the larger target side when unset.
    pub shortest_edge: Option<u32>,
}

impl ImagePreprocessor {
    /// Creates a new `ImagePreprocessor` with NCHW layout and stretch resizing.
    pub fn new(height: u32, width: u32, mean: Vec<f32>, std: Vec<f32>) -> Self {
        Self {
            height,
            width,
            mean,
            std,
            layout: Layout::Nchw,
            resize: ResizeMode::Stretch,
            shortest_edge: None,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_resize(mut self, resize: ResizeMode) -> Self {
        self.resize = resize;
        self
    }

    /// Switches to center cropping after resizing the shorter side to `shortest_edge`.
    pub fn with_center_crop(mut self, shortest_edge: Option<u32>) -> Self {
        self.resize = ResizeMode::CenterCrop;
        self.shortest_edge = shortest_edge;
        self
    }

    /// Creates a preprocessor from a Hugging Face `preprocessor_config.json`.
    ///
    /// With `do_center_crop` the output has the crop size. A `shortest_edge` size
    /// without a crop still yields a square input, cut from the middle.
    pub fn from_hf_config(config: &PreprocessorConfig) -> Result<Self> {
        let crop = config.crop();
        let (height, width) = crop.as_ref().unwrap_or(&config.size).dims();
        anyhow::ensure!(height > 0 && width > 0, "Invalid input size in preprocessor config");
        let center_crop = crop.is_some() || matches!(config.size, SizeSpec::ShortestEdge { .. });

        let (mean, std) = if config.do_normalize {
            (
                config.image_mean.clone().unwrap_or_else(|| vec![0.5, 0.5, 0.5]),
                config.image_std.clone().unwrap_or_else(|| vec![0.5, 0.5, 0.5]),
            )
        } else {
            (vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0])
        };
        anyhow::ensure!(
            mean.len() == 3 && std.len() == 3,
            "Preprocessor config must have 3-channel mean and std"
        );

        let preprocessor = Self::new(height, width, mean, std);
        if center_crop {
            let edge = config.size.shortest_edge();
            anyhow::ensure!(edge != Some(0), "Invalid shortest edge in preprocessor config");
            Ok(preprocessor.with_center_crop(edge))
        } else {
            Ok(preprocessor)
        }
    }

    /// Fits the image to the target size according to `self.resize`.
    fn fit(&self, image: &DynamicImage) -> RgbImage {
        match self.resize {
            ResizeMode::Stretch => image::imageops::resize(
                &image.to_rgb8(),
                self.width,
                self.height,
                FilterType::Triangle,
            ),
            ResizeMode::Letterbox => {
                let thumbnail = image
                    .resize(self.width, self.height, FilterType::Triangle)
                    .to_rgb8();
                let (thumb_width, thumb_height) = thumbnail.dimensions();

                let mut padded_image =
                    RgbImage::from_pixel(self.width, self.height, Rgb([128, 128, 128]));
                let pad_left = (self.width - thumb_width) / 2;
                let pad_top = (self.height - thumb_height) / 2;
                image::imageops::overlay(
                    &mut padded_image,
                    &thumbnail,
                    pad_left as i64,
                    pad_top as i64,
                );
                padded_image
            }
            ResizeMode::CenterCrop => {
                let rgb = image.to_rgb8();
                let (src_width, src_height) = rgb.dimensions();
                let edge = self
                    .shortest_edge
                    .unwrap_or_else(|| self.width.max(self.height));

                // Scale so the shorter side hits `edge` and both sides still cover the crop.
                let scale = (edge as f64 / src_width.min(src_height) as f64)
                    .max(self.width as f64 / src_width as f64)
                    .max(self.height as f64 / src_height as f64);
                let new_width = ((src_width as f64 * scale).round() as u32).max(self.width);
                let new_height = ((src_height as f64 * scale).round() as u32).max(self.height);
                let resized =
                    image::imageops::resize(&rgb, new_width, new_height, FilterType::Triangle);

                let left = (new_width - self.width) / 2;
                let top = (new_height - self.height) / 2;
                image::imageops::crop_imm(&resized, left, top, self.width, self.height).to_image()
            }
        }
    }

    /// Normalizes the pixel values and arranges them in the required tensor format.
    fn normalize_and_to_tensor(&self, image: &RgbImage) -> Array<f32, Ix4> {
        let (h, w) = (self.height as usize, self.width as usize);
        let mut tensor: Array3<f32> = match self.layout {
            Layout::Nchw => Array::zeros((3, h, w)),
            Layout::Nhwc => Array::zeros((h, w, 3)),
        };

        for (x, y, pixel) in image.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for (c, &value) in pixel.0.iter().enumerate() {
                let norm = (value as f32 / 255.0 - self.mean[c]) / self.std[c];
                match self.layout {
                    Layout::Nchw => tensor[[c, y, x]] = norm,
                    Layout::Nhwc => tensor[[y, x, c]] = norm,
                }
            }
        }

        tensor.insert_axis(Axis(0))
    }
}

impl ImageProcessor for ImagePreprocessor {
    fn process(&self, image: &DynamicImage) -> Result<Array<f32, Ix4>> {
        anyhow::ensure!(
            image.width() > 0 && image.height() > 0,
            "Cannot preprocess an empty image"
        );
        let fitted = self.fit(image);
        Ok(self.normalize_and_to_tensor(&fitted))
    }
}
