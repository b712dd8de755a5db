use anyhow::Result;
use image::{DynamicImage, ImageBuffer, Rgb};
use psyche::model::Classifier;
use std::path::{Path, PathBuf};

/// Writes a small neutral gray image and returns its path.
#[allow(dead_code)]
pub fn write_test_image(dir: &Path, name: &str) -> PathBuf {
    let mut img = ImageBuffer::new(64, 48);
    for pixel in img.pixels_mut() {
        *pixel = Rgb([128u8, 128u8, 128u8]);
    }
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

/// A classifier that returns the same logits for every image.
#[allow(dead_code)]
pub struct FixedLogits(pub Vec<f32>);

impl Classifier for FixedLogits {
    fn infer(&mut self, _image: &DynamicImage) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// A classifier whose every run fails.
#[allow(dead_code)]
pub struct BrokenModel;

impl Classifier for BrokenModel {
    fn infer(&mut self, _image: &DynamicImage) -> Result<Vec<f32>> {
        anyhow::bail!("session run failed")
    }
}
