use image::{DynamicImage, Rgb, RgbImage};
use ndarray::s;
use psyche::processor::{ImagePreprocessor, ImageProcessor, Layout, ResizeMode};
use tempfile::tempdir;

mod common;
use common::write_test_image;

const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

#[test]
fn test_process_image_nchw() {
    let dir = tempdir().unwrap();
    let image = image::open(write_test_image(dir.path(), "test_image.png")).unwrap();
    let processor = ImagePreprocessor::new(448, 448, CLIP_MEAN.to_vec(), CLIP_STD.to_vec());
    let tensor = processor.process(&image).unwrap();

    assert_eq!(tensor.shape(), &[1, 3, 448, 448]);
    assert!(tensor.iter().any(|&x| x != 0.0));
}

#[test]
fn test_process_image_nhwc() {
    let dir = tempdir().unwrap();
    let image = image::open(write_test_image(dir.path(), "test_image.png")).unwrap();
    let processor = ImagePreprocessor::new(32, 48, CLIP_MEAN.to_vec(), CLIP_STD.to_vec())
        .with_layout(Layout::Nhwc);
    let tensor = processor.process(&image).unwrap();

    assert_eq!(tensor.shape(), &[1, 32, 48, 3]);
}

#[test]
fn test_normalization_values() {
    // A uniform image stays uniform through any resize.
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 128])));
    let processor = ImagePreprocessor::new(4, 4, CLIP_MEAN.to_vec(), CLIP_STD.to_vec());
    let tensor = processor.process(&image).unwrap();

    let expected = [
        (1.0 - CLIP_MEAN[0]) / CLIP_STD[0],
        (0.0 - CLIP_MEAN[1]) / CLIP_STD[1],
        (128.0 / 255.0 - CLIP_MEAN[2]) / CLIP_STD[2],
    ];
    for (c, value) in expected.iter().enumerate() {
        let channel = tensor.slice(s![0, c, .., ..]);
        assert!(channel.iter().all(|&v| (v - value).abs() < 1e-5));
    }
}

#[test]
fn test_stretch_ignores_aspect_ratio() {
    // Red left half, blue right half: stretching keeps the split at the middle column.
    let mut wide = RgbImage::from_pixel(800, 200, Rgb([0, 0, 255]));
    for x in 0..400 {
        for y in 0..200 {
            wide.put_pixel(x, y, Rgb([255, 0, 0]));
        }
    }
    let processor = ImagePreprocessor::new(64, 64, vec![0.0; 3], vec![1.0; 3]);
    let tensor = processor
        .process(&DynamicImage::ImageRgb8(wide))
        .unwrap();

    // No gray padding anywhere: the first and last rows are image content.
    assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-5);
    assert!((tensor[[0, 2, 63, 63]] - 1.0).abs() < 1e-5);
}

#[test]
fn test_letterbox_preserves_aspect_ratio() {
    // Create a wide, non-square image (800x200) filled with red.
    let wide_image = RgbImage::from_pixel(800, 200, Rgb([255, 0, 0]));
    let dynamic_wide_image = DynamicImage::ImageRgb8(wide_image);

    let mean = vec![0.5, 0.5, 0.5];
    let std = vec![0.5, 0.5, 0.5];
    let processor =
        ImagePreprocessor::new(448, 448, mean.clone(), std.clone()).with_resize(ResizeMode::Letterbox);
    let tensor = processor.process(&dynamic_wide_image).unwrap();

    // The 800x200 image fits as 448x112, leaving (448 - 112) / 2 = 168 rows of padding on top.
    let norm_pad_val = (128.0 / 255.0 - mean[0]) / std[0];
    let top_row_r = tensor.slice(s![0, 0, 0, ..]);
    assert!(top_row_r.iter().all(|&v| (v - norm_pad_val).abs() < 1e-5));

    let norm_r = (255.0 / 255.0 - mean[0]) / std[0];
    let norm_g = (0.0 / 255.0 - mean[1]) / std[1];
    assert!((tensor[[0, 0, 224, 224]] - norm_r).abs() < 1e-5);
    assert!((tensor[[0, 1, 224, 224]] - norm_g).abs() < 1e-5);
}

#[test]
fn test_center_crop_keeps_the_middle() {
    // Three 300px wide bands: red, green, blue. Only green survives the crop.
    let mut bands = RgbImage::new(900, 300);
    for (x, _, pixel) in bands.enumerate_pixels_mut() {
        *pixel = match x / 300 {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        };
    }
    let processor =
        ImagePreprocessor::new(64, 64, vec![0.0; 3], vec![1.0; 3]).with_center_crop(Some(64));
    let tensor = processor
        .process(&DynamicImage::ImageRgb8(bands))
        .unwrap();

    assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
    // 900x300 becomes 192x64; the crop covers columns 64..128, the green band.
    for (y, x) in [(0, 8), (32, 32), (63, 55)] {
        assert!((tensor[[0, 1, y, x]] - 1.0).abs() < 1e-5);
        assert!(tensor[[0, 0, y, x]].abs() < 1e-5);
        assert!(tensor[[0, 2, y, x]].abs() < 1e-5);
    }
}
