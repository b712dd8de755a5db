//! This module provides the `Classifier` capability and its ONNX Runtime implementation.
//!
//! It includes functionality for:
//! - Selecting execution providers (e.g., CPU, CUDA).
//! - Loading an ONNX graph into a session.
//! - Running a single preprocessed image through the session.
//!
//! Everything above this module talks to `Classifier` only, so the scoring and
//! tagging logic can be driven by a stub in tests.

use std::{fmt, path::Path};

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::{
    execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch},
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tracing::info;

#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;

#[cfg(feature = "tensorrt")]
use ort::execution_providers::TensorRTExecutionProvider;

#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;

use crate::{
    config::{DeviceKind, RuntimeConfig},
    file::ModelFile,
    processor::{ImagePreprocessor, ImageProcessor},
};

/// Anything that maps one image to its raw output vector (logits).
pub trait Classifier {
    fn infer(&mut self, image: &DynamicImage) -> Result<Vec<f32>>;
}

/// Represents the execution device for the ONNX model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    /// Use the CPU for inference.
    Cpu,
    /// Use the CUDA execution provider.
    #[cfg(feature = "cuda")]
    Cuda(i32),
    /// Use the TensorRT execution provider.
    #[cfg(feature = "tensorrt")]
    TensorRT(i32),
    /// Use the CoreML execution provider (for macOS).
    #[cfg(feature = "coreml")]
    CoreML,
}

impl Device {
    /// Picks the device named in the runtime configuration.
    ///
    /// Fails when the requested provider was not compiled in.
    pub fn from_config(runtime: &RuntimeConfig) -> Result<Self> {
        match runtime.device {
            DeviceKind::Cpu => Ok(Self::Cpu),
            #[cfg(feature = "cuda")]
            DeviceKind::Cuda => Ok(Self::Cuda(runtime.device_id)),
            #[cfg(feature = "tensorrt")]
            DeviceKind::TensorRT => Ok(Self::TensorRT(runtime.device_id)),
            #[cfg(feature = "coreml")]
            DeviceKind::CoreML => Ok(Self::CoreML),
            #[allow(unreachable_patterns)]
            other => anyhow::bail!(
                "Device {:?} requested but psyche was built without its cargo feature",
                other
            ),
        }
    }

    fn providers(&self) -> Vec<ExecutionProviderDispatch> {
        let accelerator = match self {
            Device::Cpu => None,
            #[cfg(feature = "cuda")]
            Device::Cuda(device_id) => Some(
                CUDAExecutionProvider::default()
                    .with_device_id(*device_id)
                    .build(),
            ),
            #[cfg(feature = "tensorrt")]
            Device::TensorRT(device_id) => Some(
                TensorRTExecutionProvider::default()
                    .with_device_id(*device_id)
                    .build(),
            ),
            #[cfg(feature = "coreml")]
            Device::CoreML => Some(CoreMLExecutionProvider::default().build()),
        };
        // CPU always comes last so an unavailable accelerator falls back to it.
        accelerator
            .into_iter()
            .chain(std::iter::once(CPUExecutionProvider::default().build()))
            .collect()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            #[cfg(feature = "cuda")]
            Device::Cuda(id) => write!(f, "cuda:{}", id),
            #[cfg(feature = "tensorrt")]
            Device::TensorRT(id) => write!(f, "tensorrt:{}", id),
            #[cfg(feature = "coreml")]
            Device::CoreML => write!(f, "coreml"),
        }
    }
}

/// A wrapper around an ONNX Runtime session and the preprocessor that feeds it.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Session,
    preprocessor: ImagePreprocessor,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    /// Loads a model from a local `.onnx` file.
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        preprocessor: ImagePreprocessor,
        device: &Device,
        intra_threads: Option<usize>,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let threads = intra_threads.unwrap_or_else(num_cpus::get);

        let session = Session::builder()?
            .with_execution_providers(device.providers())?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model {:?}", model_path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("Model has no inputs")?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .context("Model has no outputs")?;

        Ok(Self {
            session,
            preprocessor,
            input_name,
            output_name,
        })
    }

    /// Loads a model through the hub (or its local override) on the configured device.
    pub fn from_pretrained(
        model_file: &ModelFile,
        api: &hf_hub::api::sync::Api,
        preprocessor: ImagePreprocessor,
        runtime: &RuntimeConfig,
    ) -> Result<Self> {
        let device = Device::from_config(runtime)?;
        info!("Using device: {}", device);
        let model_path = model_file.get(api)?;
        Self::load(&model_path, preprocessor, &device, runtime.intra_threads)
    }
}

impl Classifier for OnnxClassifier {
    fn infer(&mut self, image: &DynamicImage) -> Result<Vec<f32>> {
        let tensor = self.preprocessor.process(image)?;
        let input = Tensor::from_array(tensor)?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])?;

        let (shape, logits) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
        anyhow::ensure!(
            shape.first().copied().unwrap_or(1) == 1,
            "Expected a batch of one, model returned shape {:?}",
            shape
        );

        Ok(logits.to_vec())
    }
}
