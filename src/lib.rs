//! # Psyche
//!
//! Psyche scores and tags images with pretrained ONNX classifiers. It is built to
//! sit behind a pipe: a parent process writes image paths to stdin and reads one
//! result line per path from stdout.
//!
//! ## Features
//!
//! - **Aesthetic scoring**: a two-class classifier logit mapped onto a 1–10 scale.
//! - **Auto-tagging**: multi-label sigmoid outputs thresholded into tag lists.
//! - **Line protocol**: persistent stdin loop or one-shot runs over the same tasks.
//! - **Caption files**: batch-tag a directory into `.txt` sidecars.
//! - **ONNX Runtime**: powered by `ort`, with optional CUDA, TensorRT and CoreML.
//!
//! ## Modules
//!
//! - `runner`: the read-eval-print loop and the `ImageTask` trait.
//! - `aesthetic`: the aesthetic scorer.
//! - `tagger`: the auto-tagger and its selection rule.
//! - `tags`: tag vocabularies.
//! - `model`: the `Classifier` trait and the ONNX Runtime session.
//! - `processor`: image preprocessing.
//! - `caption`: sidecar caption writing.
//! - `config`: settings and Hugging Face preprocessor configs.
//! - `file`: model file resolution through the hub.
//! - `error`: error types.
//! - `logging`: tracing subscriber setup.
//! - `prelude`: a collection of the most commonly used types.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod prelude;

pub mod aesthetic;
pub mod caption;
pub mod model;
pub mod processor;
pub mod runner;
pub mod tagger;
pub mod tags;
