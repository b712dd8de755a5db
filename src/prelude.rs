pub use crate::{
    aesthetic::{AestheticScore, AestheticScorer},
    caption::{caption_directory, CaptionOptions, MergeMode},
    config::Settings,
    error::ProcessError,
    model::{Classifier, Device, OnnxClassifier},
    processor::{ImagePreprocessor, ImageProcessor},
    runner::{run, ImageTask, Mode, Summary},
    tagger::{AutoTagger, TagSet},
    tags::Vocabulary,
};
