use clap::{Parser, Subcommand};
use psyche::caption::MergeMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON settings file; unset fields keep their defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score images read from stdin, one path per line, until an empty line
    Score,

    /// Score a single image and exit
    ScoreImage {
        /// The image to score
        image_path: PathBuf,
    },

    /// Tag images read from stdin, one path per line, until an empty line
    Tag {
        /// The probability a tag must exceed to be reported
        threshold: Option<f32>,
    },

    /// Tag a single image and exit
    TagImage {
        /// The image to tag
        image_path: PathBuf,

        /// The probability a tag must exceed to be reported
        threshold: Option<f32>,
    },

    /// Tag every image in a directory into `.txt` caption files
    Caption {
        /// The directory containing the images
        dir: PathBuf,

        /// The probability a tag must exceed to be reported
        #[arg(short, long)]
        threshold: Option<f32>,

        /// How generated tags combine with an existing caption
        #[arg(short, long, value_enum, default_value_t = MergeMode::Append)]
        mode: MergeMode,

        /// An extra tag added to every caption
        #[arg(long)]
        custom_tag: Option<String>,
    },

    /// Count how many caption files in a directory use each tag
    Tags {
        /// The directory containing the caption files
        dir: PathBuf,
    },

    /// Remove a tag from every caption file in a directory, ignoring case
    RemoveTag {
        /// The directory containing the caption files
        dir: PathBuf,

        /// The tag to remove
        tag: String,
    },
}
