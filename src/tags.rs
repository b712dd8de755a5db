use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// Padding entries that align a sorted JSON tag list with the model output.
pub const LEADING_PLACEHOLDER: &str = "placeholder0";
pub const TRAILING_ENTRIES: [&str; 4] = ["placeholder1", "explicit", "questionable", "safe"];

/// Each record in a CSV tag file. Only the name is needed here.
#[derive(Debug, Deserialize)]
struct TagRecord {
    name: String,
}

/// The ordered list of tag names, index-aligned with the tagger output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    names: Vec<String>,
}

impl Vocabulary {
    /// Loads a tag file, picking the layout from its extension.
    ///
    /// `.csv` files are read in row order from their `name` column. Anything
    /// else is read as a JSON array of strings and laid out with
    /// [`Vocabulary::from_tag_list`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

        let vocabulary = if is_csv {
            Self::load_csv(path)?
        } else {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read tag list {:?}", path))?;
            let tags: Vec<String> = serde_json::from_str(&json)
                .with_context(|| format!("Tag list {:?} is not a JSON array of strings", path))?;
            anyhow::ensure!(!tags.is_empty(), "Tag list {:?} is empty", path);
            Self::from_tag_list(tags)
        };

        anyhow::ensure!(!vocabulary.is_empty(), "Tag list {:?} is empty", path);
        Ok(vocabulary)
    }

    fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to read CSV file at {:?}", path))?;
        let names = reader
            .deserialize::<TagRecord>()
            .map(|record| record.map(|r| r.name))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to deserialize tag record")?;
        Ok(Self { names })
    }

    /// Sorts the raw tag list and adds the fixed padding entries around it.
    pub fn from_tag_list(mut tags: Vec<String>) -> Self {
        tags.sort();
        let mut names = Vec::with_capacity(tags.len() + 1 + TRAILING_ENTRIES.len());
        names.push(LEADING_PLACEHOLDER.to_string());
        names.extend(tags);
        names.extend(TRAILING_ENTRIES.iter().map(|s| s.to_string()));
        Self { names }
    }

    /// Uses `names` as given, one per output index.
    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The raw tag name at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// The human-readable name at `index`.
    pub fn display_name(&self, index: usize) -> Option<String> {
        self.get(index).map(display_name)
    }
}

/// Underscores become spaces; commas are dropped so names stay list-safe.
pub fn display_name(raw: &str) -> String {
    raw.chars()
        .filter(|&c| c != ',')
        .map(|c| if c == '_' { ' ' } else { c })
        .collect()
}
