use crate::document;
use crate::error::{ReforgeError, Result};
use crate::rewrite::RewriteRule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Indentation used by the original exam-bank exports
pub const DEFAULT_INDENT: usize = 4;

/// Accepted shape of the document root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// A list of records or a single record
    #[default]
    Records,
    Array,
    Object,
}

impl Shape {
    pub fn describe(self) -> &'static str {
        match self {
            Shape::Records => "an array or an object",
            Shape::Array => "an array",
            Shape::Object => "an object",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Records => "records",
            Shape::Array => "array",
            Shape::Object => "object",
        })
    }
}

/// Everything one rewrite run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Source document
    pub input: PathBuf,

    /// Destination document. Optional for `Collect`, where it receives the sorted values.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Field the rule inspects or targets. Not used by `Reorder`.
    #[serde(default)]
    pub key: String,

    pub rule: RewriteRule,

    #[serde(default)]
    pub shape: Shape,

    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Do not write anything when the rule changed nothing
    #[serde(default)]
    pub skip_unchanged: bool,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, key: impl Into<String>, rule: RewriteRule) -> Self {
        RunConfig {
            input: input.into(),
            output: None,
            key: key.into(),
            rule,
            shape: Shape::default(),
            indent: DEFAULT_INDENT,
            skip_unchanged: false,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Read a job file. Relative paths inside it are taken from the job file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let value = document::load(path)?;
        let mut config: RunConfig = serde_json::from_value(value)
            .map_err(|e| ReforgeError::InvalidConfig(format!("{}: {}", path.display(), e)))?;

        if let Some(base) = path.parent() {
            config.input = base.join(&config.input);
            config.output = config.output.map(|out| base.join(out));
        }
        Ok(config)
    }
}

fn default_indent() -> usize {
    DEFAULT_INDENT
}

/// Settings for re-encoding a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanConfig {
    pub input: PathBuf,
    pub output: PathBuf,

    /// Also reverse double-decoded UTF-8 in strings and keys
    #[serde(default)]
    pub repair: bool,

    #[serde(default = "default_indent")]
    pub indent: usize,
}

/// What a rewrite run did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,

    /// Top-level records: array length, or 1 for an object root
    pub records: usize,

    /// Objects the rule was applied to
    pub matched: usize,

    pub changes: usize,

    /// Sorted unique values from a `Collect` rule
    pub collected: Vec<String>,

    /// Values with no entry in a `Lookup` table
    pub unmapped: Vec<String>,

    /// Whether an output file was written
    pub written: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub records: usize,
    /// Strings and keys whose encoding was repaired
    pub repaired: usize,
}
