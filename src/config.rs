use std::path::PathBuf;

/// Seed used by `random` unless another one is requested.
pub const DEFAULT_SEED: u64 = 13021967;

/// Settings for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Seed of the generator behind `random(a, b)`.
    pub seed: u64,
    /// Directory `read` resolves relative file names against.
    pub base_dir: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            base_dir: PathBuf::from("."),
        }
    }
}

impl Options {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }
}
