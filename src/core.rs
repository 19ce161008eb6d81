use thiserror::Error;

/// Hard cap on the number of updates performed by a single trial.
pub const ITERATION_LIMIT: usize = 1000;

/// A trial stops once one language holds more than this share of the
/// normalized posterior.
pub const CONV_THRESHOLD: f64 = 0.99999;

/// Width of the uniform jitter added to alpha at the start of every trial.
pub const ALPHA_WIDTH: f64 = 0.05;

/// Alpha is divided by this before being used as the additive smoothing term.
pub const ALPHA_SCALE: f64 = 10000.0;

pub const ALPHA_DEFAULT: f64 = 0.5;

pub const N_TRIAL_DEFAULT: usize = 7;

/// Languages at or below this probability are omitted from rankings.
pub const PROB_THRESHOLD: f64 = 0.1;

pub const UNKNOWN_LANG: &str = "unknown";

/// Normalization is checked every this many updates.
pub(crate) const NORMALIZE_INTERVAL: usize = 5;

pub type Result<T> = std::result::Result<T, LangBayesError>;

#[derive(Debug, Error)]
pub enum LangBayesError {
    #[error("the language list is empty")]
    EmptyLanguageList,
    #[error("no features in text")]
    EmptyDocument,
    #[error("number of trials must be positive, got {0}")]
    InvalidTrialCount(usize),
    #[error("alpha must be finite and non-negative, got {0}")]
    InvalidAlpha(f64),
    #[error("{what} has length {actual}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{what} has an invalid probability {value} at index {index}")]
    InvalidProbability {
        what: &'static str,
        index: usize,
        value: f64,
    },
    #[error("cannot normalize a probability vector summing to {sum}")]
    DegenerateProbability { sum: f64 },
    #[error("n-gram id {id} is out of bounds for a table of {vocab_size} n-grams")]
    UnknownNgram { id: usize, vocab_size: usize },
    #[error("duplicate language {0:?}")]
    DuplicateLanguage(String),
    #[error("invalid prior: {0}")]
    InvalidPrior(String),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Checks that every value is finite and non-negative.
pub(crate) fn check_probabilities(what: &'static str, values: &[f64]) -> Result<()> {
    match values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        Some((index, value)) => Err(LangBayesError::InvalidProbability {
            what,
            index,
            value: *value,
        }),
        None => Ok(()),
    }
}

pub(crate) fn check_length(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(LangBayesError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }

    Ok(())
}
