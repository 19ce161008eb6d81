use std::collections::HashMap;

use langbayes::{
    Detector, DetectorBuilderError, LangBayesError, LangProbTable, LanguageList, Prior,
    ALPHA_DEFAULT, N_TRIAL_DEFAULT,
};
use serde::Deserialize;

mod flags {
    xflags::xflags! {
        cmd langbayes {
            /// Estimate the probability of every language for a document.
            cmd classify {
                /// JSON input filepath. Otherwise, stdin is used.
                optional -i, --input input: String
                /// Smoothing coefficient.
                optional -a, --alpha alpha: f64
                /// Number of randomized trials.
                optional -t, --trials trials: usize
                /// Base seed of the trial random streams.
                optional -s, --seed seed: u64
                /// Run trials on every available core.
                optional --parallel
                /// Print every language instead of only the likely ones.
                optional --all
            }

            /// Print the most likely language of a document.
            cmd detect {
                /// JSON input filepath. Otherwise, stdin is used.
                optional -i, --input input: String
                /// Smoothing coefficient.
                optional -a, --alpha alpha: f64
                /// Number of randomized trials.
                optional -t, --trials trials: usize
                /// Base seed of the trial random streams.
                optional -s, --seed seed: u64
                /// Run trials on every available core.
                optional --parallel
            }
        }
    }
}

/// A document to classify. `table` holds one likelihood row per n-gram and
/// `ngrams`, when present, lists the rows observed in the document.
#[derive(Deserialize)]
struct Input {
    languages: LanguageList,
    table: LangProbTable,
    #[serde(default)]
    prior: Option<HashMap<String, f64>>,
    #[serde(default)]
    ngrams: Option<Vec<usize>>,
}

struct Document {
    languages: LanguageList,
    table: LangProbTable,
    prior: Option<Prior>,
}

fn load_document(input: Option<&str>) -> langbayes::Result<Document> {
    let contents = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::io::read_to_string(&mut std::io::stdin())?,
    };

    parse_document(&contents)
}

fn parse_document(contents: &str) -> langbayes::Result<Document> {
    let input: Input = serde_json::from_str(contents)?;

    if input.languages.len() != input.table.lang_count() {
        return Err(LangBayesError::LengthMismatch {
            what: "table",
            expected: input.languages.len(),
            actual: input.table.lang_count(),
        });
    }

    let table = match &input.ngrams {
        Some(ids) => input.table.select(ids)?,
        None => input.table,
    };

    let prior = input
        .prior
        .as_ref()
        .map(|map| Prior::from_map(&input.languages, map))
        .transpose()?;

    log::info!(
        "Loaded {} languages and {} n-grams{}",
        input.languages.len(),
        table.ngram_count(),
        if prior.is_some() { " with a prior" } else { "" }
    );

    Ok(Document {
        languages: input.languages,
        table,
        prior,
    })
}

fn build_detector(
    alpha: Option<f64>,
    trials: Option<usize>,
    seed: Option<u64>,
    parallel: bool,
    prior: Option<Prior>,
) -> Result<Detector, DetectorBuilderError> {
    let mut builder = Detector::builder();

    builder
        .alpha(alpha.unwrap_or(ALPHA_DEFAULT))
        .n_trial(trials.unwrap_or(N_TRIAL_DEFAULT))
        .parallel(parallel);

    if let Some(seed) = seed {
        builder.seed(seed);
    }
    if let Some(prior) = prior {
        builder.prior(prior);
    }

    let detector = builder.build()?;

    log::info!(
        "Running {} trials (alpha: {}, parallel: {})",
        detector.n_trial,
        detector.alpha,
        detector.parallel
    );

    Ok(detector)
}

/// Print the estimated probability of each language as JSON.
fn classify(flags: &flags::Classify) -> Result<(), Box<dyn std::error::Error>> {
    let document = load_document(flags.input.as_deref())?;
    let detector = build_detector(
        flags.alpha,
        flags.trials,
        flags.seed,
        flags.parallel,
        document.prior,
    )?;

    let languages = if flags.all {
        let probs = detector.probabilities(&document.table)?;
        langbayes::rank_all(&document.languages, &probs)?
    } else {
        detector.rank(&document.languages, &document.table)?
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&languages).map_err(LangBayesError::from)?
    );

    Ok(())
}

/// Print the most likely language.
fn detect(flags: &flags::Detect) -> Result<(), Box<dyn std::error::Error>> {
    let document = load_document(flags.input.as_deref())?;
    let detector = build_detector(
        flags.alpha,
        flags.trials,
        flags.seed,
        flags.parallel,
        document.prior,
    )?;

    println!("{}", detector.detect(&document.languages, &document.table)?);

    Ok(())
}

fn main() {
    env_logger::init();

    let result = match flags::Langbayes::from_env_or_exit().subcommand {
        flags::LangbayesCmd::Classify(flags) => classify(&flags),
        flags::LangbayesCmd::Detect(flags) => detect(&flags),
    };

    if let Err(err) = result {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
