use derive_builder::Builder;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::current_num_threads;
use rayon_cond::CondIterator;

use crate::core::{
    check_length, LangBayesError, Result, ALPHA_DEFAULT, ALPHA_WIDTH, CONV_THRESHOLD,
    ITERATION_LIMIT, NORMALIZE_INTERVAL, N_TRIAL_DEFAULT,
};
use crate::language::{self, Language, LanguageList};
use crate::probability::{init_probability, normalize_prob, update_lang_prob};
use crate::table::{LangProbTable, Prior};

/// Result of one randomized trial.
#[derive(Clone, Debug)]
pub struct TrialOutcome {
    /// Last normalized probability vector of the trial.
    pub prob: Vec<f64>,
    /// Number of n-grams sampled.
    pub iterations: usize,
    /// Whether a language crossed [`CONV_THRESHOLD`] before the iteration
    /// limit was hit.
    pub converged: bool,
}

/// Runs a single trial: starting from the prior (or a uniform vector), it
/// repeatedly samples a row of `table` uniformly at random and folds it into
/// the probability vector. Every [`NORMALIZE_INTERVAL`] updates the vector is
/// normalized and the trial stops once a language dominates or
/// [`ITERATION_LIMIT`] is reached.
///
/// Alpha is jittered by `U(0, ALPHA_WIDTH)` at the start of the trial.
pub fn run_trial<R: Rng>(
    rng: &mut R,
    table: &LangProbTable,
    prior: Option<&Prior>,
    alpha: f64,
) -> Result<TrialOutcome> {
    check_alpha(alpha)?;

    let mut prob = vec![0.0; table.lang_count()];
    init_probability(&mut prob, prior.map(Prior::as_slice))?;

    let trial_alpha = alpha + rng.gen::<f64>() * ALPHA_WIDTH;
    let ngram_count = table.ngram_count();

    let mut i = 0;
    loop {
        let k = rng.gen_range(0..ngram_count);
        update_lang_prob(&mut prob, table.row(k), trial_alpha)?;

        if i % NORMALIZE_INTERVAL == 0 {
            let maxp = normalize_prob(&mut prob)?;
            let converged = maxp > CONV_THRESHOLD;

            if converged || i >= ITERATION_LIMIT {
                log::trace!(
                    "Trial finished after {} iterations (alpha: {:.4}, max: {:.6}, converged: {})",
                    i + 1,
                    trial_alpha,
                    maxp,
                    converged
                );

                return Ok(TrialOutcome {
                    prob,
                    iterations: i + 1,
                    converged,
                });
            }
        }

        i += 1;
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(LangBayesError::InvalidAlpha(alpha));
    }

    Ok(())
}

/// Derives the seed of trial `counter` from a base seed (SplitMix64 finalizer)
/// so that every trial owns an independent, reproducible stream.
fn trial_seed(base_seed: u64, counter: u64) -> u64 {
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Estimates a posterior over the language list by averaging the outcome of
/// `n_trial` independent randomized naive-Bayes trials.
#[non_exhaustive]
#[derive(Builder, Clone, Debug)]
pub struct Detector {
    /// Smoothing coefficient, scaled down by `ALPHA_SCALE` before use.
    #[builder(default = "ALPHA_DEFAULT")]
    pub alpha: f64,
    #[builder(default = "N_TRIAL_DEFAULT")]
    pub n_trial: usize,
    /// Starting vector of every trial. Uniform when absent.
    #[builder(default, setter(strip_option))]
    pub prior: Option<Prior>,
    /// Base seed of the per-trial random streams. Drawn from the thread RNG
    /// when absent.
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
    /// Run trials on the rayon thread pool.
    #[builder(default = "false")]
    pub parallel: bool,
}

impl Default for Detector {
    fn default() -> Self {
        Self::builder().build().unwrap()
    }
}

impl Detector {
    pub fn builder() -> DetectorBuilder {
        DetectorBuilder::default()
    }

    /// Adds the estimated posterior of the document described by `table` to
    /// `output`. `output` is usually zeroed by the caller; it is only written
    /// once every trial has succeeded.
    ///
    /// Each trial draws from its own `StdRng` derived from the base seed, so
    /// a seeded detector gives identical results whether or not it runs in
    /// parallel.
    pub fn classify(&self, output: &mut [f64], table: &LangProbTable) -> Result<()> {
        self.validate(output, table)?;

        let base_seed = self.seed.unwrap_or_else(|| rand::thread_rng().gen());

        let trials = CondIterator::new(0..self.n_trial, self.parallel)
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(trial_seed(base_seed, t as u64));
                run_trial(&mut rng, table, self.prior.as_ref(), self.alpha)
            })
            .collect::<Result<Vec<TrialOutcome>>>()?;

        self.accumulate(output, &trials);

        Ok(())
    }

    /// Same as [`Detector::classify`] but every trial draws from the single
    /// stream `rng`, sequentially. `seed` and `parallel` are ignored.
    pub fn classify_with_rng<R: Rng>(
        &self,
        output: &mut [f64],
        table: &LangProbTable,
        rng: &mut R,
    ) -> Result<()> {
        self.validate(output, table)?;

        let trials = (0..self.n_trial)
            .map(|_| run_trial(&mut *rng, table, self.prior.as_ref(), self.alpha))
            .collect::<Result<Vec<TrialOutcome>>>()?;

        self.accumulate(output, &trials);

        Ok(())
    }

    /// Returns the estimated posterior in a freshly allocated vector.
    pub fn probabilities(&self, table: &LangProbTable) -> Result<Vec<f64>> {
        let mut output = vec![0.0; table.lang_count()];
        self.classify(&mut output, table)?;
        Ok(output)
    }

    /// Languages above the reporting threshold, most likely first.
    pub fn rank(&self, languages: &LanguageList, table: &LangProbTable) -> Result<Vec<Language>> {
        check_length("language list", table.lang_count(), languages.len())?;
        language::sort_probability(languages, &self.probabilities(table)?)
    }

    /// The most likely language, or `UNKNOWN_LANG`.
    pub fn detect(&self, languages: &LanguageList, table: &LangProbTable) -> Result<String> {
        check_length("language list", table.lang_count(), languages.len())?;
        language::detect(languages, &self.probabilities(table)?)
    }

    fn validate(&self, output: &[f64], table: &LangProbTable) -> Result<()> {
        if self.n_trial == 0 {
            return Err(LangBayesError::InvalidTrialCount(self.n_trial));
        }
        check_alpha(self.alpha)?;
        check_length("output", table.lang_count(), output.len())?;
        if let Some(prior) = &self.prior {
            check_length("prior", table.lang_count(), prior.len())?;
        }

        Ok(())
    }

    fn accumulate(&self, output: &mut [f64], trials: &[TrialOutcome]) {
        let n_trial = self.n_trial as f64;

        for trial in trials {
            for (out, p) in output.iter_mut().zip(&trial.prob) {
                *out += p / n_trial;
            }
        }

        let converged = trials.iter().filter(|t| t.converged).count();
        let iterations = trials.iter().map(|t| t.iterations).sum::<usize>();

        log::debug!(
            "{} trials | {} threads | alpha {} | {} converged | {:.1} iterations per trial",
            trials.len(),
            if self.parallel { current_num_threads() } else { 1 },
            self.alpha,
            converged,
            iterations as f64 / trials.len() as f64
        );
    }
}
