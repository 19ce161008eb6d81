use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::{check_length, LangBayesError, Result, PROB_THRESHOLD, UNKNOWN_LANG};

/// Ordered list of candidate language identifiers. The position of a
/// language is its column in every likelihood table and probability vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LanguageList {
    langs: Vec<String>,
}

impl LanguageList {
    pub fn new<I>(langs: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let langs: Vec<String> = langs.into_iter().map(Into::into).collect();
        if langs.is_empty() {
            return Err(LangBayesError::EmptyLanguageList);
        }

        let mut seen = HashSet::new();
        for lang in &langs {
            if !seen.insert(lang.as_str()) {
                return Err(LangBayesError::DuplicateLanguage(lang.clone()));
            }
        }

        Ok(Self { langs })
    }

    pub fn len(&self) -> usize {
        self.langs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.langs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.langs.iter()
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.langs.get(i).map(String::as_str)
    }

    pub fn position(&self, lang: &str) -> Option<usize> {
        self.langs.iter().position(|l| l == lang)
    }
}

impl TryFrom<Vec<String>> for LanguageList {
    type Error = LangBayesError;

    fn try_from(langs: Vec<String>) -> Result<Self> {
        Self::new(langs)
    }
}

impl From<LanguageList> for Vec<String> {
    fn from(list: LanguageList) -> Self {
        list.langs
    }
}

/// A language paired with its estimated probability.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Language {
    pub lang: String,
    pub prob: f64,
}

/// Pairs every probability with its language and sorts them from most to
/// least likely.
pub fn rank_all(languages: &LanguageList, probs: &[f64]) -> Result<Vec<Language>> {
    check_length("probabilities", languages.len(), probs.len())?;

    let mut ranked: Vec<Language> = languages
        .iter()
        .zip(probs)
        .map(|(lang, &prob)| Language {
            lang: lang.clone(),
            prob,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.prob
            .partial_cmp(&a.prob)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(ranked)
}

/// Same as [`rank_all`] but drops languages at or below [`PROB_THRESHOLD`].
pub fn sort_probability(languages: &LanguageList, probs: &[f64]) -> Result<Vec<Language>> {
    let mut ranked = rank_all(languages, probs)?;
    ranked.retain(|l| l.prob > PROB_THRESHOLD);
    Ok(ranked)
}

/// Returns the most likely language, or [`UNKNOWN_LANG`] if no language
/// clears the threshold.
pub fn detect(languages: &LanguageList, probs: &[f64]) -> Result<String> {
    Ok(sort_probability(languages, probs)?
        .into_iter()
        .next()
        .map_or_else(|| UNKNOWN_LANG.to_string(), |l| l.lang))
}
