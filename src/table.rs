use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{check_length, check_probabilities, LangBayesError, Result};
use crate::language::LanguageList;

/// Dense `ngram_count × lang_count` table of per-language likelihoods. Row
/// `k` holds the likelihood of n-gram `k` under every language, in the order
/// of the language list.
///
/// Every entry is finite and non-negative and the table always has at least
/// one row and one column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct LangProbTable {
    lang_count: usize,
    data: Vec<f64>,
}

impl LangProbTable {
    /// Builds a table from a row-major buffer of `lang_count` columns.
    pub fn from_flat(data: Vec<f64>, lang_count: usize) -> Result<Self> {
        if lang_count == 0 {
            return Err(LangBayesError::EmptyLanguageList);
        }
        if data.is_empty() {
            return Err(LangBayesError::EmptyDocument);
        }
        if data.len() % lang_count != 0 {
            return Err(LangBayesError::LengthMismatch {
                what: "table",
                expected: (data.len() / lang_count + 1) * lang_count,
                actual: data.len(),
            });
        }

        check_probabilities("table", &data)?;

        Ok(Self { lang_count, data })
    }

    /// Builds a table from one likelihood row per n-gram.
    pub fn from_rows<R>(rows: impl IntoIterator<Item = R>) -> Result<Self>
    where
        R: AsRef<[f64]>,
    {
        let mut lang_count = None;
        let mut data = Vec::new();

        for row in rows {
            let row = row.as_ref();
            match lang_count {
                None => lang_count = Some(row.len()),
                Some(expected) => check_length("table row", expected, row.len())?,
            }
            data.extend_from_slice(row);
        }

        match lang_count {
            Some(lang_count) => Self::from_flat(data, lang_count),
            None => Err(LangBayesError::EmptyDocument),
        }
    }

    /// Gathers the rows of the n-grams observed in a document. `self` acts as
    /// the vocabulary, `ids` are row indices into it and may repeat.
    pub fn select(&self, ids: &[usize]) -> Result<Self> {
        if ids.is_empty() {
            return Err(LangBayesError::EmptyDocument);
        }

        let mut data = Vec::with_capacity(ids.len() * self.lang_count);
        for &id in ids {
            if id >= self.ngram_count() {
                return Err(LangBayesError::UnknownNgram {
                    id,
                    vocab_size: self.ngram_count(),
                });
            }
            data.extend_from_slice(self.row(id));
        }

        Ok(Self {
            lang_count: self.lang_count,
            data,
        })
    }

    #[inline]
    pub fn row(&self, k: usize) -> &[f64] {
        &self.data[k * self.lang_count..(k + 1) * self.lang_count]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.lang_count)
    }

    pub fn lang_count(&self) -> usize {
        self.lang_count
    }

    pub fn ngram_count(&self) -> usize {
        self.data.len() / self.lang_count
    }
}

impl TryFrom<Vec<Vec<f64>>> for LangProbTable {
    type Error = LangBayesError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<LangProbTable> for Vec<Vec<f64>> {
    fn from(table: LangProbTable) -> Self {
        table.rows().map(|row| row.to_vec()).collect()
    }
}

/// Initial belief over the language list. The weights are used verbatim as
/// the starting vector of every trial.
#[derive(Clone, Debug, PartialEq)]
pub struct Prior {
    weights: Vec<f64>,
}

impl Prior {
    /// Wraps `weights` as they are. They must be finite and non-negative but
    /// are not required to sum to 1.
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(LangBayesError::EmptyLanguageList);
        }

        check_probabilities("prior", &weights)?;

        Ok(Self { weights })
    }

    /// Builds a normalized prior from per-language weights. Languages missing
    /// from `map` get a weight of 0 and entries naming unknown languages are
    /// ignored.
    pub fn from_map(languages: &LanguageList, map: &HashMap<String, f64>) -> Result<Self> {
        let mut weights = vec![0.0; languages.len()];

        for (i, lang) in languages.iter().enumerate() {
            if let Some(&p) = map.get(lang) {
                if !p.is_finite() || p < 0.0 {
                    return Err(LangBayesError::InvalidPrior(format!(
                        "probability of {:?} must be non-negative, got {}",
                        lang, p
                    )));
                }
                weights[i] = p;
            }
        }

        for lang in map.keys() {
            if languages.position(lang).is_none() {
                log::debug!("Ignoring prior for unknown language {:?}", lang);
            }
        }

        let sum: f64 = weights.iter().sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Err(LangBayesError::InvalidPrior(
                "at least one prior probability must be non-zero".into(),
            ));
        }

        weights.iter_mut().for_each(|w| *w /= sum);

        Self::new(weights)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_from_rows() {
        let table = LangProbTable::from_rows([[0.1, 0.2], [0.3, 0.4], [0.0, 0.5]]).unwrap();
        assert_eq!(table.lang_count(), 2);
        assert_eq!(table.ngram_count(), 3);
        assert_eq!(table.row(1), &[0.3, 0.4]);
        assert_eq!(table.rows().count(), 3);
    }

    #[test]
    fn test_from_rows_errors() {
        let ragged: Vec<Vec<f64>> = vec![vec![0.1, 0.2], vec![0.3]];
        assert!(matches!(
            LangProbTable::from_rows(ragged),
            Err(LangBayesError::LengthMismatch { .. })
        ));

        let empty: Vec<Vec<f64>> = vec![];
        assert!(matches!(
            LangProbTable::from_rows(empty),
            Err(LangBayesError::EmptyDocument)
        ));

        let no_languages: Vec<Vec<f64>> = vec![vec![]];
        assert!(matches!(
            LangProbTable::from_rows(no_languages),
            Err(LangBayesError::EmptyLanguageList)
        ));

        assert!(matches!(
            LangProbTable::from_rows([[0.1, -0.1]]),
            Err(LangBayesError::InvalidProbability { index: 1, .. })
        ));

        assert!(matches!(
            LangProbTable::from_flat(vec![0.1, 0.2, 0.3], 2),
            Err(LangBayesError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_select() {
        let vocab = LangProbTable::from_rows([[0.1, 0.2], [0.3, 0.4], [0.0, 0.5]]).unwrap();

        let document = vocab.select(&[2, 0, 2]).unwrap();
        assert_eq!(document.ngram_count(), 3);
        assert_eq!(document.row(0), &[0.0, 0.5]);
        assert_eq!(document.row(1), &[0.1, 0.2]);
        assert_eq!(document.row(2), &[0.0, 0.5]);

        assert!(matches!(
            vocab.select(&[0, 3]),
            Err(LangBayesError::UnknownNgram {
                id: 3,
                vocab_size: 3
            })
        ));
        assert!(matches!(
            vocab.select(&[]),
            Err(LangBayesError::EmptyDocument)
        ));
    }

    #[test]
    fn test_deserialize() {
        let table: LangProbTable = serde_json::from_str("[[0.5, 0.25], [0.0, 1.0]]").unwrap();
        assert_eq!(table.ngram_count(), 2);
        assert_eq!(table.row(1), &[0.0, 1.0]);

        assert!(serde_json::from_str::<LangProbTable>("[[0.5, 0.25], [1.0]]").is_err());
        assert!(serde_json::from_str::<LangProbTable>("[]").is_err());
        assert!(serde_json::from_str::<LangProbTable>("[[-1.0]]").is_err());

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, "[[0.5,0.25],[0.0,1.0]]");
    }

    #[test]
    fn test_prior_new() {
        let prior = Prior::new(vec![0.0, 3.0]).unwrap();
        assert_eq!(prior.as_slice(), &[0.0, 3.0]);
        assert_eq!(prior.len(), 2);

        assert!(Prior::new(vec![]).is_err());
        assert!(Prior::new(vec![0.5, f64::NAN]).is_err());
    }

    #[test]
    fn test_prior_from_map() {
        let languages = LanguageList::new(["en", "fr", "de"]).unwrap();

        let map = HashMap::from([
            ("en".to_string(), 3.0),
            ("de".to_string(), 1.0),
            ("xx".to_string(), 100.0),
        ]);
        let prior = Prior::from_map(&languages, &map).unwrap();
        assert_approx_eq!(prior.as_slice()[0], 0.75);
        assert_eq!(prior.as_slice()[1], 0.0);
        assert_approx_eq!(prior.as_slice()[2], 0.25);

        let negative = HashMap::from([("en".to_string(), -1.0)]);
        assert!(matches!(
            Prior::from_map(&languages, &negative),
            Err(LangBayesError::InvalidPrior(_))
        ));

        let zero = HashMap::from([("en".to_string(), 0.0), ("xx".to_string(), 1.0)]);
        assert!(matches!(
            Prior::from_map(&languages, &zero),
            Err(LangBayesError::InvalidPrior(_))
        ));
    }
}
