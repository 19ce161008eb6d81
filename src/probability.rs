use crate::core::{check_length, LangBayesError, Result, ALPHA_SCALE};

/// Fills `prob` with the starting distribution of a trial. A prior is copied
/// verbatim without being normalized; otherwise every language starts at
/// `1 / prob.len()`.
pub fn init_probability(prob: &mut [f64], prior: Option<&[f64]>) -> Result<()> {
    if prob.is_empty() {
        return Err(LangBayesError::EmptyLanguageList);
    }

    match prior {
        Some(prior) => {
            check_length("prior", prob.len(), prior.len())?;
            prob.copy_from_slice(prior);
        }
        None => {
            let init = 1.0 / prob.len() as f64;
            prob.fill(init);
        }
    }

    Ok(())
}

/// Multiplies each language's probability by its likelihood for one n-gram.
/// `alpha / ALPHA_SCALE` is added to every likelihood so that a language
/// never observed with this n-gram is penalised rather than eliminated.
///
/// No normalization happens here, values drift away from 1 with every call.
#[inline]
pub fn update_lang_prob(prob: &mut [f64], lang_prob_map: &[f64], alpha: f64) -> Result<()> {
    check_length("likelihood row", prob.len(), lang_prob_map.len())?;

    let weight = alpha / ALPHA_SCALE;
    for (p, likelihood) in prob.iter_mut().zip(lang_prob_map) {
        *p *= weight + likelihood;
    }

    Ok(())
}

/// Rescales `prob` to sum to 1 and returns its largest component.
///
/// # Errors
///
/// Returns [`LangBayesError::DegenerateProbability`] when the sum is zero,
/// negative or not finite. `prob` is left untouched in that case.
pub fn normalize_prob(prob: &mut [f64]) -> Result<f64> {
    let sum: f64 = prob.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(LangBayesError::DegenerateProbability { sum });
    }

    let mut maxp = 0.0;
    for p in prob.iter_mut() {
        *p /= sum;
        if *p > maxp {
            maxp = *p;
        }
    }

    Ok(maxp)
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_init_probability_uniform() {
        let mut prob = vec![0.0; 4];
        init_probability(&mut prob, None).unwrap();
        assert_eq!(prob, vec![0.25; 4]);
    }

    #[test]
    fn test_init_probability_prior_is_verbatim() {
        // Priors are not normalized by the initializer.
        let mut prob = vec![0.0; 3];
        init_probability(&mut prob, Some(&[2.0, 1.0, 0.0])).unwrap();
        assert_eq!(prob, vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_init_probability_errors() {
        let mut empty: Vec<f64> = vec![];
        assert!(matches!(
            init_probability(&mut empty, None),
            Err(LangBayesError::EmptyLanguageList)
        ));

        let mut prob = vec![0.0; 3];
        assert!(matches!(
            init_probability(&mut prob, Some(&[0.5, 0.5])),
            Err(LangBayesError::LengthMismatch {
                what: "prior",
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_update_lang_prob() {
        let mut prob = vec![0.5, 0.5];
        update_lang_prob(&mut prob, &[0.2, 0.0], 0.0).unwrap();
        assert_approx_eq!(prob[0], 0.1);
        assert_eq!(prob[1], 0.0);

        let mut prob = vec![0.5, 0.5];
        update_lang_prob(&mut prob, &[0.2, 0.0], 1.0).unwrap();
        assert_approx_eq!(prob[0], 0.5 * (0.2 + 1e-4));
        // The smoothing term keeps unseen languages alive.
        assert_approx_eq!(prob[1], 0.5 * 1e-4);

        // A short row is rejected before anything is multiplied.
        let mut prob = vec![0.5, 0.5];
        assert!(matches!(
            update_lang_prob(&mut prob, &[0.2], 0.0),
            Err(LangBayesError::LengthMismatch {
                what: "likelihood row",
                expected: 2,
                actual: 1
            })
        ));
        assert_eq!(prob, vec![0.5, 0.5]);
    }

    #[test]
    fn test_normalize_prob() {
        let mut prob = vec![1.0, 3.0];
        let maxp = normalize_prob(&mut prob).unwrap();
        assert_approx_eq!(prob[0], 0.25);
        assert_approx_eq!(prob[1], 0.75);
        assert_approx_eq!(maxp, 0.75);

        let mut single = vec![1e-30];
        assert_eq!(normalize_prob(&mut single).unwrap(), 1.0);
        assert_eq!(single, vec![1.0]);
    }

    #[test]
    fn test_normalize_prob_degenerate() {
        for values in [
            vec![0.0, 0.0],
            vec![f64::INFINITY, 1.0],
            vec![f64::NAN, 1.0],
            vec![f64::MAX, f64::MAX],
        ] {
            let mut prob = values.clone();
            assert!(
                matches!(
                    normalize_prob(&mut prob),
                    Err(LangBayesError::DegenerateProbability { .. })
                ),
                "expected {:?} to be rejected",
                values
            );
        }

        let mut prob = vec![0.0, 0.0];
        let _ = normalize_prob(&mut prob);
        assert_eq!(prob, vec![0.0, 0.0]);
    }
}
