//! Poisson probability mass functions.

use crate::factorial::LnLookup;

/// Log of the Poisson mass at `k`. A zero rate places all mass on `k = 0`.
#[inline]
pub fn ln_univariate(k: u16, lambda: f64, ln_factorial: &LnLookup) -> f64 {
    if lambda == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    k as f64 * lambda.ln() - lambda - ln_factorial.get(k)
}

/// Fills `masses` with the Poisson mass over outcomes `0..masses.len()`, using the recurrence
/// `p(k) = p(k - 1) λ / k`. Mass beyond the last outcome is not captured.
///
/// For rates large enough that `p(0)` underflows, the recurrence runs in log space instead.
pub fn fill_masses(lambda: f64, masses: &mut [f64]) {
    let mut mass = f64::exp(-lambda);
    if mass < f64::MIN_POSITIVE {
        fill_ln_masses(lambda, masses);
        return;
    }
    for (k, slot) in masses.iter_mut().enumerate() {
        if k > 0 {
            mass *= lambda / k as f64;
        }
        *slot = mass;
    }
}

fn fill_ln_masses(lambda: f64, masses: &mut [f64]) {
    let ln_lambda = lambda.ln();
    let mut ln_mass = -lambda;
    for (k, slot) in masses.iter_mut().enumerate() {
        if k > 0 {
            ln_mass += ln_lambda - (k as f64).ln();
        }
        *slot = ln_mass.exp();
    }
}

pub fn masses(lambda: f64, outcomes: usize) -> Vec<f64> {
    let mut masses = vec![0.0; outcomes];
    fill_masses(lambda, &mut masses);
    masses
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;
    use scorecast_testing::assert_slice_f64_relative;

    const MASSES_1_0: [f64; 3] = [0.36787944117144233, 0.36787944117144233, 0.18393972058572117];
    const MASSES_2_5: [f64; 3] = [0.0820849986238988, 0.205212496559747, 0.25651562069968376];

    #[test]
    pub fn test_ln_univariate() {
        let ln_factorial = LnLookup::default();
        for (k, &expected) in MASSES_1_0.iter().enumerate() {
            assert_float_relative_eq!(
                expected.ln(),
                ln_univariate(k as u16, 1.0, &ln_factorial),
                1e-9
            );
        }
        for (k, &expected) in MASSES_2_5.iter().enumerate() {
            assert_float_relative_eq!(
                expected.ln(),
                ln_univariate(k as u16, 2.5, &ln_factorial),
                1e-9
            );
        }
    }

    #[test]
    pub fn ln_univariate_zero_rate() {
        let ln_factorial = LnLookup::default();
        assert_eq!(0.0, ln_univariate(0, 0.0, &ln_factorial));
        assert_eq!(f64::NEG_INFINITY, ln_univariate(1, 0.0, &ln_factorial));
    }

    #[test]
    pub fn masses_match_known_values() {
        assert_slice_f64_relative(&MASSES_1_0, &masses(1.0, 3), 1e-12);
        assert_slice_f64_relative(&MASSES_2_5, &masses(2.5, 3), 1e-12);
    }

    #[test]
    pub fn masses_match_ln_univariate() {
        let ln_factorial = LnLookup::default();
        let expected = (0..40)
            .map(|k| ln_univariate(k, 1.7, &ln_factorial).exp())
            .collect::<Vec<_>>();
        assert_slice_f64_relative(&expected, &masses(1.7, 40), 1e-9);
    }

    #[test]
    pub fn masses_for_large_rates() {
        let masses = masses(800.0, 1200);
        assert_eq!(0.0, masses[0]);
        assert!(masses.iter().all(|&mass| mass >= 0.0 && mass.is_finite()));
        assert_float_absolute_eq!(1.0, masses.iter().sum::<f64>(), 1e-9);

        let ln_factorial = LnLookup::default();
        assert_float_relative_eq!(
            ln_univariate(800, 800.0, &ln_factorial).exp(),
            masses[800],
            1e-9
        );
    }

    #[test]
    pub fn masses_beyond_factorial_range() {
        let masses = masses(3.0, 60);
        assert_eq!(60, masses.len());
        assert!(masses.iter().all(|&mass| mass >= 0.0 && mass.is_finite()));
        assert_float_absolute_eq!(1.0, masses.iter().sum::<f64>(), 1e-12);
    }
}
