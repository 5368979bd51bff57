//! Mass-action equilibrium for one tube.
//!
//! With free-strand chemical potentials `λ`, every complex has mole fraction
//! `x_c = exp(w_c + Σ_s n_cs λ_s)`. The equilibrium minimizes the convex
//! function `f(λ) = Σ_c x_c - Σ_s x0_s λ_s`, whose gradient is the strand
//! mass balance. Newton's method with backtracking finds it.

use crate::error::SolverError;
use tracing::debug;

const TOLERANCE: f64 = 1e-9;
const MAX_ITERATIONS: usize = 10_000;
const MAX_STEP: f64 = 8.0;
const ARMIJO: f64 = 1e-4;
const MIN_STEP_SCALE: f64 = 1e-12;
const REGULARIZATION: f64 = 1e-10;

pub(crate) struct MassAction<'a> {
    pub tube: &'a str,
    /// strand counts, one row per complex
    pub counts: &'a [Vec<usize>],
    /// log Boltzmann weight of each complex in mole-fraction units
    pub log_weights: &'a [f64],
    /// total mole fraction of each strand
    pub totals: &'a [f64],
}

impl MassAction<'_> {
    fn fractions(&self, lambda: &[f64]) -> Vec<f64> {
        self.counts
            .iter()
            .zip(self.log_weights)
            .map(|(row, w)| {
                let exponent: f64 = row.iter().zip(lambda).map(|(n, l)| *n as f64 * l).sum();
                (w + exponent).exp()
            })
            .collect()
    }

    fn objective(&self, lambda: &[f64], x: &[f64]) -> f64 {
        x.iter().sum::<f64>()
            - self
                .totals
                .iter()
                .zip(lambda)
                .map(|(t, l)| t * l)
                .sum::<f64>()
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut g: Vec<f64> = self.totals.iter().map(|t| -t).collect();
        for (row, xc) in self.counts.iter().zip(x) {
            for (s, n) in row.iter().enumerate() {
                g[s] += *n as f64 * xc;
            }
        }
        g
    }

    fn residual(&self, g: &[f64]) -> f64 {
        g.iter()
            .zip(self.totals)
            .map(|(g, t)| g.abs() / t)
            .fold(0.0, f64::max)
    }

    fn hessian(&self, x: &[f64]) -> Vec<Vec<f64>> {
        let n = self.totals.len();
        let mut h = vec![vec![0.0; n]; n];
        for (row, xc) in self.counts.iter().zip(x) {
            for s in 0..n {
                if row[s] == 0 {
                    continue;
                }
                for t in 0..n {
                    h[s][t] += (row[s] * row[t]) as f64 * xc;
                }
            }
        }
        // a dominant complex makes H nearly rank one far from equilibrium
        let max_diag = (0..n).map(|s| h[s][s]).fold(0.0, f64::max);
        for s in 0..n {
            h[s][s] += REGULARIZATION * max_diag;
        }
        h
    }

    /// Start with every strand free as a monomer.
    fn initial_lambda(&self) -> Vec<f64> {
        (0..self.totals.len())
            .map(|s| {
                let monomer_weight = self
                    .counts
                    .iter()
                    .zip(self.log_weights)
                    .find(|(row, _)| {
                        row.iter()
                            .enumerate()
                            .all(|(t, n)| *n == usize::from(t == s))
                    })
                    .map(|(_, w)| *w)
                    .unwrap_or(0.0);
                self.totals[s].ln() - monomer_weight
            })
            .collect()
    }

    /// Equilibrium mole fraction of every complex.
    pub fn solve(&self) -> Result<Vec<f64>, SolverError> {
        let mut lambda = self.initial_lambda();
        let mut x = self.fractions(&lambda);
        let mut residual = f64::INFINITY;

        for iteration in 0..MAX_ITERATIONS {
            let g = self.gradient(&x);
            residual = self.residual(&g);
            if residual < TOLERANCE {
                debug!(tube = self.tube, iteration, residual, "concentrations converged");
                return Ok(x);
            }

            let neg_g: Vec<f64> = g.iter().map(|v| -v).collect();
            let Some(mut step) = solve_linear(self.hessian(&x), neg_g) else {
                break;
            };
            let longest = step.iter().fold(0.0, |m: f64, v| m.max(v.abs()));
            if longest > MAX_STEP {
                step.iter_mut().for_each(|v| *v *= MAX_STEP / longest);
            }

            let f = self.objective(&lambda, &x);
            let slope: f64 = g.iter().zip(&step).map(|(a, b)| a * b).sum();
            let mut scale = 1.0;
            loop {
                let trial: Vec<f64> = lambda
                    .iter()
                    .zip(&step)
                    .map(|(l, d)| l + scale * d)
                    .collect();
                let trial_x = self.fractions(&trial);
                let trial_f = self.objective(&trial, &trial_x);
                let trial_residual = self.residual(&self.gradient(&trial_x));
                let accept = trial_f.is_finite()
                    && (trial_f <= f + ARMIJO * scale * slope || trial_residual < residual);
                if accept || scale < MIN_STEP_SCALE {
                    lambda = trial;
                    x = trial_x;
                    break;
                }
                scale *= 0.5;
            }
        }

        Err(SolverError::NonConvergence {
            tube: self.tube.to_string(),
            iterations: MAX_ITERATIONS,
            residual,
            tolerance: TOLERANCE,
        })
    }
}

/// Gaussian elimination with partial pivoting; `None` if singular.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))?;
        if a[pivot][col].abs() < f64::MIN_POSITIVE {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_linear() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve_linear(a, vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
        assert!(solve_linear(vec![vec![0.0]], vec![1.0]).is_none());
    }

    #[test]
    fn test_monomers_only() {
        let counts = vec![vec![1, 0], vec![0, 1]];
        let weights = vec![0.0, 0.0];
        let totals = vec![1e-8, 2e-8];
        let x = MassAction {
            tube: "t",
            counts: &counts,
            log_weights: &weights,
            totals: &totals,
        }
        .solve()
        .unwrap();
        assert!((x[0] - 1e-8).abs() < 1e-16);
        assert!((x[1] - 2e-8).abs() < 1e-16);
    }

    #[test]
    fn test_dimerization_matches_closed_form() {
        // A + B <-> AB with K = x_ab / (x_a x_b)
        let k: f64 = 1e8;
        let total = 1e-8;
        let counts = vec![vec![1, 0], vec![0, 1], vec![1, 1]];
        let weights = vec![0.0, 0.0, k.ln()];
        let totals = vec![total, total];
        let x = MassAction {
            tube: "t",
            counts: &counts,
            log_weights: &weights,
            totals: &totals,
        }
        .solve()
        .unwrap();
        // K f^2 + f - total = 0
        let free = (-1.0 + (1.0 + 4.0 * k * total).sqrt()) / (2.0 * k);
        assert!((x[0] - free).abs() / free < 1e-6);
        assert!((x[2] - (total - free)).abs() / total < 1e-6);
        // mass balance
        assert!((x[0] + x[2] - total).abs() / total < 1e-8);
    }

    #[test]
    fn test_strong_trimer_consumes_strands() {
        let counts = vec![
            vec![1, 0, 0],
            vec![0, 1, 0],
            vec![0, 0, 1],
            vec![1, 1, 1],
        ];
        let weights = vec![0.0, 0.0, 0.0, 120.0];
        let totals = vec![1.8e-8; 3];
        let x = MassAction {
            tube: "t",
            counts: &counts,
            log_weights: &weights,
            totals: &totals,
        }
        .solve()
        .unwrap();
        assert!((x[3] - 1.8e-8).abs() / 1.8e-8 < 1e-6);
        assert!(x[0] < 1e-12);
    }
}
