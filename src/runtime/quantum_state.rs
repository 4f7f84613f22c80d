use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4, PI};

use crate::error::ExecError;

/// A 2x2 complex matrix; every single-qubit gate is one of these.
pub type Matrix2 = [[Complex64; 2]; 2];

// a collapse branch below this retained probability is numerically
// dead; collapsing into it would divide by ~0, so it is skipped.
const DEGENERACY_EPS: f64 = 1e-12;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

pub fn pauli_x() -> Matrix2 {
    [[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]]
}

pub fn pauli_y() -> Matrix2 {
    [[c(0.0, 0.0), c(0.0, -1.0)], [c(0.0, 1.0), c(0.0, 0.0)]]
}

pub fn pauli_z() -> Matrix2 {
    [[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-1.0, 0.0)]]
}

pub fn hadamard() -> Matrix2 {
    let h = c(FRAC_1_SQRT_2, 0.0);
    [[h, h], [h, -h]]
}

pub fn phase_s() -> Matrix2 {
    [[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, 1.0)]]
}

pub fn phase_t() -> Matrix2 {
    [[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, FRAC_PI_4).exp()]]
}

/// diag(1, e^(i*angle)) - the controlled-phase building block.
pub fn phase_shift(angle: f64) -> Matrix2 {
    [[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, angle).exp()]]
}

pub fn rotation_x(angle: f64) -> Matrix2 {
    let cos_half = (angle / 2.0).cos();
    let sin_half = (angle / 2.0).sin();
    [
        [c(cos_half, 0.0), c(0.0, -sin_half)],
        [c(0.0, -sin_half), c(cos_half, 0.0)],
    ]
}

pub fn rotation_y(angle: f64) -> Matrix2 {
    let cos_half = (angle / 2.0).cos();
    let sin_half = (angle / 2.0).sin();
    [
        [c(cos_half, 0.0), c(-sin_half, 0.0)],
        [c(sin_half, 0.0), c(cos_half, 0.0)],
    ]
}

pub fn rotation_z(angle: f64) -> Matrix2 {
    [
        [c(0.0, -angle / 2.0).exp(), c(0.0, 0.0)],
        [c(0.0, 0.0), c(0.0, angle / 2.0).exp()],
    ]
}

/// The quantum register file: a dense complex amplitude vector of
/// length 2^n over n qubits. Bit k of a basis index is the classical
/// value of qubit k in that branch. The vector stays unit-norm except
/// transiently mid-update.
#[derive(Debug, Serialize, Clone)]
pub struct QuantumState {
    pub n: usize,
    pub amps: Vec<Complex64>,
    #[serde(skip)]
    rng: StdRng,
}

impl QuantumState {
    pub fn new(n: usize) -> Self {
        Self::with_rng(n, StdRng::from_entropy())
    }

    /// Fixed-seed construction for reproducible measurement outcomes.
    pub fn with_seed(n: usize, seed: u64) -> Self {
        Self::with_rng(n, StdRng::seed_from_u64(seed))
    }

    fn with_rng(n: usize, rng: StdRng) -> Self {
        assert!(n >= 1, "at least one qubit required");
        assert!(n <= 26, "state vector of 2^{n} amplitudes is too large");
        let mut amps = vec![c(0.0, 0.0); 1 << n];
        amps[0] = c(1.0, 0.0);
        QuantumState { n, amps, rng }
    }

    /// Back to |0...0>. The rng is kept, so a seeded state stays
    /// deterministic across resets.
    pub fn reset(&mut self) {
        self.amps.par_iter_mut().for_each(|amp| *amp = c(0.0, 0.0));
        self.amps[0] = c(1.0, 0.0);
    }

    fn check_qubit(&self, q: usize) -> Result<(), ExecError> {
        if q < self.n {
            Ok(())
        } else {
            Err(ExecError::QubitOutOfRange { q, n: self.n })
        }
    }

    /// The single-qubit primitive: pair each basis index with its
    /// qubit-flipped partner and apply the 2x2 matrix to the amplitude
    /// pair. Every named single-qubit gate is an instance of this.
    pub fn apply_unitary(&mut self, q: usize, m: &Matrix2) -> Result<(), ExecError> {
        self.check_qubit(q)?;
        let mask = 1usize << q;
        let old_amps = &self.amps;
        let new_amps: Vec<Complex64> = (0..old_amps.len())
            .into_par_iter()
            .map(|i| {
                if i & mask == 0 {
                    m[0][0] * old_amps[i] + m[0][1] * old_amps[i | mask]
                } else {
                    m[1][0] * old_amps[i ^ mask] + m[1][1] * old_amps[i]
                }
            })
            .collect();
        self.amps = new_amps;
        Ok(())
    }

    /// Applies `m` to the target bit of every basis state whose
    /// control bit is 1; control-0 branches are untouched.
    pub fn apply_controlled(
        &mut self,
        control: usize,
        target: usize,
        m: &Matrix2,
    ) -> Result<(), ExecError> {
        self.check_qubit(control)?;
        self.check_qubit(target)?;
        if control == target {
            return Err(ExecError::SameQubit);
        }
        let c_mask = 1usize << control;
        let t_mask = 1usize << target;
        let old_amps = self.amps.clone();
        self.amps.par_iter_mut().enumerate().for_each(|(i, amp)| {
            if i & c_mask != 0 {
                *amp = if i & t_mask == 0 {
                    m[0][0] * old_amps[i] + m[0][1] * old_amps[i | t_mask]
                } else {
                    m[1][0] * old_amps[i ^ t_mask] + m[1][1] * old_amps[i]
                };
            }
        });
        Ok(())
    }

    /// Flips the target bit wherever both control bits are 1.
    pub fn apply_toffoli(&mut self, c1: usize, c2: usize, target: usize) -> Result<(), ExecError> {
        self.check_qubit(c1)?;
        self.check_qubit(c2)?;
        self.check_qubit(target)?;
        if c1 == c2 || c1 == target || c2 == target {
            return Err(ExecError::SameQubit);
        }
        let c1_mask = 1usize << c1;
        let c2_mask = 1usize << c2;
        let t_mask = 1usize << target;
        let old_amps = self.amps.clone();
        self.amps.par_iter_mut().enumerate().for_each(|(i, amp)| {
            if (i & c1_mask != 0) && (i & c2_mask != 0) {
                *amp = old_amps[i ^ t_mask];
            }
        });
        Ok(())
    }

    pub fn apply_h(&mut self, q: usize) -> Result<(), ExecError> {
        self.apply_unitary(q, &hadamard())
    }

    pub fn apply_x(&mut self, q: usize) -> Result<(), ExecError> {
        self.apply_unitary(q, &pauli_x())
    }

    pub fn apply_y(&mut self, q: usize) -> Result<(), ExecError> {
        self.apply_unitary(q, &pauli_y())
    }

    pub fn apply_z(&mut self, q: usize) -> Result<(), ExecError> {
        self.apply_unitary(q, &pauli_z())
    }

    pub fn apply_s(&mut self, q: usize) -> Result<(), ExecError> {
        self.apply_unitary(q, &phase_s())
    }

    pub fn apply_t(&mut self, q: usize) -> Result<(), ExecError> {
        self.apply_unitary(q, &phase_t())
    }

    pub fn apply_rx(&mut self, q: usize, angle: f64) -> Result<(), ExecError> {
        self.apply_unitary(q, &rotation_x(angle))
    }

    pub fn apply_ry(&mut self, q: usize, angle: f64) -> Result<(), ExecError> {
        self.apply_unitary(q, &rotation_y(angle))
    }

    pub fn apply_rz(&mut self, q: usize, angle: f64) -> Result<(), ExecError> {
        self.apply_unitary(q, &rotation_z(angle))
    }

    pub fn apply_cnot(&mut self, control: usize, target: usize) -> Result<(), ExecError> {
        self.apply_controlled(control, target, &pauli_x())
    }

    pub fn apply_cz(&mut self, control: usize, target: usize) -> Result<(), ExecError> {
        self.apply_controlled(control, target, &pauli_z())
    }

    pub fn apply_cy(&mut self, control: usize, target: usize) -> Result<(), ExecError> {
        self.apply_controlled(control, target, &pauli_y())
    }

    pub fn apply_controlled_phase(
        &mut self,
        control: usize,
        target: usize,
        angle: f64,
    ) -> Result<(), ExecError> {
        self.apply_controlled(control, target, &phase_shift(angle))
    }

    /// Swap as three sequential cnots, not an index permutation; the
    /// numerical result must match the controlled-gate decomposition
    /// exactly.
    pub fn swap(&mut self, q1: usize, q2: usize) -> Result<(), ExecError> {
        self.apply_cnot(q1, q2)?;
        self.apply_cnot(q2, q1)?;
        self.apply_cnot(q1, q2)
    }

    /// H on q1 then cnot(q1, q2).
    pub fn bell(&mut self, q1: usize, q2: usize) -> Result<(), ExecError> {
        self.apply_h(q1)?;
        self.apply_cnot(q1, q2)
    }

    /// Quantum Fourier transform over the given qubits: H on each
    /// qubit in order, a controlled phase of pi/2^(k-j) from each later
    /// qubit k onto qubit j, then qubit-order reversal via swaps.
    pub fn qft(&mut self, qubits: &[usize]) -> Result<(), ExecError> {
        for &q in qubits {
            self.check_qubit(q)?;
        }
        let m = qubits.len();
        for j in 0..m {
            self.apply_h(qubits[j])?;
            for k in (j + 1)..m {
                let angle = PI / (1u64 << (k - j)) as f64;
                self.apply_controlled_phase(qubits[k], qubits[j], angle)?;
            }
        }
        for i in 0..m / 2 {
            self.swap(qubits[i], qubits[m - 1 - i])?;
        }
        Ok(())
    }

    /// Probability that measuring `q` yields `outcome`: the summed
    /// squared magnitudes over the matching basis indices.
    pub fn probability(&self, q: usize, outcome: u8) -> Result<f64, ExecError> {
        self.check_qubit(q)?;
        let mask = 1usize << q;
        let want = if outcome == 0 { 0 } else { mask };
        Ok(self
            .amps
            .par_iter()
            .enumerate()
            .filter(|(i, _)| i & mask == want)
            .map(|(_, amp)| amp.norm_sqr())
            .sum())
    }

    /// Measures qubit `q`: draws the outcome, then collapses the state
    /// to the consistent branches and renormalizes.
    pub fn measure(&mut self, q: usize) -> Result<u8, ExecError> {
        let prob_zero = self.probability(q, 0)?;
        let draw: f64 = self.rng.gen();
        let outcome = if draw < prob_zero { 0 } else { 1 };
        self.collapse(q, outcome);
        Ok(outcome)
    }

    /// Forces qubit `q` into `outcome` without drawing: the same
    /// collapse the `reset` instruction uses (outcome 0).
    pub fn force(&mut self, q: usize, outcome: u8) -> Result<(), ExecError> {
        self.check_qubit(q)?;
        self.collapse(q, outcome);
        Ok(())
    }

    fn collapse(&mut self, q: usize, outcome: u8) {
        let retained = match self.probability(q, outcome) {
            Ok(p) => p,
            Err(_) => return,
        };
        if retained < DEGENERACY_EPS {
            log::warn!(
                "collapse of qubit {q} to {outcome} would retain ~0 probability, leaving state unchanged"
            );
            return;
        }
        let norm = retained.sqrt();
        let mask = 1usize << q;
        let want = if outcome == 0 { 0 } else { mask };
        self.amps.par_iter_mut().enumerate().for_each(|(i, amp)| {
            if i & mask == want {
                *amp /= norm;
            } else {
                *amp = c(0.0, 0.0);
            }
        });
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.amps.par_iter().map(|a| a.norm_sqr()).collect()
    }

    /// Basis states carrying non-negligible amplitude, for display.
    pub fn nonzero_amplitudes(&self) -> Vec<(usize, Complex64)> {
        self.amps
            .iter()
            .enumerate()
            .filter(|(_, amp)| amp.norm_sqr() > 1e-8)
            .map(|(i, amp)| (i, *amp))
            .collect()
    }

    /// Renders basis index `index` as a bit string, qubit 0 rightmost.
    pub fn basis_label(&self, index: usize) -> String {
        (0..self.n)
            .rev()
            .map(|q| if index >> q & 1 == 1 { '1' } else { '0' })
            .collect()
    }

    /// Checks the unit-norm invariant and scans for nan/infinite
    /// amplitudes.
    pub fn validate(&self) -> Result<(), String> {
        if self.amps.is_empty() {
            return Err("quantum state amplitudes vector is empty".to_string());
        }
        let has_nan = self
            .amps
            .par_iter()
            .any(|amp| amp.re.is_nan() || amp.im.is_nan());
        let has_inf = self
            .amps
            .par_iter()
            .any(|amp| amp.re.is_infinite() || amp.im.is_infinite());
        let norm_sqr_sum: f64 = self.amps.par_iter().map(|amp| amp.norm_sqr()).sum();
        if has_nan {
            return Err("quantum state contains nan values".to_string());
        }
        if has_inf {
            return Err("quantum state contains infinite values".to_string());
        }
        if (norm_sqr_sum - 1.0).abs() > 1e-9 {
            return Err(format!(
                "quantum state is not normalized. norm squared: {norm_sqr_sum}"
            ));
        }
        Ok(())
    }
}
