// src/solvers/solution.rs
use ndarray::{Array1, Array2, ArrayView1};

/// Why a vector trajectory stopped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Termination {
    /// Every step of the budget was taken
    Completed,
    /// Step `step` would have produced a negative `component`; that state
    /// was discarded and the trajectory ends at `step - 1`
    NegativeState {
        step: usize,
        time: f64,
        component: usize,
        value: f64,
    },
}

/// Time grid and state trajectory returned by the vector solver
///
/// `states` is `n × k`: one column per retained time point, with
/// `k ≤ n_steps + 1` and `times.len() == k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub times: Array1<f64>,
    pub states: Array2<f64>,
    pub termination: Termination,
}

impl Solution {
    /// Number of retained time points
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn state_dim(&self) -> usize {
        self.states.nrows()
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self.termination, Termination::NegativeState { .. })
    }

    /// State vector at the k-th retained time point
    pub fn state(&self, k: usize) -> ArrayView1<'_, f64> {
        self.states.column(k)
    }

    pub fn final_state(&self) -> ArrayView1<'_, f64> {
        self.states.column(self.len() - 1)
    }

    /// Time series of one compartment
    pub fn component(&self, i: usize) -> ArrayView1<'_, f64> {
        self.states.row(i)
    }
}
