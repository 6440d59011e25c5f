// src/models/dengue.rs
//! Four-serotype dengue model with cross-immunity
//!
//! # Compartments
//!
//! Hosts are tracked by infection history. `I_<h>k` is infectious with
//! serotype k after previous infections h (in order); `R_<h>` has recovered
//! from the serotypes in h (sorted). With S this gives 48 compartments:
//! S, 4 primary, 12 secondary, 12 tertiary and 4 quaternary infectives,
//! and 4 + 6 + 4 + 1 recovered classes.
//!
//! # Transitions
//!
//! ```text
//! infection   X_h → I_<h>k   rate  β X_h Λ_k           (h = ∅)
//!                                  δ β X_h Λ_k         (h ≠ ∅)
//! recovery    I_<h>k → R_<h∪k>   rate  σ I_<h>k
//! birth       → S             rate  μ N
//! death       X →             rate  μ X               (every compartment)
//! ```
//! where Λ_k, the force of infection of serotype k, is the sum of every
//! infectious compartment whose newest infection is k.

use crate::error::{validation::*, SdeError, SdeResult};
use crate::evaluator::SymbolicSystem;
use crate::expr::Expr;
use crate::models::model::CompartmentModel;
use crate::models::reaction::ReactionNetwork;
use crate::solvers::Solution;
use ndarray::{Array1, Array2};

pub const SEROTYPES: usize = 4;

/// State vector layout
pub const COMPARTMENTS: [&str; 48] = [
    "S", "I_1", "I_2", "I_3", "I_4", "R_1", "R_2", "R_3", "R_4", //
    "I_12", "I_13", "I_14", "I_21", "I_23", "I_24", "I_31", "I_32", "I_34", "I_41", "I_42",
    "I_43", //
    "R_12", "R_13", "R_14", "R_23", "R_24", "R_34", //
    "I_231", "I_241", "I_341", "I_132", "I_142", "I_342", "I_123", "I_143", "I_243", "I_124",
    "I_134", "I_234", //
    "R_123", "R_124", "R_134", "R_234", //
    "I_1234", "I_1243", "I_1342", "I_2341", "R_1234",
];

pub const PARAMETERS: [&str; 5] = ["beta", "delta", "mu", "sigma", "N"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DengueParams {
    /// Transmission rate per week
    pub beta: f64,
    /// Susceptibility of previously infected hosts relative to naive ones
    pub delta: f64,
    /// Per-capita birth and death rate
    pub mu: f64,
    /// Recovery rate
    pub sigma: f64,
    /// Population size driving births
    pub population: f64,
}

impl Default for DengueParams {
    fn default() -> Self {
        Self {
            beta: 400.0 / 52.0,
            delta: 0.2,
            mu: 1.0 / (70.0 * 52.0),
            sigma: 1.0 / 1.5,
            population: 50_000.0,
        }
    }
}

impl DengueParams {
    pub fn validate(&self) -> SdeResult<()> {
        validate_non_negative("beta", self.beta)?;
        validate_non_negative("delta", self.delta)?;
        validate_non_negative("mu", self.mu)?;
        validate_positive("sigma", self.sigma)?;
        validate_positive("N", self.population)?;
        if self.delta > 1.0 {
            return Err(SdeError::InvalidArgument {
                parameter: "delta".to_string(),
                value: self.delta,
                constraint: "relative susceptibility must be in [0, 1]".to_string(),
            });
        }
        Ok(())
    }

    /// Values in the order of [`PARAMETERS`]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.beta, self.delta, self.mu, self.sigma, self.population]
    }
}

/// Infection history encoded as digits, e.g. "23" for serotypes 2 then 3
fn digits(history: &[usize]) -> String {
    history.iter().map(|s| s.to_string()).collect()
}

fn infectious_name(history: &[usize], serotype: usize) -> String {
    format!("I_{}{}", digits(history), serotype)
}

fn recovered_name(history: &[usize]) -> String {
    if history.is_empty() {
        "S".to_string()
    } else {
        format!("R_{}", digits(history))
    }
}

/// Sorted serotype sets of size `level`
fn histories(level: usize) -> Vec<Vec<usize>> {
    fn extend(start: usize, level: usize, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if prefix.len() == level {
            out.push(prefix.clone());
            return;
        }
        for s in start..=SEROTYPES {
            prefix.push(s);
            extend(s + 1, level, prefix, out);
            prefix.pop();
        }
    }
    let mut out = Vec::new();
    extend(1, level, &mut Vec::new(), &mut out);
    out
}

/// Λ_k: infectives whose newest infection is serotype `k`
fn force_of_infection(k: usize) -> Expr {
    let suffix = char::from_digit(k as u32, 10).unwrap_or('?');
    Expr::sum(
        COMPARTMENTS
            .iter()
            .filter(|name| name.starts_with("I_") && name.ends_with(suffix))
            .map(|name| Expr::sym(name)),
    )
}

fn build_network() -> SdeResult<ReactionNetwork> {
    let mut net = ReactionNetwork::new(&COMPARTMENTS, &PARAMETERS)?;
    let beta = Expr::sym("beta");
    let delta = Expr::sym("delta");
    let sigma = Expr::sym("sigma");
    let mu = Expr::sym("mu");

    for level in 0..SEROTYPES {
        for history in histories(level) {
            let source = recovered_name(&history);
            let rate = if level == 0 {
                beta.clone()
            } else {
                delta.clone() * beta.clone()
            };
            for k in (1..=SEROTYPES).filter(|k| !history.contains(k)) {
                let target = infectious_name(&history, k);
                net.add_transition(
                    &format!("infection {} -> {}", source, target),
                    rate.clone() * Expr::sym(&source) * force_of_infection(k),
                    &[(source.as_str(), -1.0), (target.as_str(), 1.0)],
                )?;
            }
        }
        for history in histories(level) {
            for k in (1..=SEROTYPES).filter(|k| !history.contains(k)) {
                let source = infectious_name(&history, k);
                let mut immune = history.clone();
                immune.push(k);
                immune.sort_unstable();
                let target = recovered_name(&immune);
                net.add_transition(
                    &format!("recovery {} -> {}", source, target),
                    sigma.clone() * Expr::sym(&source),
                    &[(source.as_str(), -1.0), (target.as_str(), 1.0)],
                )?;
            }
        }
    }

    net.add_transition("birth", mu.clone() * Expr::sym("N"), &[("S", 1.0)])?;
    for name in COMPARTMENTS {
        net.add_transition(
            &format!("death {}", name),
            mu.clone() * Expr::sym(name),
            &[(name, -1.0)],
        )?;
    }

    tracing::debug!(
        compartments = net.species().len(),
        transitions = net.transitions().len(),
        "built dengue reaction network"
    );
    Ok(net)
}

#[derive(Debug, Clone)]
pub struct DengueModel {
    params: DengueParams,
    network: ReactionNetwork,
    initial: Array1<f64>,
}

impl DengueModel {
    pub fn new(params: DengueParams) -> SdeResult<Self> {
        params.validate()?;
        let network = build_network()?;
        let mut model = DengueModel {
            params,
            network,
            initial: Array1::zeros(COMPARTMENTS.len()),
        };
        model.initial = model.initial_state_from(&[
            ("S", 48_000.0),
            ("I_1", 500.0),
            ("I_2", 500.0),
            ("I_3", 500.0),
            ("I_4", 500.0),
        ])?;
        Ok(model)
    }

    pub fn params(&self) -> &DengueParams {
        &self.params
    }

    pub fn network(&self) -> &ReactionNetwork {
        &self.network
    }

    /// Replace the starting populations; unlisted compartments start empty
    pub fn with_initial_state(mut self, populations: &[(&str, f64)]) -> SdeResult<Self> {
        self.initial = self.initial_state_from(populations)?;
        Ok(self)
    }

    /// State vector with the given populations and zeros elsewhere
    pub fn initial_state_from(&self, populations: &[(&str, f64)]) -> SdeResult<Array1<f64>> {
        let mut state = Array1::zeros(COMPARTMENTS.len());
        for &(name, value) in populations {
            validate_finite(name, value)?;
            validate_non_negative(name, value)?;
            state[self.compartment_index(name)?] = value;
        }
        Ok(state)
    }

    pub fn compartment_index(&self, name: &str) -> SdeResult<usize> {
        self.network.index_of(name)
    }

    /// Infectives by serotype of current infection, `4 × k`
    pub fn serotype_totals(&self, solution: &Solution) -> SdeResult<Array2<f64>> {
        validate_dimension("solution state dimension", COMPARTMENTS.len(), solution.state_dim())?;
        let mut totals = Array2::zeros((SEROTYPES, solution.len()));
        for (i, name) in COMPARTMENTS.iter().enumerate() {
            if !name.starts_with("I_") {
                continue;
            }
            if let Some(k) = name.chars().last().and_then(|c| c.to_digit(10)) {
                let mut row = totals.row_mut(k as usize - 1);
                row += &solution.component(i);
            }
        }
        Ok(totals)
    }

    pub fn total_population(state: &Array1<f64>) -> f64 {
        state.sum()
    }
}

impl CompartmentModel for DengueModel {
    fn compartments(&self) -> &[String] {
        self.network.species()
    }

    fn parameter_values(&self) -> Vec<f64> {
        self.params.to_vec()
    }

    fn initial_state(&self) -> Array1<f64> {
        self.initial.clone()
    }

    fn system(&self) -> SymbolicSystem {
        self.network.system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Evaluator;

    #[test]
    fn test_network_size() {
        let model = DengueModel::new(DengueParams::default()).unwrap();
        assert_eq!(model.compartments().len(), 48);
        assert_eq!(model.network().transitions().len(), 113);

        let labels: Vec<&str> = model
            .network()
            .transitions()
            .iter()
            .map(|t| t.label.as_str())
            .collect();
        assert_eq!(labels.iter().filter(|l| l.starts_with("infection")).count(), 32);
        assert_eq!(labels.iter().filter(|l| l.starts_with("recovery")).count(), 32);
        assert_eq!(labels.iter().filter(|l| l.starts_with("death")).count(), 48);
        assert!(labels.contains(&"infection R_23 -> I_231"));
        assert!(labels.contains(&"recovery I_231 -> R_123"));
        assert!(labels.contains(&"infection R_134 -> I_1342"));
    }

    #[test]
    fn test_every_compartment_is_reachable() {
        let model = DengueModel::new(DengueParams::default()).unwrap();
        let table = model.network().stoichiometry();
        for (i, name) in COMPARTMENTS.iter().enumerate() {
            let gains = table.column(i).iter().filter(|&&c| c > 0.0).count();
            if *name != "S" {
                assert!(gains > 0, "{} is never entered", name);
            }
        }
    }

    #[test]
    fn test_drift_balances_births_and_deaths() {
        let model = DengueModel::new(DengueParams::default()).unwrap();
        let (drift, _) = model.system().compile().unwrap();
        let params = model.parameter_values();
        let state = model.initial_state();

        let e = drift.evaluate(state.view(), &params).unwrap();
        // only demography changes the total: μN − μΣX, zero at ΣX = N
        assert!(e.sum().abs() < 1e-4, "total drift {}", e.sum());

        let half = &state * 0.5;
        let e = drift.evaluate(half.view(), &params).unwrap();
        let expected = params[2] * params[4] * 0.5;
        assert!((e.sum() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_primary_infection_drift() {
        let model = DengueModel::new(DengueParams::default()).unwrap();
        let (drift, _) = model.system().compile().unwrap();
        let p = DengueParams::default();
        let state = model.initial_state();
        let e = drift.evaluate(state.view(), &p.to_vec()).unwrap();

        let i1 = model.compartment_index("I_1").unwrap();
        let expected = p.beta * 48_000.0 * 500.0 - p.sigma * 500.0 - p.mu * 500.0;
        assert!((e[i1] - expected).abs() < 1e-6 * expected.abs());
    }

    #[test]
    fn test_diffusion_columns() {
        let model = DengueModel::new(DengueParams::default()).unwrap();
        let (_, diffusion) = model.system().compile().unwrap();
        let p = DengueParams::default();
        let b = diffusion
            .evaluate(model.initial_state().view(), &p.to_vec())
            .unwrap();
        assert_eq!(b.dim(), (48, 113));

        // birth column: only S, with √(μN)
        let birth = model
            .network()
            .transitions()
            .iter()
            .position(|t| t.label == "birth")
            .unwrap();
        let s = model.compartment_index("S").unwrap();
        assert!((b[[s, birth]] - (p.mu * p.population).sqrt()).abs() < 1e-12);
        assert_eq!(b.column(birth).iter().filter(|v| **v != 0.0).count(), 1);

        // every column sums to zero except births and deaths
        for (j, t) in model.network().transitions().iter().enumerate() {
            if t.label.starts_with("infection") || t.label.starts_with("recovery") {
                assert!(b.column(j).sum().abs() < 1e-9, "{}", t.label);
            }
        }
    }

    #[test]
    fn test_initial_state_and_totals() {
        let model = DengueModel::new(DengueParams::default()).unwrap();
        assert_eq!(DengueModel::total_population(&model.initial_state()), 50_000.0);
        assert!(model.initial_state_from(&[("X_9", 1.0)]).is_err());
        assert!(model.initial_state_from(&[("S", -1.0)]).is_err());

        let states = Array2::from_shape_fn((48, 2), |(i, _)| i as f64);
        let solution = Solution {
            times: ndarray::arr1(&[0.0, 1.0]),
            states,
            termination: crate::solvers::Termination::Completed,
        };
        let totals = model.serotype_totals(&solution).unwrap();
        // serotype 1: I_1, I_21, I_31, I_41, I_231, I_241, I_341, I_2341
        let expected = [1, 12, 15, 18, 27, 28, 29, 46].iter().sum::<usize>() as f64;
        assert_eq!(totals[[0, 0]], expected);
        assert_eq!(totals.dim(), (4, 2));
    }

    #[test]
    fn test_invalid_params() {
        let params = DengueParams {
            delta: 1.5,
            ..Default::default()
        };
        assert!(DengueModel::new(params).is_err());
        let params = DengueParams {
            sigma: 0.0,
            ..Default::default()
        };
        assert!(DengueModel::new(params).is_err());
    }
}
