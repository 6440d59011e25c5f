// src/models/reaction.rs
//! Reaction networks and their diffusion approximation
//!
//! # Mathematical Framework
//!
//! A network has n species and m elementary transitions. Transition j
//! fires with propensity p_j(X; θ) and changes the state by the vector
//! c_j (the j-th row of the stoichiometry table). The chemical Langevin
//! approximation of the jump process is the Ito SDE
//! ```text
//! dX = E(X) dt + B(X) dW,   E_i = Σ_j c_ji p_j,   B_ij = c_ji √p_j
//! ```
//! with one independent Wiener process per transition.
//!
//! Both E and B are produced declaratively from the transition table, as
//! symbolic expressions ready to be compiled by [`SymbolicSystem`].

use crate::error::{SdeError, SdeResult};
use crate::evaluator::SymbolicSystem;
use crate::expr::Expr;
use ndarray::Array2;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Transition {
    pub label: String,
    pub propensity: Expr,
    /// Sparse state change as `(species index, amount)`
    pub changes: Vec<(usize, f64)>,
}

#[derive(Debug, Clone)]
pub struct ReactionNetwork {
    species: Vec<String>,
    parameters: Vec<String>,
    index: HashMap<String, usize>,
    transitions: Vec<Transition>,
}

impl ReactionNetwork {
    pub fn new<S: AsRef<str>, P: AsRef<str>>(species: &[S], parameters: &[P]) -> SdeResult<Self> {
        let species: Vec<String> = species.iter().map(|s| s.as_ref().to_string()).collect();
        let mut index = HashMap::with_capacity(species.len());
        for (i, name) in species.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(SdeError::CompilationError {
                    reason: format!("species '{}' is declared more than once", name),
                });
            }
        }
        Ok(ReactionNetwork {
            species,
            parameters: parameters.iter().map(|p| p.as_ref().to_string()).collect(),
            index,
            transitions: Vec::new(),
        })
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn index_of(&self, name: &str) -> SdeResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| SdeError::CompilationError {
                reason: format!("unknown species '{}'", name),
            })
    }

    /// Register a transition; `changes` names each affected species
    pub fn add_transition(
        &mut self,
        label: &str,
        propensity: Expr,
        changes: &[(&str, f64)],
    ) -> SdeResult<()> {
        if changes.is_empty() {
            return Err(SdeError::CompilationError {
                reason: format!("transition '{}' changes no species", label),
            });
        }
        let mut resolved: Vec<(usize, f64)> = Vec::with_capacity(changes.len());
        for (name, amount) in changes {
            let i = self.index_of(name)?;
            if resolved.iter().any(|(j, _)| *j == i) {
                return Err(SdeError::CompilationError {
                    reason: format!("transition '{}' changes '{}' twice", label, name),
                });
            }
            resolved.push((i, *amount));
        }
        self.transitions.push(Transition {
            label: label.to_string(),
            propensity,
            changes: resolved,
        });
        Ok(())
    }

    /// Dense `transitions × species` table of state changes
    pub fn stoichiometry(&self) -> Array2<f64> {
        let mut table = Array2::zeros((self.transitions.len(), self.species.len()));
        for (j, t) in self.transitions.iter().enumerate() {
            for &(i, amount) in &t.changes {
                table[[j, i]] = amount;
            }
        }
        table
    }

    /// Expected rate of change `E_i = Σ_j c_ji p_j` for every species
    pub fn drift(&self) -> Vec<Expr> {
        let mut terms: Vec<Vec<Expr>> = vec![Vec::new(); self.species.len()];
        for t in &self.transitions {
            for &(i, amount) in &t.changes {
                terms[i].push(t.propensity.clone().scaled(amount));
            }
        }
        terms.into_iter().map(Expr::sum).collect()
    }

    /// Nonzero diffusion entries `(i, j, c_ji √p_j)`
    pub fn diffusion_entries(&self) -> Vec<(usize, usize, Expr)> {
        let mut entries = Vec::new();
        for (j, t) in self.transitions.iter().enumerate() {
            for &(i, amount) in &t.changes {
                entries.push((i, j, t.propensity.clone().sqrt().scaled(amount)));
            }
        }
        entries
    }

    pub fn system(&self) -> SymbolicSystem {
        SymbolicSystem {
            state_symbols: self.species.clone(),
            param_symbols: self.parameters.clone(),
            drift: self.drift(),
            diffusion_cols: self.transitions.len(),
            diffusion: self.diffusion_entries(),
        }
    }
}
