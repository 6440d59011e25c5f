// src/solvers/mod.rs
pub mod euler_maruyama;
pub mod euler_maruyama_matrix;
pub mod grid;
pub mod solution;

pub use euler_maruyama::ScalarEulerMaruyama;
pub use euler_maruyama_matrix::VectorEulerMaruyama;
pub use grid::TimeGrid;
pub use solution::{Solution, Termination};
