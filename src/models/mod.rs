// src/models/mod.rs
pub mod birth_death;
pub mod dengue;
pub mod model;
pub mod reaction;
