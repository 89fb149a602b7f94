//! Route handlers

pub mod elevators;
pub mod movements;
pub mod training;
