//! Small geometry helpers shared by the picking and engine crates

pub mod ray;

pub use ray::{Ray, Sphere};
