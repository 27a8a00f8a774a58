pub mod energy;
pub mod resolution;
