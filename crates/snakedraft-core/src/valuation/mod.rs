pub mod catalog;
pub mod scarcity;
pub mod scoring;
pub mod seed;
