pub mod builder;
pub mod runner;
