pub mod cli;
pub mod discovery;
