pub mod ai;
pub mod cli;
pub mod core;
pub mod google;
pub mod openai;
pub mod ordering;
