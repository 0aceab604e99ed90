// cmdsage - ask for a terminal command in plain language
// Library exports

pub mod cli;
pub mod config;
pub mod errors;
pub mod prompt;
pub mod providers;
