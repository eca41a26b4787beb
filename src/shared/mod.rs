pub mod config;
pub mod time;

#[cfg(test)]
pub mod time_tests;
