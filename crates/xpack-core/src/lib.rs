pub mod archive;
pub mod config;
pub mod error;
pub mod gate;
pub mod report;
pub mod util;

#[cfg(test)]
mod tests;
