//! different utility modules used throughout the project
/// settings of the command-line driver from a TOML file
pub mod config;
/// tiny module to set up terminal and file logging
pub mod logger;
/// sample a function of x and plot it into a PNG
pub mod plots;
