//! Command-line parsing and end-to-end command tests

mod commands;
mod parse_matrix;
