//! Integration tests for the blockfs engine

mod persistence_round_trip;
mod properties;
mod scenarios;
