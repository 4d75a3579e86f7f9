//! pgEdge nearest-node connect CLI
//!
//! Command-line front end for the `pgedge-connect` library: rank nodes by
//! distance from a location, or open a connection to the nearest one.

pub mod commands;
pub mod config;
