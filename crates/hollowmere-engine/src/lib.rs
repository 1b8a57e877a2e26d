//! Hollowmere Engine - headless runner for the Hollowmere simulation.
//!
//! Loads a [`config::SimConfig`], builds the demo dungeon and steps it at a
//! fixed rate with a scripted pilot.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod config;
pub mod demo;
pub mod timing;

#[cfg(test)]
mod e2e_tests;
