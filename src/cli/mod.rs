//! CLI infrastructure for the dino agent
//!
//! This module provides the command-line interface for training the agent
//! and playing with a saved model.

pub mod commands;
pub mod config;
pub mod output;
