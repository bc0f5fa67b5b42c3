//! Chaos Engine
//!
//! Runs external programs through the destructive-value engine in
//! [`chaos_core`]:
//!
//! - **Configuration**: load `chaos.config.json` (or YAML) describing targets
//! - **Command targets**: wrap a program as the function under test
//! - **Runner**: one engine session per target, collected into outcomes
//! - **Output**: box-drawn result tables or a JSON document
//!
//! See [`config`] for the file format and [`runner`] for execution.

pub mod args;
pub mod command_target;
pub mod config;
pub mod output;
pub mod runner;
