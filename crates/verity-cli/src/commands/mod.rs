//! Subcommand handlers

pub mod demo;
pub mod inspect;
