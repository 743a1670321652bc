//! SSOT-driven artifact generation.
//!
//! One feature specification drives every generated artifact: the
//! [`ssot`] loader reads the feature index, [`generate`] renders per-kind
//! prompts, asks the [`llm`] for a completion and writes the extracted block
//! to a deterministic path. The [`api`] module hosts the demonstration
//! token, recommend and login services built on [`auth`] and [`db`].

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod generate;
pub mod llm;
pub mod models;
pub mod ssot;
pub mod validation;
