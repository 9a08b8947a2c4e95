//! Composes one navigation tree out of independently developed contributors.
//!
//! Layers, inner to outer:
//! - [`domain`]: node arena, node payloads, data-change events, menus
//! - [`application`]: contributor contract, registry, composition engine
//! - [`infrastructure`]: host boundaries, channels, manifests, DI container
//! - [`cli`]: the `navcompose` binary

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
