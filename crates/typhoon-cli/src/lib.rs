// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! Typhoon CLI library.
//!
//! This crate provides the command-line interface for the Typhoon template
//! engine.
//!
//! # Usage
//!
//! ```bash
//! typhoon render page.html --params '{"title": "Home"}'
//! typhoon check                 # compile every template
//! typhoon tokens page.html      # show the token stream
//! ```
//!
//! # Configuration
//!
//! Projects are configured via `typhoon.toml`, see [`config`].

/// CLI commands (render, check, tokens).
pub mod commands;
/// Project configuration from `typhoon.toml`.
pub mod config;
