// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account Gate - session gate and account self-service
//!
//! This crate provides cookie-session authentication for protected route
//! prefixes and the account operations behind them: profile, password,
//! avatar, email verification, deletion and logout.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session tokens, revocation and the session gate
//! - `account` - Account service and its collaborator ports
//! - `storage` - File-backed user and avatar stores

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
