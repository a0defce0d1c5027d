// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod chart;
pub mod cli;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod deploy;
pub mod error;
pub mod gitlab;
pub mod graph;
pub mod kubernetes;
pub mod trust;
pub mod types;

#[cfg(test)]
pub mod test_utils;
