// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use clap::{Parser, Subcommand};

/// Provision GitLab with OpenUnison SSO and the enterprise CA onto a Kubernetes cluster
#[derive(Parser, Debug)]
#[command(name = "gitlab-provisioner", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create or update every resource, in dependency order
    Apply,
    /// Delete the deployment's resources (the namespace is retained)
    Destroy,
    /// Resolve inputs and print the resource graph without changing anything
    Plan,
}
