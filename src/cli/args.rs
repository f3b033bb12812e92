// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kinspect")]
#[command(author, version, about = "Inspect Kubernetes applications and their resources")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show resources: "all", "app", or a resource kind such as "deployments"
    Get {
        /// "all", "app"/"application", or a plural resource kind
        resource: String,

        /// Resource (or application) name
        name: Option<String>,

        /// Namespace (defaults to the kubeconfig context namespace)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Only objects belonging to this application
        #[arg(short, long)]
        app: Option<String>,

        /// Path to the kubeconfig file
        #[arg(long, env = "KINSPECT_KUBECONFIG", value_name = "PATH")]
        kubeconfig: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        output: OutputFormat,
    },

    /// Serve inspection requests as line-delimited JSON over TCP
    Daemon {
        /// Port to listen on (default from config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind to (default from config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Show the configuration, storing any values given
    Config {
        /// Default kubeconfig path
        #[arg(long, value_name = "PATH")]
        kubeconfig: Option<PathBuf>,

        /// Directory holding service profiles
        #[arg(long, value_name = "DIR")]
        profile_dir: Option<PathBuf>,

        /// Default daemon port
        #[arg(long)]
        port: Option<u16>,

        /// Default daemon bind address
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}
