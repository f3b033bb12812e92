// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod aggregate;
mod cli;
pub mod config;
mod daemon;
mod kubernetes;
mod output;
mod profile;
pub mod progress;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

use aggregate::{ResourceAggregator, ResourceRequest};
use cli::{Args, Command, OutputFormat};
use config::Config;
use daemon::DaemonServer;
use kubernetes::{K8sClientPool, SecretApplicationRegistry};
use profile::LocalProfileStore;

/// Initialize logging with file output and optional stderr
fn init_logging(verbose: bool, to_stderr: bool) {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    let log_dir = config::base_dir()
        .map(|p| p.join("log"))
        .unwrap_or_else(|_| PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    // 10MB per file, rotated daily, 5 files kept
    let log_path = log_dir.join("kinspect.log");
    let condition = RollingConditionBase::new()
        .daily()
        .max_size(10 * 1024 * 1024);

    let file_appender = match RollingFileAppenderBase::new(log_path, condition, 5) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    let (non_blocking, _guard) = file_appender.get_non_blocking_appender();
    // Leak the guard to keep the background writer alive
    std::mem::forget(_guard);

    let filter = if verbose { "kinspect=debug" } else { "kinspect=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    if to_stderr {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

/// Wire the cluster-backed collaborators into an aggregator
fn build_aggregator(config: &Config, pool: Arc<K8sClientPool>) -> Result<ResourceAggregator> {
    let profiles = LocalProfileStore::new(config.profile_dir()?);
    let registry = SecretApplicationRegistry::new(Arc::clone(&pool));
    Ok(ResourceAggregator::new(
        pool,
        Arc::new(registry),
        Arc::new(profiles),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = Args::parse();

    // Always log to file; stderr as well with -v or when serving
    let is_daemon = matches!(args.command, Command::Daemon { .. });
    init_logging(args.verbose, args.verbose || is_daemon);

    let config = Config::load()?;

    match args.command {
        Command::Get {
            resource,
            name,
            namespace,
            app,
            kubeconfig,
            output,
        } => {
            let request = ResourceRequest {
                kube_config: config.read_kubeconfig(kubeconfig.as_deref())?,
                namespace: namespace.unwrap_or_default(),
                app_name: app.unwrap_or_default(),
                resource,
                resource_name: name.unwrap_or_default(),
            };
            run_get(&config, request, &output).await
        }
        Command::Daemon { port, bind } => {
            let pool = Arc::new(K8sClientPool::new(progress::create_progress_handle()));
            let aggregator = Arc::new(build_aggregator(&config, pool)?);
            let server = DaemonServer::new(
                port.unwrap_or(config.daemon_port),
                bind.unwrap_or_else(|| config.daemon_bind.clone()),
                aggregator,
            );
            server.run().await
        }
        Command::Config {
            kubeconfig,
            profile_dir,
            port,
            bind,
        } => run_config(config, kubeconfig, profile_dir, port, bind),
    }
}

async fn run_get(config: &Config, request: ResourceRequest, format: &OutputFormat) -> Result<()> {
    use progress::{ProgressUpdate, create_spinner};

    let spinner = create_spinner("Connecting to Kubernetes...");

    // Subscribe to progress BEFORE the first request goes out
    let pool = Arc::new(K8sClientPool::new(progress::create_progress_handle()));
    let mut progress_rx = pool.progress().subscribe();
    let aggregator = build_aggregator(config, Arc::clone(&pool))?;

    let response = {
        let mut aggregate_handle = Box::pin(aggregator.aggregate(&request));

        loop {
            tokio::select! {
                biased;
                progress = progress_rx.recv() => {
                    match progress {
                        Ok(ProgressUpdate::Connecting { cluster }) => {
                            spinner.set_message(format!("Connecting to {}...", cluster));
                        }
                        Ok(ProgressUpdate::Discovering { cluster }) => {
                            spinner.set_message(format!("Discovering resources on {}...", cluster));
                        }
                        Ok(ProgressUpdate::Listing { kind, namespace }) => {
                            spinner.set_message(format!("Listing {} in {}...", kind, namespace));
                        }
                        Ok(ProgressUpdate::Listed { .. }) => {
                            let (lists, objects) = pool.progress().progress();
                            spinner.set_message(format!("{} lists, {} objects", lists, objects));
                        }
                        _ => {}
                    }
                }
                result = &mut aggregate_handle => {
                    break result;
                }
            }
        }
    };

    spinner.finish_and_clear();

    println!("{}", output::format(response.as_ref(), format));
    Ok(())
}

fn run_config(
    mut config: Config,
    kubeconfig: Option<PathBuf>,
    profile_dir: Option<PathBuf>,
    port: Option<u16>,
    bind: Option<String>,
) -> Result<()> {
    let changed = kubeconfig.is_some() || profile_dir.is_some() || port.is_some() || bind.is_some();

    if let Some(path) = kubeconfig {
        config.kubeconfig = Some(path);
    }
    if let Some(dir) = profile_dir {
        config.profile_dir = Some(dir);
    }
    if let Some(port) = port {
        config.daemon_port = port;
    }
    if let Some(bind) = bind {
        config.daemon_bind = bind;
    }

    if changed {
        config.save()?;
        tracing::info!("Saved configuration to {}", Config::config_path()?.display());
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
