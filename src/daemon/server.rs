// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Line-delimited JSON server
//!
//! Each request line is a JSON `ResourceRequest`; each reply is one line of
//! JSON: the response, `null`, or `{"error": "..."}` for input that is not a
//! request.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::aggregate::{ResourceAggregator, ResourceRequest};
use crate::output::JsonFormatter;

pub struct DaemonServer {
    port: u16,
    bind_address: String,
    aggregator: Arc<ResourceAggregator>,
}

impl DaemonServer {
    pub fn new(port: u16, bind_address: String, aggregator: Arc<ResourceAggregator>) -> Self {
        Self {
            port,
            bind_address,
            aggregator,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let server_addr = format!("{}:{}", self.bind_address, self.port);
        let listener = TcpListener::bind(&server_addr).await?;

        tracing::info!("Inspection daemon listening on {}", server_addr);
        println!("kinspect daemon listening on {}", server_addr);

        tokio::select! {
            result = serve(listener, Arc::clone(&self.aggregator)) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down daemon");
                Ok(())
            }
        }
    }
}

/// Accept connections until the listener fails
pub async fn serve(listener: TcpListener, aggregator: Arc<ResourceAggregator>) -> Result<()> {
    loop {
        let (socket, peer_addr) = listener.accept().await?;
        let aggregator = Arc::clone(&aggregator);

        tracing::debug!("New connection from {}", peer_addr);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, &aggregator).await {
                tracing::error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

async fn handle_connection(socket: TcpStream, aggregator: &ResourceAggregator) -> Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let mut reply = handle_line(aggregator, &line).await;
        reply.push('\n');
        writer.write_all(reply.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Answer one request line
pub async fn handle_line(aggregator: &ResourceAggregator, line: &str) -> String {
    let request: ResourceRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!("Invalid request: {}", e);
            return serde_json::json!({ "error": format!("invalid request: {}", e) }).to_string();
        }
    };

    tracing::debug!(
        resource = %request.resource,
        namespace = %request.namespace,
        name = %request.resource_name,
        "Handling request"
    );

    let response = aggregator.aggregate(&request).await;
    JsonFormatter::format_line(response.as_ref())
}
