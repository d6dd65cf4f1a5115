//! Accept loop and per-connection request loop.
//!
//! One task per connection; within a connection, requests are handled
//! strictly in order: the next line is not read until the previous
//! reply has been written. Dispatch runs on the blocking pool because
//! the store underneath is synchronous.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task;
use tracing::{error, info, warn};

use chirp_api::App;
use chirp_types::api::Reply;
use chirp_types::wire;

pub async fn serve(listener: TcpListener, app: Arc<App>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("Incoming connection from {addr}");
                let app = app.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, app).await {
                        warn!("connection from {addr} ended with error: {e:#}");
                    }
                });
            }
            Err(e) => {
                error!("accept error: {e}");
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, app: Arc<App>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let reply = match wire::decode::<Value>(&line) {
            Ok(request) => {
                let app = app.clone();
                task::spawn_blocking(move || app.handle(request)).await?
            }
            Err(e) => {
                warn!("undecodable request line: {e}");
                Reply::error(400, "Bad request")
            }
        };

        let mut encoded = wire::encode(&reply)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
    }

    Ok(())
}
