//! Mock DevTools target for integration tests.
//!
//! A plain WebSocket server on `127.0.0.1:0` that the tests drive frame by
//! frame: read the client's requests, push responses and events.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use devtools_bridge::{ConnectOptions, Connection};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

/// Upper bound on any single mock wait.
pub const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// MockBrowser
// ============================================================================

/// A bound but not yet connected mock target.
pub struct MockBrowser {
    listener: TcpListener,
    addr: SocketAddr,
}

impl MockBrowser {
    /// Binds to a random local port.
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// Debugger URL the client should open.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/devtools/page/MOCK", self.addr)
    }

    /// Accepts one client and completes the WebSocket handshake.
    pub async fn accept(&self) -> anyhow::Result<MockPeer> {
        let (stream, _) = timeout(WAIT, self.listener.accept())
            .await
            .context("no client connected")??;
        let ws = accept_async(stream).await?;
        Ok(MockPeer { ws })
    }
}

/// Opens a [`Connection`] to a fresh mock and returns both ends.
pub async fn attach(options: ConnectOptions) -> anyhow::Result<(Connection, MockPeer)> {
    let mock = MockBrowser::bind().await?;
    let url = mock.ws_url();
    let (connection, peer) = tokio::join!(Connection::open(&url, &options), mock.accept());
    Ok((connection?, peer?))
}

// ============================================================================
// MockPeer
// ============================================================================

/// Server side of one accepted connection.
pub struct MockPeer {
    ws: WebSocketStream<TcpStream>,
}

impl MockPeer {
    /// Reads the next request frame as JSON.
    pub async fn recv_request(&mut self) -> anyhow::Result<Value> {
        loop {
            let message = timeout(WAIT, self.ws.next())
                .await
                .context("no request arrived")?;
            match message {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(text.as_str())?),
                Some(Ok(Message::Close(_))) | None => bail!("client closed the socket"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Sends a JSON frame.
    pub async fn send_json(&mut self, value: Value) -> anyhow::Result<()> {
        self.send_text(&value.to_string()).await
    }

    /// Sends a raw text frame.
    pub async fn send_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string().into())).await?;
        Ok(())
    }

    /// Answers request `id` with `result`.
    pub async fn respond(&mut self, id: &Value, result: Value) -> anyhow::Result<()> {
        self.send_json(serde_json::json!({ "id": id, "result": result }))
            .await
    }

    /// Pushes an event.
    pub async fn emit(&mut self, method: &str, params: Value) -> anyhow::Result<()> {
        self.send_json(serde_json::json!({ "method": method, "params": params }))
            .await
    }

    /// Sends a close frame.
    pub async fn close(&mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }

    /// Waits until the client closes its side.
    pub async fn wait_closed(&mut self) -> anyhow::Result<()> {
        loop {
            match timeout(WAIT, self.ws.next())
                .await
                .context("client did not close")?
            {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return Ok(()),
                Some(Ok(_)) => {}
            }
        }
    }
}
