//! Minimal Q IPC server: accept loop, handshake, handler dispatch.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::error::KxError;
use crate::ipc::{decode, encode, MessageType};
use crate::types::K;

/// Highest capability this server grants during the handshake.
const MAX_CAPABILITY: u8 = 3;

/// Application callbacks for decoded messages.
#[async_trait::async_trait]
pub trait KxHandler: Send + Sync + 'static {
    /// Handles a sync request. The returned value is sent back as the
    /// response; an error is sent back as a -128 error atom.
    async fn handle_sync(&self, value: K) -> Result<K, KxError>;

    /// Handles an async message. No reply is sent. Default: drop it.
    async fn handle_async(&self, value: K) -> Result<(), KxError> {
        let _ = value;
        Ok(())
    }
}

/// Handler for servers that do not accept sync requests: every sync call
/// is answered with a `nosyncrequest` error atom.
pub struct RejectSync;

#[async_trait::async_trait]
impl KxHandler for RejectSync {
    async fn handle_sync(&self, _value: K) -> Result<K, KxError> {
        Err(KxError::NoSyncRequest)
    }
}

/// A Q IPC server: binds a TCP listener and serves each accepted
/// connection on its own task.
pub struct KxServer<H: KxHandler> {
    handler: H,
    shutdown: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
}

impl<H: KxHandler> KxServer<H> {
    /// Creates a server builder with the given handler.
    pub fn builder(handler: H) -> Self {
        Self {
            handler,
            shutdown: None,
        }
    }

    /// Sets a shutdown signal future.
    pub fn shutdown(mut self, signal: impl Future<Output = ()> + Send + 'static) -> Self {
        self.shutdown = Some(Box::pin(signal));
        self
    }

    /// Accepts connections on `addr` until the shutdown signal fires (or
    /// forever without one).
    pub async fn serve(self, addr: &str) -> Result<(), KxError> {
        let listener = TcpListener::bind(addr).await?;
        let handler = Arc::new(self.handler);
        tracing::info!(%addr, "Q IPC server listening");

        if let Some(signal) = self.shutdown {
            tokio::pin!(signal);
            loop {
                tokio::select! {
                    result = listener.accept() => match result {
                        Ok((stream, peer)) => spawn_connection(stream, peer, handler.clone()),
                        Err(e) => tracing::warn!(error = %e, "accept error"),
                    },
                    () = &mut signal => {
                        tracing::info!("Q IPC server shutting down");
                        break;
                    }
                }
            }
        } else {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => spawn_connection(stream, peer, handler.clone()),
                    Err(e) => tracing::warn!(error = %e, "accept error"),
                }
            }
        }
        Ok(())
    }
}

fn spawn_connection<H: KxHandler>(stream: TcpStream, peer: SocketAddr, handler: Arc<H>) {
    tokio::spawn(async move {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer, error = %e, "failed to disable Nagle");
        }
        match serve_connection(stream, handler).await {
            Ok(()) => tracing::debug!(%peer, "connection closed"),
            Err(e) => tracing::debug!(%peer, error = %e, "connection closed"),
        }
    });
}

/// Serves one accepted connection: drains the handshake, grants a
/// capability, then decodes frames until EOF. Sync messages go to the
/// handler and their result is written back as a response; async messages
/// are delivered without reply; unsolicited responses are dropped.
/// Decoding errors close the connection.
pub async fn serve_connection<S, H>(mut stream: S, handler: Arc<H>) -> Result<(), KxError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
    H: KxHandler,
{
    // Handshake: auth string, capability byte, zero terminator.
    let mut cred = [0u8; 100];
    let n = stream.read(&mut cred).await?;
    if n < 2 {
        return Err(KxError::Authentication("truncated handshake".into()));
    }
    let granted = cred[n - 2].min(MAX_CAPABILITY);
    stream.write_all(&[granted]).await?;
    stream.flush().await?;

    let (r, w) = tokio::io::split(stream);
    let mut reader = BufReader::new(r);
    let mut writer = w;

    loop {
        let (value, msg_type) = match decode::read_frame(&mut reader).await {
            Ok(message) => message,
            Err(KxError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match msg_type {
            MessageType::Sync => {
                let reply = match handler.handle_sync(value).await {
                    Ok(k) => k,
                    Err(e) => K::error(e.to_string()),
                };
                let frame = encode::encode(MessageType::Response, &reply)?;
                writer.write_all(&frame).await?;
                writer.flush().await?;
            }
            MessageType::Async => handler.handle_async(value).await?,
            MessageType::Response => {
                tracing::debug!("unsolicited response dropped");
            }
        }
    }
}
