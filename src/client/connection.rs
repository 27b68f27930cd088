//! Client connection: dial, handshake, message I/O.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;

use crate::error::KxError;
use crate::ipc::{decode, encode, MessageType};
use crate::types::K;

/// Capability byte advertised during the handshake: protocol version 3,
/// i.e. guid, timestamp/timespan, and compression support.
pub const CAPABILITY: u8 = 3;

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// A Q IPC connection: a buffered read half plus a write half.
///
/// One outstanding sync call at a time; callers serialise access.
pub struct Connection {
    reader: BufReader<BoxedRead>,
    writer: BoxedWrite,
    capability: u8,
}

impl Connection {
    /// Connects to `[host]:port[:user:password]` over TCP and performs the
    /// handshake.
    pub async fn dial(address: &str) -> Result<Self, KxError> {
        let (dial, auth) = parse_address(address);
        let stream = connect_tcp(&dial).await?;
        Self::from_handshake(stream, &auth).await
    }

    /// Like [`Connection::dial`], giving up after `timeout`.
    pub async fn dial_timeout(address: &str, timeout: Duration) -> Result<Self, KxError> {
        match tokio::time::timeout(timeout, Self::dial(address)).await {
            Ok(result) => result,
            Err(_) => Err(KxError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connect timed out",
            ))),
        }
    }

    /// Connects over TLS. The caller supplies the client configuration via
    /// `connector`; `server_name` is the name verified against the peer
    /// certificate.
    pub async fn dial_tls(
        address: &str,
        connector: TlsConnector,
        server_name: &str,
    ) -> Result<Self, KxError> {
        let (dial, auth) = parse_address(address);
        let tcp = connect_tcp(&dial).await?;
        let name = ServerName::try_from(server_name.to_owned())
            .map_err(|_| KxError::Address(format!("invalid TLS server name: {server_name}")))?;
        let stream = connector.connect(name, tcp).await?;
        Self::from_handshake(stream, &auth).await
    }

    /// Connects over an OS-local socket at `/tmp/kx.<port>` (abstract
    /// namespace on Linux). Any host part of the address is ignored.
    #[cfg(unix)]
    pub async fn dial_unix(address: &str) -> Result<Self, KxError> {
        let (dial, auth) = parse_address(address);
        let port = match dial.rsplit_once(':') {
            Some((_, port)) => port,
            None => dial.as_str(),
        };
        let path = format!("/tmp/kx.{port}");

        #[cfg(target_os = "linux")]
        let stream = {
            use std::os::linux::net::SocketAddrExt;
            let addr = std::os::unix::net::SocketAddr::from_abstract_name(path.as_bytes())?;
            let raw = std::os::unix::net::UnixStream::connect_addr(&addr)?;
            raw.set_nonblocking(true)?;
            tokio::net::UnixStream::from_std(raw)?
        };
        #[cfg(not(target_os = "linux"))]
        let stream = tokio::net::UnixStream::connect(&path).await?;

        Self::from_handshake(stream, &auth).await
    }

    /// Performs the handshake on an established stream and wraps it.
    pub(crate) async fn from_handshake<S>(mut stream: S, auth: &str) -> Result<Self, KxError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let capability = handshake(&mut stream, auth).await?;
        let (r, w) = tokio::io::split(stream);
        Ok(Self {
            reader: BufReader::new(Box::new(r) as BoxedRead),
            writer: Box::new(w),
            capability,
        })
    }

    /// The peer's accepted capability byte.
    pub fn capability(&self) -> u8 {
        self.capability
    }

    /// Synchronous call: sends `(cmd; args...)` and waits for the reply.
    pub async fn call(&mut self, cmd: &str, args: Vec<K>) -> Result<K, KxError> {
        self.write_message(MessageType::Sync, &build_call(cmd, args))
            .await?;
        let (value, _) = self.read_message().await?;
        Ok(value)
    }

    /// Asynchronous call: sends `(cmd; args...)` without expecting a reply.
    pub async fn async_call(&mut self, cmd: &str, args: Vec<K>) -> Result<(), KxError> {
        self.write_message(MessageType::Async, &build_call(cmd, args))
            .await
    }

    /// Sends a response to a sync request received on this connection.
    pub async fn response(&mut self, value: &K) -> Result<(), KxError> {
        self.write_message(MessageType::Response, value).await
    }

    /// Reads one complete framed message.
    pub async fn read_message(&mut self) -> Result<(K, MessageType), KxError> {
        decode::read_frame(&mut self.reader).await
    }

    /// Frames and writes one message.
    pub async fn write_message(
        &mut self,
        msg_type: MessageType,
        value: &K,
    ) -> Result<(), KxError> {
        let frame = encode::encode(msg_type, value)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Shuts the connection down, aborting any in-flight reads.
    pub async fn close(mut self) -> Result<(), KxError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Writes the auth string, the capability byte, and a zero terminator, then
/// expects exactly one octet back (the peer's accepted capability). Any
/// other reply length is a rejection.
async fn handshake<S>(stream: &mut S, auth: &str) -> Result<u8, KxError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut request = Vec::with_capacity(auth.len() + 2);
    request.extend_from_slice(auth.as_bytes());
    request.push(CAPABILITY);
    request.push(0);
    stream.write_all(&request).await?;
    stream.flush().await?;

    let mut reply = vec![0u8; auth.len() + 2];
    let n = stream.read(&mut reply).await?;
    if n != 1 {
        return Err(KxError::Authentication("rejected by peer".into()));
    }
    Ok(reply[0])
}

/// Splits `host:port:user:password` into the dial target and the auth
/// string; the auth part starts at the second colon.
fn parse_address(address: &str) -> (String, String) {
    let mut colons = address.match_indices(':').map(|(i, _)| i);
    let _ = colons.next();
    match colons.next() {
        Some(second) => (
            address[..second].to_owned(),
            address[second + 1..].to_owned(),
        ),
        None => (address.to_owned(), String::new()),
    }
}

async fn connect_tcp(dial: &str) -> Result<TcpStream, KxError> {
    let mut last_err = None;
    for addr in lookup_host(dial).await? {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_keepalive(true)?;
        match socket.connect(addr).await {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => KxError::Io(e),
        None => KxError::Address(format!("no addresses for {dial}")),
    })
}

fn build_call(cmd: &str, args: Vec<K>) -> K {
    let cmd = K::string(cmd);
    if args.is_empty() {
        cmd
    } else {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(cmd);
        items.extend(args);
        K::mixed(items)
    }
}
