// TCP transport for the projector control port.
//
// Opening the socket, writing encoded requests, and the synchronous
// request/response exchange used during the handshake before any
// listener owns the read half.

use std::time::Duration;

use bytes::BytesMut;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::codec::{self, Envelope};
use crate::error::Error;
use crate::protocol::{CONNECT_TIMEOUT, DEFAULT_PORT, LOGIN_TIMEOUT};

const READ_CHUNK: usize = 8 * 1024;

/// Socket-level tuning shared by the handshake and the session.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub port: u16,
    pub connect_timeout: Duration,
    pub login_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout: CONNECT_TIMEOUT,
            login_timeout: LOGIN_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Open a TCP connection to `host`, bounded by the connect timeout.
    pub async fn connect(&self, host: &str) -> Result<TcpStream, Error> {
        tracing::debug!(host, port = self.port, "opening connection");

        let attempt = TcpStream::connect((host, self.port));
        match tokio::time::timeout(self.connect_timeout, attempt).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                Ok(stream)
            }
            Ok(Err(source)) => Err(Error::Connect {
                host: host.to_owned(),
                port: self.port,
                source,
            }),
            Err(_) => Err(Error::ConnectTimeout {
                host: host.to_owned(),
                port: self.port,
                timeout_secs: self.connect_timeout.as_secs(),
            }),
        }
    }
}

/// Encode and write one request.
pub async fn write_request<W>(
    writer: &mut W,
    method: &str,
    params: &Value,
    id: u64,
) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let bytes = codec::encode(method, params, id)?;
    tracing::trace!(id, method, frame = %String::from_utf8_lossy(&bytes), "-> frame");
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read until the reply for `id` arrives, bounded by `timeout`.
///
/// Only used while the caller still owns the read half; other traffic
/// seen in the meantime is discarded.
pub async fn read_response<R>(reader: &mut R, id: u64, timeout: Duration) -> Result<Envelope, Error>
where
    R: AsyncRead + Unpin,
{
    let exchange = async {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        loop {
            buf.clear();
            if reader.read_buf(&mut buf).await? == 0 {
                return Err(Error::Closed);
            }
            for envelope in codec::decode(&buf) {
                if envelope.id != Some(id) {
                    tracing::debug!(id = ?envelope.id, "ignoring message during handshake");
                    continue;
                }
                if let Some(err) = envelope.rpc_error() {
                    return Err(Error::Rpc {
                        code: err.code,
                        message: err.message,
                    });
                }
                if !envelope.is_result() {
                    return Err(Error::Handshake {
                        message: format!("reply to request {id} is not a JSON-RPC 2.0 result"),
                    });
                }
                return Ok(envelope);
            }
        }
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| Error::login_timeout(timeout))?
}
