//! Background read loop over the projector socket.
//!
//! The listener is the only reader of an established connection. It
//! decodes every chunk it reads and forwards each message, in wire order,
//! through an [`mpsc`] channel to whoever owns the session state. A
//! zero-length read or an I/O error ends the loop after one final
//! [`ListenerEvent::Closed`] or [`ListenerEvent::Failed`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_api::{ListenerHandle, TransportConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let stream = TransportConfig::default().connect("10.0.0.20").await?;
//! let (reader, _writer) = stream.into_split();
//! let mut listener = ListenerHandle::spawn(reader, CancellationToken::new());
//!
//! while let Some(event) = listener.recv().await {
//!     println!("{event:?}");
//! }
//! ```

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::codec::{self, Envelope};

// ── Channel sizing ───────────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;
const READ_CHUNK: usize = 8 * 1024;

// ── ListenerEvent ────────────────────────────────────────────────────

/// What the read loop observed on the socket.
#[derive(Debug)]
pub enum ListenerEvent {
    /// One decoded message.
    Message(Envelope),
    /// The projector closed the stream.
    Closed,
    /// A read failed; the loop has exited.
    Failed(std::io::Error),
}

// ── ListenerHandle ───────────────────────────────────────────────────

/// Handle to a running read loop. Dropping it cancels the task.
#[derive(Debug)]
pub struct ListenerHandle {
    events: mpsc::Receiver<ListenerEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Spawn the read loop over `reader`.
    ///
    /// The loop stops when `cancel` fires, the stream ends, or the
    /// handle's receiver is dropped.
    pub fn spawn<R>(reader: R, cancel: CancellationToken) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let task = tokio::spawn(read_loop(reader, tx, cancel.clone()));
        Self {
            events,
            cancel,
            task,
        }
    }

    /// Next event from the socket; `None` once the loop has exited and
    /// every buffered event has been drained.
    pub async fn recv(&mut self) -> Option<ListenerEvent> {
        self.events.recv().await
    }

    /// `true` once the read loop has returned.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the read loop to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Read loop ────────────────────────────────────────────────────────

async fn read_loop<R>(mut reader: R, tx: mpsc::Sender<ListenerEvent>, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            read = reader.read_buf(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                tracing::info!("connection closed by projector");
                let _ = tx.send(ListenerEvent::Closed).await;
                break;
            }
            Ok(n) => {
                tracing::trace!(bytes = n, "read chunk");
                for envelope in codec::decode(&buf) {
                    if tx.send(ListenerEvent::Message(envelope)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "socket read failed");
                let _ = tx.send(ListenerEvent::Failed(e)).await;
                break;
            }
        }
    }

    tracing::debug!("listener exiting");
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::io::{AsyncWriteExt, duplex};

    use super::*;

    #[tokio::test]
    async fn forwards_messages_in_order_then_closed() {
        let (client, mut server) = duplex(1024);
        let mut listener = ListenerHandle::spawn(client, CancellationToken::new());

        server
            .write_all(br#"{"jsonrpc":"2.0","id":1,"result":true}{"jsonrpc":"2.0","id":2,"result":false}"#)
            .await
            .unwrap();
        drop(server);

        let mut ids = Vec::new();
        loop {
            match listener.recv().await.unwrap() {
                ListenerEvent::Message(envelope) => ids.push(envelope.id),
                ListenerEvent::Closed => break,
                ListenerEvent::Failed(e) => panic!("unexpected read failure: {e}"),
            }
        }
        assert_eq!(ids, vec![Some(1), Some(2)]);
        assert!(listener.recv().await.is_none());
    }

    #[tokio::test]
    async fn malformed_chunk_does_not_stop_the_loop() {
        let (client, mut server) = duplex(1024);
        let mut listener = ListenerHandle::spawn(client, CancellationToken::new());

        server.write_all(b"{\"jsonrpc\": oops").await.unwrap();
        server.flush().await.unwrap();
        tokio::task::yield_now().await;
        server
            .write_all(br#"{"jsonrpc":"2.0","id":5,"result":null}"#)
            .await
            .unwrap();

        match listener.recv().await.unwrap() {
            ListenerEvent::Message(envelope) => assert_eq!(envelope.id, Some(5)),
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_error_ends_with_one_failed_event() {
        let reader = tokio_test::io::Builder::new()
            .read(br#"{"jsonrpc":"2.0","id":3,"result":true}"#)
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))
            .build();
        let mut listener = ListenerHandle::spawn(reader, CancellationToken::new());

        match listener.recv().await.unwrap() {
            ListenerEvent::Message(envelope) => assert_eq!(envelope.id, Some(3)),
            other => panic!("expected a message, got {other:?}"),
        }
        match listener.recv().await.unwrap() {
            ListenerEvent::Failed(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset);
            }
            other => panic!("expected a read failure, got {other:?}"),
        }
        assert!(listener.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancel_stops_the_task() {
        let (client, _server) = duplex(64);
        let cancel = CancellationToken::new();
        let mut listener = ListenerHandle::spawn(client, cancel.clone());

        cancel.cancel();
        assert!(listener.recv().await.is_none());
        assert!(listener.is_finished());
    }
}
