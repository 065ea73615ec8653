//! Loop-back device emulator.
//!
//! [`DeviceEmulator`] plays the device side of the wire protocol: it decodes
//! request frames and answers each one with the next scripted [`Reply`], or
//! with its [`Fallback`] once the script runs out. It backs the loop-back
//! tests and the `apduwire emulate` command.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use apduwire_frame::{
    encode_response, DeviceCodec, FrameConfig, FrameError, ResponseFrame, StatusCode,
};
use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// How the emulator answers one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A well-formed response frame.
    Respond(ResponseFrame),
    /// Arbitrary bytes, written as-is.
    Raw(Bytes),
    /// A well-formed frame written in two parts with a pause in between.
    Split {
        frame: ResponseFrame,
        at: usize,
        pause: Duration,
    },
    /// No answer at all.
    Silent,
    /// Wait, then answer with the inner reply.
    Delay(Duration, Box<Reply>),
    /// Close the connection instead of answering.
    Close,
}

impl Reply {
    /// `0x9000` response carrying `payload`.
    pub fn ok(payload: impl Into<Bytes>) -> Self {
        Reply::Respond(ResponseFrame::new(payload, StatusCode::OK))
    }

    /// Empty response with the given status word.
    pub fn status(code: impl Into<StatusCode>) -> Self {
        Reply::Respond(ResponseFrame::new(Bytes::new(), code))
    }

    /// Send this reply after `delay`.
    pub fn delayed(self, delay: Duration) -> Self {
        Reply::Delay(delay, Box::new(self))
    }
}

/// Answer used once the script is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// Echo the request payload back with this status word.
    Echo(StatusCode),
    /// Always answer with the same frame.
    Fixed(ResponseFrame),
}

impl Fallback {
    fn reply(&self, request: &Bytes) -> Reply {
        match self {
            Fallback::Echo(status) => Reply::Respond(ResponseFrame::new(request.clone(), *status)),
            Fallback::Fixed(frame) => Reply::Respond(frame.clone()),
        }
    }
}

impl Default for Fallback {
    fn default() -> Self {
        Fallback::Echo(StatusCode::OK)
    }
}

#[derive(Debug, Default)]
struct Shared {
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Bytes>>,
}

impl Shared {
    fn record(&self, request: Bytes) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    fn next_scripted(&self) -> Option<Reply> {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

/// A TCP peer that speaks the device side of the protocol.
///
/// Connections are served one at a time, in accept order.
#[derive(Debug)]
pub struct DeviceEmulator {
    listener: TcpListener,
    shared: Arc<Shared>,
    fallback: Fallback,
    fallback_delay: Option<Duration>,
    frame_config: FrameConfig,
}

impl DeviceEmulator {
    /// Bind to `addr`, e.g. `127.0.0.1:0` for an ephemeral port.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            shared: Arc::new(Shared::default()),
            fallback: Fallback::default(),
            fallback_delay: None,
            frame_config: FrameConfig::default(),
        })
    }

    /// Queue replies, consumed one per request across all connections.
    pub fn with_script(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.shared
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(replies);
        self
    }

    /// Override the reply used once the script is exhausted.
    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Wait this long before every fallback reply.
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = Some(delay);
        self
    }

    /// Override the request size limit.
    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.frame_config = config;
        self
    }

    /// Address the emulator is listening on.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run on a background task until the returned handle shuts it down.
    pub fn spawn(self) -> io::Result<EmulatorHandle> {
        let addr = self.local_addr()?;
        let shared = Arc::clone(&self.shared);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            tokio::select! {
                result = self.serve() => {
                    if let Err(err) = result {
                        warn!(%addr, error = %err, "emulator stopped");
                    }
                }
                _ = shutdown_rx => debug!(%addr, "emulator shut down"),
            }
        });

        Ok(EmulatorHandle {
            addr,
            shared,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// Accept and serve connections until accepting fails.
    pub async fn serve(self) -> io::Result<()> {
        info!(addr = %self.listener.local_addr()?, "emulator listening");
        loop {
            let (stream, remote) = self.listener.accept().await?;
            debug!(%remote, "emulator accepted connection");
            if let Err(err) = self.serve_connection(stream).await {
                warn!(%remote, error = %err, "emulator connection failed");
            }
            debug!(%remote, "emulator connection finished");
        }
    }

    async fn serve_connection(&self, stream: TcpStream) -> Result<(), FrameError> {
        let codec = DeviceCodec::with_config(self.frame_config.clone());
        let mut framed = Framed::new(stream, codec);

        while let Some(request) = framed.next().await {
            let request = request?;
            debug!(len = request.len(), "emulator received request");
            self.shared.record(request.clone());

            let reply = self
                .shared
                .next_scripted()
                .unwrap_or_else(|| self.fallback_reply(&request));
            if !answer(&mut framed, reply).await? {
                break;
            }
        }
        Ok(())
    }

    fn fallback_reply(&self, request: &Bytes) -> Reply {
        let reply = self.fallback.reply(request);
        match self.fallback_delay {
            Some(delay) => reply.delayed(delay),
            None => reply,
        }
    }
}

/// Write one reply. Returns `false` when the connection should be closed.
async fn answer(
    framed: &mut Framed<TcpStream, DeviceCodec>,
    mut reply: Reply,
) -> Result<bool, FrameError> {
    loop {
        match reply {
            Reply::Delay(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            Reply::Respond(frame) => {
                framed.send(frame).await?;
                return Ok(true);
            }
            Reply::Raw(bytes) => {
                let stream = framed.get_mut();
                stream.write_all(&bytes).await?;
                stream.flush().await?;
                return Ok(true);
            }
            Reply::Split { frame, at, pause } => {
                let mut wire = BytesMut::with_capacity(frame.wire_size());
                encode_response(&frame.payload, frame.status, &mut wire)?;
                let (head, tail) = wire.split_at(at.min(wire.len()));

                let stream = framed.get_mut();
                stream.write_all(head).await?;
                stream.flush().await?;
                tokio::time::sleep(pause).await;
                stream.write_all(tail).await?;
                stream.flush().await?;
                return Ok(true);
            }
            Reply::Silent => return Ok(true),
            Reply::Close => return Ok(false),
        }
    }
}

/// Handle to a spawned [`DeviceEmulator`].
#[derive(Debug)]
pub struct EmulatorHandle {
    addr: SocketAddr,
    shared: Arc<Shared>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl EmulatorHandle {
    /// Listening address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Every request payload received so far, in order.
    pub fn requests(&self) -> Vec<Bytes> {
        self.shared
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queue more replies.
    pub fn push_replies(&self, replies: impl IntoIterator<Item = Reply>) {
        self.shared
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(replies);
    }

    /// Stop the emulator and wait for its task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = (&mut self.task).await {
            warn!(error = %err, "emulator task ended abnormally");
        }
    }
}
