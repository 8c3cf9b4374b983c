//! Outbound write pipeline.
//!
//! All outbound frames for one connection funnel through a single queue
//! drained by one task, so writes are FIFO and never overlap. The first
//! write failure stops the drain permanently and reports to the close state
//! machine exactly once; no frame is attempted after a failure.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::close::CloseFrame;
use crate::connection::machine::CloseStateMachine;
use crate::connection::idle::IdleHandle;
use crate::error::Result;
use crate::message::Message;

/// An outbound frame queued for serialized transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A data message (text or binary).
    Data(Message),
    /// A close frame.
    Close(CloseFrame),
}

/// The seam to the external framing/transport layer.
///
/// Implementations serialize one frame onto the wire per call. The pipeline
/// guarantees a single in-flight call at a time per connection.
pub trait FrameSink: Send + 'static {
    /// Transmit one frame. An error is terminal for the connection.
    fn send_frame(&mut self, frame: OutboundFrame) -> impl Future<Output = Result<()>> + Send;

    /// Sever the transport. Best effort; called at most once, after which no
    /// further frames are sent.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug)]
pub(crate) enum WriteCommand {
    Frame(OutboundFrame),
    Shutdown,
}

/// Handle for enqueuing writes onto a connection's pipeline.
#[derive(Debug, Clone)]
pub(crate) struct WriteHandle {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl WriteHandle {
    /// Queue a frame. Silently dropped if the pipeline has already stopped;
    /// the stop itself was reported as a terminal signal.
    pub(crate) fn enqueue(&self, frame: OutboundFrame) {
        let _ = self.tx.send(WriteCommand::Frame(frame));
    }

    /// Ask the pipeline to sever the transport and stop.
    pub(crate) fn sever(&self) {
        let _ = self.tx.send(WriteCommand::Shutdown);
    }

    /// A handle with no pipeline behind it; commands pile up in the returned
    /// receiver.
    #[cfg(test)]
    pub(crate) fn test_handle() -> (Self, mpsc::UnboundedReceiver<WriteCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Drains one connection's write queue onto the sink.
pub(crate) struct WritePipeline<S> {
    rx: mpsc::UnboundedReceiver<WriteCommand>,
    sink: S,
}

impl<S: FrameSink> WritePipeline<S> {
    pub(crate) fn new(sink: S) -> (Self, WriteHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, sink }, WriteHandle { tx })
    }

    /// Drain until shutdown, queue closure, or the first write failure.
    pub(crate) async fn run(mut self, machine: Arc<CloseStateMachine>, idle: IdleHandle) {
        while let Some(command) = self.rx.recv().await {
            match command {
                WriteCommand::Frame(frame) => match self.sink.send_frame(frame).await {
                    Ok(()) => idle.on_activity(),
                    Err(err) => {
                        machine.on_write_failure(err);
                        break;
                    }
                },
                WriteCommand::Shutdown => break,
            }
        }
        self.sink.shutdown().await;
    }
}
