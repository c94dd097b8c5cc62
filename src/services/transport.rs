//! Transport
//!
//! Fire-and-forget channel to the remote data source. Replies come back
//! separately through the session's inbound handler, matched by `start_row`.

use crossbeam_channel::{Receiver, Sender};

use crate::domain::OutboundMessage;
use crate::error::{Error, Result};

/// Outbound half of the data-source connection
pub trait Transport: Send + Sync {
    /// Send a request; an error means the message never left
    fn post_message(&self, message: &OutboundMessage) -> Result<()>;
}

/// Transport backed by a crossbeam channel
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    tx: Sender<OutboundMessage>,
}

impl ChannelTransport {
    pub fn new(tx: Sender<OutboundMessage>) -> Self {
        Self { tx }
    }

    /// Transport plus the receiving end for the source side
    pub fn pair() -> (Self, Receiver<OutboundMessage>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl Transport for ChannelTransport {
    fn post_message(&self, message: &OutboundMessage) -> Result<()> {
        self.tx
            .send(message.clone())
            .map_err(|e| Error::Transport {
                message: format!("outbound channel closed: {e}"),
            })
    }
}

/// Transport for sources running as tokio tasks
#[derive(Clone, Debug)]
pub struct TokioTransport {
    tx: tokio::sync::mpsc::UnboundedSender<OutboundMessage>,
}

impl TokioTransport {
    pub fn pair() -> (Self, tokio::sync::mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for TokioTransport {
    fn post_message(&self, message: &OutboundMessage) -> Result<()> {
        self.tx.send(message.clone()).map_err(|_| Error::Transport {
            message: "data source task has stopped".to_string(),
        })
    }
}
