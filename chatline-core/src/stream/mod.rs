//! Live stream transport
//!
//! Bridges one subscription to one outbound connection. The connection is
//! anything implementing [`EventSink`]; the HTTP adapter feeds an SSE body
//! through an mpsc channel.

use crate::notify::{Alert, Fanout, SubscriptionHandle};
use crate::shutdown::ShutdownSignal;
use crate::types::UserId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

/// One named frame: event tag plus JSON payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub event: String,
    pub data: String,
}

impl StreamFrame {
    pub fn from_alert(alert: &Alert) -> serde_json::Result<Self> {
        Ok(Self {
            event: alert.event_type().to_string(),
            data: serde_json::to_string(&alert.payload()?)?,
        })
    }
}

/// The connection went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Stream sink closed")]
pub struct SinkClosed;

/// Outbound side of a live stream
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Write one frame
    async fn send(&self, frame: StreamFrame) -> Result<(), SinkClosed>;

    /// Resolves when the connection is gone
    async fn closed(&self);
}

#[async_trait]
impl EventSink for mpsc::Sender<StreamFrame> {
    async fn send(&self, frame: StreamFrame) -> Result<(), SinkClosed> {
        mpsc::Sender::send(self, frame).await.map_err(|_| SinkClosed)
    }

    async fn closed(&self) {
        mpsc::Sender::closed(self).await
    }
}

/// Why a stream stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The client disconnected
    ClientGone,
    /// The subscription was evicted or its topic dropped
    SubscriptionClosed,
    /// The process is shutting down
    Shutdown,
}

/// One open stream for one user
pub struct LiveStream {
    fanout: Arc<Fanout>,
    subscription: SubscriptionHandle,
    shutdown: broadcast::Receiver<ShutdownSignal>,
}

impl LiveStream {
    /// Subscribe for `user_id`
    pub async fn open(
        fanout: Arc<Fanout>,
        user_id: &UserId,
        shutdown: broadcast::Receiver<ShutdownSignal>,
    ) -> Self {
        let subscription = fanout.subscribe(user_id).await;
        tracing::info!(user = %user_id, subscriber = ?subscription.id(), "Live stream opened");

        Self {
            fanout,
            subscription,
            shutdown,
        }
    }

    pub fn user_id(&self) -> &UserId {
        self.subscription.user_id()
    }

    /// Forward alerts to `sink` until something ends the stream, then
    /// release the subscription.
    pub async fn run<S: EventSink + ?Sized>(mut self, sink: &S) -> StreamEnd {
        let end = loop {
            tokio::select! {
                _ = sink.closed() => break StreamEnd::ClientGone,
                // lagged or closed still means shutdown was requested
                _ = self.shutdown.recv() => break StreamEnd::Shutdown,
                alert = self.subscription.recv() => {
                    let Some(alert) = alert else {
                        break StreamEnd::SubscriptionClosed;
                    };

                    let frame = match StreamFrame::from_alert(&alert) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!(
                                alert = alert.event_type(),
                                error = %e,
                                "Failed to encode alert, skipping"
                            );
                            continue;
                        }
                    };

                    // a slow client must not hold off shutdown
                    let sent = tokio::select! {
                        sent = sink.send(frame) => sent,
                        _ = self.shutdown.recv() => break StreamEnd::Shutdown,
                    };
                    if sent.is_err() {
                        break StreamEnd::ClientGone;
                    }
                }
            }
        };

        tracing::info!(user = %self.subscription.user_id(), reason = ?end, "Live stream ended");
        self.fanout.unsubscribe(self.subscription).await;
        end
    }
}
