use super::session::{Inbound, InboundSender};
use crate::domain::event::ChannelEvent;
use crate::domain::ports::{ChannelTransportBox, ScopeId, TransportSignal};
use crate::error::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct ActiveSubscription {
    scope: ScopeId,
    forwarder: JoinHandle<()>,
}

/// Keeps at most one scope of the push channel joined and routes what
/// arrives on it into the session's inbound queue.
///
/// Closing only stops observation; the backend pipeline keeps running.
pub struct ChannelSubscriptionManager {
    transport: ChannelTransportBox,
    sink: InboundSender,
    active: Option<ActiveSubscription>,
}

impl ChannelSubscriptionManager {
    pub fn new(transport: ChannelTransportBox, sink: InboundSender) -> Self {
        Self {
            transport,
            sink,
            active: None,
        }
    }

    pub fn scope(&self) -> Option<&ScopeId> {
        self.active.as_ref().map(|active| &active.scope)
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Joins `scope`. Re-opening the scope that is already open does nothing;
    /// opening a different one leaves the current scope first. Items the old
    /// scope already forwarded stay in the sink; its owner decides whether
    /// they still apply.
    pub async fn open(&mut self, scope: ScopeId) -> Result<()> {
        if let Some(active) = &self.active {
            if active.scope == scope {
                debug!(%scope, "subscription already open");
                return Ok(());
            }
            self.close().await?;
        }

        let signals = self.transport.join(&scope).await?;
        let forwarder = tokio::spawn(forward(scope.clone(), signals, self.sink.clone()));
        info!(%scope, "joined finalization scope");
        self.active = Some(ActiveSubscription { scope, forwarder });
        Ok(())
    }

    /// Deregisters the handlers and leaves the scope. No-op when closed.
    pub async fn close(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };
        active.forwarder.abort();
        // Wait for the forwarder to stop so nothing from this scope is
        // queued after close returns.
        if let Err(e) = active.forwarder.await {
            if e.is_panic() {
                warn!(scope = %active.scope, "signal forwarder panicked");
            }
        }
        self.transport.leave(&active.scope).await?;
        info!(scope = %active.scope, "left finalization scope");
        Ok(())
    }
}

impl Drop for ChannelSubscriptionManager {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.forwarder.abort();
        }
    }
}

async fn forward(
    scope: ScopeId,
    mut signals: mpsc::UnboundedReceiver<TransportSignal>,
    sink: InboundSender,
) {
    while let Some(signal) = signals.recv().await {
        let inbound = match signal {
            TransportSignal::Connected => {
                debug!(%scope, "connection established, requesting resync");
                Inbound::Resync
            }
            TransportSignal::Disconnected => {
                debug!(%scope, "connection lost");
                continue;
            }
            TransportSignal::Message(message) => match ChannelEvent::decode(&message) {
                Ok(Some(event)) => Inbound::Event(event),
                Ok(None) => {
                    debug!(%scope, event = %message.event, "ignoring unhandled event");
                    continue;
                }
                Err(violation) => Inbound::Violation(violation),
            },
        };
        if sink.send(inbound).is_err() {
            break;
        }
    }
    debug!(%scope, "signal stream ended");
}
