use super::event::RawMessage;
use super::payment::{GatewayOutcome, PaymentOrder, SignedPayload, VerificationResponse};
use super::poll::PollResult;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

/// Opaque key of the channel partition that routes events to one identity.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ScopeId(String);

impl ScopeId {
    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a push transport delivers for a joined scope.
#[derive(Debug, PartialEq, Clone)]
pub enum TransportSignal {
    /// The connection was (re)established.
    Connected,
    Disconnected,
    Message(RawMessage),
}

#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Joins `scope`. Signals for the scope arrive on the returned receiver
    /// until [`ChannelTransport::leave`] is called.
    async fn join(&self, scope: &ScopeId) -> Result<mpsc::UnboundedReceiver<TransportSignal>>;
    async fn leave(&self, scope: &ScopeId) -> Result<()>;
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<PollResult>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(&self, registration_ref: &str) -> Result<PaymentOrder>;
    async fn verify(&self, payload: &SignedPayload) -> Result<VerificationResponse>;
}

/// The checkout UI the user interacts with.
#[async_trait]
pub trait CheckoutUi: Send + Sync {
    async fn present(&self, order: &PaymentOrder) -> GatewayOutcome;
}

pub type ChannelTransportBox = Box<dyn ChannelTransport>;
pub type StatusSourceBox = Box<dyn StatusSource>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type CheckoutUiBox = Box<dyn CheckoutUi>;
