use crate::domain::event::{ChannelEvent, RawMessage};
use crate::domain::payment::{
    GatewayOutcome, PaymentOrder, SignedPayload, VerificationResponse, VerificationStatus,
};
use crate::domain::poll::PollResult;
use crate::domain::ports::{
    ChannelTransport, CheckoutUi, PaymentGateway, ScopeId, StatusSource, TransportSignal,
};
use crate::error::{FinalizationError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{RwLock, mpsc};

#[derive(Default)]
struct HubState {
    subscribers: HashMap<ScopeId, mpsc::UnboundedSender<TransportSignal>>,
    joins: HashMap<ScopeId, usize>,
}

/// An in-process push channel partitioned by scope.
///
/// Stands in for the real-time transport in tests and the demo binary.
/// `Clone` shares the underlying hub.
#[derive(Default, Clone)]
pub struct InMemoryChannelHub {
    state: Arc<RwLock<HubState>>,
}

impl InMemoryChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to the observer of `scope`, if any. Events sent to a
    /// scope nobody observes are dropped, like on the real transport.
    pub async fn publish(&self, scope: &ScopeId, event: &ChannelEvent) -> bool {
        self.publish_raw(scope, event.to_message()).await
    }

    pub async fn publish_raw(&self, scope: &ScopeId, message: RawMessage) -> bool {
        self.signal(scope, TransportSignal::Message(message)).await
    }

    /// Simulates a dropped and re-established connection.
    pub async fn reconnect(&self, scope: &ScopeId) -> bool {
        self.signal(scope, TransportSignal::Disconnected).await
            && self.signal(scope, TransportSignal::Connected).await
    }

    pub async fn is_joined(&self, scope: &ScopeId) -> bool {
        self.state.read().await.subscribers.contains_key(scope)
    }

    /// How many times `scope` has been joined.
    pub async fn joins(&self, scope: &ScopeId) -> usize {
        self.state.read().await.joins.get(scope).copied().unwrap_or(0)
    }

    async fn signal(&self, scope: &ScopeId, signal: TransportSignal) -> bool {
        let state = self.state.read().await;
        state
            .subscribers
            .get(scope)
            .is_some_and(|subscriber| subscriber.send(signal).is_ok())
    }
}

#[async_trait]
impl ChannelTransport for InMemoryChannelHub {
    async fn join(&self, scope: &ScopeId) -> Result<mpsc::UnboundedReceiver<TransportSignal>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.write().await;
        state.subscribers.insert(scope.clone(), tx);
        *state.joins.entry(scope.clone()).or_default() += 1;
        Ok(rx)
    }

    async fn leave(&self, scope: &ScopeId) -> Result<()> {
        self.state.write().await.subscribers.remove(scope);
        Ok(())
    }
}

#[derive(Default)]
struct StatusState {
    current: PollResult,
    pending_failures: usize,
}

/// A status endpoint backed by a settable value.
#[derive(Default, Clone)]
pub struct InMemoryStatusSource {
    state: Arc<RwLock<StatusState>>,
    reads: Arc<AtomicUsize>,
}

impl InMemoryStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(result: PollResult) -> Self {
        Self {
            state: Arc::new(RwLock::new(StatusState {
                current: result,
                pending_failures: 0,
            })),
            reads: Arc::default(),
        }
    }

    pub async fn set(&self, result: PollResult) {
        self.state.write().await.current = result;
    }

    /// Makes the next `count` reads fail.
    pub async fn fail_next(&self, count: usize) {
        self.state.write().await.pending_failures = count;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for InMemoryStatusSource {
    async fn fetch_status(&self) -> Result<PollResult> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(FinalizationError::StatusUnavailable(
                "status endpoint unreachable".to_string(),
            ));
        }
        Ok(state.current.clone())
    }
}

/// A payment gateway with a fixed verification answer.
#[derive(Clone)]
pub struct ScriptedGateway {
    verification: std::result::Result<VerificationResponse, String>,
    verifications: Arc<AtomicUsize>,
}

impl ScriptedGateway {
    pub fn accepting() -> Self {
        Self::responding(Ok(VerificationResponse {
            status: VerificationStatus::Success,
            message: "payment verified".to_string(),
        }))
    }

    /// `Err` simulates a verification call that never completed.
    pub fn responding(verification: std::result::Result<VerificationResponse, String>) -> Self {
        Self {
            verification,
            verifications: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initiate(&self, registration_ref: &str) -> Result<PaymentOrder> {
        Ok(PaymentOrder {
            order_id: format!("order_{registration_ref}"),
            amount: Decimal::new(49900, 2),
            currency: "INR".to_string(),
            key: "test_key".to_string(),
            name: "Event registration".to_string(),
            description: format!("Registration {registration_ref}"),
        })
    }

    async fn verify(&self, _payload: &SignedPayload) -> Result<VerificationResponse> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        self.verification
            .clone()
            .map_err(FinalizationError::VerificationRequestFailed)
    }
}

/// A checkout UI that always ends the same way.
#[derive(Clone)]
pub struct ScriptedCheckoutUi {
    outcome: GatewayOutcome,
}

impl ScriptedCheckoutUi {
    pub fn new(outcome: GatewayOutcome) -> Self {
        Self { outcome }
    }

    /// Completes with a payload signed for `order`.
    pub fn completing() -> Self {
        Self::new(GatewayOutcome::Completed(SignedPayload {
            order_id: String::new(),
            payment_id: "pay_test".to_string(),
            signature: "signature".to_string(),
        }))
    }
}

#[async_trait]
impl CheckoutUi for ScriptedCheckoutUi {
    async fn present(&self, order: &PaymentOrder) -> GatewayOutcome {
        match &self.outcome {
            GatewayOutcome::Completed(payload) if payload.order_id.is_empty() => {
                GatewayOutcome::Completed(SignedPayload {
                    order_id: order.order_id.clone(),
                    ..payload.clone()
                })
            }
            outcome => outcome.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hub_drops_events_without_observer() {
        let hub = InMemoryChannelHub::new();
        let scope = ScopeId::new("user-1");
        assert!(!hub.publish(&scope, &ChannelEvent::GeneratingReceipt).await);
    }

    #[tokio::test]
    async fn test_hub_delivers_to_joined_scope_only() {
        let hub = InMemoryChannelHub::new();
        let mine = ScopeId::new("user-1");
        let other = ScopeId::new("user-2");
        let mut rx = hub.join(&mine).await.unwrap();

        assert!(hub.publish(&mine, &ChannelEvent::GeneratingPid).await);
        assert!(!hub.publish(&other, &ChannelEvent::GeneratingPid).await);

        let signal = rx.recv().await.unwrap();
        assert_eq!(
            signal,
            TransportSignal::Message(RawMessage::new("generating_pid", None))
        );
    }

    #[tokio::test]
    async fn test_status_source_counts_reads() {
        let source = InMemoryStatusSource::with_status(PollResult::completed("INC-1"));
        source.fail_next(1).await;

        assert!(source.fetch_status().await.is_err());
        assert_eq!(
            source.fetch_status().await.unwrap(),
            PollResult::completed("INC-1")
        );
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn test_ui_signs_for_presented_order() {
        let gateway = ScriptedGateway::accepting();
        let order = gateway.initiate("REG-7").await.unwrap();
        let ui = ScriptedCheckoutUi::completing();

        match ui.present(&order).await {
            GatewayOutcome::Completed(payload) => assert_eq!(payload.order_id, "order_REG-7"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
