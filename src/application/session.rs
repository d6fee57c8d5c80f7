use super::checkout::CheckoutOutcome;
use super::poll::StatusPollResolver;
use super::reconciler::{FailureKind, Reconciler};
use super::subscription::ChannelSubscriptionManager;
use crate::config::FinalizationConfig;
use crate::domain::event::ChannelEvent;
use crate::domain::poll::PollResult;
use crate::domain::ports::{ChannelTransportBox, ScopeId, StatusSourceBox};
use crate::domain::state::{Input, ProtocolViolation, RegistrationFinalizationState, Seed};
use crate::error::{FinalizationError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Items serialized into a session, whatever their source.
#[derive(Debug, PartialEq, Clone)]
pub enum Inbound {
    Event(ChannelEvent),
    Violation(ProtocolViolation),
    /// Live-channel continuity was lost; read the status endpoint again.
    Resync,
    Checkout(CheckoutOutcome),
    /// A background status read finished. `result` is `None` when the
    /// endpoint stayed unavailable; `cause` is set when the read was forced
    /// to settle a dismissal or an unverified payment.
    Polled {
        result: Option<PollResult>,
        cause: Option<FailureKind>,
    },
}

pub type InboundSender = mpsc::UnboundedSender<Inbound>;

/// External collaborators a session needs.
pub struct SessionPorts {
    pub transport: ChannelTransportBox,
    pub status: StatusSourceBox,
}

/// One finalization view, from mount to close.
///
/// All inputs are funnelled through a single queue and applied one at a
/// time, so the snapshot has exactly one writer. Arrival order is not
/// trusted; the merge rule makes it irrelevant. Status reads triggered
/// while consuming run as background tasks and come back through the same
/// queue, so channel events keep flowing while a read is in flight.
pub struct FinalizationSession {
    reconciler: Reconciler,
    subscriptions: ChannelSubscriptionManager,
    resolver: Arc<StatusPollResolver>,
    polls: JoinSet<()>,
    inbound_tx: InboundSender,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    snapshots: watch::Sender<RegistrationFinalizationState>,
    config: FinalizationConfig,
}

impl FinalizationSession {
    /// Opens the view: joins `scope`, then catches up through the status
    /// endpoint on anything that happened before the view was observing.
    pub async fn mount(
        scope: ScopeId,
        seed: Seed,
        ports: SessionPorts,
        config: FinalizationConfig,
    ) -> Result<Self> {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let reconciler = Reconciler::new(seed);
        let (snapshots, _) = watch::channel(reconciler.state().clone());

        let mut session = Self {
            reconciler,
            subscriptions: ChannelSubscriptionManager::new(ports.transport, inbound_tx.clone()),
            resolver: Arc::new(StatusPollResolver::new(ports.status, &config)),
            polls: JoinSet::new(),
            inbound_tx,
            inbound_rx,
            snapshots,
            config,
        };

        session.subscriptions.open(scope).await?;
        session.catch_up().await;
        Ok(session)
    }

    pub fn state(&self) -> &RegistrationFinalizationState {
        self.reconciler.state()
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.reconciler.failure()
    }

    pub fn violations(&self) -> &[ProtocolViolation] {
        self.reconciler.violations()
    }

    pub fn config(&self) -> &FinalizationConfig {
        &self.config
    }

    /// Handle for producers outside the push channel, such as a checkout.
    pub fn sender(&self) -> InboundSender {
        self.inbound_tx.clone()
    }

    /// Snapshot stream for the presentation layer.
    pub fn watch(&self) -> watch::Receiver<RegistrationFinalizationState> {
        self.snapshots.subscribe()
    }

    /// Waits for the next queued item and applies it.
    ///
    /// Cancel-safe: an item is either still queued or fully handled.
    pub async fn next_input(&mut self) -> Option<()> {
        let inbound = self.inbound_rx.recv().await?;
        self.handle(inbound);
        Some(())
    }

    /// Applies everything already queued without waiting for more.
    /// Status reads still in flight are not waited for.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(inbound) = self.inbound_rx.try_recv() {
            self.handle(inbound);
            handled += 1;
        }
        handled
    }

    /// Consumes inputs until the snapshot is terminal.
    ///
    /// Fails with [`FinalizationError::Stalled`] when `settle_timeout`
    /// elapses first. Nothing queued or in flight is lost, so the session
    /// stays usable.
    pub async fn run_until_terminal(&mut self) -> Result<&RegistrationFinalizationState> {
        let timeout = self.config.settle_timeout;
        let settled = tokio::time::timeout(timeout, async {
            while !self.reconciler.state().is_terminal() {
                if self.next_input().await.is_none() {
                    break;
                }
            }
        })
        .await;

        if settled.is_err() {
            warn!(?timeout, steps = ?self.state().steps(), "no terminal state before timeout");
            return Err(FinalizationError::Stalled);
        }
        Ok(self.reconciler.state())
    }

    pub fn handle(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Event(event) => self.apply(Input::Event(event)),
            Inbound::Violation(violation) => self.reconciler.report(violation),
            Inbound::Resync => self.spawn_poll(None),
            Inbound::Checkout(outcome) => self.on_checkout(outcome),
            Inbound::Polled { result, cause } => self.on_polled(result, cause),
        }
    }

    /// Rejoins `scope` after the view was hidden. Events emitted meanwhile
    /// are lost, so the status endpoint is read before trusting the channel.
    ///
    /// Switching to another scope means another identity: channel items
    /// still queued from the previous scope are dropped.
    pub async fn reopen(&mut self, scope: ScopeId) -> Result<()> {
        let switching = self.subscriptions.scope() != Some(&scope);
        self.subscriptions.close().await?;
        if switching {
            self.discard_channel_backlog();
        }
        self.subscriptions.open(scope).await?;
        self.catch_up().await;
        Ok(())
    }

    /// Stops observing. The backend pipeline is not affected; status reads
    /// still in flight are cancelled.
    pub async fn close(mut self) -> Result<RegistrationFinalizationState> {
        self.subscriptions.close().await?;
        self.polls.abort_all();
        Ok(self.reconciler.state().clone())
    }

    fn on_checkout(&mut self, outcome: CheckoutOutcome) {
        match outcome {
            CheckoutOutcome::Verified => {
                debug!("payment verified, awaiting pipeline events");
            }
            CheckoutOutcome::Rejected(_) | CheckoutOutcome::GatewayFailed(_) => {
                self.fail(FailureKind::PipelineFailed);
            }
            CheckoutOutcome::VerificationRequestFailed(reason) => {
                warn!(%reason, "verification outcome unknown, resolving through status read");
                self.spawn_poll(Some(FailureKind::VerificationRequestFailed));
            }
            CheckoutOutcome::Dismissed => {
                if self.state().is_terminal() {
                    return;
                }
                self.spawn_poll(Some(FailureKind::Stalled));
            }
        }
    }

    // A forced read that shows no issued id and no running step settles
    // the view as failed. An unreachable endpoint only settles an
    // unverified payment; a dismissal stays pending.
    fn on_polled(&mut self, result: Option<PollResult>, cause: Option<FailureKind>) {
        let Some(result) = result else {
            match cause {
                Some(kind @ FailureKind::VerificationRequestFailed) => self.fail(kind),
                Some(kind) => warn!(cause = %kind, "could not resolve pipeline state"),
                None => {}
            }
            return;
        };

        let active = result.shows_activity();
        self.apply(Input::Poll(result));
        let Some(kind) = cause else {
            return;
        };
        if active || self.state().is_terminal() {
            info!(cause = %kind, steps = ?self.state().steps(), "adopted polled pipeline state");
        } else {
            self.fail(kind);
        }
    }

    // Used where nothing else is being consumed yet, so awaiting is fine.
    async fn catch_up(&mut self) {
        let result = read_status(&self.resolver).await;
        self.on_polled(result, None);
    }

    fn spawn_poll(&mut self, cause: Option<FailureKind>) {
        while self.polls.try_join_next().is_some() {}
        let resolver = Arc::clone(&self.resolver);
        let sink = self.inbound_tx.clone();
        self.polls.spawn(async move {
            let result = read_status(&resolver).await;
            if sink.send(Inbound::Polled { result, cause }).is_err() {
                debug!("session gone before status read completed");
            }
        });
    }

    fn discard_channel_backlog(&mut self) {
        let mut kept = Vec::new();
        let mut dropped = 0;
        while let Ok(inbound) = self.inbound_rx.try_recv() {
            match inbound {
                Inbound::Event(_) | Inbound::Violation(_) | Inbound::Resync => dropped += 1,
                other => kept.push(other),
            }
        }
        if dropped > 0 {
            debug!(dropped, "discarded channel items from previous scope");
        }
        for inbound in kept {
            // The receiver lives in `self`, so the queue is still open.
            let _ = self.inbound_tx.send(inbound);
        }
    }

    fn apply(&mut self, input: Input) {
        // Violations are recorded by the reconciler and never abort the session.
        if self.reconciler.apply(&input).unwrap_or(false) {
            self.publish();
        }
    }

    fn fail(&mut self, kind: FailureKind) {
        if self.reconciler.fail(kind) {
            self.publish();
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.reconciler.state().clone());
    }
}

/// Reads the status endpoint with retries. A failed read says nothing
/// about the pipeline, so it is only logged.
async fn read_status(resolver: &StatusPollResolver) -> Option<PollResult> {
    match resolver.fetch_with_retry().await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(error = %e, "status read unavailable, keeping current snapshot");
            None
        }
    }
}
