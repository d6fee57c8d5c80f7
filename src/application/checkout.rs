use super::session::{Inbound, InboundSender};
use crate::domain::payment::GatewayOutcome;
use crate::domain::ports::{CheckoutUiBox, PaymentGatewayBox};
use crate::error::Result;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the session learns from one checkout attempt.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CheckoutOutcome {
    /// The backend accepted the payment; progress arrives on the channel.
    Verified,
    /// The backend rejected the signed payload.
    Rejected(String),
    /// The verification call could not be completed. The payment may still
    /// have gone through.
    VerificationRequestFailed(String),
    /// The user closed the gateway UI.
    Dismissed,
    /// The gateway reported the payment as failed.
    GatewayFailed(String),
}

/// Drives the payment gateway for one registration.
pub struct Checkout {
    gateway: PaymentGatewayBox,
    ui: CheckoutUiBox,
}

impl Checkout {
    pub fn new(gateway: PaymentGatewayBox, ui: CheckoutUiBox) -> Self {
        Self { gateway, ui }
    }

    /// Creates the order, presents it and verifies the signed result.
    ///
    /// Only a failure to create the order is returned as an error: at that
    /// point no payment exists for the session to track.
    pub async fn run(&self, registration_ref: &str) -> Result<CheckoutOutcome> {
        let order = self.gateway.initiate(registration_ref).await?;
        info!(order_id = %order.order_id, amount = %order.amount, currency = %order.currency, "checkout opened");

        let payload = match self.ui.present(&order).await {
            GatewayOutcome::Completed(payload) => payload,
            GatewayOutcome::Dismissed => {
                info!(order_id = %order.order_id, "checkout dismissed");
                return Ok(CheckoutOutcome::Dismissed);
            }
            GatewayOutcome::Failed(reason) => {
                warn!(order_id = %order.order_id, %reason, "gateway reported failure");
                return Ok(CheckoutOutcome::GatewayFailed(reason));
            }
        };

        match self.gateway.verify(&payload).await {
            Ok(response) if response.is_success() => Ok(CheckoutOutcome::Verified),
            Ok(response) => {
                warn!(order_id = %order.order_id, message = %response.message, "payment rejected");
                Ok(CheckoutOutcome::Rejected(response.message))
            }
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "verification request failed");
                Ok(CheckoutOutcome::VerificationRequestFailed(e.to_string()))
            }
        }
    }

    /// Runs the checkout in the background and delivers its outcome to the
    /// session, which keeps consuming channel events meanwhile.
    pub fn spawn(self, registration_ref: String, sink: InboundSender) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let outcome = self.run(&registration_ref).await?;
            if let Err(unsent) = sink.send(Inbound::Checkout(outcome)) {
                debug!(outcome = ?unsent.0, "session closed before checkout finished");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{SignedPayload, VerificationResponse, VerificationStatus};
    use crate::infrastructure::in_memory::{ScriptedCheckoutUi, ScriptedGateway};

    fn payload() -> SignedPayload {
        SignedPayload {
            order_id: "order_1".to_string(),
            payment_id: "pay_1".to_string(),
            signature: "sig".to_string(),
        }
    }

    #[tokio::test]
    async fn test_verified_checkout() {
        let checkout = Checkout::new(
            Box::new(ScriptedGateway::accepting()),
            Box::new(ScriptedCheckoutUi::new(GatewayOutcome::Completed(payload()))),
        );
        assert_eq!(checkout.run("REG-1").await.unwrap(), CheckoutOutcome::Verified);
    }

    #[tokio::test]
    async fn test_rejected_checkout() {
        let gateway = ScriptedGateway::responding(Ok(VerificationResponse {
            status: VerificationStatus::Failure,
            message: "signature mismatch".to_string(),
        }));
        let checkout = Checkout::new(
            Box::new(gateway),
            Box::new(ScriptedCheckoutUi::new(GatewayOutcome::Completed(payload()))),
        );
        assert_eq!(
            checkout.run("REG-1").await.unwrap(),
            CheckoutOutcome::Rejected("signature mismatch".to_string())
        );
    }

    #[tokio::test]
    async fn test_verification_transport_failure() {
        let gateway = ScriptedGateway::responding(Err("connection reset".to_string()));
        let checkout = Checkout::new(
            Box::new(gateway),
            Box::new(ScriptedCheckoutUi::new(GatewayOutcome::Completed(payload()))),
        );
        assert!(matches!(
            checkout.run("REG-1").await.unwrap(),
            CheckoutOutcome::VerificationRequestFailed(reason) if reason.contains("connection reset")
        ));
    }

    #[tokio::test]
    async fn test_spawned_checkout_delivers_outcome() {
        let checkout = Checkout::new(
            Box::new(ScriptedGateway::accepting()),
            Box::new(ScriptedCheckoutUi::new(GatewayOutcome::Dismissed)),
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        checkout.spawn("REG-1".to_string(), tx).await.unwrap().unwrap();

        assert_eq!(
            rx.recv().await,
            Some(Inbound::Checkout(CheckoutOutcome::Dismissed))
        );
    }

    #[tokio::test]
    async fn test_spawned_checkout_tolerates_closed_session() {
        let checkout = Checkout::new(
            Box::new(ScriptedGateway::accepting()),
            Box::new(ScriptedCheckoutUi::new(GatewayOutcome::Completed(payload()))),
        );
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);

        assert!(checkout.spawn("REG-1".to_string(), tx).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_dismissed_checkout_skips_verification() {
        let gateway = ScriptedGateway::accepting();
        let checkout = Checkout::new(
            Box::new(gateway.clone()),
            Box::new(ScriptedCheckoutUi::new(GatewayOutcome::Dismissed)),
        );
        assert_eq!(checkout.run("REG-1").await.unwrap(), CheckoutOutcome::Dismissed);
        assert_eq!(gateway.verifications(), 0);
    }
}
