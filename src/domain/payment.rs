use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order created by the payment gateway for one registration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub key: String,
    pub name: String,
    pub description: String,
}

/// Signed proof of a completed checkout, as returned by the gateway UI.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Success,
    Failure,
}

/// Body of the verification endpoint's response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct VerificationResponse {
    pub status: VerificationStatus,
    #[serde(default)]
    pub message: String,
}

impl VerificationResponse {
    pub fn is_success(&self) -> bool {
        self.status == VerificationStatus::Success
    }
}

/// How the gateway UI ended.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum GatewayOutcome {
    Completed(SignedPayload),
    Dismissed,
    Failed(String),
}
