// src/payment.rs
// Per-tool micropayment gate. Prices are fixed at startup; verification of
// payment proofs is an injected capability, never implemented here.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

/// Static price table, USDC per call.
pub const TOOL_PRICES: &[(&str, f64)] = &[
    ("findListings", 0.001),
    ("comparePrice", 0.002),
    ("getPlatformStats", 0.001),
    ("subscribeToAlerts", 0.005),
];

pub const PAYMENT_CURRENCY: &str = "USDC";
pub const PAYMENT_NETWORK: &str = "Base";
/// Header carrying the opaque payment proof.
pub const PROOF_HEADER: &str = "x-payment-proof";

/// Settlement-side verification boundary. Implementations live outside
/// this crate's core; the gate only consumes the boolean.
#[async_trait::async_trait]
pub trait ProofVerifier: Send + Sync {
    async fn verify(&self, proof: &str, expected_amount: f64) -> bool;
}

/// Development verifier: accepts any proof.
pub struct AcceptAllVerifier;

#[async_trait::async_trait]
impl ProofVerifier for AcceptAllVerifier {
    async fn verify(&self, _proof: &str, _expected_amount: f64) -> bool {
        true
    }
}

/// Production placeholder: rejects everything until a real settlement
/// verifier is wired in.
// TODO: replace with an on-chain verifier (look up the transaction by
// hash, check recipient, amount and confirmation depth).
pub struct RejectAllVerifier;

#[async_trait::async_trait]
impl ProofVerifier for RejectAllVerifier {
    async fn verify(&self, proof: &str, expected_amount: f64) -> bool {
        tracing::warn!(proof, expected_amount, "proof verification not configured, rejecting");
        false
    }
}

/// Expected control-flow signal, not a bug condition: the caller owes a
/// payment before this tool runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequired {
    pub amount: f64,
    pub tool: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment of {} {} required for {}", .0.amount, PAYMENT_CURRENCY, .0.tool)]
    Required(PaymentRequired),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Structured 402-style body, renderable by any transport.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequiredBody {
    pub error: &'static str,
    pub code: u16,
    pub amount: f64,
    pub currency: &'static str,
    pub network: &'static str,
    pub recipient: String,
    pub tool: String,
    pub instructions: &'static str,
}

pub struct PaymentGate {
    prices: HashMap<&'static str, f64>,
    enabled: bool,
    recipient: String,
    verifier: Arc<dyn ProofVerifier>,
}

impl PaymentGate {
    pub fn new(enabled: bool, recipient: String, verifier: Arc<dyn ProofVerifier>) -> Self {
        Self {
            prices: TOOL_PRICES.iter().copied().collect(),
            enabled,
            recipient,
            verifier,
        }
    }

    pub fn price_of(&self, tool: &str) -> Option<f64> {
        self.prices.get(tool).copied()
    }

    /// Authorize one tool call.
    ///
    /// With verification globally disabled every call passes. Otherwise a
    /// proof must be present and must verify against the tool's price;
    /// anything else raises `PaymentRequired` carrying that price.
    pub async fn check_payment(
        &self,
        tool: &str,
        proof: Option<&str>,
    ) -> Result<(), PaymentError> {
        let price = self
            .price_of(tool)
            .ok_or_else(|| PaymentError::UnknownTool(tool.to_string()))?;

        if !self.enabled {
            tracing::debug!(tool, "payment verification disabled, allowing call");
            return Ok(());
        }

        let required = || {
            PaymentError::Required(PaymentRequired {
                amount: price,
                tool: tool.to_string(),
            })
        };

        let proof = proof.ok_or_else(required)?;
        if !self.verifier.verify(proof, price).await {
            return Err(required());
        }

        tracing::info!(tool, price, "payment verified");
        Ok(())
    }

    /// Render the typed signal into the uniform 402 body.
    pub fn payment_required_body(&self, signal: &PaymentRequired) -> PaymentRequiredBody {
        PaymentRequiredBody {
            error: "Payment Required",
            code: 402,
            amount: signal.amount,
            currency: PAYMENT_CURRENCY,
            network: PAYMENT_NETWORK,
            recipient: self.recipient.clone(),
            tool: signal.tool.clone(),
            instructions: "Send payment to recipient address on Base network, include transaction hash in X-Payment-Proof header",
        }
    }
}
