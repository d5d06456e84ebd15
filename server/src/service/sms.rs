use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::warn;

/// Outbound SMS delivery.
///
/// In development the server returns verification codes in the response
/// body and never calls this; production wires in a real gateway.
/// `business_id` correlates the send with the provider's delivery report.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send_code(&self, phone: &str, code: &str, business_id: &str) -> Result<()>;
}

/// Gateway used when no SMS provider is configured.  Every send fails,
/// which surfaces to the client as `SMS_SEND_FAILED` instead of silently
/// swallowing codes.
pub struct DisabledSms;

#[async_trait]
impl SmsGateway for DisabledSms {
    async fn send_code(&self, phone: &str, _code: &str, business_id: &str) -> Result<()> {
        warn!(
            "SMS gateway not configured; dropping send to {} (business_id={})",
            phone, business_id
        );
        bail!("no SMS gateway configured")
    }
}
