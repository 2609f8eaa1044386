use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CheckoutSessionPaymentStatus, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData, Currency, EventObject, EventType, Webhook,
};

use crate::{
    config::StripeConfig,
    gateway::{
        CheckoutRequest, CompletedCheckout, GatewayError, GatewayEvent, GatewaySession,
        PaymentGateway,
    },
};

/// Stripe Checkout behind the [`PaymentGateway`] port.
pub struct StripeGateway {
    client: Client,
    webhook_secret: String,
    currency: Currency,
    success_url: String,
    cancel_url: String,
    timeout: Duration,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::new(config.secret_key.clone()),
            webhook_secret: config.webhook_secret.clone(),
            currency: parse_currency(&config.currency)?,
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
            timeout: config.timeout,
        })
    }
}

fn parse_currency(code: &str) -> anyhow::Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.to_lowercase()))
        .with_context(|| format!("Unsupported currency '{code}'"))
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[tracing::instrument(name = "stripe.create_checkout_session", skip_all)]
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<GatewaySession, GatewayError> {
        let line_items = request
            .line_items
            .into_iter()
            .map(|item| CreateCheckoutSessionLineItems {
                price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                    currency: self.currency,
                    product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                        name: item.name,
                        images: item.image.map(|image| vec![image]),
                        ..Default::default()
                    }),
                    unit_amount: Some(item.unit_amount),
                    ..Default::default()
                }),
                quantity: Some(item.quantity),
                ..Default::default()
            })
            .collect();

        let mut params = CreateCheckoutSession::new();
        params.success_url = Some(&self.success_url);
        params.cancel_url = Some(&self.cancel_url);
        params.mode = Some(CheckoutSessionMode::Payment);
        params.line_items = Some(line_items);
        params.metadata = Some(request.metadata);
        params.client_reference_id = request.client_reference_id.as_deref();

        let session = tokio::time::timeout(
            self.timeout,
            CheckoutSession::create(&self.client, params),
        )
        .await
        .map_err(|_| GatewayError::Timeout)?
        .map_err(|err| GatewayError::Request(err.to_string()))?;

        tracing::info!(session_id = %session.id, "Created checkout session");

        Ok(GatewaySession {
            id: session.id.to_string(),
            url: session.url,
        })
    }

    fn construct_event(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<GatewayEvent, GatewayError> {
        let event = Webhook::construct_event(payload, signature, &self.webhook_secret)
            .map_err(|err| GatewayError::InvalidSignature(err.to_string()))?;

        let event_type = event.type_.to_string();

        match (event.type_, event.data.object) {
            (
                EventType::CheckoutSessionCompleted
                | EventType::CheckoutSessionAsyncPaymentSucceeded,
                EventObject::CheckoutSession(session),
            ) => {
                let session_id = session.id.to_string();
                let transaction_id = session
                    .payment_intent
                    .as_ref()
                    .map(|intent| intent.id().to_string())
                    .unwrap_or_else(|| session_id.clone());

                Ok(GatewayEvent::CheckoutCompleted(CompletedCheckout {
                    event_type,
                    session_id,
                    transaction_id,
                    amount_total: session.amount_total,
                    paid: session.payment_status == CheckoutSessionPaymentStatus::Paid,
                    method: "stripe_checkout".into(),
                    metadata: session.metadata.unwrap_or_default(),
                }))
            }
            _ => Ok(GatewayEvent::Ignored { event_type }),
        }
    }
}
