use std::collections::HashMap;

use crate::gateway::{
    CompletedCheckout, GatewayError, GatewayEvent, GatewaySession, MockPaymentGateway,
    ORDER_DETAILS_KEY, OrderDetails,
};

pub const VALID_SIGNATURE: &str = "t=1,v1=valid";

pub fn completed(
    session_id: &str,
    transaction_id: &str,
    amount_total: i64,
    details: &OrderDetails,
) -> CompletedCheckout {
    CompletedCheckout {
        event_type: "checkout.session.completed".into(),
        session_id: session_id.into(),
        transaction_id: transaction_id.into(),
        amount_total: Some(amount_total),
        paid: true,
        method: "stripe_checkout".into(),
        metadata: HashMap::from([(
            ORDER_DETAILS_KEY.to_string(),
            serde_json::to_string(details).unwrap(),
        )]),
    }
}

/// Accepts `payload` signed with [`VALID_SIGNATURE`] as `event` and rejects
/// every other signature.
pub fn expect_event(gateway: &mut MockPaymentGateway, payload: &str, event: GatewayEvent) {
    let signed = payload.to_string();
    gateway
        .expect_construct_event()
        .withf(move |payload, signature| payload == signed && signature == VALID_SIGNATURE)
        .returning(move |_, _| Ok(event.clone()));

    gateway
        .expect_construct_event()
        .withf(|_, signature| signature != VALID_SIGNATURE)
        .returning(|_, _| Err(GatewayError::InvalidSignature("signature mismatch".into())));
}

pub fn hosted(id: &str) -> GatewaySession {
    GatewaySession {
        id: id.into(),
        url: Some(format!("https://checkout.test/{id}")),
    }
}
