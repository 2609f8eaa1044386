use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    middleware::Session,
    models::CartItemEntity,
    service::ClinicService,
    store::NewCartItem,
};

#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct CartItemReq {
    /// Product id.
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub image: Option<String>,
    pub option: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
pub struct ReplaceCartReq {
    #[schema(value_type = Vec<CartItemReq>)]
    pub cart: Option<Value>,
}

impl TryFrom<CartItemReq> for NewCartItem {
    type Error = String;

    fn try_from(item: CartItemReq) -> Result<Self, Self::Error> {
        let name = item.name.trim();
        if name.is_empty() {
            return Err("name is required".into());
        }
        if !item.price.is_finite() || item.price < 0.0 {
            return Err("price must be a non-negative amount".into());
        }
        if item.quantity < 1 {
            return Err("quantity must be at least 1".into());
        }

        Ok(NewCartItem {
            product_id: item.id,
            name: name.to_string(),
            price: item.price,
            quantity: item.quantity,
            image: item.image,
            option: item.option,
        })
    }
}

fn parse_cart(cart: Option<Value>) -> Result<Vec<NewCartItem>, AppError> {
    let Some(Value::Array(entries)) = cart else {
        return Err(AppError::Validation("cart must be an array".into()));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            serde_json::from_value::<CartItemReq>(entry)
                .map_err(|err| err.to_string())
                .and_then(NewCartItem::try_from)
                .map_err(|reason| AppError::Validation(format!("cart[{i}]: {reason}")))
        })
        .collect()
}

impl ClinicService {
    /// Current cart snapshot. Reading never creates the cart.
    pub async fn get_cart(&self, session: Session) -> Result<Vec<CartItemEntity>, AppError> {
        Ok(self.store.load_cart(session.user_id).await?)
    }

    /// Replaces the caller's cart with the submitted items.
    pub async fn replace_cart(
        &self,
        session: Session,
        req: ReplaceCartReq,
    ) -> Result<Vec<CartItemEntity>, AppError> {
        let items = parse_cart(req.cart)?;
        let saved = self.store.replace_cart(session.user_id, items).await?;

        tracing::debug!(user_id = session.user_id, items = saved.len(), "Replaced cart");

        Ok(saved)
    }
}
