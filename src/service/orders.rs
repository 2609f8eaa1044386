use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::{
    app_error::AppError,
    middleware::Session,
    models::{CreateProductOrderEntity, ProductOrderEntity},
    service::{ClinicService, non_blank, require_admin},
    status::OrderStatus,
    store::{NotesUpdate, OrderQuery, OrderTransition},
};

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderReq {
    pub product_id: Option<i32>,
    pub quantity: Option<i32>,
    pub total_price: Option<f64>,
    #[schema(value_type = Object)]
    pub customizations: Option<Value>,
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
pub struct CancelOrderReq {
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusReq {
    pub status: Option<String>,
    pub admin_notes: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    /// One of the order statuses.
    pub status: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminOrderQuery {
    pub status: Option<String>,
    /// 1-based, defaults to 1.
    pub page: Option<i64>,
    /// Defaults to 10, capped at 100.
    pub limit: Option<i64>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderListRes {
    pub orders: Vec<ProductOrderEntity>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Serialize, Debug, PartialEq, ToSchema)]
pub struct OrderCountRes {
    /// Every status is present, zero when no order is in it.
    pub counts: BTreeMap<String, i64>,
    pub total: i64,
}

fn parse_status_filter(status: Option<&str>) -> Result<Option<OrderStatus>, AppError> {
    status
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<OrderStatus>()
                .map_err(|err| AppError::Validation(err.to_string()))
        })
        .transpose()
}

fn forbidden_order() -> AppError {
    AppError::Authorization("You can only manage your own orders".into())
}

impl ClinicService {
    pub async fn create_order(
        &self,
        session: Session,
        req: CreateOrderReq,
    ) -> Result<ProductOrderEntity, AppError> {
        let product_id = req
            .product_id
            .ok_or_else(|| AppError::Validation("productId is required".into()))?;

        let quantity = req.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(AppError::Validation("quantity must be at least 1".into()));
        }

        let total_price = req.total_price.unwrap_or(0.0);
        if !total_price.is_finite() || total_price < 0.0 {
            return Err(AppError::Validation(
                "totalPrice must be a non-negative amount".into(),
            ));
        }

        let customizations = match req.customizations {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(value @ Value::Object(_)) => value,
            Some(_) => {
                return Err(AppError::Validation(
                    "customizations must be a JSON object".into(),
                ));
            }
        };

        if self.store.find_product(product_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Product {product_id} not found")));
        }

        let order = self
            .store
            .create_order(CreateProductOrderEntity {
                user_id: session.user_id,
                product_id,
                quantity,
                total_price,
                customizations,
                status: OrderStatus::Pending,
            })
            .await?;

        tracing::info!(order_id = order.id, user_id = session.user_id, "Created order");

        Ok(order)
    }

    /// The caller's own orders, newest first.
    pub async fn list_my_orders(
        &self,
        session: Session,
        filter: OrderFilter,
    ) -> Result<Vec<ProductOrderEntity>, AppError> {
        let status = parse_status_filter(filter.status.as_deref())?;

        let page = self
            .store
            .list_orders(OrderQuery {
                user_id: Some(session.user_id),
                status,
                window: None,
            })
            .await?;

        Ok(page.orders)
    }

    pub async fn get_order(&self, session: Session, id: i32) -> Result<ProductOrderEntity, AppError> {
        match self.store.find_order(id).await? {
            Some(order) if session.is_admin() || order.user_id == session.user_id => Ok(order),
            None if session.is_admin() => Err(AppError::NotFound(format!("Order {id} not found"))),
            _ => Err(forbidden_order()),
        }
    }

    /// Requests cancellation on behalf of the owner (or an administrator).
    pub async fn cancel_order(
        &self,
        session: Session,
        id: i32,
        req: CancelOrderReq,
    ) -> Result<ProductOrderEntity, AppError> {
        let order = self.get_order(session, id).await?;
        let reason = non_blank(req.reason.as_deref(), "reason")?;

        if !order
            .status
            .can_transition_to(OrderStatus::CancellationRequested)
        {
            return Err(AppError::Conflict(format!(
                "Order is {} and cannot be cancelled",
                order.status
            )));
        }

        let updated = self
            .store
            .transition_order(OrderTransition {
                order_id: id,
                expected: order.status,
                next: OrderStatus::CancellationRequested,
                notes: NotesUpdate::Append(format!("Cancellation requested: {reason}")),
            })
            .await?;

        tracing::info!(order_id = id, user_id = session.user_id, "Order cancellation requested");

        Ok(updated)
    }

    pub async fn admin_list_orders(
        &self,
        session: Session,
        query: AdminOrderQuery,
    ) -> Result<OrderListRes, AppError> {
        require_admin(&session)?;

        let status = parse_status_filter(query.status.as_deref())?;
        let page = query.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".into()));
        }
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit < 1 {
            return Err(AppError::Validation("limit must be at least 1".into()));
        }
        let limit = limit.min(MAX_PAGE_LIMIT);

        let result = self
            .store
            .list_orders(OrderQuery {
                user_id: None,
                status,
                window: Some((limit, (page - 1).saturating_mul(limit))),
            })
            .await?;

        Ok(OrderListRes {
            total_pages: (result.total + limit - 1) / limit,
            orders: result.orders,
            total: result.total,
            page,
            limit,
        })
    }

    pub async fn admin_count_orders(&self, session: Session) -> Result<OrderCountRes, AppError> {
        require_admin(&session)?;

        let mut counts: BTreeMap<String, i64> = OrderStatus::ALL
            .iter()
            .map(|status| (status.to_string(), 0))
            .collect();

        for (status, count) in self.store.count_orders_by_status().await? {
            counts.insert(status.to_string(), count);
        }

        Ok(OrderCountRes {
            total: counts.values().sum(),
            counts,
        })
    }

    pub async fn update_order_status(
        &self,
        session: Session,
        id: i32,
        req: UpdateOrderStatusReq,
    ) -> Result<ProductOrderEntity, AppError> {
        require_admin(&session)?;

        let raw = non_blank(req.status.as_deref(), "status")?;
        let next = raw
            .parse::<OrderStatus>()
            .map_err(|err| AppError::Validation(err.to_string()))?;
        if !OrderStatus::ADMIN_TARGETS.contains(&next) {
            return Err(AppError::Validation(format!(
                "status must be one of approved, rejected or completed, got '{next}'"
            )));
        }

        let order = self
            .store
            .find_order(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))?;

        if !order.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Order cannot move from {} to {next}",
                order.status
            )));
        }

        let notes = match req.admin_notes {
            Some(notes) => NotesUpdate::Replace(notes),
            None => NotesUpdate::Keep,
        };

        let updated = self
            .store
            .transition_order(OrderTransition {
                order_id: id,
                expected: order.status,
                next,
                notes,
            })
            .await?;

        tracing::info!(order_id = id, from = %order.status, to = %next, "Order status updated");

        Ok(updated)
    }
}
