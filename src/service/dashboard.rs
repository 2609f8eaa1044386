use crate::{
    app_error::AppError,
    middleware::Session,
    service::{ClinicService, require_admin},
    status::OrderStatus,
    store::DashboardStats,
};

impl ClinicService {
    pub async fn dashboard_stats(&self, session: Session) -> Result<DashboardStats, AppError> {
        require_admin(&session)?;

        let total_patients = self.store.count_patients().await?;
        let (total_appointments, appointments_awaiting_payment) =
            self.store.count_appointments().await?;
        let order_counts = self.store.count_orders_by_status().await?;
        let total_revenue = self.store.total_revenue().await?;

        Ok(DashboardStats {
            total_patients,
            total_appointments,
            appointments_awaiting_payment,
            total_orders: order_counts.iter().map(|(_, count)| count).sum(),
            pending_orders: order_counts
                .iter()
                .filter(|(status, _)| *status == OrderStatus::Pending)
                .map(|(_, count)| count)
                .sum(),
            total_revenue,
        })
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;
    use crate::service::{
        orders::CreateOrderReq,
        testing::{ADMIN, ALICE, Fixture},
    };

    #[tokio::test]
    async fn stats_are_admin_only_and_aggregate_the_store() -> TestResult {
        let fx = Fixture::new();
        fx.store.insert_patient(ALICE.user_id, "Alice").await;
        fx.store.insert_product(7, "Foam roller", 25.0).await;
        fx.service
            .create_order(
                ALICE,
                CreateOrderReq {
                    product_id: Some(7),
                    ..Default::default()
                },
            )
            .await?;

        let err = fx.service.dashboard_stats(ALICE).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let stats = fx.service.dashboard_stats(ADMIN).await?;
        assert_eq!(
            stats,
            DashboardStats {
                total_patients: 1,
                total_orders: 1,
                pending_orders: 1,
                ..Default::default()
            }
        );
        Ok(())
    }
}
