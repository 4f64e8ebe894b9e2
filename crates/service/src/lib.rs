//! Business logic layer for gift-batch submission.
//!
//! This module defines the [`GiftOrderService`] trait and its async implementation
//! [`GiftOrderServiceImpl`]. A submission creates one billing draft for the whole
//! batch and then one zero-priced fulfillment order per recipient.
//!
//! # Features
//! - A billing failure aborts the batch before any fulfillment order is attempted.
//! - Fulfillment orders are created sequentially, in input order.
//! - A failed recipient becomes a failure outcome; the batch carries on.
//! - Dependency injection of the [`CommercePlatform`] for testability.

pub mod billing;
pub mod delivery_fee;
pub mod dispatch;
pub mod line_items;
pub mod notes;
pub mod pricing;

use std::collections::HashSet;

use async_trait::async_trait;
use commerce::{CommerceError, CommercePlatform};
use model::{GiftBatch, SubmissionResult};
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use delivery_fee::DeliveryFeeTable;

/// The main error type for [`GiftOrderService`]. Only batch-level failures are errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The batch violates a precondition (e.g. no recipients).
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),
    /// The billing draft could not be created; no fulfillment order was attempted.
    #[error("Billing order failed: {0}")]
    Billing(#[from] CommerceError),
}

/// Trait describing the batch submission operation.
#[async_trait]
pub trait GiftOrderService: Send + Sync {
    /// Creates the billing draft and the per-recipient fulfillment orders.
    ///
    /// # Errors
    /// Returns [`ServiceError::InvalidBatch`] if validation fails and
    /// [`ServiceError::Billing`] if the billing draft cannot be created.
    /// Per-recipient failures are reported inside the [`SubmissionResult`].
    async fn submit(&self, batch: &GiftBatch) -> Result<SubmissionResult, ServiceError>;
}

/// Async implementation of [`GiftOrderService`] over a [`CommercePlatform`].
pub struct GiftOrderServiceImpl<P> {
    platform: P,
    fees: DeliveryFeeTable,
}

impl<P> GiftOrderServiceImpl<P>
where
    P: CommercePlatform,
{
    /// Constructs a new [`GiftOrderServiceImpl`].
    ///
    /// # Arguments
    /// * `platform` - The commerce platform client.
    /// * `fees` - Delivery-fee table shared by billing and fulfillment.
    pub fn new(platform: P, fees: DeliveryFeeTable) -> Self {
        Self { platform, fees }
    }

    /// Rejects batches that cannot be correlated back to their recipients.
    fn validate_batch(&self, batch: &GiftBatch) -> Result<(), ServiceError> {
        if batch.recipients.is_empty() {
            return Err(ServiceError::InvalidBatch("batch has no recipients".into()));
        }
        let mut seen = HashSet::with_capacity(batch.recipients.len());
        for recipient in &batch.recipients {
            if recipient.id.is_empty() {
                return Err(ServiceError::InvalidBatch("recipient id is empty".into()));
            }
            if !seen.insert(recipient.id.as_str()) {
                return Err(ServiceError::InvalidBatch(format!(
                    "duplicate recipient id '{}'",
                    recipient.id
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<P> GiftOrderService for GiftOrderServiceImpl<P>
where
    P: CommercePlatform,
{
    #[instrument(skip_all, fields(recipients = batch.recipients.len()))]
    async fn submit(&self, batch: &GiftBatch) -> Result<SubmissionResult, ServiceError> {
        self.validate_batch(batch)?;

        let billing_order =
            billing::create_billing_order(&self.platform, batch, &self.fees).await?;
        let outcomes =
            dispatch::dispatch_all(&self.platform, batch, &billing_order.id, &self.fees).await;

        let result = SubmissionResult {
            billing_order,
            outcomes,
        };
        if result.failed_count() > 0 {
            warn!(billing_order_id = %result.billing_order.id, "{}", result.summary());
        } else {
            info!(billing_order_id = %result.billing_order.id, "{}", result.summary());
        }
        Ok(result)
    }
}

/// Splits a full name into first name and the rest.
pub(crate) fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_items::is_delivery_fee;
    use crate::test_support::{batch, recipient};
    use commerce::MockCommercePlatform;
    use model::{DeliveryMethod, DraftOrder, Money, OrderInput, PlacedOrder, RecipientOutcome};
    use std::sync::{Arc, Mutex};

    fn placed(id: &str, number: &str) -> PlacedOrder {
        PlacedOrder {
            id: id.to_string(),
            number: number.to_string(),
        }
    }

    fn three_recipients() -> GiftBatch {
        let mut a = recipient("r-1", "33139");
        a.delivery_method = Some(DeliveryMethod::LocalDelivery);
        let mut b = recipient("r-2", "33132");
        b.delivery_method = Some(DeliveryMethod::LocalDelivery);
        let mut c = recipient("r-3", "10001");
        c.delivery_method = Some(DeliveryMethod::LocalDelivery);
        batch(vec![a, b, c])
    }

    #[tokio::test]
    async fn test_submit_creates_billing_then_fulfillment_in_order() {
        let mut platform = MockCommercePlatform::new();
        platform
            .expect_create_draft_order()
            .times(1)
            .returning(|_| Ok(placed("900", "#D12")));
        let counter = Arc::new(Mutex::new(0u32));
        let calls = counter.clone();
        platform
            .expect_create_order()
            .times(3)
            .returning(move |order: &OrderInput| {
                assert!(order.tags.contains("parent-draft-900"));
                let mut n = calls.lock().unwrap();
                *n += 1;
                Ok(placed(&format!("50{n}"), &format!("#100{n}")))
            });

        let service = GiftOrderServiceImpl::new(platform, DeliveryFeeTable::standard());
        let result = service.submit(&three_recipients()).await.unwrap();

        assert_eq!(result.billing_order.id, "900");
        assert_eq!(result.billing_order.number, "#D12");
        let ids: Vec<&str> = result.outcomes.iter().map(|o| o.recipient_id()).collect();
        assert_eq!(ids, vec!["r-1", "r-2", "r-3"]);
        match &result.outcomes[2] {
            RecipientOutcome::Confirmed(order) => {
                assert_eq!(order.id, "503");
                assert_eq!(order.billing_order_id, "900");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(result.summary(), "3 of 3 recipients confirmed");
    }

    #[tokio::test]
    async fn test_billing_failure_aborts_before_any_fulfillment() {
        let mut platform = MockCommercePlatform::new();
        platform.expect_create_draft_order().times(1).returning(|_| {
            Err(CommerceError::Api {
                status: 503,
                body: "unavailable".into(),
            })
        });
        platform.expect_create_order().times(0);

        let service = GiftOrderServiceImpl::new(platform, DeliveryFeeTable::standard());
        let err = service.submit(&three_recipients()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Billing(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_recipient_failure_is_isolated() {
        let mut platform = MockCommercePlatform::new();
        platform
            .expect_create_draft_order()
            .returning(|_| Ok(placed("900", "#D12")));
        let counter = Arc::new(Mutex::new(0u32));
        let calls = counter.clone();
        platform
            .expect_create_order()
            .times(3)
            .returning(move |_: &OrderInput| {
                let mut n = calls.lock().unwrap();
                *n += 1;
                if *n == 2 {
                    Err(CommerceError::Api {
                        status: 422,
                        body: "zip is invalid".into(),
                    })
                } else {
                    Ok(placed(&format!("50{n}"), &format!("#100{n}")))
                }
            });

        let service = GiftOrderServiceImpl::new(platform, DeliveryFeeTable::standard());
        let result = service.submit(&three_recipients()).await.unwrap();

        assert_eq!(result.outcomes.len(), 3);
        assert!(result.outcomes[0].is_confirmed());
        assert!(result.outcomes[2].is_confirmed());
        match &result.outcomes[1] {
            RecipientOutcome::Failed(failure) => {
                assert_eq!(failure.recipient_id, "r-2");
                assert!(failure.reason.contains("zip is invalid"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(result.summary(), "2 of 3 recipients confirmed");
        assert_eq!(*counter.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_every_fulfillment_failing_still_reports_each_recipient() {
        let mut platform = MockCommercePlatform::new();
        platform
            .expect_create_draft_order()
            .returning(|_| Ok(placed("900", "#D12")));
        platform.expect_create_order().times(3).returning(|_| {
            Err(CommerceError::Decode("missing order".into()))
        });

        let service = GiftOrderServiceImpl::new(platform, DeliveryFeeTable::standard());
        let result = service.submit(&three_recipients()).await.unwrap();
        assert_eq!(result.confirmed_count(), 0);
        let ids: Vec<&str> = result.outcomes.iter().map(|o| o.recipient_id()).collect();
        assert_eq!(ids, vec!["r-1", "r-2", "r-3"]);
    }

    #[tokio::test]
    async fn test_billed_fees_match_fulfillment_fees() {
        let drafts: Arc<Mutex<Vec<DraftOrder>>> = Arc::default();
        let orders: Arc<Mutex<Vec<OrderInput>>> = Arc::default();

        let mut platform = MockCommercePlatform::new();
        let captured_drafts = drafts.clone();
        platform
            .expect_create_draft_order()
            .returning(move |draft: &DraftOrder| {
                captured_drafts.lock().unwrap().push(draft.clone());
                Ok(placed("900", "#D12"))
            });
        let captured_orders = orders.clone();
        platform
            .expect_create_order()
            .returning(move |order: &OrderInput| {
                captured_orders.lock().unwrap().push(order.clone());
                Ok(placed("501", "#1001"))
            });

        let service = GiftOrderServiceImpl::new(platform, DeliveryFeeTable::standard());
        service.submit(&three_recipients()).await.unwrap();

        let billed: Money = drafts.lock().unwrap()[0]
            .line_items
            .iter()
            .filter(|i| is_delivery_fee(i))
            .map(|i| i.price)
            .sum();
        let fulfilled: Money = orders
            .lock()
            .unwrap()
            .iter()
            .flat_map(|o| o.line_items.iter())
            .filter(|i| is_delivery_fee(i))
            .map(|i| i.price)
            .sum();
        assert_eq!(billed, Money::from_dollars(45));
        assert_eq!(billed, fulfilled);

        // The out-of-table recipient carries no fee line on its fulfillment order.
        let orders = orders.lock().unwrap();
        assert!(!orders[2].line_items.iter().any(is_delivery_fee));
    }

    #[tokio::test]
    async fn test_huge_display_prices_bill_at_default() {
        let mut platform = MockCommercePlatform::new();
        platform
            .expect_create_draft_order()
            .times(1)
            .returning(|_| Ok(placed("900", "#D12")));
        platform
            .expect_create_order()
            .times(2)
            .returning(|_| Ok(placed("501", "#1001")));

        let mut a = recipient("r-1", "10001");
        a.product_name = Some("Gold Basket - $90000000000000000".into());
        let mut b = recipient("r-2", "10001");
        b.product_name = Some("Gold Basket - $90000000000000000".into());

        let service = GiftOrderServiceImpl::new(platform, DeliveryFeeTable::standard());
        let result = service.submit(&batch(vec![a, b])).await.unwrap();
        assert_eq!(result.billing_order.total, Money::from_dollars(138));
        assert_eq!(result.confirmed_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected_without_calls() {
        let mut platform = MockCommercePlatform::new();
        platform.expect_create_draft_order().times(0);
        platform.expect_create_order().times(0);

        let service = GiftOrderServiceImpl::new(platform, DeliveryFeeTable::standard());
        let err = service.submit(&batch(Vec::new())).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBatch(_)));
    }

    #[tokio::test]
    async fn test_duplicate_recipient_ids_are_rejected() {
        let mut platform = MockCommercePlatform::new();
        platform.expect_create_draft_order().times(0);

        let service = GiftOrderServiceImpl::new(platform, DeliveryFeeTable::standard());
        let dup = batch(vec![recipient("r-1", "33132"), recipient("r-1", "33139")]);
        let err = service.submit(&dup).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid batch: duplicate recipient id 'r-1'");
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Dana Cole"), ("Dana".into(), "Cole".into()));
        assert_eq!(
            split_name("Mary  Ann van Dyke"),
            ("Mary".into(), "Ann van Dyke".into())
        );
        assert_eq!(split_name("Cher"), ("Cher".into(), String::new()));
        assert_eq!(split_name(""), (String::new(), String::new()));
    }
}
