//! Per-recipient fulfillment orders.
//!
//! Recipients are processed strictly one after another. A failed recipient is
//! recorded and the next one is attempted; nothing already created is undone.

use commerce::{CommerceError, CommercePlatform};
use futures::stream::{self, StreamExt};
use model::{
    Customer, FulfillmentFailure, FulfillmentOrder, GiftBatch, MailingAddress, OrderInput,
    RecipientOutcome, RecipientSpec, non_empty,
};
use tracing::{error, info};

use crate::delivery_fee::DeliveryFeeTable;
use crate::line_items::{PricingContext, build_line_items};
use crate::notes::build_note_attributes;
use crate::split_name;

/// Tags linking a fulfillment order to its billing draft and delivery method.
pub fn fulfillment_tags(recipient: &RecipientSpec, billing_order_id: &str) -> String {
    let method = recipient
        .delivery_method
        .map(|m| m.as_str())
        .unwrap_or("shipping");
    format!("corporate-gift,child-order,parent-draft-{billing_order_id},delivery:{method}")
}

/// Builds the zero-priced, already-paid order for one recipient.
pub fn build_fulfillment_order(
    batch: &GiftBatch,
    recipient: &RecipientSpec,
    billing_order_id: &str,
    fees: &DeliveryFeeTable,
) -> OrderInput {
    let items = build_line_items(recipient, fees, PricingContext::Fulfillment);
    let (first_name, last_name) = split_name(&recipient.name);
    let address = &recipient.address;

    OrderInput {
        line_items: items.line_items,
        customer: Customer {
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            email: recipient.email.clone().unwrap_or_default(),
        },
        shipping_address: MailingAddress {
            first_name,
            last_name,
            company: non_empty(&batch.sender.company).map(str::to_string),
            address1: address.address1.clone(),
            address2: non_empty(&address.address2).map(str::to_string),
            city: address.city.clone(),
            province: address.state.clone(),
            zip: address.zip.clone(),
            country: address.country.clone(),
            phone: non_empty(&recipient.phone).map(str::to_string),
        },
        shipping_line: items.shipping_line,
        note: batch
            .gift_message_for(recipient)
            .unwrap_or_default()
            .to_string(),
        note_attributes: build_note_attributes(batch, recipient, billing_order_id),
        tags: fulfillment_tags(recipient, billing_order_id),
        financial_status: "paid".to_string(),
        send_receipt: false,
        send_fulfillment_receipt: false,
    }
}

/// Creates the fulfillment order of a single recipient.
pub async fn dispatch_one<P>(
    platform: &P,
    batch: &GiftBatch,
    recipient: &RecipientSpec,
    billing_order_id: &str,
    fees: &DeliveryFeeTable,
) -> Result<FulfillmentOrder, FulfillmentFailure>
where
    P: CommercePlatform + ?Sized,
{
    let order = build_fulfillment_order(batch, recipient, billing_order_id, fees);
    match platform.create_order(&order).await {
        Ok(placed) => {
            info!(
                recipient_id = %recipient.id,
                order_id = %placed.id,
                order_number = %placed.number,
                "Fulfillment order created"
            );
            Ok(FulfillmentOrder {
                id: placed.id,
                number: placed.number,
                recipient_id: recipient.id.clone(),
                billing_order_id: billing_order_id.to_string(),
            })
        }
        Err(err) => Err(failure(recipient, err)),
    }
}

fn failure(recipient: &RecipientSpec, err: CommerceError) -> FulfillmentFailure {
    error!(recipient_id = %recipient.id, error = %err, "Failed to create fulfillment order");
    FulfillmentFailure {
        recipient_id: recipient.id.clone(),
        reason: err.to_string(),
    }
}

/// Dispatches every recipient in input order and returns exactly one outcome per recipient.
pub async fn dispatch_all<P>(
    platform: &P,
    batch: &GiftBatch,
    billing_order_id: &str,
    fees: &DeliveryFeeTable,
) -> Vec<RecipientOutcome>
where
    P: CommercePlatform + ?Sized,
{
    stream::iter(&batch.recipients)
        .then(|recipient| dispatch_one(platform, batch, recipient, billing_order_id, fees))
        .map(RecipientOutcome::from)
        .collect()
        .await
}
