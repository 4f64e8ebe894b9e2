//! Consolidated billing draft for a whole batch.

use std::fmt;

use chrono::NaiveDate;
use commerce::{CommerceError, CommercePlatform};
use model::{
    BillingOrder, Customer, DeliveryMethod, DraftOrder, GiftBatch, LineItem, MailingAddress, Money,
    non_empty,
};
use tracing::info;

use crate::delivery_fee::DeliveryFeeTable;
use crate::line_items::{PricingContext, build_line_items, local_delivery_fee};
use crate::split_name;

pub const BILLING_TAGS: &str = "corporate-gift,parent-order";

/// Counts and fees of a batch, rendered into the draft's note only at the platform boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingSummary {
    pub recipient_count: usize,
    pub local_delivery: usize,
    pub shipping: usize,
    pub store_pickup: usize,
    pub total_delivery_fees: Money,
}

impl BillingSummary {
    /// Recipients without a delivery method count as shipping.
    pub fn from_batch(batch: &GiftBatch, fees: &DeliveryFeeTable) -> Self {
        batch
            .recipients
            .iter()
            .fold(Self::default(), |mut summary, recipient| {
                summary.recipient_count += 1;
                match recipient.delivery_method.unwrap_or(DeliveryMethod::Shipping) {
                    DeliveryMethod::LocalDelivery => summary.local_delivery += 1,
                    DeliveryMethod::Shipping => summary.shipping += 1,
                    DeliveryMethod::StorePickup => summary.store_pickup += 1,
                }
                if let Some(fee) = local_delivery_fee(recipient, fees) {
                    summary.total_delivery_fees += fee;
                }
                summary
            })
    }
}

/// The draft's free-text note: sender details, the summary and batch-wide extras.
pub struct BillingNote<'a> {
    pub batch: &'a GiftBatch,
    pub summary: &'a BillingSummary,
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

fn billing_address_line(batch: &GiftBatch) -> Option<String> {
    batch.sender.billing_address.as_ref().map(|a| {
        let unit = non_empty(&a.address2)
            .map(|unit| format!(", {unit}"))
            .unwrap_or_default();
        format!("{}{unit}, {}, {} {}", a.address1, a.city, a.state, a.zip)
    })
}

impl fmt::Display for BillingNote<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sender = &self.batch.sender;
        let summary = self.summary;
        writeln!(f, "Corporate Gift Order")?;
        writeln!(f, "Company: {}", or_na(non_empty(&sender.company)))?;
        writeln!(f, "Phone: {}", sender.phone)?;
        writeln!(
            f,
            "Billing Address: {}",
            or_na(billing_address_line(self.batch).as_deref())
        )?;
        writeln!(f)?;
        writeln!(f, "ORDER SUMMARY:")?;
        writeln!(f, "Total Recipients: {}", summary.recipient_count)?;
        writeln!(f, "- Local Delivery: {}", summary.local_delivery)?;
        writeln!(f, "- Shipping (UPS): {}", summary.shipping)?;
        writeln!(f, "- Store Pickup: {}", summary.store_pickup)?;
        write!(f, "Total Delivery Fees: ${}", summary.total_delivery_fees)?;
        if let Some(date) = self.batch.delivery_date {
            write!(f, "\n\n📅 Delivery Date: {}", iso_date(date))?;
        }
        if let Some(message) = non_empty(&self.batch.gift_message) {
            write!(f, "\n\n🎁 Gift Message: {message}")?;
        }
        if let Some(from) = non_empty(&sender.gift_from) {
            write!(f, "\n\nGift From: {from}")?;
        }
        write!(f, "\n\nThis is a parent draft order for payment collection.")
    }
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Builds the draft order and its summary without touching the platform.
pub fn build_draft_order(batch: &GiftBatch, fees: &DeliveryFeeTable) -> (DraftOrder, BillingSummary) {
    let line_items: Vec<LineItem> = batch
        .recipients
        .iter()
        .flat_map(|recipient| {
            build_line_items(recipient, fees, PricingContext::Billing).line_items
        })
        .collect();

    let summary = BillingSummary::from_batch(batch, fees);
    let sender = &batch.sender;
    let (first_name, last_name) = split_name(&sender.name);

    let billing_address = sender.billing_address.as_ref().map(|a| MailingAddress {
        first_name: first_name.clone(),
        last_name: last_name.clone(),
        company: non_empty(&sender.company).map(str::to_string),
        address1: a.address1.clone(),
        address2: non_empty(&a.address2).map(str::to_string),
        city: a.city.clone(),
        province: a.state.clone(),
        zip: a.zip.clone(),
        country: a.country.clone(),
        phone: Some(sender.phone.clone()),
    });

    let note = BillingNote {
        batch,
        summary: &summary,
    }
    .to_string();

    let draft = DraftOrder {
        line_items,
        customer: Customer {
            first_name,
            last_name,
            email: sender.email.clone(),
        },
        billing_address,
        note,
        tags: BILLING_TAGS.to_string(),
    };
    (draft, summary)
}

/// Creates the batch's single billing draft. Nothing is finalized or charged.
pub async fn create_billing_order<P>(
    platform: &P,
    batch: &GiftBatch,
    fees: &DeliveryFeeTable,
) -> Result<BillingOrder, CommerceError>
where
    P: CommercePlatform + ?Sized,
{
    let (draft, summary) = build_draft_order(batch, fees);
    let total: Money = draft.line_items.iter().map(|item| item.price).sum();

    let placed = platform.create_draft_order(&draft).await?;
    info!(
        billing_order_id = %placed.id,
        billing_order_number = %placed.number,
        recipients = summary.recipient_count,
        %total,
        "Billing draft created"
    );

    Ok(BillingOrder {
        id: placed.id,
        number: placed.number,
        total,
    })
}
