//! Note attributes attached to each fulfillment order.
//!
//! The fulfillment integration reads these by label and position, so both the
//! labels and their order are fixed. Optional values that are absent produce no
//! entry at all rather than an empty one.

use chrono::NaiveDate;
use model::{GiftBatch, LogoBar, NoteAttribute, RecipientSpec, non_empty};

pub const RECIPIENT_NAME: &str = "👤 Recipient Name";
pub const DELIVERY_ADDRESS: &str = "📍 Delivery Address";
pub const PHONE_NUMBER: &str = "📞 Phone Number";
pub const COMPANY: &str = "🏢 Company";
pub const DELIVERY_DATE: &str = "📅 Delivery Date";
pub const DELIVERY_DAY: &str = "Delivery Day";
pub const DELIVERY_METHOD: &str = "📦 Delivery method";
pub const GIFT_WRAP: &str = "Gift Wrap";
pub const GIFT_MESSAGE: &str = "🎁 Gift message";
pub const GIFT_SENDER: &str = "Gift Sender";
pub const GIFT_RECEIVER: &str = "Gift Receiver";
pub const PARENT_DRAFT_ORDER: &str = "Parent Draft Order";
pub const LOGO_BAR: &str = "🎨 Logo Bar";
pub const PRODUCT: &str = "💵 Product";

/// `Dec 25, 2025`. The date is a plain calendar date and is never shifted through a time zone.
pub fn format_delivery_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// `Thursday`.
pub fn format_delivery_day(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// `address1[, address2], city, state zip`.
pub fn format_address(recipient: &RecipientSpec) -> String {
    let address = &recipient.address;
    let unit = non_empty(&address.address2)
        .map(|unit| format!(", {unit}"))
        .unwrap_or_default();
    format!(
        "{}{unit}, {}, {} {}",
        address.address1, address.city, address.state, address.zip
    )
}

fn logo_bar_label(logo_bar: LogoBar) -> Option<&'static str> {
    match logo_bar {
        LogoBar::None => None,
        LogoBar::Small => Some("Small (+$8)"),
        LogoBar::Large => Some("Large (+$20)"),
    }
}

/// Builds the ordered annotation list for one recipient of `batch`.
pub fn build_note_attributes(
    batch: &GiftBatch,
    recipient: &RecipientSpec,
    billing_order_id: &str,
) -> Vec<NoteAttribute> {
    let sender = &batch.sender;
    let mut notes = Vec::with_capacity(14);

    notes.push(NoteAttribute::new(RECIPIENT_NAME, &recipient.name));
    notes.push(NoteAttribute::new(DELIVERY_ADDRESS, format_address(recipient)));

    if let Some(phone) = non_empty(&recipient.phone) {
        notes.push(NoteAttribute::new(PHONE_NUMBER, phone));
    }
    if let Some(company) = non_empty(&sender.company) {
        notes.push(NoteAttribute::new(COMPANY, company));
    }
    if let Some(date) = batch.delivery_date_for(recipient) {
        notes.push(NoteAttribute::new(DELIVERY_DATE, format_delivery_date(date)));
        notes.push(NoteAttribute::new(DELIVERY_DAY, format_delivery_day(date)));
    }
    if let Some(method) = recipient.delivery_method {
        notes.push(NoteAttribute::new(DELIVERY_METHOD, method.as_str()));
    }

    notes.push(NoteAttribute::new(GIFT_WRAP, "yes"));

    if let Some(message) = batch.gift_message_for(recipient) {
        notes.push(NoteAttribute::new(GIFT_MESSAGE, message));
    }
    if let Some(from) = non_empty(&sender.gift_from) {
        notes.push(NoteAttribute::new(GIFT_SENDER, from));
    }

    notes.push(NoteAttribute::new(GIFT_RECEIVER, &recipient.name));
    notes.push(NoteAttribute::new(PARENT_DRAFT_ORDER, billing_order_id));

    if let Some(label) = logo_bar_label(recipient.logo_bar) {
        notes.push(NoteAttribute::new(LOGO_BAR, label));
    }
    if let Some(product) = non_empty(&recipient.product_name) {
        notes.push(NoteAttribute::new(PRODUCT, product));
    }

    notes
}
