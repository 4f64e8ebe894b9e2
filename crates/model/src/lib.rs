//! Domain and wire types shared by every crate of the gift-ordering backend.
//!
//! The batch types ([`GiftBatch`], [`Sender`], [`RecipientSpec`]) describe what the
//! request layer hands to the order service. The wire types ([`DraftOrder`],
//! [`OrderInput`] and friends) describe what is sent to the commerce platform.
//! The result types ([`SubmissionResult`], [`RecipientOutcome`]) describe what
//! comes back to the caller.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Money: an amount in cents, rendered as `D.CC` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Money(dollars * 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Error returned when a string is not a valid dollar amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoneyError(String);

impl fmt::Display for ParseMoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid amount '{}'", self.0)
    }
}

impl std::error::Error for ParseMoneyError {}

impl FromStr for Money {
    type Err = ParseMoneyError;

    /// Accepts `69`, `69.`, `69.5` and `69.00`. More than two decimals is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMoneyError(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        if whole.is_empty()
            || frac.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }
        let dollars: i64 = whole.parse().map_err(|_| err())?;
        let cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac.parse().map_err(|_| err())?,
        };
        dollars
            .checked_mul(100)
            .and_then(|d| d.checked_add(cents))
            .map(Money)
            .ok_or_else(err)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

// --- Batch input ---

/// PostalAddress: a street address as entered for a sender or recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostalAddress {
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "US".to_string()
}

/// Sender: the person (and company) paying for the batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sender {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub billing_address: Option<PostalAddress>,
    /// Label printed on gift cards as the sender ("Gift Sender").
    #[serde(default)]
    pub gift_from: Option<String>,
}

/// DeliveryMethod: how a single gift reaches its recipient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    LocalDelivery,
    Shipping,
    StorePickup,
}

impl DeliveryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMethod::LocalDelivery => "local_delivery",
            DeliveryMethod::Shipping => "shipping",
            DeliveryMethod::StorePickup => "store_pickup",
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LogoBar: optional branded chocolate bar added to a gift.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogoBar {
    #[default]
    None,
    Small,
    Large,
}

/// RecipientSpec: one gift within a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientSpec {
    /// Caller-supplied identifier used to correlate outcomes with stored recipients.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub address: PostalAddress,
    #[serde(default)]
    pub product_name: Option<String>,
    /// Catalog identifier (SKU) of the selected product, when known.
    #[serde(default)]
    pub product_sku: Option<String>,
    /// Overrides the batch-wide gift message.
    #[serde(default)]
    pub gift_message: Option<String>,
    #[serde(default)]
    pub delivery_method: Option<DeliveryMethod>,
    /// Overrides the batch-wide delivery date.
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub logo_bar: LogoBar,
}

/// GiftBatch: one sender's submission covering many recipients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GiftBatch {
    pub sender: Sender,
    #[serde(default)]
    pub gift_message: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    pub recipients: Vec<RecipientSpec>,
}

impl GiftBatch {
    /// Recipient override first, then the batch message. Empty strings count as absent.
    pub fn gift_message_for<'a>(&'a self, recipient: &'a RecipientSpec) -> Option<&'a str> {
        non_empty(&recipient.gift_message).or_else(|| non_empty(&self.gift_message))
    }

    pub fn delivery_date_for(&self, recipient: &RecipientSpec) -> Option<NaiveDate> {
        recipient.delivery_date.or(self.delivery_date)
    }
}

/// Returns the contained string unless it is missing or empty.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// --- Commerce platform wire types ---

/// LineItem: a priced line on a draft or regular order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub title: String,
    pub quantity: u32,
    pub price: Money,
}

impl LineItem {
    pub fn single(title: impl Into<String>, price: Money) -> Self {
        Self {
            title: title.into(),
            quantity: 1,
            price,
        }
    }
}

/// ShippingLine: routing descriptor telling fulfillment how the order leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingLine {
    pub code: String,
    pub title: String,
    pub price: Money,
}

/// NoteAttribute: a labelled annotation read by the downstream fulfillment system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteAttribute {
    pub name: String,
    pub value: String,
}

impl NoteAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// MailingAddress: address in the shape the commerce platform expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailingAddress {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub province: String,
    pub zip: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// DraftOrder: a non-finalized order used to collect payment later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftOrder {
    pub line_items: Vec<LineItem>,
    pub customer: Customer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<MailingAddress>,
    pub note: String,
    pub tags: String,
}

/// OrderInput: a finalized order created for fulfillment tracking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderInput {
    pub line_items: Vec<LineItem>,
    pub customer: Customer,
    pub shipping_address: MailingAddress,
    pub shipping_line: ShippingLine,
    pub note: String,
    pub note_attributes: Vec<NoteAttribute>,
    pub tags: String,
    pub financial_status: String,
    pub send_receipt: bool,
    pub send_fulfillment_receipt: bool,
}

/// PlacedOrder: identifiers the commerce platform assigned to a created order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: String,
    pub number: String,
}

// --- Submission results ---

/// BillingOrder: the single consolidated draft created for a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillingOrder {
    pub id: String,
    pub number: String,
    pub total: Money,
}

/// FulfillmentOrder: the zero-priced order created for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FulfillmentOrder {
    pub id: String,
    pub number: String,
    pub recipient_id: String,
    pub billing_order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FulfillmentFailure {
    pub recipient_id: String,
    pub reason: String,
}

/// RecipientOutcome: what happened to one recipient of the batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecipientOutcome {
    Confirmed(FulfillmentOrder),
    Failed(FulfillmentFailure),
}

impl RecipientOutcome {
    pub fn recipient_id(&self) -> &str {
        match self {
            RecipientOutcome::Confirmed(order) => &order.recipient_id,
            RecipientOutcome::Failed(failure) => &failure.recipient_id,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, RecipientOutcome::Confirmed(_))
    }
}

impl From<Result<FulfillmentOrder, FulfillmentFailure>> for RecipientOutcome {
    fn from(result: Result<FulfillmentOrder, FulfillmentFailure>) -> Self {
        match result {
            Ok(order) => RecipientOutcome::Confirmed(order),
            Err(failure) => RecipientOutcome::Failed(failure),
        }
    }
}

/// SubmissionResult: billing order plus one outcome per input recipient, in input order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionResult {
    pub billing_order: BillingOrder,
    pub outcomes: Vec<RecipientOutcome>,
}

impl SubmissionResult {
    pub fn confirmed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_confirmed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.confirmed_count()
    }

    /// Human-readable partial-success line, e.g. `2 of 3 recipients confirmed`.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} recipients confirmed",
            self.confirmed_count(),
            self.outcomes.len()
        )
    }
}
