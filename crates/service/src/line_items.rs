//! Priced line items and the shipping line for one recipient.

use model::{DeliveryMethod, LineItem, LogoBar, Money, RecipientSpec, ShippingLine};

use crate::delivery_fee::DeliveryFeeTable;
use crate::pricing::{price_for, product_title};

/// Which order the line items are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingContext {
    /// The consolidated draft the sender pays.
    Billing,
    /// The zero-priced per-recipient order read by the warehouse.
    Fulfillment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemSet {
    pub line_items: Vec<LineItem>,
    pub shipping_line: ShippingLine,
}

/// Fixed add-on price of a logo bar, `None` when not selected.
pub fn logo_bar_price(logo_bar: LogoBar) -> Option<Money> {
    match logo_bar {
        LogoBar::None => None,
        LogoBar::Small => Some(Money::from_dollars(8)),
        LogoBar::Large => Some(Money::from_dollars(20)),
    }
}

fn logo_bar_title(logo_bar: LogoBar) -> Option<&'static str> {
    match logo_bar {
        LogoBar::None => None,
        LogoBar::Small => Some("Logo Chocolate Bar - Small"),
        LogoBar::Large => Some("Logo Chocolate Bar - Large"),
    }
}

/// Fee charged for the recipient, only for local delivery to a known postal code.
pub fn local_delivery_fee(recipient: &RecipientSpec, fees: &DeliveryFeeTable) -> Option<Money> {
    match recipient.delivery_method {
        Some(DeliveryMethod::LocalDelivery) => fees.resolve(&recipient.address.zip),
        _ => None,
    }
}

/// Maps the delivery method to the shipping line. Unset means shipping.
pub fn shipping_line_for(method: Option<DeliveryMethod>) -> ShippingLine {
    let (code, title) = match method {
        Some(DeliveryMethod::LocalDelivery) => ("LOCAL_DELIVERY", "Local delivery"),
        Some(DeliveryMethod::StorePickup) => ("PICKUP", "In-Store Pickup"),
        Some(DeliveryMethod::Shipping) | None => ("SHIPPING", "Shipping"),
    };
    ShippingLine {
        code: code.to_string(),
        title: title.to_string(),
        price: Money::ZERO,
    }
}

/// Builds the line items for one recipient.
///
/// Billing: the product at its price plus the local-delivery fee.
/// Fulfillment: the product at zero, the logo bar at its fixed price and the
/// local-delivery fee at its real amount.
pub fn build_line_items(
    recipient: &RecipientSpec,
    fees: &DeliveryFeeTable,
    context: PricingContext,
) -> LineItemSet {
    let title = product_title(recipient);
    let zip = &recipient.address.zip;
    let fee = local_delivery_fee(recipient, fees);

    let mut line_items = Vec::with_capacity(3);
    match context {
        PricingContext::Billing => {
            line_items.push(LineItem::single(title, price_for(recipient)));
            if let Some(fee) = fee {
                line_items.push(LineItem::single(format!("Local Delivery - {zip}"), fee));
            }
        }
        PricingContext::Fulfillment => {
            line_items.push(LineItem::single(title, Money::ZERO));
            if let (Some(bar_title), Some(bar_price)) = (
                logo_bar_title(recipient.logo_bar),
                logo_bar_price(recipient.logo_bar),
            ) {
                line_items.push(LineItem::single(bar_title, bar_price));
            }
            if let Some(fee) = fee {
                line_items.push(LineItem::single(format!("Local Delivery Fee - {zip}"), fee));
            }
        }
    }

    LineItemSet {
        line_items,
        shipping_line: shipping_line_for(recipient.delivery_method),
    }
}

/// True for the delivery-fee line of either context.
pub fn is_delivery_fee(item: &LineItem) -> bool {
    item.title.starts_with("Local Delivery - ") || item.title.starts_with("Local Delivery Fee - ")
}
