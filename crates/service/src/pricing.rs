//! Product pricing for the billing order.
//!
//! A recipient's product is priced from the catalog when its SKU is known.
//! Otherwise the price is recovered from the display name (`"... - $69"`),
//! and when that fails too the default basket price applies.

use std::sync::LazyLock;

use model::{Money, RecipientSpec};
use regex::Regex;

/// Price used when nothing better is known.
pub const DEFAULT_PRODUCT_PRICE: Money = Money::from_dollars(69);

/// Largest price accepted from a display name. Anything above is treated as unparseable.
pub const MAX_NAME_PRICE: Money = Money::from_dollars(10_000);

/// Line-item title used when the recipient has no product name.
pub const DEFAULT_PRODUCT_TITLE: &str = "Gift Basket";

static PRICE_IN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(\d+\.?\d*)").expect("price pattern is a valid regex")
});

/// A catalog entry. Vegan/Parve variants share the base SKU with a `-V` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogProduct {
    pub sku: &'static str,
    pub name: &'static str,
    pub price: Money,
}

const fn product(sku: &'static str, name: &'static str, dollars: i64) -> CatalogProduct {
    CatalogProduct {
        sku,
        name,
        price: Money::from_dollars(dollars),
    }
}

/// Holiday 2025 catalog.
pub const CATALOG: &[CatalogProduct] = &[
    product("TST-25-SP-PRETZOREO", "Holiday Chocolate-Dipped Pretzel & Oreo Tray - 10″ round - $39", 39),
    product("ST-25-CB-SMROUND", "Holiday Favorites Round Basket - 10″ round - $69", 69),
    product("ST-25-CB-MEDRECT", "Classic Holiday Round Basket - 12″ round - $89", 89),
    product("TST-25-SP-INDULGTRAY", "Holiday Indulgence Wood Tray - $109", 109),
    product("HOL25-OVAL-L60", "Grand Holiday Oval Basket - 15″ oval - $129", 129),
    product("ST-25-CB-XLARGE", "Deluxe Holiday Round Basket - 18″ round - $179", 179),
    product("ST-25-CB-GIANTOVAL", "Prestige Holiday Oval Basket - 20″ oval - $209", 209),
    product("ST-25-CB-JUMBRECT", "Premier Holiday Rectangle Basket - 24.5″ rectangle - $279", 269),
    product("ST-25-CB-PENULT", "Majestic Holiday Round Basket - 24″ round - $399", 399),
    product("ST-25-CB-SUPREME", "Supreme Holiday Round Basket - 30″ round - $629", 629),
    product("TST-25-SP-LOGOBOX", "Branded Holiday Oreo Box - $54", 54),
    product("TST-25-SP-RUGELLACH", "Sonny's Famous Chocolate Rugullach - $59 – Vegan/Parve", 59),
    product("ST-25-SP-TRUFFLE", "Holiday Signature Truffle Box - $69", 59),
    product("ST-25-SP-BAKERY", "Ultimate Holiday Bakery Tray - $149", 149),
];

/// Finds a catalog product by SKU, case-insensitively. `-V` variants resolve to their base.
pub fn find_by_sku(sku: &str) -> Option<&'static CatalogProduct> {
    let wanted = sku.trim().to_ascii_uppercase();
    let base = wanted.strip_suffix("-V").unwrap_or(&wanted);
    CATALOG.iter().find(|p| p.sku == base)
}

/// Recovers a price from a display name such as `"Holiday Basket ($69.00)"`.
///
/// Names without a parseable `$amount`, or with one above [`MAX_NAME_PRICE`],
/// fall back to [`DEFAULT_PRODUCT_PRICE`].
pub fn product_name_to_price(display_name: &str) -> Money {
    PRICE_IN_NAME
        .captures(display_name)
        .and_then(|caps| caps.get(1))
        .and_then(|amount| amount.as_str().parse::<Money>().ok())
        .filter(|price| *price <= MAX_NAME_PRICE)
        .unwrap_or(DEFAULT_PRODUCT_PRICE)
}

/// Billing price of the recipient's product.
pub fn price_for(recipient: &RecipientSpec) -> Money {
    if let Some(found) = recipient.product_sku.as_deref().and_then(find_by_sku) {
        return found.price;
    }
    recipient
        .product_name
        .as_deref()
        .map(product_name_to_price)
        .unwrap_or(DEFAULT_PRODUCT_PRICE)
}

/// Title for the product line item.
pub fn product_title(recipient: &RecipientSpec) -> &str {
    model::non_empty(&recipient.product_name).unwrap_or(DEFAULT_PRODUCT_TITLE)
}
