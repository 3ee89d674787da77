//! Order records and intake validation.
//!
//! `NewOrder` is the raw intake form, `OrderDraft` is what survives
//! validation, and `Order` is the stored record. Edits are expressed as an
//! `OrderPatch`, which can never touch the status or the creation date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::city::{City, UnknownCity};
use super::id::OrderId;
use super::price::{MAX_QUANTITY, Price};
use super::product::{ProductKind, UnknownProductKind};
use super::status::OrderStatus;

/// Errors raised while validating intake or edit input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The customer name is blank.
    #[error("name cannot be empty")]
    EmptyName,
    /// The unit price is negative or above the maximum.
    #[error("price {0} is out of range (0 to 500000)")]
    PriceOutOfRange(Decimal),
    /// The quantity is above the maximum.
    #[error("quantity {0} is out of range (0 to {MAX_QUANTITY})")]
    QuantityOutOfRange(i64),
    /// A numeric field could not be parsed.
    #[error("{field} is not a number: {value}")]
    InvalidNumber {
        /// Form field name.
        field: &'static str,
        /// Raw input.
        value: String,
    },
    /// Unknown city.
    #[error(transparent)]
    City(#[from] UnknownCity),
    /// Unknown product kind.
    #[error(transparent)]
    Kind(#[from] UnknownProductKind),
}

/// A stored order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Stable identifier.
    pub id: OrderId,
    /// Customer name.
    pub name: String,
    /// Customer phone number (free text).
    pub phone: String,
    /// Delivery city.
    pub city: City,
    /// Area within the city (free text).
    pub region: String,
    /// Product kind.
    pub kind: ProductKind,
    /// Unit price.
    pub price: Price,
    /// Quantity ordered.
    pub quantity: u32,
    /// Free-text notes.
    pub notes: String,
    /// Workflow status.
    pub status: OrderStatus,
    /// Creation date.
    ///
    /// Always set for orders recorded through intake. `None` only for rows
    /// loaded from the store whose date is missing or unreadable.
    pub created_on: Option<NaiveDate>,
}

impl Order {
    /// Build a new Pending order from a validated draft.
    #[must_use]
    pub fn create(draft: OrderDraft, created_on: NaiveDate) -> Self {
        Self {
            id: OrderId::new(),
            name: draft.name,
            phone: draft.phone,
            city: draft.city,
            region: draft.region,
            kind: draft.kind,
            price: draft.price,
            quantity: draft.quantity,
            notes: draft.notes,
            status: OrderStatus::Pending,
            created_on: Some(created_on),
        }
    }

    /// Merge a patch into this record.
    ///
    /// Only the fields present in the patch are overwritten.
    pub fn apply(&mut self, patch: OrderPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(city) = patch.city {
            self.city = city;
        }
        if let Some(region) = patch.region {
            self.region = region;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}

/// Raw intake form input, as typed by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrder {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub city: String,
    #[serde(default)]
    pub region: String,
    pub kind: String,
    pub price: String,
    pub quantity: String,
    #[serde(default)]
    pub notes: String,
}

/// Intake input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub name: String,
    pub phone: String,
    pub city: City,
    pub region: String,
    pub kind: ProductKind,
    pub price: Price,
    pub quantity: u32,
    pub notes: String,
}

impl NewOrder {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(self) -> Result<OrderDraft, ValidationError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        Ok(OrderDraft {
            name,
            phone: self.phone.trim().to_owned(),
            city: self.city.parse()?,
            region: self.region.trim().to_owned(),
            kind: self.kind.parse()?,
            price: parse_price(&self.price)?,
            quantity: parse_quantity(&self.quantity)?,
            notes: self.notes.trim().to_owned(),
        })
    }
}

/// A partial update to an order.
///
/// Status and creation date are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<City>,
    pub region: Option<String>,
    pub kind: Option<ProductKind>,
    pub price: Option<Price>,
    pub quantity: Option<u32>,
    pub notes: Option<String>,
}

impl OrderPatch {
    /// A patch overwriting every editable field.
    #[must_use]
    pub fn replace_all(draft: OrderDraft) -> Self {
        Self {
            name: Some(draft.name),
            phone: Some(draft.phone),
            city: Some(draft.city),
            region: Some(draft.region),
            kind: Some(draft.kind),
            price: Some(draft.price),
            quantity: Some(draft.quantity),
            notes: Some(draft.notes),
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.city.is_none()
            && self.region.is_none()
            && self.kind.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
            && self.notes.is_none()
    }
}

/// Parse a unit price, tolerating `,` grouping and surrounding spaces.
///
/// # Errors
///
/// Returns `InvalidNumber` or `PriceOutOfRange`.
pub fn parse_price(raw: &str) -> Result<Price, ValidationError> {
    Price::new(parse_amount(raw)?)
}

/// Parse a unit price read back from the record store.
///
/// Like [`parse_price`] without the intake maximum.
///
/// # Errors
///
/// Returns `InvalidNumber`, or `PriceOutOfRange` for a negative amount.
pub fn parse_stored_price(raw: &str) -> Result<Price, ValidationError> {
    Price::stored(parse_amount(raw)?)
}

fn parse_amount(raw: &str) -> Result<Decimal, ValidationError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse().map_err(|_| ValidationError::InvalidNumber {
        field: "price",
        value: raw.to_owned(),
    })
}

/// Parse a quantity.
///
/// Accepts whole numbers written with a trailing `.0`, which is how some
/// spreadsheet exports render integers.
///
/// # Errors
///
/// Returns `InvalidNumber` or `QuantityOutOfRange`.
pub fn parse_quantity(raw: &str) -> Result<u32, ValidationError> {
    parse_stored_quantity(raw).and_then(|q| {
        if q <= MAX_QUANTITY {
            Ok(q)
        } else {
            Err(ValidationError::QuantityOutOfRange(i64::from(q)))
        }
    })
}

/// Parse a quantity read back from the record store.
///
/// Like [`parse_quantity`] without the intake maximum.
///
/// # Errors
///
/// Returns `InvalidNumber`, or `QuantityOutOfRange` for a negative value.
pub fn parse_stored_quantity(raw: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    let whole = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    let value: i64 = whole.parse().map_err(|_| ValidationError::InvalidNumber {
        field: "quantity",
        value: raw.to_owned(),
    })?;
    u32::try_from(value).map_err(|_| ValidationError::QuantityOutOfRange(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> NewOrder {
        NewOrder {
            name: "  Ali Hassan ".to_string(),
            phone: "0751234567".to_string(),
            city: "بغداد".to_string(),
            region: "Karrada".to_string(),
            kind: "smart watch".to_string(),
            price: "25000".to_string(),
            quantity: "1".to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let draft = form().validate().unwrap();
        assert_eq!(draft.name, "Ali Hassan");
        assert_eq!(draft.city, City::Baghdad);
        assert_eq!(draft.kind, ProductKind::SmartWatch);
        assert_eq!(draft.price.amount(), Decimal::new(25_000, 0));
        assert_eq!(draft.quantity, 1);
    }

    #[test]
    fn test_validate_empty_name() {
        let mut input = form();
        input.name = "   ".to_string();
        assert_eq!(input.validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_validate_price_bounds() {
        let mut input = form();
        input.price = "500001".to_string();
        assert!(matches!(
            input.validate(),
            Err(ValidationError::PriceOutOfRange(_))
        ));

        let mut input = form();
        input.price = "-5".to_string();
        assert!(matches!(
            input.validate(),
            Err(ValidationError::PriceOutOfRange(_))
        ));
    }

    #[test]
    fn test_validate_quantity_bounds() {
        let mut input = form();
        input.quantity = "101".to_string();
        assert_eq!(
            input.validate(),
            Err(ValidationError::QuantityOutOfRange(101))
        );

        let mut input = form();
        input.quantity = "-1".to_string();
        assert_eq!(
            input.validate(),
            Err(ValidationError::QuantityOutOfRange(-1))
        );
    }

    #[test]
    fn test_validate_unknown_city() {
        let mut input = form();
        input.city = "Paris".to_string();
        assert!(matches!(input.validate(), Err(ValidationError::City(_))));
    }

    #[test]
    fn test_parse_price_tolerates_grouping() {
        assert_eq!(
            parse_price("25,000").unwrap().amount(),
            Decimal::new(25_000, 0)
        );
        assert!(parse_price("abc").is_err());
    }

    #[test]
    fn test_parse_quantity_trailing_zero() {
        assert_eq!(parse_quantity("3.0").unwrap(), 3);
        assert!(parse_quantity("2.5").is_err());
    }

    #[test]
    fn test_stored_values_skip_intake_maxima() {
        assert!(parse_price("600000").is_err());
        assert_eq!(
            parse_stored_price("600,000").unwrap().amount(),
            Decimal::new(600_000, 0)
        );
        assert!(parse_quantity("150").is_err());
        assert_eq!(parse_stored_quantity("150").unwrap(), 150);
        assert!(parse_stored_quantity("-1").is_err());
        assert!(parse_stored_price("-5").is_err());
    }

    #[test]
    fn test_create_is_pending_and_dated() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let order = Order::create(form().validate().unwrap(), date);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.created_on, Some(date));
    }

    #[test]
    fn test_apply_patch_keeps_status_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut order = Order::create(form().validate().unwrap(), date);
        order.status = OrderStatus::Notification;

        order.apply(OrderPatch {
            phone: Some("0770000000".to_string()),
            quantity: Some(4),
            ..OrderPatch::default()
        });

        assert_eq!(order.phone, "0770000000");
        assert_eq!(order.quantity, 4);
        assert_eq!(order.name, "Ali Hassan");
        assert_eq!(order.status, OrderStatus::Notification);
        assert_eq!(order.created_on, Some(date));
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(OrderPatch::default().is_empty());
        let patch = OrderPatch::replace_all(form().validate().unwrap());
        assert!(!patch.is_empty());
    }
}
