//! # Validation Module
//!
//! Business rule validation for candidate documents, drawer amounts and
//! sequence configuration.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Terminal / UI                                                │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger Engine (Rust)                                         │
//! │  ├── THIS MODULE: item, customer, event and amount rules               │
//! │  └── Runs before any invoice number is allocated                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE invoice_number                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_quantity, validate_invoice_prefix};
//!
//! validate_quantity(5).unwrap();
//! validate_invoice_prefix("INV-").unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{EventReservation, SaleItem};
use crate::{MAX_DOCUMENT_ITEMS, MAX_INVOICE_WIDTH, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest customer name accepted on a document.
pub const MAX_CUSTOMER_LEN: usize = 200;

/// Longest invoice prefix accepted by the allocator.
pub const MAX_PREFIX_LEN: usize = 16;

/// Longest free text accepted by a document listing.
pub const MAX_QUERY_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a customer name where one is mandatory (quotations).
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_customer;
///
/// assert!(validate_customer("Awa Kone").is_ok());
/// assert!(validate_customer("   ").is_err());
/// ```
pub fn validate_customer(customer: &str) -> ValidationResult<()> {
    let customer = customer.trim();

    if customer.is_empty() {
        return Err(ValidationError::required("customer"));
    }

    validate_customer_length(customer)
}

/// Length check alone, for document kinds where the customer is optional.
pub fn validate_customer_length(customer: &str) -> ValidationResult<()> {
    if customer.trim().chars().count() > MAX_CUSTOMER_LEN {
        return Err(ValidationError::TooLong {
            field: "customer".to_string(),
            max: MAX_CUSTOMER_LEN,
        });
    }

    Ok(())
}

/// Validates an identifier supplied by a caller (cashier, document, refunder).
pub fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates an invoice prefix.
///
/// ## Rules
/// - May be empty (plain numeric invoices)
/// - At most 16 characters
/// - No whitespace or control characters, since the prefix is printed on
///   every invoice and used for lookups
pub fn validate_invoice_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.chars().count() > MAX_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "invoice_prefix".to_string(),
            max: MAX_PREFIX_LEN,
        });
    }

    if prefix.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidFormat {
            field: "invoice_prefix".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates the free text of a document listing and returns it trimmed.
///
/// Matching is a substring scan over every document, so the text is capped.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Ticket: Add Item                                                       │
/// │                                                                         │
/// │  Waiter enters quantity: 5                                             │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → line accepted                                           │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (complimentary items).
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(300)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_cents(-100)).is_err());
/// assert!(validate_price(Money::from_cents(i64::MAX)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.cents() > MAX_UNIT_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE,
        });
    }

    Ok(())
}

/// Validates a declared drawer amount (opening float or closing count).
pub fn validate_balance(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the zero-padded width of invoice numbers.
pub fn validate_invoice_width(width: u32) -> ValidationResult<()> {
    if width == 0 || width > MAX_INVOICE_WIDTH {
        return Err(ValidationError::OutOfRange {
            field: "invoice_width".to_string(),
            min: 1,
            max: i64::from(MAX_INVOICE_WIDTH),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates one line: product reference, name, price and quantity.
pub fn validate_item(item: &SaleItem) -> ValidationResult<()> {
    if item.product_id.trim().is_empty() {
        return Err(ValidationError::required("product_id"));
    }

    if item.name.trim().is_empty() {
        return Err(ValidationError::required("item name"));
    }

    validate_price(item.unit_price)?;
    validate_quantity(item.quantity)
}

/// Validates every line and the line count.
///
/// An empty list is accepted here; drafts and quotations may be empty.
/// Confirmation uses [`validate_items_for_posting`].
pub fn validate_items(items: &[SaleItem]) -> ValidationResult<()> {
    if items.len() > MAX_DOCUMENT_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 0,
            max: MAX_DOCUMENT_ITEMS as i64,
        });
    }

    items.iter().try_for_each(validate_item)
}

/// Validates lines for an invoice: at least one line is required.
pub fn validate_items_for_posting(items: &[SaleItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    validate_items(items)
}

/// Validates event reservation metadata.
pub fn validate_event(event: &EventReservation) -> ValidationResult<()> {
    if event.event_type.trim().is_empty() {
        return Err(ValidationError::required("event_type"));
    }

    if event.guest_count == 0 {
        return Err(ValidationError::MustBePositive {
            field: "guest_count".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(qty: i64, cents: i64) -> SaleItem {
        SaleItem {
            product_id: "p-1".to_string(),
            name: "Attieke".to_string(),
            unit_price: Money::from_cents(cents),
            quantity: qty,
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_customer() {
        assert!(validate_customer("Awa Kone").is_ok());
        assert_eq!(
            validate_customer(""),
            Err(ValidationError::required("customer"))
        );
        assert!(validate_customer(&"A".repeat(300)).is_err());
        assert!(validate_customer_length("").is_ok());
    }

    #[test]
    fn test_validate_items_for_posting_rejects_empty() {
        assert_eq!(
            validate_items_for_posting(&[]),
            Err(ValidationError::Empty {
                field: "items".to_string()
            })
        );
        assert!(validate_items(&[]).is_ok());
        assert!(validate_items_for_posting(&[item(2, 300)]).is_ok());
    }

    #[test]
    fn test_validate_items_checks_every_line() {
        assert!(validate_items(&[item(1, 100), item(0, 100)]).is_err());
        assert!(validate_items(&[item(1, -5)]).is_err());

        let too_many = vec![item(1, 100); MAX_DOCUMENT_ITEMS + 1];
        assert!(validate_items(&too_many).is_err());
    }

    #[test]
    fn test_validate_price_cap() {
        assert!(validate_price(Money::from_cents(MAX_UNIT_PRICE)).is_ok());
        assert!(matches!(
            validate_price(Money::from_cents(MAX_UNIT_PRICE + 1)),
            Err(ValidationError::OutOfRange { max: MAX_UNIT_PRICE, .. })
        ));

        // Two lines that would overflow a plain sum are refused up front.
        let half = i64::MAX / 2 + 1;
        assert!(validate_items(&[item(1, half), item(1, half)]).is_err());

        // The largest accepted document still has an exact total.
        let biggest = vec![item(MAX_ITEM_QUANTITY, MAX_UNIT_PRICE); MAX_DOCUMENT_ITEMS];
        assert!(validate_items(&biggest).is_ok());
        let total: i64 = biggest.iter().map(|line| line.line_total().cents()).sum();
        assert_eq!(total, MAX_UNIT_PRICE * MAX_ITEM_QUANTITY * MAX_DOCUMENT_ITEMS as i64);
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  awa ").unwrap(), "awa");
        assert!(matches!(
            validate_search_query(&"x".repeat(MAX_QUERY_LEN + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_invoice_prefix_and_width() {
        assert!(validate_invoice_prefix("INV-").is_ok());
        assert!(validate_invoice_prefix("").is_ok());
        assert!(validate_invoice_prefix("IN V").is_err());
        assert!(validate_invoice_prefix(&"X".repeat(17)).is_err());

        assert!(validate_invoice_width(4).is_ok());
        assert!(validate_invoice_width(0).is_err());
        assert!(validate_invoice_width(19).is_err());
    }

    #[test]
    fn test_validate_event() {
        let mut event = EventReservation {
            event_date: NaiveDate::from_ymd_opt(2026, 12, 24).unwrap(),
            event_type: "Wedding".to_string(),
            guest_count: 120,
            venue: None,
        };
        assert!(validate_event(&event).is_ok());

        event.guest_count = 0;
        assert!(validate_event(&event).is_err());

        event.guest_count = 10;
        event.event_type = " ".to_string();
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn test_validate_balance() {
        assert!(validate_balance("opening_balance", Money::zero()).is_ok());
        assert!(validate_balance("opening_balance", Money::from_cents(-1)).is_err());
    }
}
