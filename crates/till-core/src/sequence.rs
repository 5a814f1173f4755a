//! # Invoice Sequence
//!
//! The single source of "next invoice number".
//!
//! ```text
//! prefix "INV-", width 4, next 7
//!      │
//!      ▼
//! allocate() ──► "INV-0007"   next = 8
//! allocate() ──► "INV-0008"   next = 9
//!      ...
//! next = 10000 ──► SequenceExhausted (never "INV-10000", never wraps)
//! ```
//!
//! A number once handed out is consumed for good. Gaps are acceptable,
//! duplicates are not. Callers that need all-or-nothing semantics allocate
//! on a clone and keep the clone only after their write is durable.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult};
use crate::types::InvoiceNumber;
use crate::{DEFAULT_INVOICE_PREFIX, DEFAULT_INVOICE_WIDTH, MAX_INVOICE_WIDTH};

/// Counter state of the invoice allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceSequence {
    prefix: String,
    next: u64,
    width: u32,
}

impl Default for InvoiceSequence {
    fn default() -> Self {
        InvoiceSequence::new(DEFAULT_INVOICE_PREFIX, 1, DEFAULT_INVOICE_WIDTH)
    }
}

impl InvoiceSequence {
    /// Creates a sequence. The width is clamped to `1..=MAX_INVOICE_WIDTH`.
    pub fn new(prefix: impl Into<String>, next: u64, width: u32) -> Self {
        InvoiceSequence {
            prefix: prefix.into(),
            next,
            width: width.clamp(1, MAX_INVOICE_WIDTH),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The counter value the next allocation will use.
    pub fn next_value(&self) -> u64 {
        self.next
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Largest counter value that fits the configured width.
    pub fn capacity(&self) -> u64 {
        10u64.pow(self.width) - 1
    }

    /// Previews the next number without consuming it.
    pub fn peek(&self) -> LedgerResult<InvoiceNumber> {
        if self.next > self.capacity() {
            return Err(LedgerError::SequenceExhausted {
                prefix: self.prefix.clone(),
                next: self.next,
                width: self.width,
            });
        }
        Ok(self.format(self.next))
    }

    /// Hands out the next number and advances the counter.
    pub fn allocate(&mut self) -> LedgerResult<InvoiceNumber> {
        let number = self.peek()?;
        self.next += 1;
        Ok(number)
    }

    /// Applies configured values to a stored sequence.
    ///
    /// The prefix always follows configuration. The counter only moves
    /// forward, so lowering `next_invoice_number` in a config file can
    /// never cause an already issued number to be handed out again.
    pub fn reseed(&mut self, prefix: &str, configured_next: u64, width: u32) {
        self.prefix = prefix.to_string();
        self.next = self.next.max(configured_next);
        self.width = width.clamp(1, MAX_INVOICE_WIDTH);
    }

    fn format(&self, value: u64) -> InvoiceNumber {
        InvoiceNumber::from_string(format!(
            "{}{:0width$}",
            self.prefix,
            value,
            width = self.width as usize
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
