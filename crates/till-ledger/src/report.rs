//! # Reporting Views
//!
//! Read-only aggregates computed from the document set alone.
//!
//! ## Revenue
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  confirmed  INV-0001   450  ─┐                                          │
//! │  refunded   INV-0002   300  ─┼─► gross    = 750  (everything posted)    │
//! │                              │   refunded = 300                         │
//! │  draft      (no number)  90   ✗  net      = 450                         │
//! │  quotation  (no number) 600   ✗                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A refund keeps its original total, so the figures can always be rebuilt
//! from the stored documents.

use chrono::NaiveDate;
use serde::Serialize;
use ts_rs::TS;

use till_core::{DocumentId, DocumentStatus, EventReservation, Money, SaleDocument};

/// Revenue over a set of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct RevenueSummary {
    /// Documents that were ever posted (confirmed or refunded).
    pub posted_count: usize,
    pub gross: Money,
    pub refunded_count: usize,
    pub refunded: Money,
    /// `gross - refunded`.
    pub net: Money,
    /// Net revenue settled in cash.
    pub cash_net: Money,
}

impl RevenueSummary {
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a SaleDocument>) -> Self {
        let mut summary = RevenueSummary::default();

        for doc in documents {
            let Some(posted) = doc.as_posted() else {
                continue;
            };
            let total = posted.body.total();

            summary.posted_count += 1;
            summary.gross += total;

            if doc.status() == DocumentStatus::Refunded {
                summary.refunded_count += 1;
                summary.refunded += total;
            } else {
                summary.cash_net += posted.cash_impact();
            }
        }

        summary.net = summary.gross - summary.refunded;
        summary
    }
}

/// A booked event, from a quotation carrying reservation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Reservation {
    pub document_id: DocumentId,
    pub customer: String,
    pub event: EventReservation,
    pub total: Money,
}

/// Quotations whose event date falls in `from..=to`, earliest first.
pub fn reservations<'a>(
    documents: impl IntoIterator<Item = &'a SaleDocument>,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<Reservation> {
    let mut found: Vec<Reservation> = documents
        .into_iter()
        .filter(|doc| doc.status() == DocumentStatus::Quotation)
        .filter_map(|doc| {
            let body = doc.body();
            let event = body.event.as_ref()?;
            (from..=to).contains(&event.event_date).then(|| Reservation {
                document_id: doc.id().clone(),
                customer: body.customer.clone(),
                event: event.clone(),
                total: body.total(),
            })
        })
        .collect();

    found.sort_by_key(|r| r.event.event_date);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use till_core::{DocumentBody, InvoiceNumber, PaymentMethod, SaleItem};

    fn body(customer: &str, cents: i64) -> DocumentBody {
        DocumentBody {
            customer: customer.to_string(),
            items: vec![SaleItem {
                product_id: "p1".into(),
                name: "Menu".into(),
                unit_price: Money::from_cents(cents),
                quantity: 1,
            }],
            ..DocumentBody::new("c1")
        }
    }

    fn invoice(id: &str, cents: i64, payment: PaymentMethod) -> SaleDocument {
        SaleDocument::new_invoice(
            DocumentId::from(id),
            body("Awa", cents),
            InvoiceNumber::from(format!("INV-{id}")),
            payment,
            Utc::now(),
        )
        .unwrap()
    }

    fn quotation(id: &str, date: Option<NaiveDate>) -> SaleDocument {
        let mut b = body("Koffi", 600);
        b.event = date.map(|event_date| EventReservation {
            event_date,
            event_type: "Wedding".into(),
            guest_count: 50,
            venue: None,
        });
        SaleDocument::new_quotation(DocumentId::from(id), b, None, Utc::now()).unwrap()
    }

    #[test]
    fn test_revenue_summary() {
        let refunded = invoice("2", 300, PaymentMethod::Cash)
            .refund("manager", Utc::now())
            .unwrap();
        let draft =
            SaleDocument::new_draft(DocumentId::from("t"), body("", 90), None, Utc::now()).unwrap();
        let docs = vec![
            invoice("1", 450, PaymentMethod::Cash),
            invoice("3", 200, PaymentMethod::Card),
            refunded,
            draft,
            quotation("q", None),
        ];

        let summary = RevenueSummary::from_documents(&docs);
        assert_eq!(summary.posted_count, 3);
        assert_eq!(summary.gross.cents(), 950);
        assert_eq!(summary.refunded_count, 1);
        assert_eq!(summary.refunded.cents(), 300);
        assert_eq!(summary.net.cents(), 650);
        assert_eq!(summary.cash_net.cents(), 450);
    }

    #[test]
    fn test_reservations_in_range_sorted() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 6, d).unwrap();
        let docs = vec![
            quotation("late", Some(day(28))),
            quotation("early", Some(day(3))),
            quotation("outside", Some(day(30))),
            quotation("no-event", None),
        ];

        let found = reservations(&docs, day(1), day(28));
        let ids: Vec<_> = found.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(found[0].total.cents(), 600);

        assert!(reservations(&docs, day(29), day(1)).is_empty());
    }
}
