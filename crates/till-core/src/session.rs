//! # Cash Session Ledger
//!
//! Cash drawer sessions and their reconciliation.
//!
//! ## Drawer Arithmetic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open(opening = 5000)                                                   │
//! │      expected = 5000                                                    │
//! │                                                                         │
//! │  cash sale confirmed  +1200  ──► expected = 6200, cash sales   = 1200   │
//! │  cash sale refunded    -300  ──► expected = 5900, cash refunds =  300   │
//! │                                                                         │
//! │  close(declared = 5850)                                                 │
//! │      variance = declared - expected = -50                               │
//! │                                                                         │
//! │  expected == opening + cash sales - cash refunds   (always)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Card, mobile money and transfer settlements never reach this module.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::money::Money;
use crate::types::{SessionId, SessionStatus, Timestamp};
use crate::validation::{validate_balance, validate_identifier};

// =============================================================================
// Drawer Policy
// =============================================================================

/// Which open sessions block a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DrawerPolicy {
    /// One physical drawer for the whole till: any open session blocks
    /// another, and every cash movement lands in it.
    #[default]
    Shared,
    /// One drawer per cashier: each cashier may hold one open session and
    /// cash movements go to the acting cashier's drawer.
    PerCashier,
}

// =============================================================================
// Cash Session
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSession {
    pub id: SessionId,
    pub cashier_id: String,
    pub cashier_name: String,
    #[ts(as = "String")]
    pub opened_at: Timestamp,
    pub opening_balance: Money,
    pub expected_balance: Money,
    pub total_cash_sales: Money,
    pub total_cash_refunds: Money,
    pub status: SessionStatus,
    /// Declared count, set at close.
    pub closing_balance: Option<Money>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<Timestamp>,
}

impl CashSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Declared minus expected, once closed.
    pub fn variance(&self) -> Option<Money> {
        self.closing_balance
            .and_then(|declared| declared.checked_sub(self.expected_balance))
    }

    /// Returns the session with a signed movement applied.
    ///
    /// Positive amounts count as cash sales, negative ones as cash refunds.
    pub fn with_movement(&self, amount: Money) -> LedgerResult<CashSession> {
        if !self.is_open() {
            return Err(LedgerError::SessionAlreadyClosed(self.id.to_string()));
        }

        let mut next = self.clone();
        next.expected_balance =
            tally("expected_balance", self.expected_balance.checked_add(amount))?;
        if amount.is_negative() {
            next.total_cash_refunds =
                tally("total_cash_refunds", self.total_cash_refunds.checked_sub(amount))?;
        } else {
            next.total_cash_sales =
                tally("total_cash_sales", self.total_cash_sales.checked_add(amount))?;
        }
        Ok(next)
    }

    /// Returns the session with a correction to an earlier cash sale applied.
    ///
    /// The delta is booked against cash sales whatever its sign, so a
    /// reduced invoice does not show up as a refund.
    pub fn with_sale_correction(&self, delta: Money) -> LedgerResult<CashSession> {
        if !self.is_open() {
            return Err(LedgerError::SessionAlreadyClosed(self.id.to_string()));
        }

        let mut next = self.clone();
        next.expected_balance =
            tally("expected_balance", self.expected_balance.checked_add(delta))?;
        next.total_cash_sales =
            tally("total_cash_sales", self.total_cash_sales.checked_add(delta))?;
        Ok(next)
    }

    /// Returns the closed session and its variance.
    pub fn closed(&self, declared: Money, now: Timestamp) -> LedgerResult<SessionClosure> {
        if !self.is_open() {
            return Err(LedgerError::SessionAlreadyClosed(self.id.to_string()));
        }
        validate_balance("closing_balance", declared)?;

        let mut session = self.clone();
        session.status = SessionStatus::Closed;
        session.closing_balance = Some(declared);
        session.closed_at = Some(now);

        Ok(SessionClosure {
            variance: tally("variance", declared.checked_sub(session.expected_balance))?,
            session,
        })
    }
}

/// Unwraps a checked drawer sum, or reports the field that left i64.
fn tally(field: &str, sum: Option<Money>) -> LedgerResult<Money> {
    sum.ok_or_else(|| {
        ValidationError::OutOfRange {
            field: field.to_string(),
            min: i64::MIN,
            max: i64::MAX,
        }
        .into()
    })
}

/// Result of closing a drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionClosure {
    pub session: CashSession,
    pub variance: Money,
}

// =============================================================================
// Cash Session Ledger
// =============================================================================

/// All drawer sessions, oldest first.
///
/// The `plan_*` methods compute the new session without touching the
/// ledger; [`CashSessionLedger::upsert`] applies a planned session. The
/// `open` / `record_cash_movement` / `close` methods do both in one step.
#[derive(Debug, Clone, Default)]
pub struct CashSessionLedger {
    policy: DrawerPolicy,
    sessions: Vec<CashSession>,
}

impl CashSessionLedger {
    pub fn new(policy: DrawerPolicy) -> Self {
        CashSessionLedger {
            policy,
            sessions: Vec::new(),
        }
    }

    /// Rebuilds the ledger from stored sessions (any order).
    pub fn from_sessions(policy: DrawerPolicy, mut sessions: Vec<CashSession>) -> Self {
        sessions.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        CashSessionLedger { policy, sessions }
    }

    pub fn policy(&self) -> DrawerPolicy {
        self.policy
    }

    pub fn get(&self, id: &SessionId) -> Option<&CashSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// The open session a cashier should use.
    ///
    /// With a shared drawer the cashier is ignored. Per cashier, `None`
    /// returns the most recently opened session of anyone.
    pub fn current_open(&self, cashier_id: Option<&str>) -> Option<&CashSession> {
        let mut open = self.sessions.iter().rev().filter(|s| s.is_open());
        match (self.policy, cashier_id) {
            (DrawerPolicy::PerCashier, Some(cashier)) => open.find(|s| s.cashier_id == cashier),
            _ => open.next(),
        }
    }

    /// History, newest first.
    pub fn list(&self) -> impl Iterator<Item = &CashSession> {
        self.sessions.iter().rev()
    }

    // -------------------------------------------------------------------------
    // Planning
    // -------------------------------------------------------------------------

    /// Builds a new open session if the drawer policy allows one.
    pub fn plan_open(
        &self,
        cashier_id: &str,
        cashier_name: &str,
        opening_balance: Money,
        now: Timestamp,
    ) -> LedgerResult<CashSession> {
        validate_identifier("cashier_id", cashier_id)?;
        validate_balance("opening_balance", opening_balance)?;

        if let Some(existing) = self.current_open(Some(cashier_id)) {
            return Err(LedgerError::SessionAlreadyOpen {
                session_id: existing.id.to_string(),
                cashier_id: existing.cashier_id.clone(),
            });
        }

        Ok(CashSession {
            id: SessionId::generate(),
            cashier_id: cashier_id.to_string(),
            cashier_name: cashier_name.trim().to_string(),
            opened_at: now,
            opening_balance,
            expected_balance: opening_balance,
            total_cash_sales: Money::zero(),
            total_cash_refunds: Money::zero(),
            status: SessionStatus::Open,
            closing_balance: None,
            closed_at: None,
        })
    }

    pub fn plan_movement(&self, id: &SessionId, amount: Money) -> LedgerResult<CashSession> {
        self.require(id)?.with_movement(amount)
    }

    pub fn plan_close(
        &self,
        id: &SessionId,
        declared: Money,
        now: Timestamp,
    ) -> LedgerResult<SessionClosure> {
        self.require(id)?.closed(declared, now)
    }

    /// Inserts or replaces a session by id.
    pub fn upsert(&mut self, session: CashSession) {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(slot) => *slot = session,
            None => self.sessions.push(session),
        }
    }

    // -------------------------------------------------------------------------
    // Direct Operations
    // -------------------------------------------------------------------------

    /// Opens a drawer. The policy check and the insert happen under one
    /// `&mut self` borrow.
    pub fn open(
        &mut self,
        cashier_id: &str,
        cashier_name: &str,
        opening_balance: Money,
    ) -> LedgerResult<CashSession> {
        let session = self.plan_open(cashier_id, cashier_name, opening_balance, Utc::now())?;
        self.upsert(session.clone());
        Ok(session)
    }

    pub fn record_cash_movement(
        &mut self,
        id: &SessionId,
        amount: Money,
    ) -> LedgerResult<CashSession> {
        let session = self.plan_movement(id, amount)?;
        self.upsert(session.clone());
        Ok(session)
    }

    pub fn close(&mut self, id: &SessionId, declared: Money) -> LedgerResult<SessionClosure> {
        let closure = self.plan_close(id, declared, Utc::now())?;
        self.upsert(closure.session.clone());
        Ok(closure)
    }

    fn require(&self, id: &SessionId) -> LedgerResult<&CashSession> {
        self.get(id)
            .ok_or_else(|| LedgerError::SessionNotFound(id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawer_reconciliation() {
        let mut ledger = CashSessionLedger::new(DrawerPolicy::Shared);
        let session = ledger.open("c1", "Fatou", Money::from_cents(5000)).unwrap();

        ledger
            .record_cash_movement(&session.id, Money::from_cents(1200))
            .unwrap();
        let after = ledger
            .record_cash_movement(&session.id, Money::from_cents(-300))
            .unwrap();
        assert_eq!(after.expected_balance.cents(), 5900);
        assert_eq!(after.total_cash_sales.cents(), 1200);
        assert_eq!(after.total_cash_refunds.cents(), 300);
        assert_eq!(
            after.expected_balance,
            after.opening_balance + after.total_cash_sales - after.total_cash_refunds
        );

        let closure = ledger.close(&session.id, Money::from_cents(5850)).unwrap();
        assert_eq!(closure.variance.cents(), -50);
        assert_eq!(closure.session.status, SessionStatus::Closed);
        assert_eq!(closure.session.variance(), Some(Money::from_cents(-50)));
    }

    #[test]
    fn test_tally_overflow_is_rejected() {
        let mut ledger = CashSessionLedger::new(DrawerPolicy::Shared);
        let session = ledger
            .open("c1", "Fatou", Money::from_cents(i64::MAX - 100))
            .unwrap();

        let err = ledger
            .record_cash_movement(&session.id, Money::from_cents(500))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::OutOfRange { ref field, .. })
                if field == "expected_balance"
        ));
        assert!(session.with_sale_correction(Money::from_cents(500)).is_err());

        // Nothing was booked.
        let unchanged = ledger.get(&session.id).unwrap();
        assert_eq!(unchanged.expected_balance.cents(), i64::MAX - 100);
        assert!(unchanged.total_cash_sales.is_zero());
    }

    #[test]
    fn test_sale_correction_keeps_identity() {
        let mut ledger = CashSessionLedger::new(DrawerPolicy::Shared);
        let session = ledger.open("c1", "Fatou", Money::from_cents(1000)).unwrap();
        let sold = ledger
            .record_cash_movement(&session.id, Money::from_cents(600))
            .unwrap();

        let corrected = sold.with_sale_correction(Money::from_cents(-200)).unwrap();
        assert_eq!(corrected.expected_balance.cents(), 1400);
        assert_eq!(corrected.total_cash_sales.cents(), 400);
        assert!(corrected.total_cash_refunds.is_zero());
        assert_eq!(
            corrected.expected_balance,
            corrected.opening_balance + corrected.total_cash_sales - corrected.total_cash_refunds
        );
    }

    #[test]
    fn test_shared_drawer_blocks_second_open() {
        let mut ledger = CashSessionLedger::new(DrawerPolicy::Shared);
        let first = ledger.open("c1", "Fatou", Money::zero()).unwrap();

        let err = ledger.open("c2", "Yao", Money::zero()).unwrap_err();
        assert_eq!(
            err,
            LedgerError::SessionAlreadyOpen {
                session_id: first.id.to_string(),
                cashier_id: "c1".to_string()
            }
        );
        assert_eq!(ledger.current_open(Some("c2")).unwrap().id, first.id);
    }

    #[test]
    fn test_per_cashier_drawers() {
        let mut ledger = CashSessionLedger::new(DrawerPolicy::PerCashier);
        let a = ledger.open("c1", "Fatou", Money::zero()).unwrap();
        let b = ledger.open("c2", "Yao", Money::zero()).unwrap();

        assert!(ledger.open("c1", "Fatou", Money::zero()).is_err());
        assert_eq!(ledger.current_open(Some("c1")).unwrap().id, a.id);
        assert_eq!(ledger.current_open(Some("c2")).unwrap().id, b.id);
        assert!(ledger.current_open(Some("c3")).is_none());
    }

    #[test]
    fn test_closed_session_is_immutable() {
        let mut ledger = CashSessionLedger::new(DrawerPolicy::Shared);
        let s = ledger.open("c1", "Fatou", Money::zero()).unwrap();
        ledger.close(&s.id, Money::zero()).unwrap();

        assert_eq!(
            ledger.record_cash_movement(&s.id, Money::from_cents(100)),
            Err(LedgerError::SessionAlreadyClosed(s.id.to_string()))
        );
        assert_eq!(
            ledger.close(&s.id, Money::zero()),
            Err(LedgerError::SessionAlreadyClosed(s.id.to_string()))
        );
        assert!(ledger.current_open(None).is_none());

        // Reopening after close is allowed.
        assert!(ledger.open("c1", "Fatou", Money::zero()).is_ok());
    }

    #[test]
    fn test_unknown_session_and_negative_balances() {
        let mut ledger = CashSessionLedger::new(DrawerPolicy::Shared);
        let missing = SessionId::from("nope");
        assert_eq!(
            ledger.close(&missing, Money::zero()),
            Err(LedgerError::SessionNotFound("nope".to_string()))
        );
        assert!(ledger.open("c1", "Fatou", Money::from_cents(-1)).is_err());
        assert!(ledger.list().next().is_none());
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut ledger = CashSessionLedger::new(DrawerPolicy::PerCashier);
        let a = ledger.open("c1", "Fatou", Money::zero()).unwrap();
        let b = ledger.open("c2", "Yao", Money::zero()).unwrap();

        let ids: Vec<_> = ledger.list().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
