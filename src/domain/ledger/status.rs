//! Ledger entry status and payment method.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Settlement status of a ledger entry.
///
/// Never set directly: always derived from the amounts and the due date
/// through [`LedgerStatus::derive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    /// Nothing paid yet, not past due.
    Pending,

    /// Some but not all of the amount due has been paid.
    Partial,

    /// Amount paid covers the amount due.
    Paid,

    /// Nothing paid and the due date has passed.
    Overdue,
}

impl LedgerStatus {
    /// Derives the status from the entry's amounts and due date.
    ///
    /// An entry due today is not yet overdue.
    pub fn derive(
        amount_paid: Decimal,
        amount_due: Decimal,
        due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        if amount_paid >= amount_due {
            LedgerStatus::Paid
        } else if amount_paid > Decimal::ZERO {
            LedgerStatus::Partial
        } else if due_date.map_or(false, |due| due < today) {
            LedgerStatus::Overdue
        } else {
            LedgerStatus::Pending
        }
    }

    /// Returns true if the allocator may apply payments to this status.
    pub fn accepts_allocation(&self) -> bool {
        matches!(self, LedgerStatus::Pending | LedgerStatus::Partial)
    }

    /// Returns the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Partial => "partial",
            LedgerStatus::Paid => "paid",
            LedgerStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LedgerStatus::Pending),
            "partial" => Ok(LedgerStatus::Partial),
            "paid" => Ok(LedgerStatus::Paid),
            "overdue" => Ok(LedgerStatus::Overdue),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown ledger status '{}'", other),
            )),
        }
    }
}

/// How a ledger entry was (last) settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid through the online payment gateway.
    Gateway,
    Cash,
    BankTransfer,
    /// Fee waived by an administrator.
    Waived,
}

impl PaymentMethod {
    /// Returns the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Gateway => "gateway",
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Waived => "waived",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gateway" => Ok(PaymentMethod::Gateway),
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "waived" => Ok(PaymentMethod::Waived),
            other => Err(ValidationError::invalid_format(
                "payment_method",
                format!("unknown payment method '{}'", other),
            )),
        }
    }
}
