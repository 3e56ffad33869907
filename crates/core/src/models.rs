use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Failed,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// An invoice as issued to a customer. The amount is kept verbatim as the
/// text the merchant entered; no normalization happens at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub customer_phone: String,
    pub amount: String,
    pub description: String,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txn_id: Option<String>,
}

impl Invoice {
    pub fn pending(
        id: impl Into<String>,
        customer_phone: impl Into<String>,
        amount: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            customer_phone: customer_phone.into(),
            amount: amount.into(),
            description: description.into(),
            status: InvoiceStatus::Pending,
            created_at: Utc::now(),
            paid_at: None,
            txn_id: None,
        }
    }

    /// Moves a pending invoice to its final status. Status only ever moves
    /// forward: once Paid or Failed, the record (including `txn_id` and
    /// `paid_at`) is immutable and the call is a no-op returning `false`.
    pub fn finalize(&mut self, status: InvoiceStatus, txn_id: String) -> bool {
        if self.status != InvoiceStatus::Pending || status == InvoiceStatus::Pending {
            return false;
        }
        self.status = status;
        self.txn_id = Some(txn_id);
        if status == InvoiceStatus::Paid {
            self.paid_at = Some(Utc::now());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_marks_paid_once() {
        let mut inv = Invoice::pending("INV-0001", "+255700000001", "50000", "");
        assert!(inv.finalize(InvoiceStatus::Paid, "TX-1".into()));
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.txn_id.as_deref(), Some("TX-1"));
        assert!(inv.paid_at.is_some());

        // second finalization with a different txn id must not change anything
        assert!(!inv.finalize(InvoiceStatus::Paid, "TX-2".into()));
        assert_eq!(inv.txn_id.as_deref(), Some("TX-1"));
    }

    #[test]
    fn finalize_failed_leaves_paid_at_unset() {
        let mut inv = Invoice::pending("INV-0002", "+255700000001", "100", "");
        assert!(inv.finalize(InvoiceStatus::Failed, "TX-9".into()));
        assert_eq!(inv.status, InvoiceStatus::Failed);
        assert!(inv.paid_at.is_none());
    }

    #[test]
    fn finalize_rejects_backward_transition() {
        let mut inv = Invoice::pending("INV-0003", "+255700000001", "100", "");
        assert!(inv.finalize(InvoiceStatus::Paid, "TX-1".into()));
        assert!(!inv.finalize(InvoiceStatus::Failed, "TX-2".into()));
        assert_eq!(inv.status, InvoiceStatus::Paid);
    }

    #[test]
    fn finalize_to_pending_is_rejected() {
        let mut inv = Invoice::pending("INV-0004", "+255700000001", "100", "");
        assert!(!inv.finalize(InvoiceStatus::Pending, "TX-1".into()));
        assert_eq!(inv.status, InvoiceStatus::Pending);
        assert!(inv.txn_id.is_none());
    }
}
