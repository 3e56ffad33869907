use crate::models::Invoice;
use std::collections::HashMap;
use std::sync::Mutex;

/// Keyed invoice records with a monotonic id generator. Injected into the
/// channel adapters and API handlers so they can be unit-tested with fakes.
pub trait InvoiceStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Invoice>;
    fn put(&self, id: &str, invoice: Invoice);
    /// Mutate an existing record in place, holding the store lock for the
    /// whole read-modify-write. Returns the updated record, or `None` when
    /// the id is unknown.
    fn update(&self, id: &str, f: &mut dyn FnMut(&mut Invoice)) -> Option<Invoice>;
    fn next_id(&self) -> String;
}

struct Inner {
    invoices: HashMap<String, Invoice>,
    next_id: u64,
}

pub struct InMemoryInvoiceStore {
    inner: Mutex<Inner>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                invoices: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryInvoiceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceStore for InMemoryInvoiceStore {
    fn get(&self, id: &str) -> Option<Invoice> {
        let inner = self.inner.lock().expect("invoice store poisoned");
        inner.invoices.get(id).cloned()
    }

    fn put(&self, id: &str, invoice: Invoice) {
        let mut inner = self.inner.lock().expect("invoice store poisoned");
        inner.invoices.insert(id.to_string(), invoice);
    }

    fn update(&self, id: &str, f: &mut dyn FnMut(&mut Invoice)) -> Option<Invoice> {
        let mut inner = self.inner.lock().expect("invoice store poisoned");
        let invoice = inner.invoices.get_mut(id)?;
        f(invoice);
        Some(invoice.clone())
    }

    fn next_id(&self) -> String {
        let mut inner = self.inner.lock().expect("invoice store poisoned");
        let id = format!("INV-{:04}", inner.next_id);
        inner.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceStatus;

    #[test]
    fn put_and_get_round_trip() {
        let store = InMemoryInvoiceStore::new();
        store.put("INV1", Invoice::pending("INV1", "+255700000001", "500", ""));

        let inv = store.get("INV1").expect("invoice should be found");
        assert_eq!(inv.id, "INV1");
        assert_eq!(inv.amount, "500");
        assert_eq!(inv.status, InvoiceStatus::Pending);
        assert!(store.get("INV2").is_none());
    }

    #[test]
    fn generated_ids_are_zero_padded_and_monotonic() {
        let store = InMemoryInvoiceStore::new();
        assert_eq!(store.next_id(), "INV-0001");
        assert_eq!(store.next_id(), "INV-0002");
        assert_eq!(store.next_id(), "INV-0003");
    }

    #[test]
    fn update_mutates_in_place_under_the_lock() {
        let store = InMemoryInvoiceStore::new();
        store.put("A", Invoice::pending("A", "+255700000001", "100", ""));

        let updated = store
            .update("A", &mut |inv| {
                inv.finalize(InvoiceStatus::Paid, "TX-1".to_string());
            })
            .expect("record exists");
        assert_eq!(updated.status, InvoiceStatus::Paid);
        assert_eq!(updated.txn_id.as_deref(), Some("TX-1"));
        assert_eq!(store.get("A").unwrap().status, InvoiceStatus::Paid);

        assert!(store.update("missing", &mut |_| {}).is_none());
    }

    #[test]
    fn put_overwrites_existing_record() {
        let store = InMemoryInvoiceStore::new();
        store.put("A", Invoice::pending("A", "+255700000001", "100", ""));
        store.put("A", Invoice::pending("A", "+255700000001", "200", ""));
        assert_eq!(store.get("A").unwrap().amount, "200");
    }
}
