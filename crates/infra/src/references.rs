//! Order reference generation.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Source of order references, injected into the propagation engine.
pub trait ReferenceGenerator: Send + Sync {
    fn next_order_reference(&self, at: DateTime<Utc>) -> String;
}

impl<G> ReferenceGenerator for std::sync::Arc<G>
where
    G: ReferenceGenerator + ?Sized,
{
    fn next_order_reference(&self, at: DateTime<Utc>) -> String {
        (**self).next_order_reference(at)
    }
}

/// `<PREFIX><YYYYMMDD><NN>` references, e.g. `ELAST2026101507`.
///
/// The running number is global (it does not reset per day) and is padded to
/// at least two digits.
#[derive(Debug)]
pub struct SequentialOrderReferences {
    prefix: String,
    issued: AtomicU64,
}

impl SequentialOrderReferences {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_after(prefix, 0)
    }

    /// Continue numbering after `issued` existing orders.
    pub fn starting_after(prefix: impl Into<String>, issued: u64) -> Self {
        Self {
            prefix: prefix.into(),
            issued: AtomicU64::new(issued),
        }
    }
}

impl ReferenceGenerator for SequentialOrderReferences {
    fn next_order_reference(&self, at: DateTime<Utc>) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}{}{:02}", self.prefix, at.format("%Y%m%d"), n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn formats_prefix_date_and_padded_counter() {
        let refs = SequentialOrderReferences::new("ELAST");
        let at = Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap();
        assert_eq!(refs.next_order_reference(at), "ELAST2026101501");
        assert_eq!(refs.next_order_reference(at), "ELAST2026101502");
    }

    #[test]
    fn continues_after_existing_orders() {
        let refs = SequentialOrderReferences::starting_after("ELAST", 99);
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(refs.next_order_reference(at), "ELAST20260102100");
    }

    #[test]
    fn concurrent_callers_never_share_a_number() {
        let refs = Arc::new(SequentialOrderReferences::new("T"));
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let refs = refs.clone();
                std::thread::spawn(move || (0..50).map(|_| refs.next_order_reference(at)).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for r in h.join().unwrap() {
                assert!(seen.insert(r));
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
