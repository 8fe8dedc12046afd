//! Payment reference minting
//!
//! References look like `order_<orderId>_<unix-millis>_<instance>`. The
//! millisecond component is strictly increasing per generator, so two
//! initializations that land in the same millisecond still get distinct
//! references. The instance tag is drawn once per generator and keeps
//! replicas of the service from minting the same reference.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

const INSTANCE_TAG_LEN: usize = 6;

#[derive(Debug)]
pub struct ReferenceGenerator {
    last_millis: AtomicI64,
    instance: String,
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::with_instance(&Uuid::new_v4().simple().to_string()[..INSTANCE_TAG_LEN])
    }
}

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(instance: &str) -> Self {
        Self {
            last_millis: AtomicI64::new(0),
            instance: instance.to_string(),
        }
    }

    pub fn next(&self, order_id: &str) -> String {
        format!(
            "order_{}_{}_{}",
            order_id,
            self.next_millis(Utc::now().timestamp_millis()),
            self.instance
        )
    }

    fn next_millis(&self, now: i64) -> i64 {
        let mut current = self.last_millis.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last_millis.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(observed) => current = observed,
            }
        }
    }
}
