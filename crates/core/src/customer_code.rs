//! Customer codes: external aliases resolving to canonical customer ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// A row mapping an external customer code to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCode {
    pub id: DbId,
    pub code: String,
    pub customer_id: DbId,
    pub is_active: bool,
}

/// Outcome of resolving a rule's `assign_to` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustomerResolution {
    /// Value written to `assigned_customer`.
    pub customer_id: DbId,
    /// The code the customer was resolved through, when one was found.
    pub customer_code_id: Option<DbId>,
    /// `assign_to` matched no active code and was used verbatim.
    pub fallback: bool,
}

/// Lookup of active customer codes by code id.
#[derive(Debug, Clone, Default)]
pub struct CustomerCodeIndex {
    by_id: HashMap<DbId, DbId>,
}

impl CustomerCodeIndex {
    /// Index the active codes; inactive ones are dropped.
    pub fn from_codes(codes: &[CustomerCode]) -> Self {
        let by_id = codes
            .iter()
            .filter(|c| c.is_active)
            .map(|c| (c.id, c.customer_id))
            .collect();
        Self { by_id }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Resolve `assign_to` to a customer, falling back to the raw value.
    pub fn resolve(&self, assign_to: DbId) -> CustomerResolution {
        match self.by_id.get(&assign_to) {
            Some(&customer_id) => CustomerResolution {
                customer_id,
                customer_code_id: Some(assign_to),
                fallback: false,
            },
            None => CustomerResolution {
                customer_id: assign_to,
                customer_code_id: None,
                fallback: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(id: DbId, customer_id: DbId, is_active: bool) -> CustomerCode {
        CustomerCode {
            id,
            code: format!("C{id}"),
            customer_id,
            is_active,
        }
    }

    #[test]
    fn resolves_active_code_to_customer() {
        let index = CustomerCodeIndex::from_codes(&[code(10, 500, true)]);
        let r = index.resolve(10);
        assert_eq!(r.customer_id, 500);
        assert_eq!(r.customer_code_id, Some(10));
        assert!(!r.fallback);
    }

    #[test]
    fn inactive_code_falls_back_to_raw_value() {
        let index = CustomerCodeIndex::from_codes(&[code(10, 500, false)]);
        assert!(index.is_empty());
        let r = index.resolve(10);
        assert_eq!(r.customer_id, 10);
        assert_eq!(r.customer_code_id, None);
        assert!(r.fallback);
    }
}
