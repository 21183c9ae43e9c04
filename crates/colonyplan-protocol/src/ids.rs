use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Data IDs are strings used in YAML files (human-readable, stable across versions)
pub type DataId = String;

/// Runtime IDs are integers compiled at catalog load (fast, deterministic)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeId<T> {
    pub raw: u16,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> RuntimeId<T> {
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Display for RuntimeId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

// Type-safe runtime IDs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemTypeTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceTag;

pub type ItemTypeId = RuntimeId<ItemTypeTag>;
pub type CapabilityId = RuntimeId<CapabilityTag>;
pub type ResourceId = RuntimeId<ResourceTag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_ids_serialize_as_bare_integers() {
        let id = ItemTypeId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");

        let back: ItemTypeId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn runtime_ids_order_by_raw_value() {
        let mut ids = vec![
            CapabilityId::new(3),
            CapabilityId::new(1),
            CapabilityId::new(2),
        ];
        ids.sort();
        assert_eq!(
            ids.iter().map(|id| id.raw).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}
