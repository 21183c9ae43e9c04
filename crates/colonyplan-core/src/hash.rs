use crate::catalog::Catalog;
use crate::rules::GrantScope;

struct Fnv1a64 {
    hash: u64,
}

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            hash: Self::OFFSET_BASIS,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.hash ^= u64::from(b);
            self.hash = self.hash.wrapping_mul(Self::PRIME);
        }
    }

    fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(if v { 1 } else { 0 });
    }

    fn write_u16(&mut self, v: u16) {
        self.write(&v.to_le_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write(s.as_bytes());
    }

    fn finish(&self) -> u64 {
        self.hash
    }
}

/// Deterministic hash of the compiled catalog content.
///
/// Keys the infeasible memo and stamps committed queues, so two loads of the
/// same data always agree.
pub(crate) fn catalog_hash(catalog: &Catalog) -> u64 {
    let mut h = Fnv1a64::new();

    h.write_u32(catalog.capabilities.len() as u32);
    for name in &catalog.capabilities {
        h.write_str(name);
    }
    h.write_u32(catalog.resources.len() as u32);
    for name in &catalog.resources {
        h.write_str(name);
    }

    h.write_u32(catalog.items.len() as u32);
    for item in &catalog.items {
        h.write_str(&item.data_id);
        h.write_bool(item.is_structure());
        h.write_u32(item.costs.len() as u32);
        for cost in &item.costs {
            h.write_u16(cost.resource.raw);
            h.write_u32(cost.amount);
        }
        h.write_u32(item.population_required);
        h.write_u32(item.requires.len() as u32);
        for (cap, value) in &item.requires {
            h.write_u16(cap.raw);
            h.write_bool(*value);
        }
        h.write_u32(item.grants.len() as u32);
        for grant in &item.grants {
            h.write_u16(grant.capability.raw);
            h.write_bool(grant.value);
            h.write_u8(match grant.scope {
                GrantScope::Queued => 0,
                GrantScope::Built => 1,
            });
        }
        match item.upgrades_from {
            Some(prev) => {
                h.write_bool(true);
                h.write_u16(prev.raw);
            }
            None => h.write_bool(false),
        }
    }

    h.finish()
}

#[cfg(test)]
mod tests {
    use crate::rules::{load_catalog, RulesSource};

    const STRUCTURES: &str = r#"
docks:
  name: Docks
  cost: [{ resource: hammers, amount: 52 }]
  grants: [{ capability: build_boats }]
"#;

    #[test]
    fn same_data_hashes_the_same() {
        let load = || {
            load_catalog(RulesSource::Bytes {
                structures: STRUCTURES.as_bytes(),
                units: b"",
            })
            .unwrap()
        };
        assert_eq!(load().catalog_hash, load().catalog_hash);
    }

    #[test]
    fn grant_scope_changes_the_hash() {
        let queued = load_catalog(RulesSource::Bytes {
            structures: STRUCTURES.as_bytes(),
            units: b"",
        })
        .unwrap();
        let built = STRUCTURES.replace("build_boats }", "build_boats, scope: built }");
        let built = load_catalog(RulesSource::Bytes {
            structures: built.as_bytes(),
            units: b"",
        })
        .unwrap();
        assert_ne!(queued.catalog_hash, built.catalog_hash);
    }
}
