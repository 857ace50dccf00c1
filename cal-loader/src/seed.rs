use crate::common::error::Result;
use cal_core::domain::Party;
use cal_core::storage::Storage;
use std::sync::Arc;
use tracing::info;

/// Canonical California parties with their CAL-ACCESS filer type codes.
///
/// The UNKNOWN sentinel must exist before any resolution runs; the rest
/// carry the numeric identifiers `PartyResolver::resolve_by_filer` matches
/// against. Codes 16007 and 16009 are deliberately absent: they are
/// remapped to 16012 at resolution time, never stored on a party.
const PARTIES: &[(&str, &[&str], &[i64])] = &[
    ("UNKNOWN", &[], &[]),
    ("DEMOCRATIC", &["DEMOCRATIC PARTY"], &[16001]),
    ("REPUBLICAN", &["REPUBLICAN PARTY"], &[16002]),
    ("GREEN", &["GREEN PARTY"], &[16003]),
    ("REFORM", &["REFORM PARTY"], &[16004]),
    ("AMERICAN INDEPENDENT", &["AMERICAN INDEPENDENT PARTY"], &[16005]),
    ("PEACE AND FREEDOM", &["PEACE AND FREEDOM PARTY"], &[16006]),
    ("LIBERTARIAN", &["LIBERTARIAN PARTY"], &[16008]),
    ("NATURAL LAW", &[], &[16010]),
    ("NO PARTY PREFERENCE", &["NONE", "NON-PARTISAN", "INDEPENDENT"], &[16012]),
    ("AMERICANS ELECT", &[], &[16013]),
];

/// Ensure the canonical party rows exist. Idempotent: existing rows are
/// left untouched.
pub async fn seed_parties(storage: Arc<dyn Storage>) -> Result<usize> {
    let mut created = 0;
    for (name, alternate_names, identifiers) in PARTIES {
        if storage.get_party_by_name(name).await?.is_some() {
            continue;
        }
        let mut party = Party::new(
            *name,
            alternate_names.iter().map(|n| n.to_string()).collect(),
            identifiers.to_vec(),
        );
        storage.create_party(&mut party).await?;
        created += 1;
    }
    info!("Seeded {} parties", created);
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cal_core::storage::InMemoryStorage;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());

        let first = seed_parties(storage.clone()).await.unwrap();
        assert_eq!(first, PARTIES.len());

        let second = seed_parties(storage.clone()).await.unwrap();
        assert_eq!(second, 0);

        let unknown = storage.get_party_by_name("UNKNOWN").await.unwrap();
        assert!(unknown.is_some());
    }
}
