use crate::common::error::Result;
use cal_core::domain::{Party, UNKNOWN_PARTY_NAME};
use cal_core::storage::Storage;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, instrument};

/// CAL-ACCESS filer type code for "INDEPENDENT".
pub const PARTY_CODE_INDEPENDENT: i64 = 16007;
/// CAL-ACCESS filer type code for "NON-PARTISAN".
pub const PARTY_CODE_NON_PARTISAN: i64 = 16009;
/// CAL-ACCESS filer type code for "NO PARTY PREFERENCE".
pub const PARTY_CODE_NO_PARTY_PREFERENCE: i64 = 16012;

/// Resolves raw CAL-ACCESS party names and filer ids to canonical parties.
///
/// Resolution is total: both lookups degrade to the UNKNOWN sentinel
/// party rather than failing when nothing matches.
pub struct PartyResolver {
    storage: Arc<dyn Storage>,
}

impl PartyResolver {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The UNKNOWN sentinel party.
    ///
    /// Seeded into the store before any load pass runs; missing only on a
    /// store that was never seeded, which is a storage error rather than a
    /// resolution miss.
    pub async fn unknown(&self) -> Result<Party> {
        match self.storage.get_party_by_name(UNKNOWN_PARTY_NAME).await? {
            Some(party) => Ok(party),
            None => Err(crate::common::error::LoaderError::Storage {
                message: format!(
                    "Sentinel party '{UNKNOWN_PARTY_NAME}' not found (run the seed command first)"
                ),
            }),
        }
    }

    /// Resolve a raw party name from a filing to a canonical party.
    ///
    /// Tries the canonical display name first, then alternate names.
    /// Exact string equality only; no fuzzy matching.
    #[instrument(skip(self))]
    pub async fn resolve_by_name(&self, name: &str) -> Result<Party> {
        // First try a full name
        if let Some(party) = self.storage.get_party_by_name(name).await? {
            return Ok(party);
        }

        // If that doesn't work, try an alternate name
        if let Some(party) = self.storage.get_party_by_alternate_name(name).await? {
            debug!("Matched '{}' via alternate name to {}", name, party.name);
            return Ok(party);
        }

        // And if that doesn't work, just return the unknown party
        self.unknown().await
    }

    /// Resolve the party for a filer as of a reference date, usually the
    /// election date of the filing being processed.
    #[instrument(skip(self))]
    pub async fn resolve_by_filer(&self, filer_id: i64, reference_date: NaiveDate) -> Result<Party> {
        // Latest assignment effective at or before the reference date
        let assignment = match self
            .storage
            .latest_party_assignment(filer_id, reference_date)
            .await?
        {
            Some(assignment) => assignment,
            // No assignment on file: quit now
            None => return self.unknown().await,
        };

        // Transform "INDEPENDENT" and "NON-PARTISAN" codes to "NO PARTY PREFERENCE"
        let party_code = match assignment.party_code {
            PARTY_CODE_INDEPENDENT | PARTY_CODE_NON_PARTISAN => PARTY_CODE_NO_PARTY_PREFERENCE,
            code => code,
        };

        // Try pulling out the party using the lookup code
        if let Some(party) = self.storage.get_party_by_identifier(party_code).await? {
            return Ok(party);
        }

        // If that fails, fall back to the unknown party
        self.unknown().await
    }
}
