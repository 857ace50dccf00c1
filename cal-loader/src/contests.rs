use crate::common::error::Result;
use cal_core::domain::{Contest, Form501Filing};
use cal_core::storage::Storage;
use std::sync::Arc;
use tracing::debug;

/// Derives the contest implied by a Form 501 filing.
///
/// Contests are loaded by an upstream pass; this resolver only matches,
/// it never creates. A `None` result means the contest-loading step has
/// not run for this election yet.
pub struct ContestResolver {
    storage: Arc<dyn Storage>,
}

impl ContestResolver {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn resolve(&self, filing: &Form501Filing) -> Result<Option<Contest>> {
        let election_date = match filing.election_date {
            Some(date) => date,
            None => {
                debug!(
                    "Form 501 {} carries no election date; no contest derivable",
                    filing.filing_id
                );
                return Ok(None);
            }
        };

        let office = filing.office_label();
        if office.is_empty() {
            debug!(
                "Form 501 {} carries no office; no contest derivable",
                filing.filing_id
            );
            return Ok(None);
        }

        let contest = self
            .storage
            .get_contest_by_office_and_date(&office, election_date)
            .await?;
        Ok(contest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cal_core::storage::InMemoryStorage;
    use chrono::{NaiveDate, Utc};

    fn filing(office: &str, district: Option<&str>, election_date: Option<NaiveDate>) -> Form501Filing {
        Form501Filing {
            id: None,
            filing_id: 1,
            filer_id: None,
            office: office.to_string(),
            district: district.map(str::to_string),
            election_date,
            title: String::new(),
            first_name: String::new(),
            last_name: "DOE".to_string(),
            name_suffix: String::new(),
            party: String::new(),
            candidacy_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn resolves_contest_by_office_and_date() {
        let storage = Arc::new(InMemoryStorage::new());
        let election = NaiveDate::from_ymd_opt(2016, 6, 7).unwrap();
        let mut contest = Contest::new("STATE SENATE DISTRICT 7", election);
        storage.create_contest(&mut contest).await.unwrap();

        let resolver = ContestResolver::new(storage);
        let found = resolver
            .resolve(&filing("STATE SENATE", Some("7"), Some(election)))
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, contest.id);
    }

    #[tokio::test]
    async fn missing_election_date_yields_none() {
        let storage = Arc::new(InMemoryStorage::new());
        let resolver = ContestResolver::new(storage);
        let found = resolver
            .resolve(&filing("GOVERNOR", None, None))
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
