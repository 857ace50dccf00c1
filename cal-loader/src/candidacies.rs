use crate::common::error::{LoaderError, Result};
use crate::contests::ContestResolver;
use crate::parties::PartyResolver;
use cal_core::domain::{
    Candidacy, ChangeType, Contest, FieldChanged, Form501Filing, LoadRecord, LoadRun,
};
use cal_core::storage::Storage;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const SOURCE: &str = "form501";

/// Counts reported by one candidacy load pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadOutcome {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    /// True when the pass stopped at a filing whose contest could not be
    /// derived, leaving later filings for a future pass.
    pub halted: bool,
}

/// Drives one batch pass that upgrades unlinked Form 501 filings into
/// reconciled OCD candidacies.
pub struct CandidacyLoader {
    storage: Arc<dyn Storage>,
    contests: ContestResolver,
    parties: PartyResolver,
}

impl CandidacyLoader {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            contests: ContestResolver::new(storage.clone()),
            parties: PartyResolver::new(storage.clone()),
            storage,
        }
    }

    /// Run the load pass over every unlinked Form 501 filing.
    ///
    /// Fails before touching any record if no contests are loaded at all.
    /// Stops early (with `halted` set) at the first filing whose contest
    /// cannot be derived: that signals the contest load has not run for
    /// the election in question, and every filing after it would hit the
    /// same wall. Filings already processed stay committed.
    pub async fn run(&self) -> Result<LoadOutcome> {
        if !self.storage.has_contests().await? {
            return Err(LoaderError::Precondition(
                "No contests currently loaded (run the contest load first)".to_string(),
            ));
        }

        let mut run = LoadRun::new("load-candidacies");
        self.storage.create_load_run(&mut run).await?;
        let run_id = run.id.unwrap();

        let filings = self.storage.get_unlinked_form501s().await?;
        info!("Loading candidacies from {} unlinked Form 501 filings", filings.len());

        let mut outcome = LoadOutcome::default();
        for filing in &filings {
            debug!("Processing Form 501: {}", filing.filing_id);

            let contest = match self.contests.resolve(filing).await? {
                Some(contest) => contest,
                None => {
                    warn!(
                        "No contest derivable for Form 501 {}; halting pass (load contests first)",
                        filing.filing_id
                    );
                    let mut record = LoadRecord::new(
                        run_id,
                        SOURCE,
                        Some(filing.filing_id),
                        ChangeType::Skip,
                        format!(
                            "No contest for office '{}'; pass halted",
                            filing.office_label()
                        ),
                        FieldChanged::Contest,
                    );
                    self.storage.create_load_record(&mut record).await?;
                    outcome.halted = true;
                    break;
                }
            };

            let (candidacy, created) =
                self.get_or_create_candidacy(&contest, filing, run_id).await?;
            if created {
                outcome.created += 1;
            } else {
                outcome.updated += 1;
            }

            self.link_and_refresh(candidacy, filing, run_id).await?;
            outcome.processed += 1;
        }

        run.finish();
        self.storage.update_load_run(&run).await?;

        info!(
            "Candidacy pass finished: {} processed, {} created, {} updated, halted: {}",
            outcome.processed, outcome.created, outcome.updated, outcome.halted
        );
        Ok(outcome)
    }

    /// Get or create the candidacy keyed by (contest, parsed name, filer id).
    #[instrument(skip(self, contest, filing))]
    async fn get_or_create_candidacy(
        &self,
        contest: &Contest,
        filing: &Form501Filing,
        run_id: Uuid,
    ) -> Result<(Candidacy, bool)> {
        let contest_id = contest.id.ok_or_else(|| LoaderError::Storage {
            message: format!("Contest '{}' has no stored ID", contest.name),
        })?;
        let candidate_name = filing.parsed_name();

        if let Some(existing) = self
            .storage
            .get_candidacy_by_key(contest_id, &candidate_name, filing.filer_id)
            .await?
        {
            debug!(
                "Found existing candidacy: {} in {}",
                existing.candidate_name, contest.name
            );
            let mut record = LoadRecord::new(
                run_id,
                SOURCE,
                Some(filing.filing_id),
                ChangeType::NoChange,
                format!("Using existing candidacy: {candidate_name}"),
                FieldChanged::Candidacy,
            )
            .with_candidacy(existing.id.unwrap())
            .with_contest(contest_id);
            self.storage.create_load_record(&mut record).await?;

            return Ok((existing, false));
        }

        let mut candidacy = Candidacy::new(contest_id, candidate_name.clone(), filing.filer_id);
        self.storage.create_candidacy(&mut candidacy).await?;

        info!("Created new candidacy: {} in {}", candidate_name, contest.name);

        let mut record = LoadRecord::new(
            run_id,
            SOURCE,
            Some(filing.filing_id),
            ChangeType::Created,
            format!("Created new candidacy: {candidate_name} in {}", contest.name),
            FieldChanged::Candidacy,
        )
        .with_candidacy(candidacy.id.unwrap())
        .with_contest(contest_id);
        self.storage.create_load_record(&mut record).await?;

        Ok((candidacy, true))
    }

    /// Attach the filing to the candidacy and refresh derived fields,
    /// last-write-wins.
    #[instrument(skip(self, candidacy, filing))]
    async fn link_and_refresh(
        &self,
        mut candidacy: Candidacy,
        filing: &Form501Filing,
        run_id: Uuid,
    ) -> Result<()> {
        let candidacy_id = candidacy.id.ok_or_else(|| LoaderError::Storage {
            message: "Candidacy has no stored ID".to_string(),
        })?;

        if !candidacy.has_form501(filing.filing_id) {
            candidacy.form501_filing_ids.push(filing.filing_id);
        }

        // A later filing's data overwrites an earlier one's
        candidacy.candidate_name = filing.parsed_name();
        candidacy.title = filing.title.trim().to_string();
        candidacy.first_name = filing.first_name.trim().to_string();
        candidacy.last_name = filing.last_name.trim().to_string();
        candidacy.name_suffix = filing.name_suffix.trim().to_string();

        let party = self.resolve_party(filing).await?;
        let mut record = LoadRecord::new(
            run_id,
            SOURCE,
            Some(filing.filing_id),
            ChangeType::Updated,
            format!(
                "Linked Form 501 {} to candidacy {} (party: {})",
                filing.filing_id, candidacy.candidate_name, party.name
            ),
            FieldChanged::Candidacy,
        )
        .with_candidacy(candidacy_id);
        if let Some(party_id) = party.id {
            candidacy.party_id = Some(party_id);
            record = record.with_party(party_id);
        }

        self.storage.update_candidacy(&candidacy).await?;
        self.storage
            .link_form501_to_candidacy(filing.filing_id, candidacy_id)
            .await?;
        self.storage.create_load_record(&mut record).await?;

        Ok(())
    }

    /// Party for the filing: the raw party name first, then the filer's
    /// assignment as of the election date when the name resolves unknown.
    async fn resolve_party(&self, filing: &Form501Filing) -> Result<cal_core::domain::Party> {
        let mut party = self.parties.resolve_by_name(&filing.party).await?;
        if party.is_unknown() {
            if let (Some(filer_id), Some(election_date)) = (filing.filer_id, filing.election_date) {
                party = self.parties.resolve_by_filer(filer_id, election_date).await?;
            }
        }
        Ok(party)
    }
}
