use crate::common::error::{EtlError, Result};
use crate::domain::*;
use crate::storage::traits::Storage;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// In-memory storage implementation for development/testing
pub struct InMemoryStorage {
    parties: Arc<Mutex<HashMap<Uuid, Party>>>,
    assignments: Arc<Mutex<HashMap<Uuid, FilerPartyAssignment>>>,
    contests: Arc<Mutex<HashMap<Uuid, Contest>>>,
    candidacies: Arc<Mutex<HashMap<Uuid, Candidacy>>>,
    form501s: Arc<Mutex<HashMap<Uuid, Form501Filing>>>,
    raw_expenditures: Arc<Mutex<HashMap<Uuid, RawExpenditure>>>,
    schedule_g_items: Arc<Mutex<HashMap<Uuid, Form460ScheduleGItem>>>,
    schedule_g_item_versions: Arc<Mutex<HashMap<Uuid, Form460ScheduleGItemVersion>>>,
    load_runs: Arc<Mutex<HashMap<Uuid, LoadRun>>>,
    load_records: Arc<Mutex<HashMap<Uuid, LoadRecord>>>,
    assignment_sequence: AtomicU64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            parties: Arc::new(Mutex::new(HashMap::new())),
            assignments: Arc::new(Mutex::new(HashMap::new())),
            contests: Arc::new(Mutex::new(HashMap::new())),
            candidacies: Arc::new(Mutex::new(HashMap::new())),
            form501s: Arc::new(Mutex::new(HashMap::new())),
            raw_expenditures: Arc::new(Mutex::new(HashMap::new())),
            schedule_g_items: Arc::new(Mutex::new(HashMap::new())),
            schedule_g_item_versions: Arc::new(Mutex::new(HashMap::new())),
            load_runs: Arc::new(Mutex::new(HashMap::new())),
            load_records: Arc::new(Mutex::new(HashMap::new())),
            assignment_sequence: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_party(&self, party: &mut Party) -> Result<()> {
        let id = Uuid::new_v4();
        party.id = Some(id);

        let mut parties = self.parties.lock().unwrap();
        parties.insert(id, party.clone());

        debug!("Created party: {} with id {}", party.name, id);
        Ok(())
    }

    async fn get_party_by_name(&self, name: &str) -> Result<Option<Party>> {
        let parties = self.parties.lock().unwrap();
        let party = parties
            .values()
            .find(|p| p.classification == "party" && p.name == name)
            .cloned();
        Ok(party)
    }

    async fn get_party_by_alternate_name(&self, name: &str) -> Result<Option<Party>> {
        let parties = self.parties.lock().unwrap();
        let party = parties
            .values()
            .find(|p| p.classification == "party" && p.alternate_names.iter().any(|n| n == name))
            .cloned();
        Ok(party)
    }

    async fn get_party_by_identifier(&self, code: i64) -> Result<Option<Party>> {
        let parties = self.parties.lock().unwrap();
        let party = parties
            .values()
            .find(|p| p.classification == "party" && p.identifiers.contains(&code))
            .cloned();
        Ok(party)
    }

    async fn create_filer_party_assignment(&self, assignment: &mut FilerPartyAssignment) -> Result<()> {
        let id = Uuid::new_v4();
        assignment.id = Some(id);
        assignment.sequence = self.assignment_sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let mut assignments = self.assignments.lock().unwrap();
        assignments.insert(id, assignment.clone());

        debug!(
            "Created filer-party assignment for filer {} with id {}",
            assignment.filer_id, id
        );
        Ok(())
    }

    async fn latest_party_assignment(
        &self,
        filer_id: i64,
        as_of: NaiveDate,
    ) -> Result<Option<FilerPartyAssignment>> {
        let assignments = self.assignments.lock().unwrap();
        let assignment = assignments
            .values()
            .filter(|a| a.filer_id == filer_id && a.effective_date <= as_of)
            .max_by_key(|a| (a.effective_date, a.sequence))
            .cloned();
        Ok(assignment)
    }

    async fn create_contest(&self, contest: &mut Contest) -> Result<()> {
        let id = Uuid::new_v4();
        contest.id = Some(id);

        let mut contests = self.contests.lock().unwrap();
        contests.insert(id, contest.clone());

        debug!("Created contest: {} with id {}", contest.name, id);
        Ok(())
    }

    async fn get_contest_by_office_and_date(
        &self,
        office: &str,
        election_date: NaiveDate,
    ) -> Result<Option<Contest>> {
        let contests = self.contests.lock().unwrap();
        let contest = contests
            .values()
            .find(|c| c.office == office && c.election_date == election_date)
            .cloned();
        Ok(contest)
    }

    async fn has_contests(&self) -> Result<bool> {
        let contests = self.contests.lock().unwrap();
        Ok(!contests.is_empty())
    }

    async fn create_candidacy(&self, candidacy: &mut Candidacy) -> Result<()> {
        let id = Uuid::new_v4();
        candidacy.id = Some(id);

        let mut candidacies = self.candidacies.lock().unwrap();
        candidacies.insert(id, candidacy.clone());

        debug!("Created candidacy: {} with id {}", candidacy.candidate_name, id);
        Ok(())
    }

    async fn get_candidacy_by_key(
        &self,
        contest_id: Uuid,
        candidate_name: &str,
        filer_id: Option<i64>,
    ) -> Result<Option<Candidacy>> {
        let candidacies = self.candidacies.lock().unwrap();
        let candidacy = candidacies
            .values()
            .find(|c| {
                c.contest_id == contest_id
                    && c.candidate_name == candidate_name
                    && c.filer_id == filer_id
            })
            .cloned();
        Ok(candidacy)
    }

    async fn update_candidacy(&self, candidacy: &Candidacy) -> Result<()> {
        let candidacy_id = candidacy.id.ok_or_else(|| EtlError::Store {
            message: "Cannot update candidacy without ID".to_string(),
        })?;

        let mut candidacies = self.candidacies.lock().unwrap();
        candidacies.insert(candidacy_id, candidacy.clone());

        debug!(
            "Updated candidacy: {} with id {}",
            candidacy.candidate_name, candidacy_id
        );
        Ok(())
    }

    async fn create_form501_filing(&self, filing: &mut Form501Filing) -> Result<()> {
        let id = Uuid::new_v4();
        filing.id = Some(id);

        let mut form501s = self.form501s.lock().unwrap();
        form501s.insert(id, filing.clone());

        debug!("Created Form 501 filing {} with id {}", filing.filing_id, id);
        Ok(())
    }

    async fn get_unlinked_form501s(&self) -> Result<Vec<Form501Filing>> {
        let form501s = self.form501s.lock().unwrap();
        let mut unlinked: Vec<Form501Filing> = form501s
            .values()
            .filter(|f| f.candidacy_id.is_none())
            .cloned()
            .collect();

        // Stable processing order
        unlinked.sort_by_key(|f| f.filing_id);
        Ok(unlinked)
    }

    async fn link_form501_to_candidacy(&self, filing_id: i64, candidacy_id: Uuid) -> Result<()> {
        let mut form501s = self.form501s.lock().unwrap();
        for filing in form501s.values_mut() {
            if filing.filing_id == filing_id {
                filing.candidacy_id = Some(candidacy_id);
                debug!("Linked Form 501 {} to candidacy {}", filing_id, candidacy_id);
            }
        }
        Ok(())
    }

    async fn create_raw_expenditure(&self, expenditure: &mut RawExpenditure) -> Result<()> {
        let id = Uuid::new_v4();
        expenditure.id = Some(id);

        let mut raw_expenditures = self.raw_expenditures.lock().unwrap();
        raw_expenditures.insert(id, expenditure.clone());

        debug!(
            "Created raw expenditure for filing {} with id {}",
            expenditure.filing_id, id
        );
        Ok(())
    }

    async fn get_raw_expenditures_by_form_type(&self, form_type: &str) -> Result<Vec<RawExpenditure>> {
        let raw_expenditures = self.raw_expenditures.lock().unwrap();
        let mut rows: Vec<RawExpenditure> = raw_expenditures
            .values()
            .filter(|e| e.form_type == form_type)
            .cloned()
            .collect();

        rows.sort_by_key(|e| (e.filing_id, e.amend_id, e.fields.line_item));
        Ok(rows)
    }

    async fn create_schedule_g_item_version(
        &self,
        version: &mut Form460ScheduleGItemVersion,
    ) -> Result<()> {
        let id = Uuid::new_v4();
        version.id = Some(id);

        let mut versions = self.schedule_g_item_versions.lock().unwrap();

        // Unique on (filing_id, amend_id, line_item): reloading replaces
        let existing: Vec<Uuid> = versions
            .iter()
            .filter(|(_, v)| {
                v.filing_id == version.filing_id
                    && v.amend_id == version.amend_id
                    && v.fields.line_item == version.fields.line_item
            })
            .map(|(id, _)| *id)
            .collect();
        for old_id in existing {
            versions.remove(&old_id);
        }

        versions.insert(id, version.clone());
        Ok(())
    }

    async fn get_schedule_g_item_versions(
        &self,
        filing_id: i64,
    ) -> Result<Vec<Form460ScheduleGItemVersion>> {
        let versions = self.schedule_g_item_versions.lock().unwrap();
        let mut rows: Vec<Form460ScheduleGItemVersion> = versions
            .values()
            .filter(|v| v.filing_id == filing_id)
            .cloned()
            .collect();
        rows.sort_by_key(|v| (v.amend_id, v.fields.line_item));
        Ok(rows)
    }

    async fn replace_schedule_g_items(
        &self,
        filing_id: i64,
        items: Vec<Form460ScheduleGItem>,
    ) -> Result<Vec<Form460ScheduleGItem>> {
        let mut table = self.schedule_g_items.lock().unwrap();

        let existing: Vec<Uuid> = table
            .iter()
            .filter(|(_, item)| item.filing_id == filing_id)
            .map(|(id, _)| *id)
            .collect();
        for old_id in existing {
            table.remove(&old_id);
        }

        let mut inserted = Vec::with_capacity(items.len());
        for mut item in items {
            let id = Uuid::new_v4();
            item.id = Some(id);
            table.insert(id, item.clone());
            inserted.push(item);
        }

        debug!(
            "Replaced Schedule G items for filing {}: {} rows",
            filing_id,
            inserted.len()
        );
        Ok(inserted)
    }

    async fn get_schedule_g_items(&self, filing_id: i64) -> Result<Vec<Form460ScheduleGItem>> {
        let items = self.schedule_g_items.lock().unwrap();
        let mut rows: Vec<Form460ScheduleGItem> = items
            .values()
            .filter(|item| item.filing_id == filing_id)
            .cloned()
            .collect();
        rows.sort_by_key(|item| item.fields.line_item);
        Ok(rows)
    }

    async fn create_load_run(&self, run: &mut LoadRun) -> Result<()> {
        let id = Uuid::new_v4();
        run.id = Some(id);

        let mut runs = self.load_runs.lock().unwrap();
        runs.insert(id, run.clone());

        debug!("Created load run: {} with id {}", run.name, id);
        Ok(())
    }

    async fn update_load_run(&self, run: &LoadRun) -> Result<()> {
        let run_id = run.id.ok_or_else(|| EtlError::Store {
            message: "Cannot update load run without ID".to_string(),
        })?;

        let mut runs = self.load_runs.lock().unwrap();
        runs.insert(run_id, run.clone());

        debug!("Updated load run: {} with id {}", run.name, run_id);
        Ok(())
    }

    async fn create_load_record(&self, record: &mut LoadRecord) -> Result<()> {
        let id = Uuid::new_v4();
        record.id = Some(id);

        let mut records = self.load_records.lock().unwrap();
        records.insert(id, record.clone());

        debug!("Created load record with id {}", id);
        Ok(())
    }
}
