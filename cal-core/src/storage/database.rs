use crate::common::error::{EtlError, Result};
use crate::database::DatabaseManager;
use crate::domain::*;
use crate::storage::traits::Storage;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Database storage implementation backed by Turso/libSQL.
///
/// Each domain row is one JSON document node; `label` scopes rows to a
/// logical table and the filtered queries scan within a label.
pub struct DatabaseStorage {
    db: Arc<DatabaseManager>,
}

const PARTY: &str = "party";
const ASSIGNMENT: &str = "filer_party_assignment";
const CONTEST: &str = "contest";
const CANDIDACY: &str = "candidacy";
const FORM501: &str = "form501";
const RAW_EXPENDITURE: &str = "raw_expenditure";
const SCHEDULE_G_ITEM: &str = "schedule_g_item";
const SCHEDULE_G_ITEM_VERSION: &str = "schedule_g_item_version";
const LOAD_RUN: &str = "load_run";
const LOAD_RECORD: &str = "load_record";

impl DatabaseStorage {
    pub async fn new(db: DatabaseManager) -> Result<Self> {
        Ok(Self { db: Arc::new(db) })
    }

    fn to_node_data<T: Serialize>(row: &T, what: &str) -> Result<String> {
        serde_json::to_string(row).map_err(|e| EtlError::Database {
            message: format!("Failed to serialize {what}: {e}"),
        })
    }

    fn from_node_data<T: DeserializeOwned>(data: &str, what: &str) -> Result<T> {
        serde_json::from_str(data).map_err(|e| EtlError::Database {
            message: format!("Failed to deserialize {what}: {e}"),
        })
    }

    /// Load and decode every node under a label.
    async fn scan<T: DeserializeOwned>(&self, label: &str) -> Result<Vec<T>> {
        let nodes = self.db.get_nodes_by_label(label).await?;
        let mut rows = Vec::with_capacity(nodes.len());
        for (_id, _label, data) in nodes {
            rows.push(Self::from_node_data(&data, label)?);
        }
        Ok(rows)
    }

    /// Upsert a row as a JSON node under a label.
    async fn put<T: Serialize>(&self, label: &str, id: Uuid, row: &T) -> Result<()> {
        let data = Self::to_node_data(row, label)?;
        self.db.create_node(&id.to_string(), label, &data).await
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn create_party(&self, party: &mut Party) -> Result<()> {
        // Respect existing ID if provided; otherwise generate
        let id = party.id.unwrap_or_else(Uuid::new_v4);
        party.id = Some(id);
        self.put(PARTY, id, party).await?;
        info!("Upserted party: {} with id {}", party.name, id);
        Ok(())
    }

    async fn get_party_by_name(&self, name: &str) -> Result<Option<Party>> {
        let parties: Vec<Party> = self.scan(PARTY).await?;
        Ok(parties
            .into_iter()
            .find(|p| p.classification == "party" && p.name == name))
    }

    async fn get_party_by_alternate_name(&self, name: &str) -> Result<Option<Party>> {
        let parties: Vec<Party> = self.scan(PARTY).await?;
        Ok(parties
            .into_iter()
            .find(|p| p.classification == "party" && p.alternate_names.iter().any(|n| n == name)))
    }

    async fn get_party_by_identifier(&self, code: i64) -> Result<Option<Party>> {
        let parties: Vec<Party> = self.scan(PARTY).await?;
        Ok(parties
            .into_iter()
            .find(|p| p.classification == "party" && p.identifiers.contains(&code)))
    }

    async fn create_filer_party_assignment(&self, assignment: &mut FilerPartyAssignment) -> Result<()> {
        // Sequence is the insertion-order tie-break for equal effective dates
        let existing: Vec<FilerPartyAssignment> = self.scan(ASSIGNMENT).await?;
        assignment.sequence = existing.iter().map(|a| a.sequence).max().unwrap_or(0) + 1;

        let id = assignment.id.unwrap_or_else(Uuid::new_v4);
        assignment.id = Some(id);
        self.put(ASSIGNMENT, id, assignment).await?;

        debug!(
            "Upserted filer-party assignment for filer {} (sequence {})",
            assignment.filer_id, assignment.sequence
        );
        Ok(())
    }

    async fn latest_party_assignment(
        &self,
        filer_id: i64,
        as_of: NaiveDate,
    ) -> Result<Option<FilerPartyAssignment>> {
        let assignments: Vec<FilerPartyAssignment> = self.scan(ASSIGNMENT).await?;
        Ok(assignments
            .into_iter()
            .filter(|a| a.filer_id == filer_id && a.effective_date <= as_of)
            .max_by_key(|a| (a.effective_date, a.sequence)))
    }

    async fn create_contest(&self, contest: &mut Contest) -> Result<()> {
        let id = contest.id.unwrap_or_else(Uuid::new_v4);
        contest.id = Some(id);
        self.put(CONTEST, id, contest).await?;
        info!("Upserted contest: {} with id {}", contest.name, id);
        Ok(())
    }

    async fn get_contest_by_office_and_date(
        &self,
        office: &str,
        election_date: NaiveDate,
    ) -> Result<Option<Contest>> {
        let contests: Vec<Contest> = self.scan(CONTEST).await?;
        Ok(contests
            .into_iter()
            .find(|c| c.office == office && c.election_date == election_date))
    }

    async fn has_contests(&self) -> Result<bool> {
        let count = self.db.count_nodes_by_label(CONTEST).await?;
        Ok(count > 0)
    }

    async fn create_candidacy(&self, candidacy: &mut Candidacy) -> Result<()> {
        let id = candidacy.id.unwrap_or_else(Uuid::new_v4);
        candidacy.id = Some(id);
        self.put(CANDIDACY, id, candidacy).await?;
        info!("Upserted candidacy: {} with id {}", candidacy.candidate_name, id);
        Ok(())
    }

    async fn get_candidacy_by_key(
        &self,
        contest_id: Uuid,
        candidate_name: &str,
        filer_id: Option<i64>,
    ) -> Result<Option<Candidacy>> {
        let candidacies: Vec<Candidacy> = self.scan(CANDIDACY).await?;
        Ok(candidacies.into_iter().find(|c| {
            c.contest_id == contest_id
                && c.candidate_name == candidate_name
                && c.filer_id == filer_id
        }))
    }

    async fn update_candidacy(&self, candidacy: &Candidacy) -> Result<()> {
        let candidacy_id = candidacy.id.ok_or_else(|| EtlError::Store {
            message: "Cannot update candidacy without ID".to_string(),
        })?;
        self.put(CANDIDACY, candidacy_id, candidacy).await?;
        debug!(
            "Updated candidacy: {} with id {}",
            candidacy.candidate_name, candidacy_id
        );
        Ok(())
    }

    async fn create_form501_filing(&self, filing: &mut Form501Filing) -> Result<()> {
        let id = filing.id.unwrap_or_else(Uuid::new_v4);
        filing.id = Some(id);
        self.put(FORM501, id, filing).await?;
        debug!("Upserted Form 501 filing {}", filing.filing_id);
        Ok(())
    }

    async fn get_unlinked_form501s(&self) -> Result<Vec<Form501Filing>> {
        let filings: Vec<Form501Filing> = self.scan(FORM501).await?;
        let mut unlinked: Vec<Form501Filing> = filings
            .into_iter()
            .filter(|f| f.candidacy_id.is_none())
            .collect();
        unlinked.sort_by_key(|f| f.filing_id);
        Ok(unlinked)
    }

    async fn link_form501_to_candidacy(&self, filing_id: i64, candidacy_id: Uuid) -> Result<()> {
        let filings: Vec<Form501Filing> = self.scan(FORM501).await?;
        for mut filing in filings {
            if filing.filing_id == filing_id {
                let node_id = filing.id.ok_or_else(|| EtlError::Store {
                    message: format!("Form 501 filing {filing_id} has no stored ID"),
                })?;
                filing.candidacy_id = Some(candidacy_id);
                self.put(FORM501, node_id, &filing).await?;
                debug!("Linked Form 501 {} to candidacy {}", filing_id, candidacy_id);
            }
        }
        Ok(())
    }

    async fn create_raw_expenditure(&self, expenditure: &mut RawExpenditure) -> Result<()> {
        let id = expenditure.id.unwrap_or_else(Uuid::new_v4);
        expenditure.id = Some(id);
        self.put(RAW_EXPENDITURE, id, expenditure).await?;
        Ok(())
    }

    async fn get_raw_expenditures_by_form_type(&self, form_type: &str) -> Result<Vec<RawExpenditure>> {
        let rows: Vec<RawExpenditure> = self.scan(RAW_EXPENDITURE).await?;
        let mut filtered: Vec<RawExpenditure> = rows
            .into_iter()
            .filter(|e| e.form_type == form_type)
            .collect();
        filtered.sort_by_key(|e| (e.filing_id, e.amend_id, e.fields.line_item));
        Ok(filtered)
    }

    async fn create_schedule_g_item_version(
        &self,
        version: &mut Form460ScheduleGItemVersion,
    ) -> Result<()> {
        // Unique on (filing_id, amend_id, line_item): reloads reuse the stored id
        let existing: Vec<Form460ScheduleGItemVersion> = self.scan(SCHEDULE_G_ITEM_VERSION).await?;
        if let Some(previous) = existing.into_iter().find(|v| {
            v.filing_id == version.filing_id
                && v.amend_id == version.amend_id
                && v.fields.line_item == version.fields.line_item
        }) {
            version.id = previous.id;
        }

        let id = version.id.unwrap_or_else(Uuid::new_v4);
        version.id = Some(id);
        self.put(SCHEDULE_G_ITEM_VERSION, id, version).await?;
        Ok(())
    }

    async fn get_schedule_g_item_versions(
        &self,
        filing_id: i64,
    ) -> Result<Vec<Form460ScheduleGItemVersion>> {
        let versions: Vec<Form460ScheduleGItemVersion> = self.scan(SCHEDULE_G_ITEM_VERSION).await?;
        let mut rows: Vec<Form460ScheduleGItemVersion> = versions
            .into_iter()
            .filter(|v| v.filing_id == filing_id)
            .collect();
        rows.sort_by_key(|v| (v.amend_id, v.fields.line_item));
        Ok(rows)
    }

    async fn replace_schedule_g_items(
        &self,
        filing_id: i64,
        items: Vec<Form460ScheduleGItem>,
    ) -> Result<Vec<Form460ScheduleGItem>> {
        let existing: Vec<Form460ScheduleGItem> = self.scan(SCHEDULE_G_ITEM).await?;
        for item in existing.iter().filter(|i| i.filing_id == filing_id) {
            if let Some(old_id) = item.id {
                self.db.delete_node(&old_id.to_string()).await?;
            }
        }

        let mut inserted = Vec::with_capacity(items.len());
        for mut item in items {
            let id = Uuid::new_v4();
            item.id = Some(id);
            self.put(SCHEDULE_G_ITEM, id, &item).await?;
            inserted.push(item);
        }

        info!(
            "Replaced Schedule G items for filing {}: {} rows",
            filing_id,
            inserted.len()
        );
        Ok(inserted)
    }

    async fn get_schedule_g_items(&self, filing_id: i64) -> Result<Vec<Form460ScheduleGItem>> {
        let items: Vec<Form460ScheduleGItem> = self.scan(SCHEDULE_G_ITEM).await?;
        let mut rows: Vec<Form460ScheduleGItem> = items
            .into_iter()
            .filter(|i| i.filing_id == filing_id)
            .collect();
        rows.sort_by_key(|i| i.fields.line_item);
        Ok(rows)
    }

    async fn create_load_run(&self, run: &mut LoadRun) -> Result<()> {
        let id = run.id.unwrap_or_else(Uuid::new_v4);
        run.id = Some(id);
        self.put(LOAD_RUN, id, run).await?;
        debug!("Created load run: {} with id {}", run.name, id);
        Ok(())
    }

    async fn update_load_run(&self, run: &LoadRun) -> Result<()> {
        let run_id = run.id.ok_or_else(|| EtlError::Store {
            message: "Cannot update load run without ID".to_string(),
        })?;
        self.put(LOAD_RUN, run_id, run).await?;
        Ok(())
    }

    async fn create_load_record(&self, record: &mut LoadRecord) -> Result<()> {
        let id = record.id.unwrap_or_else(Uuid::new_v4);
        record.id = Some(id);
        self.put(LOAD_RECORD, id, record).await?;
        Ok(())
    }
}
