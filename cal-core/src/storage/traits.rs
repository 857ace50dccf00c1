use crate::common::error::Result;
use crate::domain::*;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

/// Storage trait for the normalized (OCD) and raw (CAL-ACCESS) tables the
/// load passes read and write.
#[async_trait]
pub trait Storage: Send + Sync {
    // Party operations
    async fn create_party(&self, party: &mut Party) -> Result<()>;
    async fn get_party_by_name(&self, name: &str) -> Result<Option<Party>>;
    async fn get_party_by_alternate_name(&self, name: &str) -> Result<Option<Party>>;
    async fn get_party_by_identifier(&self, code: i64) -> Result<Option<Party>>;

    // Filer-party assignment operations
    async fn create_filer_party_assignment(&self, assignment: &mut FilerPartyAssignment) -> Result<()>;
    /// Latest assignment for the filer effective at or before `as_of`;
    /// ties on effective date go to the highest sequence.
    async fn latest_party_assignment(
        &self,
        filer_id: i64,
        as_of: NaiveDate,
    ) -> Result<Option<FilerPartyAssignment>>;

    // Contest operations
    async fn create_contest(&self, contest: &mut Contest) -> Result<()>;
    async fn get_contest_by_office_and_date(
        &self,
        office: &str,
        election_date: NaiveDate,
    ) -> Result<Option<Contest>>;
    async fn has_contests(&self) -> Result<bool>;

    // Candidacy operations
    async fn create_candidacy(&self, candidacy: &mut Candidacy) -> Result<()>;
    async fn get_candidacy_by_key(
        &self,
        contest_id: Uuid,
        candidate_name: &str,
        filer_id: Option<i64>,
    ) -> Result<Option<Candidacy>>;
    async fn update_candidacy(&self, candidacy: &Candidacy) -> Result<()>;

    // Form 501 operations
    async fn create_form501_filing(&self, filing: &mut Form501Filing) -> Result<()>;
    /// Filings not yet linked to a candidacy, ascending by filing_id.
    async fn get_unlinked_form501s(&self) -> Result<Vec<Form501Filing>>;
    async fn link_form501_to_candidacy(&self, filing_id: i64, candidacy_id: Uuid) -> Result<()>;

    // Raw expenditure operations
    async fn create_raw_expenditure(&self, expenditure: &mut RawExpenditure) -> Result<()>;
    /// Raw rows for the given form type, ascending by
    /// (filing_id, amend_id, line_item).
    async fn get_raw_expenditures_by_form_type(&self, form_type: &str) -> Result<Vec<RawExpenditure>>;

    // Schedule G operations
    async fn create_schedule_g_item_version(&self, version: &mut Form460ScheduleGItemVersion) -> Result<()>;
    async fn get_schedule_g_item_versions(&self, filing_id: i64) -> Result<Vec<Form460ScheduleGItemVersion>>;
    /// Replace all current items for the filing with the given set.
    async fn replace_schedule_g_items(
        &self,
        filing_id: i64,
        items: Vec<Form460ScheduleGItem>,
    ) -> Result<Vec<Form460ScheduleGItem>>;
    async fn get_schedule_g_items(&self, filing_id: i64) -> Result<Vec<Form460ScheduleGItem>>;

    // Load run operations
    async fn create_load_run(&self, run: &mut LoadRun) -> Result<()>;
    async fn update_load_run(&self, run: &LoadRun) -> Result<()>;

    // Load record operations
    async fn create_load_record(&self, record: &mut LoadRecord) -> Result<()>;
}
