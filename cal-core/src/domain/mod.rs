use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name of the sentinel party returned when resolution misses.
pub const UNKNOWN_PARTY_NAME: &str = "UNKNOWN";

/// A political party in the normalized OCD schema.
///
/// Only organizations classified as `"party"` take part in resolution.
/// `identifiers` holds the CAL-ACCESS numeric lookup codes carried over
/// from the raw filer type data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: Option<Uuid>,
    pub name: String,
    pub alternate_names: Vec<String>,
    pub identifiers: Vec<i64>,
    pub classification: String,
    pub created_at: DateTime<Utc>,
}

impl Party {
    pub fn new(name: impl Into<String>, alternate_names: Vec<String>, identifiers: Vec<i64>) -> Self {
        Self {
            id: None,
            name: name.into(),
            alternate_names,
            identifiers,
            classification: "party".to_string(),
            created_at: Utc::now(),
        }
    }

    /// The sentinel party yielded when no match is found.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_PARTY_NAME, Vec::new(), Vec::new())
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_PARTY_NAME
    }
}

/// A time-bounded link between a filer id and a party lookup code,
/// sourced from the raw filer type records. Read-only to the loaders.
///
/// `sequence` is assigned by the store on insert and breaks ties when two
/// assignments share the same effective date (latest inserted wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilerPartyAssignment {
    pub id: Option<Uuid>,
    pub filer_id: i64,
    pub party_code: i64,
    pub effective_date: NaiveDate,
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl FilerPartyAssignment {
    pub fn new(filer_id: i64, party_code: i64, effective_date: NaiveDate) -> Self {
        Self {
            id: None,
            filer_id,
            party_code,
            effective_date,
            sequence: 0,
            created_at: Utc::now(),
        }
    }
}

/// An election contest (office plus election date), loaded upstream of
/// the candidacy pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contest {
    pub id: Option<Uuid>,
    /// Normalized office label, including the district where one applies,
    /// e.g. "STATE SENATE DISTRICT 7".
    pub office: String,
    pub election_date: NaiveDate,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Contest {
    pub fn new(office: impl Into<String>, election_date: NaiveDate) -> Self {
        let office = office.into();
        let name = format!("{} {}", election_date, office);
        Self {
            id: None,
            office,
            election_date,
            name,
            created_at: Utc::now(),
        }
    }
}

/// A candidate's participation in one contest.
///
/// Keyed by (contest_id, candidate_name, filer_id); created lazily the
/// first time a filing implies it, then updated in place by later filings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidacy {
    pub id: Option<Uuid>,
    pub contest_id: Uuid,
    /// Parsed sort name, e.g. "DOE, JANE".
    pub candidate_name: String,
    pub filer_id: Option<i64>,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub name_suffix: String,
    pub party_id: Option<Uuid>,
    /// Filing ids of the Form 501s linked to this candidacy.
    pub form501_filing_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl Candidacy {
    pub fn new(contest_id: Uuid, candidate_name: impl Into<String>, filer_id: Option<i64>) -> Self {
        Self {
            id: None,
            contest_id,
            candidate_name: candidate_name.into(),
            filer_id,
            title: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            name_suffix: String::new(),
            party_id: None,
            form501_filing_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the given filing is already linked to this candidacy.
    pub fn has_form501(&self, filing_id: i64) -> bool {
        self.form501_filing_ids.contains(&filing_id)
    }
}

/// A raw Form 501 (candidate intention statement) filing.
///
/// Immutable source data apart from `candidacy_id`, which is set once the
/// filing has been reconciled so later passes skip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form501Filing {
    pub id: Option<Uuid>,
    pub filing_id: i64,
    pub filer_id: Option<i64>,
    pub office: String,
    pub district: Option<String>,
    pub election_date: Option<NaiveDate>,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub name_suffix: String,
    /// Party name exactly as written on the filing.
    pub party: String,
    pub candidacy_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Form501Filing {
    /// Sort-order candidate name, "LAST, FIRST SUFFIX".
    pub fn parsed_name(&self) -> String {
        let mut name = self.last_name.trim().to_string();
        let first = self.first_name.trim();
        if !first.is_empty() {
            name.push_str(", ");
            name.push_str(first);
        }
        let suffix = self.name_suffix.trim();
        if !suffix.is_empty() {
            name.push(' ');
            name.push_str(suffix);
        }
        name
    }

    /// Office label used for contest matching, with the district folded in.
    pub fn office_label(&self) -> String {
        match self.district.as_deref() {
            Some(district) if !district.trim().is_empty() => {
                format!("{} DISTRICT {}", self.office.trim(), district.trim())
            }
            _ => self.office.trim().to_string(),
        }
    }
}

/// Fields shared by every representation of a Schedule G line item:
/// payments made on a filer's behalf by an agent or contractor.
///
/// Shared between the current-item and per-version tables by composition;
/// nothing varies per table except the surrounding keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleGItemFields {
    pub line_item: i64,
    pub agent_title: String,
    pub agent_lastname: String,
    pub agent_firstname: String,
    pub agent_name_suffix: String,
    /// Which schedule ('E' or 'F') carries the parent item.
    pub parent_schedule: String,
    pub payee_name: String,
    /// Payment amount in cents; the source data is fixed to two decimal
    /// places, so integer cents round-trip without drift.
    pub amount_cents: i64,
    pub expense_date: Option<NaiveDate>,
    pub expense_description: String,
}

/// A payment itemized on Schedule G of the most recent version of a
/// Form 460 filing. Unique on (filing_id, line_item).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form460ScheduleGItem {
    pub id: Option<Uuid>,
    pub filing_id: i64,
    pub fields: ScheduleGItemFields,
    pub created_at: DateTime<Utc>,
}

/// Every version of each Schedule G payment, one row per amendment.
/// Unique on (filing_id, amend_id, line_item).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form460ScheduleGItemVersion {
    pub id: Option<Uuid>,
    pub filing_id: i64,
    pub amend_id: i64,
    pub fields: ScheduleGItemFields,
    pub created_at: DateTime<Utc>,
}

/// A raw EXPN_CD-shaped expenditure row. Schedule G line items are the
/// rows whose form_type is "G".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExpenditure {
    pub id: Option<Uuid>,
    pub filing_id: i64,
    pub amend_id: i64,
    pub form_type: String,
    pub fields: ScheduleGItemFields,
    pub created_at: DateTime<Utc>,
}

/// Change types recorded during load passes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ChangeType {
    Created,
    Updated,
    NoChange,
    Skip,
    Error,
}

/// Entity types a load record can point at
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FieldChanged {
    Candidacy,
    Party,
    Contest,
    ScheduleG,
    None,
}

/// One invocation of a load pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRun {
    pub id: Option<Uuid>,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl LoadRun {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

/// A record of one change made during a load run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRecord {
    pub id: Option<Uuid>,
    pub load_run_id: Uuid,
    pub source: String,
    pub filing_id: Option<i64>,
    pub change_type: ChangeType,
    pub change_log: String,
    pub field_changed: FieldChanged,
    pub candidacy_id: Option<Uuid>,
    pub party_id: Option<Uuid>,
    pub contest_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl LoadRecord {
    pub fn new(
        load_run_id: Uuid,
        source: impl Into<String>,
        filing_id: Option<i64>,
        change_type: ChangeType,
        change_log: impl Into<String>,
        field_changed: FieldChanged,
    ) -> Self {
        Self {
            id: None,
            load_run_id,
            source: source.into(),
            filing_id,
            change_type,
            change_log: change_log.into(),
            field_changed,
            candidacy_id: None,
            party_id: None,
            contest_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_candidacy(mut self, candidacy_id: Uuid) -> Self {
        self.candidacy_id = Some(candidacy_id);
        self
    }

    pub fn with_party(mut self, party_id: Uuid) -> Self {
        self.party_id = Some(party_id);
        self
    }

    pub fn with_contest(mut self, contest_id: Uuid) -> Self {
        self.contest_id = Some(contest_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_name_includes_first_and_suffix() {
        let filing = Form501Filing {
            id: None,
            filing_id: 1,
            filer_id: None,
            office: "GOVERNOR".to_string(),
            district: None,
            election_date: None,
            title: String::new(),
            first_name: "JANE".to_string(),
            last_name: "DOE".to_string(),
            name_suffix: "JR".to_string(),
            party: String::new(),
            candidacy_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(filing.parsed_name(), "DOE, JANE JR");
    }

    #[test]
    fn office_label_folds_in_district() {
        let mut filing = Form501Filing {
            id: None,
            filing_id: 1,
            filer_id: None,
            office: "STATE SENATE".to_string(),
            district: Some("7".to_string()),
            election_date: None,
            title: String::new(),
            first_name: String::new(),
            last_name: "DOE".to_string(),
            name_suffix: String::new(),
            party: String::new(),
            candidacy_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(filing.office_label(), "STATE SENATE DISTRICT 7");

        filing.district = None;
        assert_eq!(filing.office_label(), "STATE SENATE");
    }

    #[test]
    fn unknown_party_predicate() {
        assert!(Party::unknown().is_unknown());
        assert!(!Party::new("DEMOCRATIC", vec![], vec![16001]).is_unknown());
    }
}
