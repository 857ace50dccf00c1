use crate::common::error::Result;
use cal_core::domain::{
    ChangeType, FieldChanged, Form460ScheduleGItem, Form460ScheduleGItemVersion, LoadRecord,
    LoadRun, RawExpenditure,
};
use cal_core::storage::Storage;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

const SOURCE: &str = "form460_schedule_g";

/// Raw expenditure rows carrying Schedule G line items.
const SCHEDULE_G_FORM_TYPE: &str = "G";

/// Counts reported by one Schedule G load pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScheduleGOutcome {
    pub filings: usize,
    pub items: usize,
    pub versions: usize,
}

/// Loads Schedule G of Form 460: payments made on a filer's behalf by
/// agents or contractors.
///
/// Every raw row becomes an item-version row; current items are rebuilt
/// from the highest amendment of each filing, replacing whatever was
/// loaded before. Re-running the pass on unchanged raw data leaves the
/// store in the same state.
pub struct ScheduleGLoader {
    storage: Arc<dyn Storage>,
}

impl ScheduleGLoader {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ScheduleGOutcome> {
        let mut run = LoadRun::new("load-schedule-g");
        self.storage.create_load_run(&mut run).await?;
        let run_id = run.id.unwrap();

        let rows = self
            .storage
            .get_raw_expenditures_by_form_type(SCHEDULE_G_FORM_TYPE)
            .await?;

        let mut by_filing: BTreeMap<i64, Vec<RawExpenditure>> = BTreeMap::new();
        for row in rows {
            by_filing.entry(row.filing_id).or_default().push(row);
        }
        info!(
            "Loading Schedule G items for {} filings",
            by_filing.len()
        );

        let mut outcome = ScheduleGOutcome::default();
        for (filing_id, rows) in by_filing {
            // One version row per raw row, across every amendment
            for row in &rows {
                let mut version = Form460ScheduleGItemVersion {
                    id: None,
                    filing_id,
                    amend_id: row.amend_id,
                    fields: row.fields.clone(),
                    created_at: Utc::now(),
                };
                self.storage.create_schedule_g_item_version(&mut version).await?;
                outcome.versions += 1;
            }

            // Current items come from the most recent amendment only
            let latest_amend = rows.iter().map(|r| r.amend_id).max().unwrap_or(0);
            let items: Vec<Form460ScheduleGItem> = rows
                .iter()
                .filter(|r| r.amend_id == latest_amend)
                .map(|r| Form460ScheduleGItem {
                    id: None,
                    filing_id,
                    fields: r.fields.clone(),
                    created_at: Utc::now(),
                })
                .collect();
            let inserted = self
                .storage
                .replace_schedule_g_items(filing_id, items)
                .await?;

            let mut record = LoadRecord::new(
                run_id,
                SOURCE,
                Some(filing_id),
                ChangeType::Updated,
                format!(
                    "Loaded {} Schedule G items from amendment {} ({} version rows)",
                    inserted.len(),
                    latest_amend,
                    rows.len()
                ),
                FieldChanged::ScheduleG,
            );
            self.storage.create_load_record(&mut record).await?;

            outcome.items += inserted.len();
            outcome.filings += 1;
        }

        run.finish();
        self.storage.update_load_run(&run).await?;

        info!(
            "Schedule G pass finished: {} filings, {} items, {} version rows",
            outcome.filings, outcome.items, outcome.versions
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cal_core::domain::ScheduleGItemFields;
    use cal_core::storage::InMemoryStorage;

    fn fields(line_item: i64, amount_cents: i64) -> ScheduleGItemFields {
        ScheduleGItemFields {
            line_item,
            agent_title: String::new(),
            agent_lastname: "ACME CONSULTING".to_string(),
            agent_firstname: String::new(),
            agent_name_suffix: String::new(),
            parent_schedule: "E".to_string(),
            payee_name: "PRINT SHOP".to_string(),
            amount_cents,
            expense_date: None,
            expense_description: "mailers".to_string(),
        }
    }

    async fn raw(storage: &dyn Storage, filing_id: i64, amend_id: i64, line_item: i64, amount_cents: i64) {
        let mut row = RawExpenditure {
            id: None,
            filing_id,
            amend_id,
            form_type: "G".to_string(),
            fields: fields(line_item, amount_cents),
            created_at: Utc::now(),
        };
        storage.create_raw_expenditure(&mut row).await.unwrap();
    }

    #[tokio::test]
    async fn items_come_from_latest_amendment_only() {
        let storage = Arc::new(InMemoryStorage::new());
        raw(storage.as_ref(), 100, 0, 1, 25_000).await;
        raw(storage.as_ref(), 100, 0, 2, 9_000).await;
        raw(storage.as_ref(), 100, 1, 1, 30_000).await;

        let loader = ScheduleGLoader::new(storage.clone());
        let outcome = loader.run().await.unwrap();
        assert_eq!(outcome.filings, 1);
        assert_eq!(outcome.versions, 3);
        assert_eq!(outcome.items, 1);

        let items = storage.get_schedule_g_items(100).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fields.amount_cents, 30_000);

        let versions = storage.get_schedule_g_item_versions(100).await.unwrap();
        assert_eq!(versions.len(), 3);
    }

    #[tokio::test]
    async fn rerun_leaves_store_unchanged() {
        let storage = Arc::new(InMemoryStorage::new());
        raw(storage.as_ref(), 100, 0, 1, 25_000).await;

        let loader = ScheduleGLoader::new(storage.clone());
        loader.run().await.unwrap();
        loader.run().await.unwrap();

        assert_eq!(storage.get_schedule_g_items(100).await.unwrap().len(), 1);
        assert_eq!(
            storage.get_schedule_g_item_versions(100).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn non_g_rows_are_ignored() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut row = RawExpenditure {
            id: None,
            filing_id: 200,
            amend_id: 0,
            form_type: "E".to_string(),
            fields: fields(1, 4_000),
            created_at: Utc::now(),
        };
        storage.create_raw_expenditure(&mut row).await.unwrap();

        let loader = ScheduleGLoader::new(storage.clone());
        let outcome = loader.run().await.unwrap();
        assert_eq!(outcome.filings, 0);
        assert!(storage.get_schedule_g_items(200).await.unwrap().is_empty());
    }
}
