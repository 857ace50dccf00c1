use cal_core::domain::{Contest, FilerPartyAssignment, Form501Filing};
use cal_core::storage::{InMemoryStorage, Storage};
use cal_loader::candidacies::CandidacyLoader;
use cal_loader::common::error::LoaderError;
use cal_loader::seed::seed_parties;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn form501(filing_id: i64, last_name: &str, office: &str, election_date: NaiveDate) -> Form501Filing {
    Form501Filing {
        id: None,
        filing_id,
        filer_id: None,
        office: office.to_string(),
        district: None,
        election_date: Some(election_date),
        title: String::new(),
        first_name: "JANE".to_string(),
        last_name: last_name.to_string(),
        name_suffix: String::new(),
        party: String::new(),
        candidacy_id: None,
        created_at: Utc::now(),
    }
}

async fn setup() -> (Arc<dyn Storage>, NaiveDate) {
    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
    seed_parties(storage.clone()).await.unwrap();

    let election = date(2016, 6, 7);
    let mut contest = Contest::new("GOVERNOR", election);
    storage.create_contest(&mut contest).await.unwrap();

    (storage, election)
}

#[tokio::test]
async fn precondition_fails_without_contests() {
    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
    seed_parties(storage.clone()).await.unwrap();

    let mut filing = form501(1, "DOE", "GOVERNOR", date(2016, 6, 7));
    storage.create_form501_filing(&mut filing).await.unwrap();

    let loader = CandidacyLoader::new(storage.clone());
    let err = loader.run().await.unwrap_err();
    assert!(matches!(err, LoaderError::Precondition(_)));

    // Nothing was touched
    let unlinked = storage.get_unlinked_form501s().await.unwrap();
    assert_eq!(unlinked.len(), 1);
    assert!(unlinked[0].candidacy_id.is_none());
}

#[tokio::test]
async fn load_pass_creates_and_links_candidacies() {
    let (storage, election) = setup().await;

    let mut filing = form501(1, "DOE", "GOVERNOR", election);
    storage.create_form501_filing(&mut filing).await.unwrap();

    let loader = CandidacyLoader::new(storage.clone());
    let outcome = loader.run().await.unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.created, 1);
    assert!(!outcome.halted);

    // Filing is linked and excluded from future scans
    assert!(storage.get_unlinked_form501s().await.unwrap().is_empty());

    let contest = storage
        .get_contest_by_office_and_date("GOVERNOR", election)
        .await
        .unwrap()
        .unwrap();
    let candidacy = storage
        .get_candidacy_by_key(contest.id.unwrap(), "DOE, JANE", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(candidacy.form501_filing_ids, vec![1]);
    assert_eq!(candidacy.last_name, "DOE");
}

#[tokio::test]
async fn second_run_processes_zero_records() {
    let (storage, election) = setup().await;

    let mut filing = form501(1, "DOE", "GOVERNOR", election);
    storage.create_form501_filing(&mut filing).await.unwrap();

    let loader = CandidacyLoader::new(storage.clone());
    let first = loader.run().await.unwrap();
    assert_eq!(first.processed, 1);

    let second = loader.run().await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.created, 0);
    assert!(!second.halted);
}

#[tokio::test]
async fn same_key_reconciles_to_one_candidacy_last_write_wins() {
    let (storage, election) = setup().await;

    let mut first = form501(1, "DOE", "GOVERNOR", election);
    let mut second = form501(2, "DOE", "GOVERNOR", election);
    second.party = "DEMOCRATIC".to_string();
    second.title = "DR".to_string();
    storage.create_form501_filing(&mut first).await.unwrap();
    storage.create_form501_filing(&mut second).await.unwrap();

    let loader = CandidacyLoader::new(storage.clone());
    let outcome = loader.run().await.unwrap();
    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.updated, 1);

    let contest = storage
        .get_contest_by_office_and_date("GOVERNOR", election)
        .await
        .unwrap()
        .unwrap();
    let candidacy = storage
        .get_candidacy_by_key(contest.id.unwrap(), "DOE, JANE", None)
        .await
        .unwrap()
        .unwrap();

    // Both filings linked to the single row; the later filing's fields won
    assert_eq!(candidacy.form501_filing_ids, vec![1, 2]);
    assert_eq!(candidacy.title, "DR");
    let democratic = storage.get_party_by_name("DEMOCRATIC").await.unwrap().unwrap();
    assert_eq!(candidacy.party_id, democratic.id);
}

#[tokio::test]
async fn missing_contest_halts_pass_and_keeps_prior_progress() {
    let (storage, election) = setup().await;

    let mut ok_first = form501(1, "DOE", "GOVERNOR", election);
    let mut no_contest = form501(2, "ROE", "INSURANCE COMMISSIONER", election);
    let mut ok_last = form501(3, "POE", "GOVERNOR", election);
    storage.create_form501_filing(&mut ok_first).await.unwrap();
    storage.create_form501_filing(&mut no_contest).await.unwrap();
    storage.create_form501_filing(&mut ok_last).await.unwrap();

    let loader = CandidacyLoader::new(storage.clone());
    let outcome = loader.run().await.unwrap();
    assert!(outcome.halted);
    assert_eq!(outcome.processed, 1);

    // The first filing stays committed; the rest wait for a later pass
    let unlinked = storage.get_unlinked_form501s().await.unwrap();
    let ids: Vec<i64> = unlinked.iter().map(|f| f.filing_id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[tokio::test]
async fn filer_assignment_resolves_candidacy_party() {
    let (storage, _) = setup().await;

    // Worked example: legacy code then current code; the reference date
    // sits after both, so the 16012 assignment wins
    for (effective, code) in [(date(2001, 1, 1), 16007), (date(2003, 6, 1), 16012)] {
        let mut assignment = FilerPartyAssignment::new(1001, code, effective);
        storage
            .create_filer_party_assignment(&mut assignment)
            .await
            .unwrap();
    }

    let mut contest = Contest::new("GOVERNOR", date(2004, 1, 1));
    storage.create_contest(&mut contest).await.unwrap();

    let mut filing = form501(10, "DOE", "GOVERNOR", date(2004, 1, 1));
    filing.filer_id = Some(1001);
    storage.create_form501_filing(&mut filing).await.unwrap();

    let loader = CandidacyLoader::new(storage.clone());
    loader.run().await.unwrap();

    let candidacy = storage
        .get_candidacy_by_key(contest.id.unwrap(), "DOE, JANE", Some(1001))
        .await
        .unwrap()
        .unwrap();
    let npp = storage
        .get_party_by_name("NO PARTY PREFERENCE")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(candidacy.party_id, npp.id);
}

#[tokio::test]
async fn unresolvable_party_links_the_unknown_sentinel() {
    let (storage, election) = setup().await;

    let mut filing = form501(1, "DOE", "GOVERNOR", election);
    filing.party = "WHIG".to_string();
    storage.create_form501_filing(&mut filing).await.unwrap();

    let loader = CandidacyLoader::new(storage.clone());
    loader.run().await.unwrap();

    let contest = storage
        .get_contest_by_office_and_date("GOVERNOR", election)
        .await
        .unwrap()
        .unwrap();
    let candidacy = storage
        .get_candidacy_by_key(contest.id.unwrap(), "DOE, JANE", None)
        .await
        .unwrap()
        .unwrap();
    let unknown = storage.get_party_by_name("UNKNOWN").await.unwrap().unwrap();
    assert_eq!(candidacy.party_id, unknown.id);
}
