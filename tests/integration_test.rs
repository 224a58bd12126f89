use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

use feedprep::config::{FeedSpec, PipelineConfig};
use feedprep::eda::{align_data_types, remove_outliers};
use feedprep::infra::LocalDirStore;
use feedprep::pipeline::processing::RowPolicy;
use feedprep::pipeline::storage::{CsvFileSink, InMemorySink};
use feedprep::pipeline::{FeedOrchestrator, FeedStatus, Stage};
use feedprep::types::{ColumnType, Feed, Value};

const MALWARE: &str = "\
Domain,Creation_Date_Time,1gram,len,entropy,char_distribution,Domain_Age
evil.com,2020-01-02 03:04:05,['e', 'v', 'i', 'l'],8,1.75,defaultdict(<class 'int'>, {'e': 1, 'v': 1}),10 days, 01:00:00
bad.net,not a date,['b', 'a', 'd'],7,1.5,defaultdict(<class 'int'>, {'b': 1}),3 days, 00:00:00
";

const PHISHING: &str = "\
Domain,Creation_Date_Time,len,Page_Rank
login-bank.com,2021-03-04 05:06:07,14,0
paypa1.com,2021-03-05 05:06:07,10,2
";

const SPAM: &str = "\
Domain,Creation_Date_Time,numeric_percentage,Emails,2gram,entropy,Domain_Age,Domain_Name,Registrar,ASN,TTL
cheap.biz,junk,2021-05-06 07:08:09,0.25,a@cheap.biz,['ch', 'he'],3.2,12 days 00:00:00,cheap.biz,AS1,300
pills.info,junk,2021-05-07 07:08:09,0.5,b@pills.info,['pi', 'il'],2.9,40 days 00:00:00,pills.info,AS2,600
";

const BENIGN: &str = "\
Domain,Creation_Date_Time,1gram,Domain_Age,len,Emails,Registrar
b'good.com',2019-01-01 00:00:00,'[1, 2]',5 days, 02:00:00,8,nan,GoDaddy
b'other.org',bad-date,'[3]'
";

fn write_raw(dir: &Path) -> Result<()> {
    std::fs::write(dir.join("CSV_malware.csv"), MALWARE)?;
    std::fs::write(dir.join("CSV_phishing.csv"), PHISHING)?;
    std::fs::write(dir.join("CSV_spam.csv"), SPAM)?;
    std::fs::write(dir.join("CSV_benign.csv"), BENIGN)?;
    Ok(())
}

#[tokio::test]
async fn test_all_feeds_are_repaired_and_typed() -> Result<()> {
    let raw = tempdir()?;
    write_raw(raw.path())?;

    let sink = Arc::new(InMemorySink::new());
    let orchestrator = FeedOrchestrator::new(
        PipelineConfig::default(),
        Arc::new(LocalDirStore::new(raw.path())),
        sink.clone(),
    );
    let report = orchestrator.run().await;
    assert_eq!(report.succeeded(), 4, "outcomes: {:?}", report.outcomes);

    let malware = sink.get("processed_CSV_malware.csv").expect("malware written");
    assert_eq!(malware.column_count(), 7);
    assert_eq!(malware.column("len").unwrap().kind, ColumnType::Integer);
    assert_eq!(malware.column("entropy").unwrap().kind, ColumnType::Float);
    assert_eq!(
        malware.column("1gram").unwrap().values[0],
        Value::Text("['e', 'v', 'i', 'l']".into())
    );
    assert_eq!(
        malware.column("Domain_Age").unwrap().values[0],
        Value::Text("10 days 01:00:00".into())
    );
    let created = malware.column("Creation_Date_Time").unwrap();
    assert_eq!(created.kind, ColumnType::Timestamp);
    assert_eq!(created.values[1], Value::Missing);

    let spam = sink.get("processed_CSV_spam.csv").expect("spam written");
    assert_eq!(
        spam.column_names(),
        vec![
            "Domain",
            "Creation_Date_Time",
            "numeric_percentage",
            "Emails",
            "2gram",
            "entropy",
            "Domain_Age",
            "Domain_Name"
        ]
    );
    assert_eq!(spam.column("Creation_Date_Time").unwrap().kind, ColumnType::Timestamp);
    assert!(matches!(
        spam.column("Creation_Date_Time").unwrap().values[0],
        Value::Timestamp(_)
    ));
    assert_eq!(spam.column("numeric_percentage").unwrap().values[1], Value::Float(0.5));
    assert_eq!(spam.column("Emails").unwrap().values[0], Value::Text("a@cheap.biz".into()));
    assert_eq!(spam.column("entropy").unwrap().kind, ColumnType::Float);
    assert_eq!(spam.column("Domain_Name").unwrap().values[1], Value::Text("pills.info".into()));

    let benign = sink.get("processed_CSV_benign.csv").expect("benign written");
    assert_eq!(benign.row_count(), 2);
    for i in 0..benign.row_count() {
        assert_eq!(benign.row(i).unwrap().len(), benign.column_count());
    }
    assert_eq!(benign.column("Domain").unwrap().values[0], Value::Text("good.com".into()));
    assert_eq!(benign.column("1gram").unwrap().kind, ColumnType::Structured);
    assert_eq!(benign.column("Domain_Age").unwrap().kind, ColumnType::Duration);
    assert_eq!(benign.column("Domain_Age").unwrap().values[1], Value::Missing);
    assert_eq!(benign.column("Emails").unwrap().values[0], Value::Missing);
    assert_eq!(benign.column("len").unwrap().values, vec![Value::Int(8), Value::Missing]);
    Ok(())
}

#[tokio::test]
async fn test_failures_are_isolated_per_feed() -> Result<()> {
    let raw = tempdir()?;
    write_raw(raw.path())?;
    // ragged row in phishing, malware missing entirely
    std::fs::write(raw.path().join("CSV_phishing.csv"), "Domain,len\na.com,1\nb.com\n")?;
    std::fs::remove_file(raw.path().join("CSV_malware.csv"))?;

    let sink = Arc::new(InMemorySink::new());
    let orchestrator = FeedOrchestrator::new(
        PipelineConfig::default(),
        Arc::new(LocalDirStore::new(raw.path())),
        sink.clone(),
    );
    let report = orchestrator.run().await;

    let stage_of = |feed: Feed| match &report.outcome(feed).unwrap().status {
        FeedStatus::Failed { stage, .. } => Some(*stage),
        FeedStatus::Written { .. } => None,
    };
    assert_eq!(stage_of(Feed::Malware), Some(Stage::Fetch));
    assert_eq!(stage_of(Feed::Phishing), Some(Stage::Read));
    assert_eq!(stage_of(Feed::Spam), None);
    assert_eq!(stage_of(Feed::Benign), None);
    assert_eq!(
        sink.destinations(),
        vec!["processed_CSV_benign.csv", "processed_CSV_spam.csv"]
    );
    Ok(())
}

#[tokio::test]
async fn test_legacy_rows_and_spam_width_check() -> Result<()> {
    let raw = tempdir()?;
    write_raw(raw.path())?;
    std::fs::write(raw.path().join("CSV_phishing.csv"), "Domain,len\na.com,1\nb.com\n")?;

    let mut config = PipelineConfig::default();
    config.row_policy = RowPolicy::Legacy;
    config.spam_expected_columns = Some(12);
    config.feeds = vec![
        FeedSpec::new(Feed::Phishing, "CSV_phishing.csv"),
        FeedSpec::new(Feed::Spam, "CSV_spam.csv"),
    ];

    let sink = Arc::new(InMemorySink::new());
    let report = FeedOrchestrator::new(config, Arc::new(LocalDirStore::new(raw.path())), sink.clone())
        .run()
        .await;

    let phishing = sink.get("processed_CSV_phishing.csv").expect("legacy mode pads");
    assert_eq!(phishing.column("len").unwrap().values, vec![Value::Int(1), Value::Missing]);
    match &report.outcome(Feed::Spam).unwrap().status {
        FeedStatus::Failed { stage, .. } => assert_eq!(*stage, Stage::Realign),
        other => panic!("spam should fail the width check, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_csv_sink_and_raw_cache() -> Result<()> {
    let raw = tempdir()?;
    write_raw(raw.path())?;
    let work = tempdir()?;

    let mut config = PipelineConfig::default();
    config.cache_raw = true;
    config.raw_dir = work.path().join("raw");
    config.processed_dir = work.path().join("processed");
    config.feeds = vec![FeedSpec::new(Feed::Benign, "CSV_benign.csv")];
    config.ensure_directories()?;

    let sink = Arc::new(CsvFileSink::new(config.processed_dir.clone()));
    let processed_dir = config.processed_dir.clone();
    let raw_dir = config.raw_dir.clone();
    let report = FeedOrchestrator::new(config, Arc::new(LocalDirStore::new(raw.path())), sink)
        .run()
        .await;
    assert_eq!(report.succeeded(), 1);

    assert_eq!(std::fs::read_to_string(raw_dir.join("CSV_benign.csv"))?, BENIGN);
    let written = std::fs::read_to_string(processed_dir.join("processed_CSV_benign.csv"))?;
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("Domain,Creation_Date_Time,1gram,Domain_Age,len,Emails,Registrar")
    );
    assert_eq!(
        lines.next(),
        Some("good.com,2019-01-01 00:00:00,\"[1, 2]\",5 days 02:00:00,8,,GoDaddy")
    );
    assert_eq!(lines.next(), Some("other.org,,[3],,,,"));
    Ok(())
}

#[tokio::test]
async fn test_eda_over_processed_tables() -> Result<()> {
    let raw = tempdir()?;
    write_raw(raw.path())?;
    let sink = Arc::new(InMemorySink::new());
    FeedOrchestrator::new(
        PipelineConfig::default(),
        Arc::new(LocalDirStore::new(raw.path())),
        sink.clone(),
    )
    .run()
    .await;

    let mut tables = vec![
        sink.get("processed_CSV_phishing.csv").expect("phishing"),
        sink.get("processed_CSV_benign.csv").expect("benign"),
    ];
    align_data_types(&mut tables);
    for table in &tables {
        assert_eq!(table.column("len").unwrap().kind, ColumnType::Integer);
    }
    // benign's missing len is filled with 0 by alignment
    assert_eq!(tables[1].column("len").unwrap().values[1], Value::Int(0));
    assert_eq!(tables[0].column("Page_Rank").unwrap().values, vec![Value::Int(0), Value::Int(2)]);

    let (kept, report) = remove_outliers(&tables[0], "len", 0.0, 1.0)?;
    assert_eq!(kept.row_count(), 2);
    assert_eq!(report.rows_removed, 0);
    Ok(())
}
