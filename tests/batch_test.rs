mod common;

use std::path::Path;

use chrono::Local;
use common::*;
use declaration_submit::models::{BatchPlan, DeclarationEntry, DeclarationResult, DeclarationRow, PortalSelectors};
use declaration_submit::services::ReportWriter;
use declaration_submit::workflow::SessionEnv;
use declaration_submit::{App, AppError, BatchOrchestrator, Config, FailureKind};
use tokio_test::assert_ok;

const BATCH: &str = r#"
[[rows]]
folder = "a"
  [[rows.declarations]]
  receiver = "ΔΟΥ Α"
  text = "πρώτη"

[[rows]]
folder = "b"
  [[rows.declarations]]
  receiver = "ΔΟΥ Β"
  text = "δεύτερη"

[[rows]]
folder = "c"
  [[rows.declarations]]
  receiver = "ΔΟΥ Γ"
  text = "τρίτη"
"#;

fn config_in(work: &Path) -> Config {
    let mut config = Config::with_credentials(credentials());
    config.batch_file = work.join("declarations.toml");
    config.download_dir = work.join("downloads");
    config.report_dir = work.join("reports");
    config.failure_screenshots = false;
    config
}

fn read_ledger(report_dir: &Path) -> Vec<DeclarationResult> {
    let json = std::fs::read_dir(report_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.extension().is_some_and(|ext| ext == "json")
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with("bulk_declare_"))
        })
        .expect("应当生成批次台账");
    serde_json::from_str(&std::fs::read_to_string(json).unwrap()).unwrap()
}

#[tokio::test]
async fn test_failed_item_does_not_stop_batch() {
    let work = tempfile::tempdir().unwrap();
    let config = config_in(work.path());
    tokio::fs::write(&config.batch_file, BATCH).await.unwrap();
    let downloads = config.download_dir.clone();
    let reports = config.report_dir.clone();

    let app = assert_ok!(App::initialize(config).await);
    assert_eq!(app.plan().total_declarations(), 3);

    let factory = FakeFactory::new(vec![
        PortalScript::accepting_all(),
        PortalScript::accepting_all().with_tax_id("111222333"),
        PortalScript::accepting_all(),
    ]);
    let fetcher = FakeFetcher::default();
    let mut otp = FakeOtpSource::new(&["111111", "222222"]);

    let ledger = assert_ok!(app.run_with(&factory, &fetcher, &mut otp).await);

    assert_eq!(ledger.len(), 3);
    assert!(ledger[0].is_success());
    assert!(ledger[2].is_success());

    let failed = &ledger[1];
    assert_eq!(failed.row, 2);
    assert_eq!(failed.failure_kind, Some(FailureKind::IdentityMismatch));
    assert!(failed.failure_reason.as_deref().is_some_and(|r| r.contains("111222333")));
    assert!(failed.file_path.is_none());
    assert!(failed.file_url.is_none());

    assert!(downloads.join("a").join("declaration.pdf").exists());
    assert!(downloads.join("c").join("declaration.pdf").exists());
    assert!(!downloads.join("b").join("declaration.pdf").exists());

    // 每条声明前后各清空一次
    assert_eq!(otp.clears, 6);

    let persisted = read_ledger(&reports);
    assert_eq!(persisted.len(), 3);
    assert_eq!(persisted[1].failure_kind, Some(FailureKind::IdentityMismatch));
    assert!(downloads.join("b").join("2_result.json").exists());
    assert!(downloads.join("b").join("2_result.html").exists());
}

#[tokio::test]
async fn test_missing_batch_file_is_fatal() {
    let work = tempfile::tempdir().unwrap();
    let config = config_in(work.path());

    let result = App::initialize(config).await;

    assert!(matches!(result, Err(AppError::InputFileMissing { .. })));
}

#[tokio::test]
async fn test_browser_launch_failure_is_recorded() {
    let work = tempfile::tempdir().unwrap();
    let plan = BatchPlan {
        rows: vec![DeclarationRow {
            folder: None,
            declarations: vec![
                DeclarationEntry {
                    receiver: "ΔΟΥ Α".into(),
                    text: "πρώτη".into(),
                },
                DeclarationEntry {
                    receiver: "ΔΟΥ Β".into(),
                    text: "δεύτερη".into(),
                },
            ],
        }],
        file_path: None,
    };

    // 只够打开一个会话
    let factory = FakeFactory::new(vec![PortalScript::accepting_all()]);
    let fetcher = FakeFetcher::default();
    let selectors = PortalSelectors::default();
    let settings = settings(3);
    let env = SessionEnv {
        settings: &settings,
        selectors: &selectors,
        fetcher: &fetcher,
    };
    let reports = ReportWriter::new(work.path().join("reports"), Local::now());
    let mut otp = FakeOtpSource::new(&["123456", "654321"]);

    let ledger = BatchOrchestrator::new(&factory, env, &reports)
        .run(
            &plan,
            &credentials(),
            &work.path().join("downloads"),
            "declaration.pdf",
            &mut otp,
        )
        .await;

    assert_eq!(ledger.len(), 2);
    assert!(ledger[0].is_success());
    assert_eq!(ledger[1].failure_kind, Some(FailureKind::SessionUnavailable));
    assert_eq!(factory.opened(), 1);
    assert_eq!(otp.clears, 4);
    assert_eq!(fetcher.urls.lock().unwrap().len(), 1);
    assert_eq!(read_ledger(&work.path().join("reports")).len(), 2);
}
