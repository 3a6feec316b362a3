mod common;

use std::sync::Arc;

use certificate_archiver::error::AppError;
use certificate_archiver::orchestrator::pipeline::{
    run_pipeline, EXIT_ITEM_FAILURES, EXIT_SUCCESS, EXIT_UPLOAD_FAILED,
};
use certificate_archiver::{
    run_batch, run_batch_pooled, ArchiveName, FailureReason, RetrievalFlow, RetrievalSettings,
    Workspace,
};
use common::{item, Behavior, FailingPublisher, RecordingPublisher, Script, ScriptedDriver};
use tokio_test::{assert_err, assert_ok};

fn flow() -> RetrievalFlow {
    RetrievalFlow::new(RetrievalSettings::default())
}

fn name(requested: &str) -> ArchiveName {
    ArchiveName::resolve_now(Some(requested)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn missing_trigger_fails_one_item_and_archives_the_rest() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::prepare(root.path().join("temp")).unwrap();
    let dir = workspace.path().to_path_buf();
    let items = vec![item(1, "cert-a"), item(2, "cert-b"), item(3, "cert-c")];
    let script = Arc::new(Script::new().with(&items[1], Behavior::NeverShowsTrigger));
    let drivers = vec![ScriptedDriver::new(&dir, script.clone())];
    let publisher = RecordingPublisher::default();

    let report = assert_ok!(
        run_pipeline(&items, workspace, &drivers, &publisher, &name("batch"), &flow()).await
    );

    assert_eq!(report.batch.successes, vec![dir.join("cert-a.png"), dir.join("cert-c.png")]);
    assert_eq!(report.batch.failures.len(), 1);
    let failure = &report.batch.failures[0];
    assert_eq!(failure.reason, FailureReason::TriggerNotFound);
    assert_eq!(
        failure.to_string(),
        "Name: Student 2, Download link: https://certs.example.com/c/cert-b"
    );
    assert_eq!(script.navigations(&items[1]), 3);

    let members = publisher.single_archive_members();
    assert_eq!(members.len(), 2);
    assert!(members[0].ends_with("temp/cert-a.png"));
    assert!(members[1].ends_with("temp/cert-c.png"));

    assert_eq!(
        report.address.as_deref(),
        Some("https://s3-eu-north-1.amazonaws.com/test-bucket/batch.zip")
    );
    assert_eq!(report.exit_code(), EXIT_ITEM_FAILURES);
    assert!(report.cleanup.is_clean());
    assert!(!dir.exists());
}

#[tokio::test(start_paused = true)]
async fn all_successes_exit_zero() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::prepare(root.path().join("temp")).unwrap();
    let dir = workspace.path().to_path_buf();
    let items = vec![item(1, "cert-a"), item(2, "cert-b")];
    let drivers = vec![ScriptedDriver::new(&dir, Arc::new(Script::new()))];
    let publisher = RecordingPublisher::default();

    let report = assert_ok!(
        run_pipeline(&items, workspace, &drivers, &publisher, &name("full"), &flow()).await
    );

    assert!(report.batch.is_all_success());
    assert_eq!(report.exit_code(), EXIT_SUCCESS);
    assert_eq!(publisher.uploads()[0].0, "full.zip");
    assert!(!dir.exists());
}

#[tokio::test(start_paused = true)]
async fn empty_input_uploads_an_empty_archive() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::prepare(root.path().join("temp")).unwrap();
    let dir = workspace.path().to_path_buf();
    let script = Arc::new(Script::new());
    let drivers = vec![ScriptedDriver::new(&dir, script.clone())];
    let publisher = RecordingPublisher::default();

    let report = assert_ok!(
        run_pipeline(&[], workspace, &drivers, &publisher, &name("empty"), &flow()).await
    );

    assert!(publisher.single_archive_members().is_empty());
    assert_eq!(script.total_navigations(), 0);
    assert_eq!(report.exit_code(), EXIT_SUCCESS);
    assert!(!dir.exists());
}

#[tokio::test(start_paused = true)]
async fn upload_failure_still_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::prepare(root.path().join("temp")).unwrap();
    let dir = workspace.path().to_path_buf();
    let items = vec![item(1, "cert-a")];
    let drivers = vec![ScriptedDriver::new(&dir, Arc::new(Script::new()))];
    let publisher = FailingPublisher::default();

    let report = assert_ok!(
        run_pipeline(&items, workspace, &drivers, &publisher, &name("denied"), &flow()).await
    );

    assert!(report.address.is_none());
    assert!(report.upload_error.is_some());
    assert_eq!(report.exit_code(), EXIT_UPLOAD_FAILED);
    assert!(report.cleanup.is_clean());
    assert!(!dir.exists());
}

#[tokio::test(start_paused = true)]
async fn archive_failure_is_fatal_and_skips_upload() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::prepare(root.path().join("temp")).unwrap();
    let dir = workspace.path().to_path_buf();
    let items = vec![item(1, "cert-a"), item(2, "cert-b")];
    let script = Arc::new(Script::new().with(&items[1], Behavior::WritesDirectory));
    let drivers = vec![ScriptedDriver::new(&dir, script)];
    let publisher = RecordingPublisher::default();

    let err = assert_err!(
        run_pipeline(&items, workspace, &drivers, &publisher, &name("broken"), &flow()).await
    );

    assert!(matches!(err, AppError::Archive(_)));
    assert!(publisher.uploads().is_empty());
    assert!(!dir.exists());
}

#[tokio::test(start_paused = true)]
async fn failures_never_stop_the_batch() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().to_path_buf();
    let items = vec![
        item(1, "cert-a"),
        item(2, "cert-b"),
        item(3, "cert-c"),
        item(4, "cert-d"),
    ];
    let script = Arc::new(
        Script::new()
            .with(&items[0], Behavior::NavigationFails)
            .with(&items[1], Behavior::NeverDownloads)
            .with(&items[2], Behavior::SucceedsOnAttempt(2)),
    );
    let driver = ScriptedDriver::new(&dir, script.clone());

    let result = run_batch(&items, &dir, &driver, &flow()).await;

    assert_eq!(result.total(), 4);
    assert_eq!(result.successes, vec![dir.join("cert-c.png"), dir.join("cert-d.png")]);
    assert!(matches!(
        result.failures[0].reason,
        FailureReason::NavigationError(_)
    ));
    assert_eq!(result.failures[1].reason, FailureReason::DownloadTimeout);
    assert_eq!(script.navigations(&items[0]), 3);
    assert_eq!(script.navigations(&items[1]), 3);
    assert_eq!(script.navigations(&items[2]), 2);
    assert_eq!(script.navigations(&items[3]), 1);
}

#[tokio::test(start_paused = true)]
async fn pooled_sessions_handle_each_item_once_in_input_order() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().to_path_buf();
    let items: Vec<_> = (1..=7).map(|i| item(i, &format!("cert-{}", i))).collect();
    let script = Arc::new(Script::new().with(&items[4], Behavior::NeverShowsTrigger));
    let drivers: Vec<_> = (0..3)
        .map(|_| ScriptedDriver::new(&dir, script.clone()))
        .collect();

    let result = run_batch_pooled(&items, &dir, &drivers, &flow()).await;

    let expected: Vec<_> = [1, 2, 3, 4, 6, 7]
        .iter()
        .map(|i| dir.join(format!("cert-{}.png", i)))
        .collect();
    assert_eq!(result.successes, expected);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].name, "Student 5");

    for (idx, it) in items.iter().enumerate() {
        let expected_navigations = if idx == 4 { 3 } else { 1 };
        assert_eq!(script.navigations(it), expected_navigations, "{}", it.download_link);
    }
    assert!(drivers.iter().all(|d| d.session_navigations() > 0));
}

#[tokio::test(start_paused = true)]
async fn single_session_pool_matches_sequential_run() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().to_path_buf();
    let items = vec![item(1, "cert-a"), item(2, "cert-b")];
    let script = Arc::new(Script::new().with(&items[0], Behavior::NeverDownloads));

    let sequential = run_batch(
        &items,
        &dir,
        &ScriptedDriver::new(&dir, script.clone()),
        &flow(),
    )
    .await;
    let pooled = run_batch_pooled(
        &items,
        &dir,
        &[ScriptedDriver::new(&dir, script.clone())],
        &flow(),
    )
    .await;

    assert_eq!(sequential, pooled);
}
