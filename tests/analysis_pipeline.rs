mod common;

use std::{sync::Arc, time::Duration};

use authenticator_lib::{
    analysis::{
        AnalysisPipeline, AnalysisResult, Completion, JobState, RandomScoringPolicy, ResultView,
        AI_INDICATORS, CONFIDENCE_RANGE,
    },
    capture::{CaptureSource, ImageOrigin, StubCapturePolicy, UploadFile},
    error::AppError,
    log_store::{LogKey, MemoryLogStore},
    notices::{NoticeCenter, NoticeLevel},
};
use common::{gated_policy, upload, RecordingLogStore, SessionFixture};

fn capture_source(pipeline: &AnalysisPipeline, fx: &SessionFixture) -> CaptureSource {
    CaptureSource::new(
        fx.manager.clone(),
        Arc::new(StubCapturePolicy::new(vec!["/placeholder.svg".into()])),
        pipeline.clone(),
        NoticeCenter::new(),
    )
}

#[tokio::test]
async fn uploaded_photo_completes_within_bounds() {
    let fx = SessionFixture::new(Vec::new());
    let pipeline = AnalysisPipeline::new(
        Arc::new(RandomScoringPolicy::new(Duration::from_millis(5))),
        Arc::new(MemoryLogStore::new()),
        NoticeCenter::new(),
    );
    let source = capture_source(&pipeline, &fx);

    for _ in 0..25 {
        let photo = UploadFile::new("photo.png", Some("image/png".into()), vec![0x89, b'P']);
        let image = source.from_file(photo).await.unwrap();

        let Completion::Applied(job) = pipeline.submit(Some(image)).await.unwrap() else {
            panic!("sole job must be applied");
        };
        assert_eq!(job.state, JobState::Completed);

        let result = job.result.unwrap();
        assert!(CONFIDENCE_RANGE.contains(&result.confidence));
        if result.is_ai {
            assert_eq!(result.areas, AI_INDICATORS.to_vec());
        } else {
            assert!(result.areas.is_empty());
        }
        assert_eq!(pipeline.current_result(), Some(result));
    }
}

#[tokio::test]
async fn non_image_upload_creates_no_job() {
    let fx = SessionFixture::new(Vec::new());
    let store = Arc::new(RecordingLogStore::new());
    let pipeline = AnalysisPipeline::new(
        Arc::new(RandomScoringPolicy::new(Duration::ZERO)),
        store.clone(),
        NoticeCenter::new(),
    );
    let source = capture_source(&pipeline, &fx);

    let notes = UploadFile::new("notes.txt", None, b"buy milk".to_vec());
    assert!(matches!(
        source.from_file(notes).await,
        Err(AppError::UnsupportedFileType(_))
    ));
    assert!(source.current().await.is_none());

    assert_eq!(
        pipeline.submit(source.current().await).await.unwrap_err(),
        AppError::NoImage
    );
    assert!(pipeline.active_job().await.is_none());
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn only_the_latest_submission_is_shown() {
    let (policy, mut gates) = gated_policy(&["a.png", "b.png"]);
    let store = Arc::new(RecordingLogStore::new());
    let pipeline = AnalysisPipeline::new(policy, store.clone(), NoticeCenter::new());

    let first = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.submit(Some(upload("a.png"))).await }
    });
    gates.wait_started("a.png").await;

    let second = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.submit(Some(upload("b.png"))).await }
    });
    gates.wait_started("b.png").await;
    let b_id = pipeline.active_job().await.unwrap().id;

    gates.release("a.png", Ok(AnalysisResult::new(true, 90)));
    let a = first.await.unwrap().unwrap();
    assert!(matches!(a, Completion::Discarded { .. }));
    assert_eq!(pipeline.view(), ResultView::Analyzing { job_id: b_id });
    assert_eq!(pipeline.current_result(), None);

    gates.release("b.png", Ok(AnalysisResult::new(false, 77)));
    let b = second.await.unwrap().unwrap();
    assert_eq!(b.job_id(), b_id);
    assert_eq!(
        pipeline.view(),
        ResultView::Completed {
            job_id: b_id,
            result: AnalysisResult::new(false, 77),
        }
    );

    pipeline.flush_log_writes().await;
    let a_record = store.get(&LogKey(a.job_id())).unwrap();
    assert_eq!(a_record.is_ai, None, "superseded job is never written back");
    let b_record = store.get(&LogKey(b_id)).unwrap();
    assert_eq!(b_record.confidence, Some(77));
}

#[tokio::test]
async fn late_completion_of_superseded_job_keeps_newer_result() {
    let (policy, mut gates) = gated_policy(&["a.png", "b.png"]);
    let pipeline = AnalysisPipeline::new(
        policy,
        Arc::new(MemoryLogStore::new()),
        NoticeCenter::new(),
    );

    let first = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.submit(Some(upload("a.png"))).await }
    });
    gates.wait_started("a.png").await;

    let second = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.submit(Some(upload("b.png"))).await }
    });
    gates.wait_started("b.png").await;

    gates.release("b.png", Ok(AnalysisResult::new(false, 81)));
    let b = second.await.unwrap().unwrap();
    let shown = pipeline.view();

    gates.release("a.png", Ok(AnalysisResult::new(true, 93)));
    assert!(matches!(
        first.await.unwrap().unwrap(),
        Completion::Discarded { .. }
    ));
    assert_eq!(pipeline.view(), shown);
    assert_eq!(pipeline.active_job().await.unwrap().id, b.job_id());
}

#[tokio::test]
async fn new_capture_retires_running_job() {
    let fx = SessionFixture::new(Vec::new());
    let (policy, mut gates) = gated_policy(&["a.png"]);
    let pipeline = AnalysisPipeline::new(
        policy,
        Arc::new(MemoryLogStore::new()),
        NoticeCenter::new(),
    );
    let source = capture_source(&pipeline, &fx);

    let running = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.submit(Some(upload("a.png"))).await }
    });
    gates.wait_started("a.png").await;

    source
        .from_file(UploadFile::new("c.jpg", None, Vec::new()))
        .await
        .unwrap();
    assert_eq!(
        pipeline.view(),
        ResultView::Ready {
            origin: ImageOrigin::Upload
        }
    );

    gates.release("a.png", Ok(AnalysisResult::new(true, 88)));
    assert!(matches!(
        running.await.unwrap().unwrap(),
        Completion::Discarded { .. }
    ));
    assert_eq!(pipeline.current_result(), None);
}

#[tokio::test]
async fn superseded_failure_is_silent() {
    let notices = NoticeCenter::new();
    let mut toasts = notices.subscribe();
    let (policy, mut gates) = gated_policy(&["a.png", "b.png"]);
    let pipeline = AnalysisPipeline::new(policy, Arc::new(MemoryLogStore::new()), notices);

    let first = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.submit(Some(upload("a.png"))).await }
    });
    gates.wait_started("a.png").await;
    let second = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.submit(Some(upload("b.png"))).await }
    });
    gates.wait_started("b.png").await;

    gates.release("a.png", Err("model crashed".into()));
    assert!(matches!(
        first.await.unwrap().unwrap(),
        Completion::Discarded { .. }
    ));
    assert!(toasts.try_recv().is_err(), "no toast for a superseded job");

    gates.release("b.png", Ok(AnalysisResult::new(true, 71)));
    second.await.unwrap().unwrap();
    assert_eq!(toasts.try_recv().unwrap().message, "Analysis complete!");
}

#[tokio::test]
async fn failing_log_store_never_affects_the_job() {
    let notices = NoticeCenter::new();
    let mut toasts = notices.subscribe();
    let store = Arc::new(RecordingLogStore::failing());
    let pipeline = AnalysisPipeline::new(
        Arc::new(RandomScoringPolicy::new(Duration::ZERO)),
        store.clone(),
        notices,
    );

    let completion = pipeline.submit(Some(upload("photo.png"))).await.unwrap();
    assert!(matches!(completion, Completion::Applied(_)));
    pipeline.flush_log_writes().await;

    let toast = toasts.try_recv().unwrap();
    assert_eq!(toast.level, NoticeLevel::Success);
    assert!(toasts.try_recv().is_err(), "log failures stay out of the UI");
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn scoring_does_not_wait_for_creation_write() {
    let store = Arc::new(RecordingLogStore::new());
    let release_append = store.hold_next_append();
    let pipeline = AnalysisPipeline::new(
        Arc::new(RandomScoringPolicy::new(Duration::ZERO)),
        store.clone(),
        NoticeCenter::new(),
    );

    let completion = pipeline.submit(Some(upload("photo.png"))).await.unwrap();
    let key = LogKey(completion.job_id());
    assert!(matches!(completion, Completion::Applied(_)));
    assert!(store.calls().is_empty(), "append still held");

    release_append.send(()).unwrap();
    pipeline.flush_log_writes().await;

    assert_eq!(
        store.calls(),
        vec![format!("append {key}"), format!("update {key}")]
    );
    let record = store.get(&key).unwrap();
    assert_eq!(record.is_ai, completion.result().map(|r| r.is_ai));
}

#[tokio::test]
async fn replaced_capture_cannot_be_analyzed() {
    let fx = SessionFixture::new(Vec::new());
    let store = Arc::new(RecordingLogStore::new());
    let pipeline = AnalysisPipeline::new(
        Arc::new(RandomScoringPolicy::new(Duration::ZERO)),
        store.clone(),
        NoticeCenter::new(),
    );
    let source = capture_source(&pipeline, &fx);

    source
        .from_file(UploadFile::new("a.png", None, Vec::new()))
        .await
        .unwrap();
    let replaced = source.current().await;
    source
        .from_file(UploadFile::new("b.png", None, Vec::new()))
        .await
        .unwrap();

    let completion = pipeline.submit(replaced).await.unwrap();
    assert!(matches!(completion, Completion::Discarded { .. }));
    assert!(pipeline.active_job().await.is_none());
    assert_eq!(
        pipeline.view(),
        ResultView::Ready {
            origin: ImageOrigin::Upload
        }
    );
    pipeline.flush_log_writes().await;
    assert!(store.calls().is_empty(), "replaced capture is never audited");

    let Completion::Applied(job) = pipeline.submit(source.current().await).await.unwrap() else {
        panic!("current capture must be applied");
    };
    assert_eq!(job.image.name.as_deref(), Some("b.png"));
}

#[tokio::test]
async fn rejected_upload_lets_running_job_finish() {
    let fx = SessionFixture::new(Vec::new());
    let (policy, mut gates) = gated_policy(&["a.png"]);
    let pipeline = AnalysisPipeline::new(
        policy,
        Arc::new(MemoryLogStore::new()),
        NoticeCenter::new(),
    );
    let source = capture_source(&pipeline, &fx);

    let photo = UploadFile::new("a.png", Some("image/png".into()), vec![0x89, b'P']);
    let image = source.from_file(photo).await.unwrap();
    let running = tokio::spawn({
        let pipeline = pipeline.clone();
        let image = image.clone();
        async move { pipeline.submit(Some(image)).await }
    });
    gates.wait_started("a.png").await;
    let job_id = pipeline.active_job().await.unwrap().id;

    let notes = UploadFile::new("notes.txt", None, b"buy milk".to_vec());
    assert!(matches!(
        source.from_file(notes).await,
        Err(AppError::UnsupportedFileType(_))
    ));
    assert_eq!(pipeline.view(), ResultView::Analyzing { job_id });
    assert_eq!(source.current().await, Some(image));

    gates.release("a.png", Ok(AnalysisResult::new(true, 88)));
    let Completion::Applied(job) = running.await.unwrap().unwrap() else {
        panic!("job survives a rejected upload");
    };
    assert_eq!(job.id, job_id);
    assert_eq!(
        pipeline.current_result(),
        Some(AnalysisResult::new(true, 88))
    );
}

#[tokio::test]
async fn flush_waits_for_creation_write_of_running_job() {
    let store = Arc::new(RecordingLogStore::new());
    let release_append = store.hold_next_append();
    let (policy, mut gates) = gated_policy(&["a.png"]);
    let pipeline = AnalysisPipeline::new(policy, store.clone(), NoticeCenter::new());

    let running = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.submit(Some(upload("a.png"))).await }
    });
    gates.wait_started("a.png").await;
    let key = LogKey(pipeline.active_job().await.unwrap().id);

    let flush = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.flush_log_writes().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!flush.is_finished(), "flush returned before the held append");

    release_append.send(()).unwrap();
    flush.await.unwrap();
    assert_eq!(store.calls(), vec![format!("append {key}")]);

    gates.release("a.png", Ok(AnalysisResult::new(false, 80)));
    assert!(matches!(
        running.await.unwrap().unwrap(),
        Completion::Applied(_)
    ));
}
