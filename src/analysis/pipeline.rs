use std::sync::{Arc, Mutex as StdMutex};

use serde::Serialize;
use tokio::{
    sync::{oneshot, watch, Mutex},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    capture::{CapturedImage, ImageOrigin},
    error::{AppError, Result},
    log_store::{LogKey, LogOutcome, LogRecord, LogStore},
    notices::NoticeCenter,
};

use super::{
    job::{AnalysisJob, JobId},
    scoring::{AnalysisResult, ScoringPolicy},
};

// Set to false to silence per-job logging
const ENABLE_LOGS: bool = true;

use crate::{job_debug, job_info, job_warn};

/// What the result panel should show.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ResultView {
    Empty,
    Ready {
        origin: ImageOrigin,
    },
    #[serde(rename_all = "camelCase")]
    Analyzing {
        job_id: JobId,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        job_id: JobId,
        result: AnalysisResult,
    },
}

/// How a submitted job ended for its caller.
#[derive(Debug, Clone)]
pub enum Completion {
    /// The job was still active; its result is now the visible one.
    Applied(AnalysisJob),
    /// A newer job or capture superseded this one, or the image was no
    /// longer the current capture; nothing was applied.
    Discarded { job_id: JobId },
}

impl Completion {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Completion::Applied(job) => job.result.as_ref(),
            Completion::Discarded { .. } => None,
        }
    }

    pub fn job_id(&self) -> JobId {
        match self {
            Completion::Applied(job) => job.id,
            Completion::Discarded { job_id } => *job_id,
        }
    }
}

struct PipelineState {
    /// Bumped by every submit and every invalidation.
    generation: u64,
    active: Option<AnalysisJob>,
    /// Id of the capture the source currently holds, once one was announced.
    capture: Option<Uuid>,
}

#[derive(Clone)]
pub struct AnalysisPipeline {
    state: Arc<Mutex<PipelineState>>,
    policy: Arc<dyn ScoringPolicy>,
    log_store: Arc<dyn LogStore>,
    view: Arc<watch::Sender<ResultView>>,
    log_writes: Arc<StdMutex<Vec<JoinHandle<()>>>>,
    notices: NoticeCenter,
}

impl AnalysisPipeline {
    pub fn new(
        policy: Arc<dyn ScoringPolicy>,
        log_store: Arc<dyn LogStore>,
        notices: NoticeCenter,
    ) -> Self {
        let (view, _) = watch::channel(ResultView::Empty);
        Self {
            state: Arc::new(Mutex::new(PipelineState {
                generation: 0,
                active: None,
                capture: None,
            })),
            policy,
            log_store,
            view: Arc::new(view),
            log_writes: Arc::new(StdMutex::new(Vec::new())),
            notices,
        }
    }

    pub fn watch(&self) -> watch::Receiver<ResultView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> ResultView {
        self.view.borrow().clone()
    }

    pub fn current_result(&self) -> Option<AnalysisResult> {
        match &*self.view.borrow() {
            ResultView::Completed { result, .. } => Some(result.clone()),
            _ => None,
        }
    }

    pub async fn active_job(&self) -> Option<AnalysisJob> {
        self.state.lock().await.active.clone()
    }

    /// Drops the visible result and retires the active job, so an analysis
    /// still in flight for the previous image can no longer land.
    pub async fn invalidate(&self, next: Option<&CapturedImage>) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.capture = next.map(|image| image.id);
        if let Some(job) = state.active.take() {
            if !job.is_finished() {
                job_info!(job.id, "superseded by a new capture");
            }
        }
        self.view.send_replace(match next {
            Some(image) => ResultView::Ready {
                origin: image.origin,
            },
            None => ResultView::Empty,
        });
    }

    /// Runs one analysis and waits for it.
    ///
    /// The new job supersedes any job still running. An image that a newer
    /// capture already replaced is discarded without touching the running job
    /// or the visible result. The audit record is written in the background
    /// and never holds up or fails the analysis.
    pub async fn submit(&self, image: Option<CapturedImage>) -> Result<Completion> {
        let Some(image) = image else {
            let err = AppError::NoImage;
            self.notices.error(&err);
            return Err(err);
        };

        let job = {
            let mut state = self.state.lock().await;
            if state.capture.is_some_and(|current| current != image.id) {
                let job = AnalysisJob::new(image, state.generation);
                drop(state);
                job_info!(job.id, "discarded; its capture was replaced");
                return Ok(Completion::Discarded { job_id: job.id });
            }
            state.generation += 1;
            let mut job = AnalysisJob::new(image, state.generation);
            job.start();
            if let Some(previous) = state.active.replace(job.clone()) {
                if !previous.is_finished() {
                    job_info!(previous.id, "superseded by job {}", job.id);
                }
            }
            self.view
                .send_replace(ResultView::Analyzing { job_id: job.id });
            job
        };

        job_info!(
            job.id,
            "analyzing {} image with {} policy",
            job.image.origin.as_str(),
            self.policy.name()
        );

        let key = LogKey(job.id);
        let appended = self.spawn_append(LogRecord::started(
            key,
            job.created_at,
            job.image.origin.into(),
        ));

        let outcome = self
            .policy
            .classify(&job.image)
            .await
            .and_then(|result| result.validate().map(|_| result));

        let mut state = self.state.lock().await;
        let still_active = state.generation == job.generation
            && state.active.as_ref().map(|active| active.id) == Some(job.id);
        if !still_active {
            drop(state);
            job_info!(job.id, "completion discarded; job was superseded");
            return Ok(Completion::Discarded { job_id: job.id });
        }
        let Some(active) = state.active.as_mut() else {
            return Ok(Completion::Discarded { job_id: job.id });
        };

        match outcome {
            Ok(result) => {
                active.complete(result.clone());
                let finished = active.clone();
                self.view.send_replace(ResultView::Completed {
                    job_id: job.id,
                    result: result.clone(),
                });
                drop(state);

                job_info!(
                    job.id,
                    "completed: ai={} confidence={}%",
                    result.is_ai,
                    result.confidence
                );
                self.spawn_update(
                    appended,
                    LogOutcome {
                        is_ai: result.is_ai,
                        confidence: result.confidence,
                    },
                );
                self.notices.success("Analysis complete!");
                Ok(Completion::Applied(finished))
            }
            Err(err) => {
                let message = format!("{err:#}");
                active.fail(message.clone());
                self.view.send_replace(ResultView::Ready {
                    origin: job.image.origin,
                });
                drop(state);

                job_warn!(job.id, "scoring failed: {message}");
                let err = AppError::AnalysisFailed(message);
                self.notices.error(&err);
                Err(err)
            }
        }
    }

    /// Waits for every outstanding audit write.
    pub async fn flush_log_writes(&self) {
        let pending = {
            let mut guard = match self.log_writes.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::take(&mut *guard)
        };
        for handle in pending {
            let _ = handle.await;
        }
    }

    /// Starts the creation write and tracks it right away. The receiver
    /// yields the key once the record exists, or `None` if it never will.
    fn spawn_append(&self, record: LogRecord) -> oneshot::Receiver<Option<LogKey>> {
        let store = self.log_store.clone();
        let notices = self.notices.clone();
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let key = record.key;
            let written = match store.append(record).await {
                Ok(key) => {
                    job_debug!(key, "audit record created");
                    Some(key)
                }
                Err(err) => {
                    notices.error(&AppError::LogWriteFailed(format!(
                        "append {key}: {err:#}"
                    )));
                    None
                }
            };
            // Nobody listens when the job was discarded or failed.
            let _ = tx.send(written);
        });
        self.track_log_write(handle);
        rx
    }

    fn spawn_update(&self, appended: oneshot::Receiver<Option<LogKey>>, outcome: LogOutcome) {
        let store = self.log_store.clone();
        let notices = self.notices.clone();
        let handle = tokio::spawn(async move {
            // The update may only follow its own record; a failed append was
            // already reported.
            let key = match appended.await {
                Ok(Some(key)) => key,
                Ok(None) => return,
                Err(_) => {
                    notices.error(&AppError::LogWriteFailed(
                        "append task ended without reporting".into(),
                    ));
                    return;
                }
            };
            if let Err(err) = store.update(&key, outcome).await {
                notices.error(&AppError::LogWriteFailed(format!("update {key}: {err:#}")));
            }
        });
        self.track_log_write(handle);
    }

    fn track_log_write(&self, handle: JoinHandle<()>) {
        let mut guard = match self.log_writes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.retain(|pending| !pending.is_finished());
        guard.push(handle);
    }
}
