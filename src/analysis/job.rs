use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::CapturedImage;

use super::scoring::AnalysisResult;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    Created,
    Running,
    Completed,
    Failed,
}

/// One analysis attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub id: JobId,
    /// Pipeline generation this job was created in; a completion is applied
    /// only while it still matches the pipeline's current generation.
    #[serde(skip)]
    pub generation: u64,
    pub image: CapturedImage,
    pub state: JobState,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisJob {
    pub fn new(image: CapturedImage, generation: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            image,
            state: JobState::Created,
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn start(&mut self) {
        if self.state == JobState::Created {
            self.state = JobState::Running;
        }
    }

    pub fn complete(&mut self, result: AnalysisResult) {
        if self.state == JobState::Running {
            self.state = JobState::Completed;
            self.result = Some(result);
        }
    }

    pub fn fail(&mut self, message: String) {
        if self.state == JobState::Running {
            self.state = JobState::Failed;
            self.error = Some(message);
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, JobState::Completed | JobState::Failed)
    }
}
