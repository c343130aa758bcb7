use tauri::State;

use crate::{
    analysis::{AnalysisResult, ResultView},
    log_store::LogRecord,
    AppState,
};

const DEFAULT_LOG_LIMIT: usize = 50;

/// Resolves to `None` when a newer capture superseded the analysis.
#[tauri::command]
pub async fn analyze_image(state: State<'_, AppState>) -> Result<Option<AnalysisResult>, String> {
    let completion = state.analyze_current().await.map_err(|e| e.to_string())?;
    Ok(completion.result().cloned())
}

#[tauri::command]
pub async fn get_result(state: State<'_, AppState>) -> Result<ResultView, String> {
    Ok(state.pipeline.view())
}

#[tauri::command]
pub async fn list_analysis_logs(
    state: State<'_, AppState>,
    limit: Option<usize>,
) -> Result<Vec<LogRecord>, String> {
    let Some(db) = state.db.as_ref() else {
        return Ok(Vec::new());
    };
    db.recent_analysis_logs(limit.unwrap_or(DEFAULT_LOG_LIMIT))
        .await
        .map_err(|e| e.to_string())
}
