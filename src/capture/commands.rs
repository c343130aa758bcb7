use tauri::State;

use crate::{
    capture::{CapturedImage, UploadFile},
    AppState,
};

#[tauri::command]
pub async fn upload_image(
    state: State<'_, AppState>,
    name: String,
    media_type: Option<String>,
    bytes: Vec<u8>,
) -> Result<CapturedImage, String> {
    state
        .capture
        .from_file(UploadFile::new(name, media_type, bytes))
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn capture_from_camera(state: State<'_, AppState>) -> Result<CapturedImage, String> {
    state.capture.from_device().await.map_err(|e| e.to_string())
}
