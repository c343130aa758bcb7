use tauri::State;

use crate::{session::Session, AppState};

#[tauri::command]
pub async fn get_session(state: State<'_, AppState>) -> Result<Session, String> {
    Ok(state.session.snapshot().await)
}

#[tauri::command]
pub async fn connect_camera(state: State<'_, AppState>) -> Result<Session, String> {
    state.session.connect().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn disconnect_camera(state: State<'_, AppState>) -> Result<Session, String> {
    state.session.disconnect().await.map_err(|e| e.to_string())
}
