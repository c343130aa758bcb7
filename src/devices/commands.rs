use tauri::State;

use crate::{devices::DeviceDescriptor, session::Session, AppState};

#[tauri::command]
pub async fn list_devices(state: State<'_, AppState>) -> Result<Vec<DeviceDescriptor>, String> {
    state.refresh_devices().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn select_device(
    state: State<'_, AppState>,
    device_id: String,
) -> Result<Session, String> {
    let devices = state
        .devices
        .list_devices()
        .await
        .map_err(|e| e.to_string())?;
    let device = devices
        .into_iter()
        .find(|device| device.id == device_id)
        .ok_or_else(|| format!("unknown capture device {device_id}"))?;

    state
        .session
        .select_device(device)
        .await
        .map_err(|e| e.to_string())
}
