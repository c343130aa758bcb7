pub mod analysis;
pub mod app_state;
pub mod capture;
pub mod config;
pub mod db;
pub mod devices;
pub mod error;
pub mod log_store;
pub mod notices;
pub mod session;
pub mod utils;

pub use app_state::AppState;

#[cfg(feature = "desktop")]
pub const ANALYSIS_RESULT_EVENT: &str = "analysis-result-changed";

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use log::warn;
    use tauri::{Emitter, Manager, RunEvent};
    use tokio_util::sync::CancellationToken;

    use analysis::commands::{analyze_image, get_result, list_analysis_logs};
    use capture::commands::{capture_from_camera, upload_image};
    use config::AppConfig;
    use devices::commands::{list_devices, select_device};
    use notices::{Notice, NOTICE_EVENT};
    use session::{
        commands::{connect_camera, disconnect_camera, get_session},
        SessionSignal,
    };
    use utils::{spawn_forwarder, spawn_watch_forwarder};

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Authenticator starting up...");

    let shutdown = CancellationToken::new();
    let forwarders_token = shutdown.clone();

    let app = tauri::Builder::default()
        .setup(move |app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let config = AppConfig::load(app_data_dir)?;
                let state = AppState::from_config(&config)?;

                let handle = app.handle().clone();
                tauri::async_runtime::block_on(async {
                    state.start().await;

                    let emitter = handle.clone();
                    spawn_forwarder(
                        "session",
                        state.session.subscribe(),
                        move |signal: SessionSignal| {
                            if let Err(err) = emitter.emit(signal.event_name(), ()) {
                                warn!("Failed to emit {}: {err}", signal.event_name());
                            }
                        },
                        forwarders_token.clone(),
                    );

                    let emitter = handle.clone();
                    spawn_watch_forwarder(
                        "result",
                        state.pipeline.watch(),
                        move |view| {
                            if let Err(err) = emitter.emit(ANALYSIS_RESULT_EVENT, view) {
                                warn!("Failed to emit {ANALYSIS_RESULT_EVENT}: {err}");
                            }
                        },
                        forwarders_token.clone(),
                    );

                    let emitter = handle.clone();
                    spawn_forwarder(
                        "notice",
                        state.notices.subscribe(),
                        move |notice: Notice| {
                            if let Err(err) = emitter.emit(NOTICE_EVENT, notice) {
                                warn!("Failed to emit {NOTICE_EVENT}: {err}");
                            }
                        },
                        forwarders_token.clone(),
                    );
                });

                app.manage(state);
                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            list_devices,
            select_device,
            get_session,
            connect_camera,
            disconnect_camera,
            upload_image,
            capture_from_camera,
            analyze_image,
            get_result,
            list_analysis_logs,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(move |app_handle, event| {
        if let RunEvent::Exit = event {
            shutdown.cancel();
            if let Some(state) = app_handle.try_state::<AppState>() {
                tauri::async_runtime::block_on(state.pipeline.flush_log_writes());
            }
        }
    });
}
