use log::{info, warn};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// Relays every message from `receiver` into `sink` until the token is
/// cancelled or the channel closes.
///
/// Lagging only costs intermediate messages; the sink still runs for the ones
/// that remain, which is enough for signals whose receivers re-read state.
pub fn spawn_forwarder<T, F>(
    name: &'static str,
    mut receiver: broadcast::Receiver<T>,
    sink: F,
    cancel_token: CancellationToken,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
    F: Fn(T) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Ok(message) => sink(message),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("{name} forwarder lagged, skipped {skipped} message(s)");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = cancel_token.cancelled() => break,
            }
        }
        info!("{name} forwarder shutting down");
    })
}

/// Relays the latest value of `receiver` into `sink` each time it changes.
/// Intermediate values may be skipped; the current one never is.
pub fn spawn_watch_forwarder<T, F>(
    name: &'static str,
    mut receiver: watch::Receiver<T>,
    sink: F,
    cancel_token: CancellationToken,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = receiver.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let value = receiver.borrow_and_update().clone();
                    sink(value);
                }
                _ = cancel_token.cancelled() => break,
            }
        }
        info!("{name} forwarder shutting down");
    })
}
