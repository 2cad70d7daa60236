//! Operator interrupt handling.
//!
//! Ctrl-C is caught by a tokio signal listener on its own thread with a
//! current-thread runtime; it only raises the exit signal, every loop then
//! winds down cooperatively.

use std::thread;

use tokio::runtime::Builder;

use crate::error::PlaybackError;
use crate::signals::ExitSignal;

pub fn install_interrupt_handler(exit: ExitSignal) -> Result<(), PlaybackError> {
    thread::Builder::new()
        .name("interrupt-listener".to_string())
        .spawn(move || {
            let rt = match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(err) => {
                    tracing::error!("[Shutdown] Failed to create Tokio runtime: {}", err);
                    return;
                }
            };
            rt.block_on(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("[Shutdown] Keyboard interrupt detected, stopping ...");
                        exit.raise();
                    }
                    Err(err) => {
                        tracing::warn!("[Shutdown] Unable to listen for Ctrl-C: {}", err);
                    }
                }
            });
        })
        .map_err(|err| PlaybackError::WorkerSpawn {
            worker: "interrupt-listener".to_string(),
            reason: err.to_string(),
        })?;
    Ok(())
}
