use std::io;
use std::process;
use std::thread::{self, JoinHandle};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit status used when a second Ctrl-C aborts without waiting
pub const FORCED_EXIT_STATUS: i32 = 130;

/// Cancels `cancel` on the first Ctrl-C
///
/// The listener runs on its own thread with a single-threaded runtime. It
/// returns as soon as the token is cancelled from elsewhere. A second Ctrl-C
/// after cancellation exits the process immediately.
///
/// # Errors
/// Returns an error when the listener thread cannot be spawned
pub fn cancel_on_interrupt(cancel: CancellationToken) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "Failed to start interrupt listener");
                    return;
                }
            };
            runtime.block_on(listen(cancel));
        })
}

async fn listen(cancel: CancellationToken) {
    select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to install SIGINT handler");
                return;
            }
            info!("Received SIGINT, cancelling job...");
            cancel.cancel();
        }
        _ = cancel.cancelled() => return,
    }

    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Received second SIGINT, exiting without waiting for the job");
        process::exit(FORCED_EXIT_STATUS);
    }
}
