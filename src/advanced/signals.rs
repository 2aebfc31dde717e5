//! Process signals → `Shutdown`.
//!
//! SIGINT and SIGTERM are handled on a small current-thread tokio runtime running on its own
//! thread, so the blocking sampling loop stays synchronous. Handlers are registered before
//! `spawn_signal_listener` returns; a signal arriving after that point always triggers shutdown.
//! The listener also exits on its own once shutdown was triggered elsewhere.

use std::{io, thread, time::Duration};

use log::info;
use tokio::{
    runtime::Builder,
    signal::unix::{SignalKind, signal},
};

use crate::sampling::clock::Shutdown;

const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

pub fn spawn_signal_listener(shutdown: Shutdown) -> io::Result<thread::JoinHandle<()>> {
    let runtime = Builder::new_current_thread().enable_all().build()?;
    let (mut term, mut int) = {
        let _guard = runtime.enter();
        (signal(SignalKind::terminate())?, signal(SignalKind::interrupt())?)
    };

    thread::Builder::new()
        .name("signal_listener".into())
        .spawn(move || {
            let received = runtime.block_on(async {
                let mut poll = tokio::time::interval(SHUTDOWN_POLL);
                loop {
                    tokio::select! {
                        _ = term.recv() => break Some("SIGTERM"),
                        _ = int.recv() => break Some("SIGINT"),
                        _ = poll.tick() => {
                            if shutdown.is_triggered() {
                                break None;
                            }
                        }
                    }
                }
            });
            if let Some(name) = received {
                info!("[Signal] {} received, stopping sampler", name);
                shutdown.trigger();
            }
        })
}
