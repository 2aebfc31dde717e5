//! CPU pinning and priority for the sampling thread.

use core_affinity::{get_core_ids, set_for_current};
use log::{info, warn};
use thread_priority::{ThreadPriority, set_current_thread_priority};

/// Pins the calling thread to `core`. Returns false (and logs) when the core is unavailable.
pub fn pin_current_thread(core: usize) -> bool {
    let cores = get_core_ids().unwrap_or_default();
    match cores.into_iter().find(|c| c.id == core) {
        Some(core_id) if set_for_current(core_id) => {
            info!("Sampling thread pinned to core {}", core);
            true
        }
        Some(_) => {
            warn!("Failed to pin sampling thread to core {}", core);
            false
        }
        None => {
            warn!("Core {} not found among available system cores", core);
            false
        }
    }
}

/// Raises the calling thread to `ThreadPriority::Max`.
/// Usually needs elevated privileges; on failure the thread keeps its priority.
pub fn raise_current_thread_priority() -> bool {
    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(()) => {
            info!("Sampling thread running at max priority");
            true
        }
        Err(e) => {
            warn!("Could not raise sampling thread priority: {:?}", e);
            false
        }
    }
}
