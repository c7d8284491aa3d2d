// Supervisor constants (no magic values)
use std::time::Duration;

/// Pause after spawning the master so it can bind its port before workers connect
pub const MASTER_WARMUP: Duration = Duration::from_millis(1500);

/// Pause after the master exits so workers can end gracefully before being killed
pub const WORKER_DRAIN_GRACE: Duration = Duration::from_millis(1500);

/// Poll interval for the silent-master liveness loop
pub const SILENT_MASTER_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Ceiling on whole-pending-set cleanup passes before giving up with a warning
pub const CLEANUP_MAX_PASSES: usize = 100_000;
