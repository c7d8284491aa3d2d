// Default pool sizing from host CPU topology

use sysinfo::System;
use tracing::debug;

/// Default worker count: one worker per logical CPU
pub fn default_worker_count() -> usize {
    let sys = System::new_all();
    let count = sys.cpus().len().max(1);
    debug!(cpus = count, "probed logical CPU count");
    count
}
