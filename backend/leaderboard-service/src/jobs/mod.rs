pub mod refresh_scheduler;

pub use refresh_scheduler::{run_refresh_cycle, start_refresh_scheduler, RefreshSchedulerConfig};
