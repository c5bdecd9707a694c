//! Cron job scheduling for Skybell.
//!
//! Provides a cron scheduler with:
//! - 6-field cron expressions (seconds first)
//! - Named jobs with run statistics
//! - Async job execution on tracked tasks
//! - Job overlap prevention
//! - Graceful stop that waits for running jobs
//!
//! ## Quick Start
//!
//! ```
//! use skybell_cron::CronExpression;
//!
//! let expr = CronExpression::parse("0 0 * * * *").unwrap();
//!
//! let now = chrono::Utc::now();
//! let next = expr.next_after(now);
//!
//! assert!(next.unwrap() > now);
//! ```
//!
//! ## Running a scheduler
//!
//! ```no_run
//! use skybell_cron::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CronError> {
//!     let scheduler = CronScheduler::new();
//!
//!     scheduler.add_job("report", CronPresets::HOURLY, |ctx| async move {
//!         println!("run #{} of {}", ctx.execution_count, ctx.name);
//!         Ok(())
//!     })?;
//!
//!     scheduler.start()?;
//!     tokio::signal::ctrl_c().await.ok();
//!     scheduler.stop().await
//! }
//! ```

pub mod error;
pub mod expression;
pub mod job;
pub mod scheduler;

pub use error::{CronError, CronResult};
pub use expression::{CronExpression, CronPresets};
pub use job::{Job, JobContext, JobFn, JobStats, JobStatus};
pub use scheduler::{CronScheduler, SchedulerConfig};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CronError, CronResult};
    pub use crate::expression::{CronExpression, CronPresets};
    pub use crate::job::{Job, JobContext, JobStatus};
    pub use crate::scheduler::{CronScheduler, SchedulerConfig};
}
