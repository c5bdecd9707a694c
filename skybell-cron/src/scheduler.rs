//! Cron job scheduler.

use crate::error::{CronError, CronResult};
use crate::expression::CronExpression;
use crate::job::{Job, JobContext, JobStats};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Tick interval for checking scheduled jobs
    pub tick_interval: Duration,

    /// Whether to log job execution
    pub log_execution: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            log_execution: true,
        }
    }
}

type JobTable = Arc<RwLock<HashMap<String, Arc<Job>>>>;

struct LoopHandle {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Cron job scheduler.
///
/// Each tick claims the jobs that are due and runs them on their own tasks.
/// Jobs prevent overlap by default, so a tick that finds a previous run
/// still in flight skips that occurrence.
pub struct CronScheduler {
    jobs: JobTable,
    config: SchedulerConfig,
    tracker: TaskTracker,
    running: Mutex<Option<LoopHandle>>,
}

impl CronScheduler {
    /// Create a new scheduler with default configuration.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a new scheduler with custom configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        debug!(tick_interval = ?config.tick_interval, "Initializing cron scheduler");
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            config,
            tracker: TaskTracker::new(),
            running: Mutex::new(None),
        }
    }

    /// Add a job to the scheduler.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use skybell_cron::*;
    ///
    /// # fn main() -> Result<(), CronError> {
    /// let scheduler = CronScheduler::new();
    ///
    /// scheduler.add_job("cleanup", "0 0 0 * * *", |ctx| async move {
    ///     println!("Running {}", ctx.name);
    ///     Ok(())
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_job<F, Fut>(
        &self,
        name: impl Into<String>,
        expression: &str,
        function: F,
    ) -> CronResult<()>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CronResult<()>> + Send + 'static,
    {
        let expression = CronExpression::parse(expression)?;
        self.add(Job::new(name, expression, function))
    }

    /// Add a prepared job.
    pub fn add(&self, job: Job) -> CronResult<()> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(job.name()) {
            return Err(CronError::JobAlreadyExists(job.name().to_string()));
        }

        info!(
            job = job.name(),
            schedule = job.expression().expression(),
            next_run = ?job.next_run(),
            "Added cron job"
        );
        jobs.insert(job.name().to_string(), Arc::new(job));
        Ok(())
    }

    /// Remove a job from the scheduler.
    pub fn remove_job(&self, name: &str) -> CronResult<()> {
        self.jobs
            .write()
            .remove(name)
            .map(|_| debug!(job = name, "Removed cron job"))
            .ok_or_else(|| CronError::JobNotFound(name.to_string()))
    }

    /// Get the names of all jobs, sorted.
    pub fn list_jobs(&self) -> Vec<String> {
        let mut names: Vec<_> = self.jobs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Enable a job.
    pub fn enable_job(&self, name: &str) -> CronResult<()> {
        self.job(name)?.enable();
        Ok(())
    }

    /// Disable a job.
    pub fn disable_job(&self, name: &str) -> CronResult<()> {
        self.job(name)?.disable();
        Ok(())
    }

    /// Get job statistics.
    pub fn get_stats(&self, name: &str) -> CronResult<JobStats> {
        Ok(self.job(name)?.stats())
    }

    /// Run a job immediately, outside its schedule, and wait for it.
    pub async fn run_now(&self, name: &str) -> CronResult<()> {
        let job = self.job(name)?;
        job.execute().await
    }

    fn job(&self, name: &str) -> CronResult<Arc<Job>> {
        self.jobs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CronError::JobNotFound(name.to_string()))
    }

    /// Start the scheduler.
    pub fn start(&self) -> CronResult<()> {
        let runtime = Handle::try_current().map_err(|_| CronError::NoRuntime)?;

        let mut running = self.running.lock();
        if running.is_some() {
            warn!("Cron scheduler already running");
            return Err(CronError::SchedulerAlreadyRunning);
        }

        let shutdown = CancellationToken::new();
        let handle = runtime.spawn(tick_loop(
            Arc::clone(&self.jobs),
            self.tracker.clone(),
            shutdown.clone(),
            self.config.clone(),
        ));
        *running = Some(LoopHandle { shutdown, handle });

        info!(jobs = self.jobs.read().len(), "Cron scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for in-flight job runs to finish.
    pub async fn stop(&self) -> CronResult<()> {
        let Some(LoopHandle { shutdown, handle }) = self.running.lock().take() else {
            return Err(CronError::SchedulerNotRunning);
        };

        info!("Stopping cron scheduler");
        shutdown.cancel();
        if let Err(e) = handle.await {
            error!(error = %e, "Cron scheduler loop terminated abnormally");
        }

        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();

        info!("Cron scheduler stopped");
        Ok(())
    }

    /// Check if the scheduler is running.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn tick_loop(
    jobs: JobTable,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    config: SchedulerConfig,
) {
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now = Utc::now();
        let due: Vec<_> = jobs
            .read()
            .values()
            .filter_map(|job| job.claim_due(now).map(|at| (Arc::clone(job), at)))
            .collect();

        for (job, scheduled) in due {
            let log = config.log_execution;
            tracker.spawn(async move {
                if log {
                    info!(job = job.name(), scheduled = %scheduled, "Executing cron job");
                }

                match job.run(scheduled).await {
                    Ok(()) if log => info!(job = job.name(), "Cron job completed"),
                    Ok(()) => {}
                    Err(CronError::JobAlreadyRunning(_)) => {
                        warn!(job = job.name(), scheduled = %scheduled, "Previous run still in progress, skipping");
                    }
                    Err(e) => error!(job = job.name(), error = %e, "Cron job failed"),
                }
            });
        }
    }

    debug!("Cron scheduler loop exited");
}
