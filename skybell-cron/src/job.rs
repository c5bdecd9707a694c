//! Job definition and execution.

use crate::error::{CronError, CronResult};
use crate::expression::CronExpression;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Job execution function type.
pub type JobFn =
    Arc<dyn Fn(JobContext) -> Pin<Box<dyn Future<Output = CronResult<()>> + Send>> + Send + Sync>;

/// Job execution context.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Job name
    pub name: String,

    /// Scheduled execution time
    pub scheduled_time: DateTime<Utc>,

    /// Actual execution time
    pub execution_time: DateTime<Utc>,

    /// Execution count (0-based)
    pub execution_count: u64,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(name: String, scheduled_time: DateTime<Utc>, execution_count: u64) -> Self {
        Self {
            name,
            scheduled_time,
            execution_time: Utc::now(),
            execution_count,
        }
    }

    /// Get the delay between scheduled and actual execution time.
    pub fn delay(&self) -> chrono::Duration {
        self.execution_time - self.scheduled_time
    }
}

/// Job status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Job is scheduled and waiting
    Scheduled,

    /// Job is currently running
    Running,

    /// Job completed successfully
    Completed,

    /// Job failed
    Failed(String),
}

/// Job statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStats {
    pub name: String,
    pub expression: String,
    pub enabled: bool,
    pub execution_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub status: JobStatus,
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    next_run: Option<DateTime<Utc>>,
    last_run: Option<DateTime<Utc>>,
    execution_count: u64,
    enabled: bool,
}

/// Scheduled job.
///
/// Shared between the scheduler loop and the tasks running it, so all
/// bookkeeping lives behind interior mutability.
pub struct Job {
    name: String,
    expression: CronExpression,
    function: JobFn,
    prevent_overlap: bool,
    in_flight: AtomicUsize,
    state: Mutex<JobState>,
}

impl Job {
    /// Create a new job.
    pub fn new<F, Fut>(name: impl Into<String>, expression: CronExpression, function: F) -> Self
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CronResult<()>> + Send + 'static,
    {
        let next_run = expression.next();

        let wrapped_fn: JobFn = Arc::new(
            move |ctx: JobContext| -> Pin<Box<dyn Future<Output = CronResult<()>> + Send>> {
                Box::pin(function(ctx))
            },
        );

        Self {
            name: name.into(),
            expression,
            function: wrapped_fn,
            prevent_overlap: true,
            in_flight: AtomicUsize::new(0),
            state: Mutex::new(JobState {
                status: JobStatus::Scheduled,
                next_run,
                last_run: None,
                execution_count: 0,
                enabled: true,
            }),
        }
    }

    /// Allow a new run to start while a previous one is still in flight.
    pub fn allow_overlap(mut self) -> Self {
        self.prevent_overlap = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &CronExpression {
        &self.expression
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn status(&self) -> JobStatus {
        self.state.lock().status.clone()
    }

    pub fn execution_count(&self) -> u64 {
        self.state.lock().execution_count
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.state.lock().next_run
    }

    /// Claim the run that is due at `now`.
    ///
    /// Advances the next run time past `now` and returns the claimed
    /// scheduled time, so each occurrence is handed out once.
    pub fn claim_due(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut state = self.state.lock();
        if !state.enabled {
            return None;
        }

        let scheduled = state.next_run.filter(|next| *next <= now)?;
        state.next_run = self.expression.next_after(now);
        Some(scheduled)
    }

    /// Execute the job now, outside its schedule.
    pub async fn execute(&self) -> CronResult<()> {
        let scheduled = self.next_run().unwrap_or_else(Utc::now);
        self.run(scheduled).await
    }

    /// Execute the job for the given scheduled time.
    ///
    /// Returns [`CronError::JobAlreadyRunning`] without running when overlap
    /// is prevented and a previous run is in flight.
    pub async fn run(&self, scheduled_time: DateTime<Utc>) -> CronResult<()> {
        let in_flight = InFlight::enter(&self.in_flight);
        if in_flight.previous > 0 && self.prevent_overlap {
            return Err(CronError::JobAlreadyRunning(self.name.clone()));
        }

        let context = {
            let mut state = self.state.lock();
            state.status = JobStatus::Running;
            JobContext::new(self.name.clone(), scheduled_time, state.execution_count)
        };

        let result = (self.function)(context).await;

        let mut state = self.state.lock();
        state.last_run = Some(Utc::now());
        state.execution_count += 1;
        state.status = match &result {
            Ok(()) => JobStatus::Completed,
            Err(e) => JobStatus::Failed(e.to_string()),
        };
        result
    }

    /// Enable the job.
    pub fn enable(&self) {
        let mut state = self.state.lock();
        state.enabled = true;
        if state.next_run.is_none() {
            state.next_run = self.expression.next();
        }
    }

    /// Disable the job.
    pub fn disable(&self) {
        self.state.lock().enabled = false;
    }

    /// Snapshot of the job's bookkeeping.
    pub fn stats(&self) -> JobStats {
        let state = self.state.lock();
        JobStats {
            name: self.name.clone(),
            expression: self.expression.expression().to_string(),
            enabled: state.enabled,
            execution_count: state.execution_count,
            last_run: state.last_run,
            next_run: state.next_run,
            status: state.status.clone(),
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("expression", &self.expression.expression())
            .field("prevent_overlap", &self.prevent_overlap)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Counts a run as in flight until dropped, including when the job future
/// is dropped mid-run.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
    previous: usize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let previous = counter.fetch_add(1, Ordering::AcqRel);
        Self { counter, previous }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::Notify;

    fn every_minute() -> CronExpression {
        CronExpression::parse("0 * * * * *").unwrap()
    }

    #[tokio::test]
    async fn test_job_creation() {
        let job = Job::new("test", every_minute(), |_ctx| async { Ok(()) });

        assert_eq!(job.name(), "test");
        assert_eq!(job.execution_count(), 0);
        assert_eq!(job.status(), JobStatus::Scheduled);
        assert!(job.is_enabled());
        assert!(job.next_run().is_some());
    }

    #[tokio::test]
    async fn test_job_execution() {
        let job = Job::new("test", every_minute(), |ctx| async move {
            assert_eq!(ctx.name, "test");
            Ok(())
        });

        job.execute().await.unwrap();
        job.execute().await.unwrap();

        assert_eq!(job.execution_count(), 2);
        assert_eq!(job.status(), JobStatus::Completed);
        assert!(!job.is_running());
        assert!(job.stats().last_run.is_some());
    }

    #[tokio::test]
    async fn test_job_failure() {
        let job = Job::new("test", every_minute(), |_ctx| async {
            Err(CronError::ExecutionFailed("test error".to_string()))
        });

        let result = job.execute().await;

        assert!(result.is_err());
        assert!(matches!(job.status(), JobStatus::Failed(_)));
        assert_eq!(job.execution_count(), 1);
    }

    #[test]
    fn test_job_enable_disable() {
        let job = Job::new("test", every_minute(), |_ctx| async { Ok(()) });

        job.disable();
        assert!(!job.is_enabled());
        assert_eq!(job.claim_due(Utc::now() + chrono::Duration::hours(1)), None);

        job.enable();
        assert!(job.is_enabled());
    }

    #[test]
    fn test_claim_due_hands_out_each_occurrence_once() {
        let job = Job::new("test", every_minute(), |_ctx| async { Ok(()) });
        let next = job.next_run().unwrap();

        assert_eq!(job.claim_due(next - chrono::Duration::seconds(1)), None);
        assert_eq!(job.claim_due(next), Some(next));
        assert_eq!(job.claim_due(next), None);
        assert!(job.next_run().unwrap() > next);
    }

    #[test]
    fn test_context_delay() {
        let scheduled = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut ctx = JobContext::new("job".to_string(), scheduled, 0);
        ctx.execution_time = scheduled + chrono::Duration::seconds(2);

        assert_eq!(ctx.delay(), chrono::Duration::seconds(2));
    }

    #[tokio::test]
    async fn test_overlapping_run_is_rejected() {
        let release = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());
        let runs = Arc::new(AtomicU32::new(0));

        let job = {
            let release = Arc::clone(&release);
            let started = Arc::clone(&started);
            let runs = Arc::clone(&runs);
            Arc::new(Job::new("slow", every_minute(), move |_ctx| {
                let release = Arc::clone(&release);
                let started = Arc::clone(&started);
                let runs = Arc::clone(&runs);
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    started.notify_one();
                    release.notified().await;
                    Ok(())
                }
            }))
        };

        let first = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.execute().await })
        };
        started.notified().await;

        assert!(job.is_running());
        assert_eq!(
            job.execute().await,
            Err(CronError::JobAlreadyRunning("slow".to_string()))
        );

        release.notify_one();
        first.await.unwrap().unwrap();

        assert!(!job.is_running());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
