use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use deno_core::v8;
use futures::FutureExt;
use gantry_fs::Backends;
use gantry_value::Value;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::error::ScriptError;
use crate::session::{Bindings, Session};

/// Default per-job execution limit
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct PoolOptions {
    /// Number of worker threads, at least one
    pub workers: usize,
    /// Execution limit for a single job
    pub timeout: Duration,
    /// Backends FS objects resolve against
    pub backends: Backends,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            timeout: DEFAULT_SCRIPT_TIMEOUT,
            backends: gantry_fs::backends().clone(),
        }
    }
}

/// A unit of script work: evaluate `source`, then optionally call `function`
#[derive(Debug, Clone)]
pub struct ScriptJob {
    pub source: Arc<str>,
    pub bindings: Bindings,
    pub function: Option<String>,
    pub args: Vec<Value>,
}

impl ScriptJob {
    pub fn eval(source: impl Into<Arc<str>>, bindings: Bindings) -> Self {
        Self {
            source: source.into(),
            bindings,
            function: None,
            args: Vec::new(),
        }
    }

    pub fn call(
        source: impl Into<Arc<str>>,
        bindings: Bindings,
        function: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            source: source.into(),
            bindings,
            function: Some(function.into()),
            args,
        }
    }
}

struct Envelope {
    job: ScriptJob,
    response: oneshot::Sender<Result<Value, ScriptError>>,
}

/// Script executor backed by dedicated worker threads
///
/// V8 isolates never leave the thread that created them, so every worker is an OS
/// thread with its own single-threaded Tokio runtime. Each job runs in a fresh
/// [`Session`]; workers are reused, isolates are not.
#[derive(Clone)]
pub struct ScriptPool {
    sender: mpsc::Sender<Envelope>,
    workers: usize,
}

impl ScriptPool {
    /// Spawn the worker threads
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Internal`] if a worker thread cannot be spawned
    pub fn new(options: PoolOptions) -> Result<Self, ScriptError> {
        let workers = options.workers.max(1);
        let (tx, rx) = mpsc::channel::<Envelope>(workers * 16);
        let rx = Arc::new(Mutex::new(rx));

        for id in 0..workers {
            let rx = Arc::clone(&rx);
            let backends = options.backends.clone();
            let timeout = options.timeout;
            std::thread::Builder::new()
                .name(format!("gantry-script-{id}"))
                .spawn(move || worker_loop(id, &rx, &backends, timeout))
                .map_err(|e| ScriptError::Internal(format!("cannot spawn script worker: {e}")))?;
        }

        log::debug!("Started script pool with {workers} workers");
        Ok(Self {
            sender: tx,
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run a job and wait for its result
    ///
    /// Dropping the returned future abandons the job: a queued job is skipped and a
    /// running one finishes with its result discarded.
    ///
    /// # Errors
    ///
    /// Whatever the script fails with, or [`ScriptError::Internal`] if the pool has
    /// shut down
    pub async fn execute(&self, job: ScriptJob) -> Result<Value, ScriptError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Envelope { job, response: tx })
            .await
            .map_err(|_| ScriptError::Internal("script pool shut down".into()))?;
        rx.await
            .map_err(|_| ScriptError::Internal("script worker dropped the job".into()))?
    }
}

fn worker_loop(
    id: usize,
    rx: &Arc<Mutex<mpsc::Receiver<Envelope>>>,
    backends: &Backends,
    timeout: Duration,
) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Script worker {id} could not start a runtime: {e}");
            return;
        }
    };

    rt.block_on(async move {
        loop {
            // Hold the lock only while waiting, so jobs spread across workers
            let next = { rx.lock().await.recv().await };
            let Some(Envelope { job, response }) = next else {
                break;
            };

            if response.is_closed() {
                log::debug!("Script worker {id} skipping abandoned job");
                continue;
            }

            let result = AssertUnwindSafe(run_job(&job, backends, timeout))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(ScriptError::Internal(panic_message(&*panic))));

            if response.send(result).is_err() {
                log::warn!("Script worker {id} discarded the result of an abandoned job");
            }
        }
        log::debug!("Script worker {id} shutting down");
    });
}

async fn run_job(
    job: &ScriptJob,
    backends: &Backends,
    timeout: Duration,
) -> Result<Value, ScriptError> {
    let mut session = Session::new(backends.clone())?;
    let watchdog = Watchdog::arm(session.isolate_handle(), timeout);

    let outcome = {
        let mut ctx = session.new_context(&job.bindings)?;
        let work = async {
            let completion = ctx.run(&job.source).await?;
            match &job.function {
                Some(function) => ctx.call(function, job.args.clone()).await,
                None => Ok(completion),
            }
        };
        tokio::time::timeout(timeout, work)
            .await
            .unwrap_or(Err(ScriptError::Timeout(timeout)))
    };

    let fired = watchdog.disarm();
    session.dispose();
    if fired {
        Err(ScriptError::Timeout(timeout))
    } else {
        outcome
    }
}

/// Terminates V8 execution if a job outlives its limit
struct Watchdog {
    done: std_mpsc::Sender<()>,
    fired: Arc<AtomicBool>,
}

impl Watchdog {
    fn arm(handle: v8::IsolateHandle, limit: Duration) -> Self {
        let (done, wait) = std_mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        std::thread::spawn(move || {
            if let Err(std_mpsc::RecvTimeoutError::Timeout) = wait.recv_timeout(limit) {
                flag.store(true, Ordering::SeqCst);
                handle.terminate_execution();
            }
        });

        Self { done, fired }
    }

    /// Stop watching; returns whether execution was terminated
    fn disarm(self) -> bool {
        let _ = self.done.send(());
        self.fired.load(Ordering::SeqCst)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("script worker panicked: {detail}")
}
