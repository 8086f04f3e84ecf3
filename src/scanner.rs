use crate::http::{authority, HttpProber, Scheme, SchemeOrder};
use crate::report;
use crate::targets::TargetEnumerator;
use crate::types::{Outcome, ScanResult, ScanTask};
use anyhow::{anyhow, Result};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, info, warn};

/// Immutable run configuration shared by every worker.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Report every probed task, not only detections.
    pub verbose: bool,
    /// Try both schemes per target.
    pub auto_scheme: bool,
    pub scheme_order: SchemeOrder,
    /// Scheme used when auto-scheme is off and the host carries none.
    pub default_scheme: Scheme,
    /// Gate each HTTP probe on a TCP connect.
    pub check_liveness: bool,
    pub connect_timeout: Duration,
    /// Task queue capacity; submission blocks while it is full.
    pub queue_capacity: usize,
    /// Result channel capacity; workers block while it is full.
    pub result_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 1000,
            verbose: true,
            auto_scheme: false,
            scheme_order: SchemeOrder::HttpFirst,
            default_scheme: Scheme::Http,
            check_liveness: true,
            connect_timeout: Duration::from_secs(1),
            queue_capacity: 100,
            result_capacity: 100,
        }
    }
}

/// Counters for one finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// List lines read.
    pub lines: u64,
    /// Non-empty lines that produced no task.
    pub skipped_lines: u64,
    pub tasks: u64,
    pub detections: u64,
    /// Results forwarded to the sink.
    pub reported: u64,
}

/// TCP connect-and-close reachability check.
///
/// Returns `false` on any failure: timeout, refusal, unreachable network or
/// name resolution error.
pub async fn is_live(host: &str, port: &str, timeout: Duration) -> bool {
    let addr = authority(host, port);
    match time::timeout(timeout, TcpStream::connect(addr.as_str())).await {
        Ok(Ok(mut stream)) => {
            if let Err(e) = stream.shutdown().await {
                debug!("shutdown {addr}: {e}");
            }
            true
        }
        Ok(Err(e)) => {
            debug!("{addr} closed: {e}");
            false
        }
        Err(_) => {
            debug!("{addr} connect timed out");
            false
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WorkerStats {
    tasks: u64,
    detections: u64,
    reported: u64,
}

struct Worker {
    id: usize,
    config: Arc<ScanConfig>,
    prober: Arc<HttpProber>,
}

impl Worker {
    async fn run(
        self,
        tasks: Arc<Mutex<mpsc::Receiver<ScanTask>>>,
        results: mpsc::Sender<ScanResult>,
    ) -> WorkerStats {
        let mut stats = WorkerStats::default();
        loop {
            // Only the queue pop is serialised; probing runs unlocked.
            let next = tasks.lock().await.recv().await;
            let Some(task) = next else { break };

            let outcome = self.probe(&task).await;
            stats.tasks += 1;
            let detected = outcome.is_detection();
            if detected {
                stats.detections += 1;
            }
            if detected || self.config.verbose {
                let result = ScanResult {
                    worker_id: self.id,
                    host: task.host,
                    port: task.port,
                    outcome,
                };
                if results.send(result).await.is_err() {
                    warn!(worker = self.id, "result sink closed; dropping result");
                    continue;
                }
                stats.reported += 1;
            }
        }
        debug!(worker = self.id, tasks = stats.tasks, "worker exiting");
        stats
    }

    async fn probe(&self, task: &ScanTask) -> Outcome {
        let (carried, host) = Scheme::split_host(&task.host);

        if self.config.check_liveness
            && !is_live(host, &task.port, self.config.connect_timeout).await
        {
            return Outcome::Unreachable;
        }

        if self.config.auto_scheme {
            self.prober
                .probe_schemes(&self.config.scheme_order.schemes(), host, &task.port)
                .await
        } else {
            let scheme = carried.unwrap_or(self.config.default_scheme);
            self.prober.probe(scheme, host, &task.port).await
        }
    }
}

/// Fixed set of workers pulling from one bounded task queue.
///
/// Results arrive on the receiver returned by [`WorkerPool::spawn`]; that
/// channel closes once [`WorkerPool::finish`] has seen every worker exit.
pub struct WorkerPool {
    tasks: mpsc::Sender<ScanTask>,
    workers: JoinSet<WorkerStats>,
}

impl WorkerPool {
    pub fn spawn(
        config: Arc<ScanConfig>,
        prober: Arc<HttpProber>,
    ) -> (Self, mpsc::Receiver<ScanResult>) {
        let (task_tx, task_rx) = mpsc::channel::<ScanTask>(config.queue_capacity.max(1));
        let (result_tx, result_rx) = mpsc::channel::<ScanResult>(config.result_capacity.max(1));
        let task_rx = Arc::new(Mutex::new(task_rx));

        let mut workers = JoinSet::new();
        for id in 1..=config.workers.max(1) {
            let worker = Worker {
                id,
                config: Arc::clone(&config),
                prober: Arc::clone(&prober),
            };
            workers.spawn(worker.run(Arc::clone(&task_rx), result_tx.clone()));
        }
        // Workers now hold the only result senders.
        drop(result_tx);

        (
            Self {
                tasks: task_tx,
                workers,
            },
            result_rx,
        )
    }

    /// Queue one task, waiting while the queue is full.
    pub async fn submit(&self, task: ScanTask) -> Result<()> {
        self.tasks
            .send(task)
            .await
            .map_err(|_| anyhow!("all workers have exited"))
    }

    /// Close the queue and wait for every worker to drain it and exit.
    pub async fn finish(self) -> ScanSummary {
        let Self { tasks, mut workers } = self;
        drop(tasks);

        join_workers(&mut workers).await
    }
}

/// Join every worker and sum their counters. A worker that panicked is
/// logged and skipped; the others are still awaited.
async fn join_workers(workers: &mut JoinSet<WorkerStats>) -> ScanSummary {
    let mut summary = ScanSummary::default();
    while let Some(res) = workers.join_next().await {
        match res {
            Ok(stats) => {
                summary.tasks += stats.tasks;
                summary.detections += stats.detections;
                summary.reported += stats.reported;
            }
            Err(e) => warn!("worker failed: {e}"),
        }
    }
    summary
}

/// Read target lines from `list`, probe every task and render reported
/// results to `out`.
pub async fn scan_list<R, W>(
    mut list: R,
    ports: &[u16],
    config: ScanConfig,
    prober: Arc<HttpProber>,
    out: W,
) -> Result<ScanSummary>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send + 'static,
{
    let enumerator = TargetEnumerator::new(ports);
    let config = Arc::new(config);
    let (pool, results) = WorkerPool::spawn(Arc::clone(&config), prober);
    let sink = tokio::task::spawn_blocking(move || report::drain(results, out));

    let mut buf = Vec::new();
    let mut line_count = 0u64;
    let mut skipped = 0u64;
    loop {
        buf.clear();
        match list.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("target list read failed after {line_count} lines: {e}");
                break;
            }
        }
        // Undecodable bytes become U+FFFD rather than ending the scan.
        let line = String::from_utf8_lossy(&buf);
        line_count += 1;
        let mut produced = false;
        for task in enumerator.tasks(&line) {
            produced = true;
            pool.submit(task).await?;
        }
        let trimmed = line.trim();
        if !produced && !trimmed.is_empty() && !trimmed.starts_with('#') {
            debug!(line = trimmed, "line produced no tasks");
            skipped += 1;
        }
    }

    let mut summary = pool.finish().await;
    let rendered = sink.await??;
    debug!(rendered, "result sink drained");

    summary.lines = line_count;
    summary.skipped_lines = skipped;
    if skipped > 0 && !enumerator.has_ports() {
        warn!(
            skipped,
            "bare-host lines skipped: no ports given (use -p or host,port lines)"
        );
    }
    info!(
        tasks = summary.tasks,
        detections = summary.detections,
        reported = summary.reported,
        "scan complete"
    );
    Ok(summary)
}
