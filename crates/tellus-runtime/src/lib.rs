//! Background chunk generation: a rayon pool fed through crossbeam channels.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tellus_chunk::{BuiltChunk, build_chunk};
use tellus_edit::EditRecord;
use tellus_world::{ChunkKey, Terrain};

/// One chunk to generate. `edits` is a snapshot of the chunk's overlay
/// taken on the tick thread; workers never see the live store.
#[derive(Clone, Debug)]
pub struct GenJob {
    pub key: ChunkKey,
    pub job_id: u64,
    pub edits: Vec<EditRecord>,
}

pub struct GenOut {
    pub key: ChunkKey,
    pub job_id: u64,
    pub built: BuiltChunk,
    pub t_total_ms: u32,
    pub t_queue_ms: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to start generation workers: {0}")]
    Pool(#[from] ThreadPoolBuildError),
}

struct Queued {
    job: GenJob,
    submitted: Instant,
}

#[inline]
fn ms_since(t: Instant) -> u32 {
    t.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

fn process_gen_job(queued: Queued, terrain: &Terrain, tx: &Sender<GenOut>) {
    let Queued { job, submitted } = queued;
    let GenJob { key, job_id, edits } = job;
    let t_queue_ms = ms_since(submitted);
    let t0 = Instant::now();
    let built = build_chunk(terrain, key, &edits);
    let t_total_ms = ms_since(t0);
    // Receiver gone means the runtime is shutting down.
    let _ = tx.send(GenOut {
        key,
        job_id,
        built,
        t_total_ms,
        t_queue_ms,
    });
}

pub struct Runtime {
    job_tx: Sender<Queued>,
    res_rx: Receiver<GenOut>,
    _pool: Arc<ThreadPool>,
    q_gen: Arc<AtomicUsize>,
    inflight_gen: Arc<AtomicUsize>,
    pub workers: usize,
}

impl Runtime {
    /// Start `workers` generation threads; 0 picks the machine's available
    /// parallelism.
    pub fn new(terrain: Arc<Terrain>, workers: usize) -> Result<Self, RuntimeError> {
        let (job_tx, job_rx) = unbounded::<Queued>();
        let (res_tx, res_rx) = unbounded::<GenOut>();

        let workers = if workers == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };

        let q_gen = Arc::new(AtomicUsize::new(0));
        let inflight_gen = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("tellus-gen-{i}"))
                .build()?,
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let terrain = terrain.clone();
            let q_gen = q_gen.clone();
            let inflight_gen = inflight_gen.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    // Count in flight before leaving the queue so both never read zero
                    // while a job is still outstanding.
                    inflight_gen.fetch_add(1, Ordering::SeqCst);
                    q_gen.fetch_sub(1, Ordering::SeqCst);
                    process_gen_job(job, terrain.as_ref(), &tx);
                    inflight_gen.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }
        log::info!(target: "runtime", "generation pool started with {workers} workers");

        Ok(Self {
            job_tx,
            res_rx,
            _pool: pool,
            q_gen,
            inflight_gen,
            workers,
        })
    }

    pub fn submit(&self, job: GenJob) {
        self.q_gen.fetch_add(1, Ordering::SeqCst);
        let queued = Queued {
            job,
            submitted: Instant::now(),
        };
        if self.job_tx.send(queued).is_err() {
            self.q_gen.fetch_sub(1, Ordering::SeqCst);
            log::warn!(target: "runtime", "generation queue closed; job dropped");
        }
    }

    pub fn drain_worker_results(&self) -> Vec<GenOut> {
        self.res_rx.try_iter().collect()
    }

    /// Block for the next result, up to `timeout`.
    pub fn wait_result(&self, timeout: Duration) -> Option<GenOut> {
        match self.res_rx.recv_timeout(timeout) {
            Ok(out) => Some(out),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// True when nothing is queued or being generated. Once idle, every
    /// submitted job's result is already in the result channel.
    pub fn is_idle(&self) -> bool {
        self.q_gen.load(Ordering::SeqCst) == 0 && self.inflight_gen.load(Ordering::SeqCst) == 0
    }

    /// (queued, in flight)
    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.q_gen.load(Ordering::Relaxed),
            self.inflight_gen.load(Ordering::Relaxed),
        )
    }
}
