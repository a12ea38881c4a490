use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Entries batched for one worker: `(lane, sample position, serialized FASTQ bytes)`.
pub type Batch = Vec<(u32, u64, Vec<u8>)>;

/// Number of entries in a worker's head batch above which the producer signals the worker
/// rather than waiting for the next natural wakeup.
const BATCH_THRESHOLD: usize = 4096;

/// Per-worker memory ceiling (bytes) on the head batch; the producer blocks until the
/// worker has drained below this before enqueuing more.
const MEM_CAP: usize = 1 << 30;

const BACKPRESSURE_SLEEP: Duration = Duration::from_millis(300);

struct WorkerQueue {
    batches: Mutex<VecDeque<Batch>>,
    cv: Condvar,
}

impl WorkerQueue {
    fn new() -> Self {
        WorkerQueue { batches: Mutex::new(VecDeque::new()), cv: Condvar::new() }
    }
}

/// A bounded, per-worker fan-out queue with byte-size backpressure: one queue per worker
/// thread, a shared `is_done` flag the producer sets once after the input is exhausted.
pub struct Router {
    queues: Vec<Arc<WorkerQueue>>,
    is_done: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl Router {
    /// Spawns `worker_count` worker threads; `handle_entry` is called once per `(lane,
    /// sample position, bytes)` entry, on the worker thread that owns it.
    pub fn spawn<F>(worker_count: usize, handle_entry: F) -> Self
    where
        F: Fn(u32, u64, &[u8]) + Send + Sync + 'static,
    {
        let handle_entry = Arc::new(handle_entry);
        let is_done = Arc::new(AtomicBool::new(false));
        let queues: Vec<Arc<WorkerQueue>> = (0..worker_count).map(|_| Arc::new(WorkerQueue::new())).collect();

        let workers = queues
            .iter()
            .cloned()
            .map(|queue| {
                let is_done = Arc::clone(&is_done);
                let handle_entry = Arc::clone(&handle_entry);
                std::thread::spawn(move || worker_loop(queue, is_done, handle_entry))
            })
            .collect();

        Router { queues, is_done, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }

    /// Enqueues one entry on worker `pos % worker_count`, applying backpressure if that
    /// worker's head batch has grown past [`BATCH_THRESHOLD`]/[`MEM_CAP`].
    pub fn enqueue(&self, lane: u32, pos: u64, bytes: Vec<u8>) {
        let worker = pos as usize % self.queues.len();
        let queue = &self.queues[worker];

        let mut batches = queue.batches.lock().unwrap();
        if batches.is_empty() {
            batches.push_back(Vec::new());
        }
        batches.back_mut().unwrap().push((lane, pos, bytes));

        let over_threshold = batches.back().unwrap().len() > BATCH_THRESHOLD;
        if over_threshold {
            queue.cv.notify_one();
        }
        drop(batches);

        loop {
            let batches = queue.batches.lock().unwrap();
            let head_bytes: usize = batches.front().map_or(0, |b| b.iter().map(|(_, _, bytes)| bytes.len()).sum());
            if head_bytes <= MEM_CAP {
                break;
            }
            drop(batches);
            std::thread::sleep(BACKPRESSURE_SLEEP);
        }
    }

    /// Signals shutdown and waits for every worker to drain its queue and exit.
    pub fn finish(self) {
        self.is_done.store(true, Ordering::Release);
        for queue in &self.queues {
            queue.cv.notify_one();
        }
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

fn worker_loop<F>(queue: Arc<WorkerQueue>, is_done: Arc<AtomicBool>, handle_entry: Arc<F>)
where
    F: Fn(u32, u64, &[u8]) + Send + Sync + 'static,
{
    loop {
        let mut batches = queue.batches.lock().unwrap();
        loop {
            if !batches.is_empty() {
                break;
            }
            if is_done.load(Ordering::Acquire) {
                return;
            }
            batches = queue.cv.wait(batches).unwrap();
        }
        let batch = batches.pop_front().unwrap_or_default();
        drop(batches);

        for (lane, pos, bytes) in &batch {
            handle_entry(*lane, *pos, bytes);
        }
    }
}
