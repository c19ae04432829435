use crate::config::ExtractorConfig;
use crate::world::WorldSource;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;

type WorldJob<W> = Box<dyn FnOnce(&mut W) + Send>;

/// Why a read could not be marshaled onto the world thread. All of these are transient; the same read can be re-issued on
/// the next sync pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarshalError {
    QueueFull,
    Closed,
    TimedOut,
    Panicked,
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalError::QueueFull => f.write_str("world thread queue is full"),
            MarshalError::Closed => f.write_str("world thread has shut down"),
            MarshalError::TimedOut => f.write_str("world thread did not answer in time"),
            MarshalError::Panicked => f.write_str("world job panicked"),
        }
    }
}

impl std::error::Error for MarshalError {}

/// Owns a [`WorldSource`] on one dedicated thread and runs submitted closures against it in submission order.
///
/// The world's data structures are only ever touched from that thread. Callers suspend on a oneshot until their closure has
/// run or the configured timeout elapses.
pub struct WorldThread<W> {
    jobs: Option<Sender<WorldJob<W>>>,
    available: Arc<AtomicBool>,
    timeout: Duration,
    worker: Option<JoinHandle<()>>,
}

impl<W: WorldSource> WorldThread<W> {
    pub fn spawn(world: W, config: ExtractorConfig) -> io::Result<Self> {
        let (jobs, job_rx) = channel::bounded(config.queue_capacity.max(1));
        let available = Arc::new(AtomicBool::new(world.is_loaded()));
        let worker_available = available.clone();
        let tick = config.tick_interval();
        let worker = thread::Builder::new()
            .name("world".to_owned())
            .spawn(move || world_loop(world, job_rx, worker_available, tick))?;

        Ok(Self {
            jobs: Some(jobs),
            available,
            timeout: config.job_timeout(),
            worker: Some(worker),
        })
    }

    /// Whether the world reported itself loaded as of the last tick.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Runs `f` on the world thread and waits for its result.
    pub async fn run<T, F>(&self, f: F) -> Result<T, MarshalError>
    where
        F: FnOnce(&mut W) -> T + Send + 'static,
        T: Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(MarshalError::Closed)?;
        let (tx, rx) = oneshot::channel();
        let available = self.available.clone();
        let job: WorldJob<W> = Box::new(move |world| {
            let value = f(world);
            available.store(world.is_loaded(), Ordering::Release);
            // The caller may have timed out already.
            let _ = tx.send(value);
        });
        jobs.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => MarshalError::QueueFull,
            TrySendError::Disconnected(_) => MarshalError::Closed,
        })?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            // The sender was dropped without a value, which only happens when the job unwound.
            Ok(Err(_)) => Err(MarshalError::Panicked),
            Err(_) => Err(MarshalError::TimedOut),
        }
    }
}

impl<W> Drop for WorldThread<W> {
    fn drop(&mut self) {
        // Disconnecting the queue stops the worker after it drains.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("World thread exited with a panic");
            }
        }
    }
}

fn world_loop<W: WorldSource>(
    mut world: W,
    jobs: Receiver<WorldJob<W>>,
    available: Arc<AtomicBool>,
    tick: Duration,
) {
    log::debug!("World thread started");
    loop {
        match jobs.recv_timeout(tick) {
            Ok(job) => {
                if panic::catch_unwind(AssertUnwindSafe(|| job(&mut world))).is_err() {
                    log::error!("World job panicked; continuing with the next job");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        available.store(world.is_loaded(), Ordering::Release);
    }
    log::debug!("World thread stopped");
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{GridWorld, WorldSize};

    use terramap_core::ChunkCoords;

    fn spawn_world(config: ExtractorConfig) -> WorldThread<GridWorld> {
        WorldThread::spawn(GridWorld::new(WorldSize::new(64, 64), 256), config).unwrap()
    }

    #[tokio::test]
    async fn jobs_run_on_the_world_thread() {
        let world = spawn_world(ExtractorConfig::default());
        let name = world
            .run(|_| thread::current().name().map(str::to_owned))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("world"));
    }

    #[tokio::test]
    async fn jobs_see_earlier_mutations() {
        let world = spawn_world(ExtractorConfig::default());
        world
            .run(|w| {
                w.insert_chunk(
                    ChunkCoords::new(1, 1),
                    crate::world::ChunkSurface::filled(3, 4),
                )
            })
            .await
            .unwrap();
        let loaded = world
            .run(|w| w.chunk_surface(ChunkCoords::new(1, 1)).is_some())
            .await
            .unwrap();
        assert!(loaded);
    }

    #[tokio::test]
    async fn panicking_job_is_reported_and_worker_survives() {
        let world = spawn_world(ExtractorConfig::default());
        let result: Result<(), _> = world.run(|_| panic!("boom")).await;
        assert_eq!(result, Err(MarshalError::Panicked));
        assert_eq!(world.run(|w| w.map_height()).await, Ok(256));
    }

    #[tokio::test]
    async fn slow_job_times_out() {
        let world = spawn_world(ExtractorConfig {
            job_timeout_ms: 20,
            ..Default::default()
        });
        let result = world
            .run(|_| thread::sleep(Duration::from_millis(200)))
            .await;
        assert_eq!(result, Err(MarshalError::TimedOut));
        // The queue still drains once the slow job is done.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(world.run(|w| w.map_height()).await, Ok(256));
    }

    #[tokio::test]
    async fn availability_follows_the_world() {
        let world = spawn_world(ExtractorConfig {
            tick_interval_ms: 5,
            ..Default::default()
        });
        assert!(world.is_available());
        world.run(|w| w.set_loaded(false)).await.unwrap();
        assert!(!world.is_available());
        world.run(|w| w.set_loaded(true)).await.unwrap();
        assert!(world.is_available());
    }
}
