//! Continuous background sampling.
//!
//! A [`Sampler`] runs a polling closure against a [`SharedDriver`] on a
//! worker thread and buffers completed samples in a bounded ring. When the
//! ring is full the oldest sample is dropped and counted as an overrun, so a
//! slow consumer never stalls the worker.
//!
//! Stopping is cooperative: [`Sampler::stop`] clears a shared running flag,
//! waits for the worker to finish its current poll and returns every sample
//! still buffered.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TrySendError, bounded};
use tracing::{error, info, warn};

use crate::{
    driver::{BoardDriver, SharedDriver},
    error::{Error, Result},
};

/// Counters of a sampler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Samples pushed into the ring.
    pub samples: u64,
    /// Samples discarded because the ring was full.
    pub overruns: u64,
}

#[derive(Debug, Default)]
struct Counters {
    samples: AtomicU64,
    overruns: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SamplerStats {
        SamplerStats {
            samples: self.samples.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running sampling worker.
pub struct Sampler<S> {
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    rx: Receiver<S>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl<S: Send + 'static> Sampler<S> {
    /// Starts a worker that calls `poll` in a loop until stopped.
    ///
    /// `poll` runs inside [`SharedDriver::with_driver`] and returns
    /// `Some(sample)` when a sample is complete or `None` while the board is
    /// not ready yet. An error from `poll` stops the worker and is returned
    /// by [`stop`](Self::stop).
    ///
    /// The board stays locked for the whole of each `poll` call, so `poll`
    /// should do one step and return. Waiting loops such as
    /// [`BoardDriver::poll_flag`] belong outside the sampler; the worker
    /// already calls `poll` again on `None`.
    pub fn start<IO, AP, F>(shared: Arc<SharedDriver<IO, AP>>, capacity: usize, mut poll: F) -> Self
    where
        IO: Send + 'static,
        AP: Send + 'static,
        F: FnMut(&mut BoardDriver<IO, AP>) -> Result<Option<S>> + Send + 'static,
    {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded::<S>(capacity);
        let overflow = rx.clone();
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        let running_worker = Arc::clone(&running);
        let counters_worker = Arc::clone(&counters);

        info!(capacity, "sampler started");
        let worker = thread::spawn(move || {
            while running_worker.load(Ordering::SeqCst) {
                let sample = match shared.with_driver(&mut poll) {
                    Ok(Some(sample)) => sample,
                    Ok(None) => {
                        thread::yield_now();
                        continue;
                    }
                    Err(e) => {
                        error!(error = %e, "sampler worker failed");
                        running_worker.store(false, Ordering::SeqCst);
                        return Err(e);
                    }
                };

                let mut pending = sample;
                loop {
                    match tx.try_send(pending) {
                        Ok(()) => {
                            counters_worker.samples.fetch_add(1, Ordering::Relaxed);
                            break;
                        }
                        Err(TrySendError::Full(sample)) => {
                            // Ring full: drop the oldest and retry
                            let _ = overflow.try_recv();
                            let overruns = counters_worker.overruns.fetch_add(1, Ordering::Relaxed) + 1;
                            warn!(overruns, "sampler ring overrun, oldest sample dropped");
                            pending = sample;
                        }
                        Err(TrySendError::Disconnected(_)) => return Ok(()),
                    }
                }
            }
            Ok(())
        });

        Self {
            running,
            counters,
            rx,
            worker: Some(worker),
        }
    }
}

impl<S> Sampler<S> {
    /// True until the sampler is stopped or its worker fails.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    pub fn stats(&self) -> SamplerStats {
        self.counters.snapshot()
    }

    /// Oldest buffered sample, if any.
    pub fn try_recv(&self) -> Option<S> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next sample.
    ///
    /// # Errors
    /// * [`Error::Timeout`] - if no sample arrived in time
    /// * [`Error::SamplerStopped`] - if the worker has exited and the ring is empty
    pub fn recv_timeout(&self, timeout: Duration) -> Result<S> {
        match self.rx.recv_timeout(timeout) {
            Ok(sample) => Ok(sample),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout { waited: timeout }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::SamplerStopped),
        }
    }

    /// All samples currently buffered, oldest first.
    pub fn drain(&self) -> Vec<S> {
        self.rx.try_iter().collect()
    }

    /// Stops the worker and returns the samples still buffered, together
    /// with how the worker ended.
    ///
    /// Samples buffered before a worker failure are returned as well. The
    /// outcome is the error that stopped the worker, if it failed, or
    /// [`Error::SamplerStopped`] if it panicked.
    pub fn stop(mut self) -> (Vec<S>, Result<()>) {
        let outcome = self.shutdown();
        (self.drain(), outcome)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let outcome = worker.join().map_err(|_| Error::SamplerStopped)?;
        let stats = self.stats();
        info!(
            samples = stats.samples,
            overruns = stats.overruns,
            "sampler stopped"
        );
        outcome
    }
}

impl<S> Drop for Sampler<S> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl<S> core::fmt::Debug for Sampler<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sampler")
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;
    use crate::{
        io::IoAddress,
        test_support::{PORT_BASE, test_driver},
    };

    fn shared() -> Arc<SharedDriver<crate::io::SimulatedIo>> {
        Arc::new(SharedDriver::new(test_driver()))
    }

    #[test]
    fn collects_until_stopped() {
        let shared = shared();
        let next = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&next);

        let sampler = Sampler::start(Arc::clone(&shared), 1024, move |driver| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n >= 10 {
                return Ok(None);
            }
            driver.write_u8(0, 2, n as u8)?;
            Ok(Some(n))
        });

        let first = sampler.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, 0);
        while sampler.stats().samples < 10 {
            thread::yield_now();
        }
        let (rest, outcome) = sampler.stop();
        outcome.unwrap();
        assert_eq!(rest, (1..10).collect::<Vec<_>>());

        let out = shared.with_driver(|d| d.io().output(IoAddress::Port(PORT_BASE + 2)));
        assert_eq!(out, 9);
    }

    #[test]
    fn full_ring_drops_oldest() {
        let next = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&next);
        let sampler = Sampler::start(shared(), 4, move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok((n < 20).then_some(n))
        });

        while sampler.stats().samples < 20 {
            thread::yield_now();
        }
        let stats = sampler.stats();
        let (kept, outcome) = sampler.stop();
        assert!(outcome.is_ok());
        assert_eq!(kept, vec![16, 17, 18, 19]);
        assert_eq!(stats.overruns, 16);
    }

    #[test]
    fn worker_error_is_reported_on_stop() {
        let sampler: Sampler<u8> = Sampler::start(shared(), 8, |driver| {
            driver.read(0, 0, 3)?;
            Ok(None)
        });

        assert!(matches!(
            sampler.recv_timeout(Duration::from_secs(5)),
            Err(Error::SamplerStopped)
        ));
        assert!(!sampler.is_running());
        let (samples, outcome) = sampler.stop();
        assert!(samples.is_empty());
        assert!(matches!(outcome, Err(Error::InvalidAccessSize { size: 3, .. })));
    }

    #[test]
    fn samples_before_failure_survive_stop() {
        let next = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&next);
        let sampler = Sampler::start(shared(), 8, move |driver| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                return Ok(Some(n));
            }
            driver.read(0, 0, 3)?;
            Ok(None)
        });

        while sampler.is_running() {
            thread::yield_now();
        }
        let (samples, outcome) = sampler.stop();
        assert_eq!(samples, vec![0, 1, 2]);
        assert!(matches!(outcome, Err(Error::InvalidAccessSize { size: 3, .. })));
    }

    #[test]
    fn drop_stops_worker() {
        let polls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&polls);
        let sampler: Sampler<()> = Sampler::start(shared(), 1, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });
        while polls.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        drop(sampler);
        let after = polls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(polls.load(Ordering::SeqCst), after);
    }
}
