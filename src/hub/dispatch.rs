//! Deferred delivery
//!
//! Every listener invocation goes through a `Dispatcher`: hub operations push
//! a `Job` onto an unbounded FIFO and return, and a single consumer runs the
//! jobs later. One consumer per hub keeps deliveries in enqueue order, which
//! gives the per-topic subscription-order guarantee.
//!
//! The queue outlives its consumers. The receiving end is either parked in
//! the dispatcher or leased by exactly one consumer: a task on the current
//! tokio runtime or, when there is none (or `DispatchMode::Thread` is
//! configured), a dedicated thread. A lease hands the receiver back when its
//! consumer goes away, e.g. because the runtime it lived on was shut down;
//! jobs still queued at that point are drained on a thread, and the next
//! enqueue starts a fresh consumer.
//!
//! A panicking listener is caught per delivery, logged, and published as a
//! `DeliveryFailure`; the jobs behind it still run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error};

use crate::config::DispatchMode;
use crate::hub::listener::{Listener, ListenerId};
use crate::hub::topic::Payload;
use crate::utils::error::Result;

const THREAD_NAME: &str = "broadcast-dispatch";

/// A listener that panicked while handling a resolution.
#[derive(Debug, Clone)]
pub struct DeliveryFailure<K> {
    pub topic: K,
    pub listener: ListenerId,
    /// The panic message, when it was a string.
    pub message: String,
    /// Milliseconds since UNIX epoch.
    pub failed_at: i64,
}

pub(crate) struct Delivery<K, V> {
    pub topic: K,
    pub listener: Listener<V>,
    pub payload: Payload<V>,
}

pub(crate) enum Job<K, V> {
    Deliver(Delivery<K, V>),
    /// Completes once every job queued before it has run.
    Barrier(oneshot::Sender<()>),
}

type Receiver<K, V> = mpsc::UnboundedReceiver<Job<K, V>>;

/// The receiver while no consumer holds it.
type Parked<K, V> = Arc<Mutex<Option<Receiver<K, V>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct Dispatcher<K, V> {
    mode: DispatchMode,
    tx: mpsc::UnboundedSender<Job<K, V>>,
    parked: Parked<K, V>,
    failures: broadcast::Sender<DeliveryFailure<K>>,
}

impl<K, V> Dispatcher<K, V>
where
    K: std::fmt::Debug + Clone + Send + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(mode: DispatchMode, failure_capacity: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (failures, _) = broadcast::channel(failure_capacity.max(1));
        Self {
            mode,
            tx,
            parked: Arc::new(Mutex::new(Some(rx))),
            failures,
        }
    }

    pub fn failures(&self) -> broadcast::Receiver<DeliveryFailure<K>> {
        self.failures.subscribe()
    }

    pub fn deliver(&self, topic: K, listener: Listener<V>, payload: Payload<V>) {
        self.enqueue(Job::Deliver(Delivery {
            topic,
            listener,
            payload,
        }));
    }

    pub fn barrier(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Job::Barrier(tx));
        rx
    }

    fn enqueue(&self, job: Job<K, V>) {
        // send and check under the parking lock, so a lease being returned
        // either sees this job or leaves the receiver for us to pick up
        let rx = {
            let mut parked = lock(&self.parked);
            // the receiver is parked or leased, never dropped while tx is alive
            let _ = self.tx.send(job);
            match parked.take() {
                Some(rx) => rx,
                None => return,
            }
        };
        self.start(rx);
    }

    fn start(&self, rx: Receiver<K, V>) {
        if self.mode == DispatchMode::Runtime {
            if let Ok(handle) = Handle::try_current() {
                let lease = Lease::new(rx, self.parked.clone(), self.failures.clone());
                handle.spawn(run_async(lease));
                debug!("dispatcher started on tokio runtime");
                return;
            }
            debug!("no tokio runtime available, dispatching on a thread");
        }

        *lock(&self.parked) = Some(rx);
        if let Err(e) = spawn_consumer(self.parked.clone(), self.failures.clone(), Until::Closed) {
            error!("Failed to start dispatcher, jobs stay queued: {e}");
        }
    }
}

/// How long a thread consumer keeps its lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Until {
    /// Until the hub goes away.
    Closed,
    /// Until the queue is momentarily empty.
    Drained,
}

/// Exclusive hold on the receiver. Dropping it parks the receiver again.
struct Lease<K, V>
where
    K: std::fmt::Debug + Send + 'static,
    V: Send + Sync + 'static,
{
    rx: Option<Receiver<K, V>>,
    parked: Parked<K, V>,
    failures: broadcast::Sender<DeliveryFailure<K>>,
}

impl<K, V> Lease<K, V>
where
    K: std::fmt::Debug + Send + 'static,
    V: Send + Sync + 'static,
{
    fn new(
        rx: Receiver<K, V>,
        parked: Parked<K, V>,
        failures: broadcast::Sender<DeliveryFailure<K>>,
    ) -> Self {
        Self {
            rx: Some(rx),
            parked,
            failures,
        }
    }

    async fn recv(&mut self) -> Option<Job<K, V>> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    fn blocking_recv(&mut self) -> Option<Job<K, V>> {
        self.rx.as_mut().and_then(|rx| rx.blocking_recv())
    }

    fn try_recv(&mut self) -> Option<Job<K, V>> {
        self.rx.as_mut().and_then(|rx| rx.try_recv().ok())
    }
}

impl<K, V> Drop for Lease<K, V>
where
    K: std::fmt::Debug + Send + 'static,
    V: Send + Sync + 'static,
{
    fn drop(&mut self) {
        let Some(rx) = self.rx.take() else {
            return;
        };

        let backlog = {
            let mut parked = lock(&self.parked);
            let backlog = !rx.is_empty();
            *parked = Some(rx);
            backlog
        };

        if backlog {
            debug!("dispatcher stopped with queued jobs, draining them on a thread");
            if let Err(e) = spawn_consumer(self.parked.clone(), self.failures.clone(), Until::Drained) {
                error!("Failed to drain dispatcher, jobs stay queued: {e}");
            }
        }
    }
}

fn spawn_consumer<K, V>(
    parked: Parked<K, V>,
    failures: broadcast::Sender<DeliveryFailure<K>>,
    until: Until,
) -> Result<()>
where
    K: std::fmt::Debug + Send + 'static,
    V: Send + Sync + 'static,
{
    thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            // another consumer may have picked the receiver up in the meantime
            let Some(rx) = lock(&parked).take() else {
                return;
            };
            run_blocking(Lease::new(rx, parked, failures), until);
        })?;
    debug!("dispatcher started on thread {THREAD_NAME} ({until:?})");
    Ok(())
}

async fn run_async<K, V>(mut lease: Lease<K, V>)
where
    K: std::fmt::Debug + Send + 'static,
    V: Send + Sync + 'static,
{
    while let Some(job) = lease.recv().await {
        job.run(&lease.failures);
    }
}

fn run_blocking<K, V>(mut lease: Lease<K, V>, until: Until)
where
    K: std::fmt::Debug + Send + 'static,
    V: Send + Sync + 'static,
{
    loop {
        let job = match until {
            Until::Closed => lease.blocking_recv(),
            Until::Drained => lease.try_recv(),
        };
        match job {
            Some(job) => job.run(&lease.failures),
            None => break,
        }
    }
}

impl<K: std::fmt::Debug, V> Job<K, V> {
    fn run(self, failures: &broadcast::Sender<DeliveryFailure<K>>) {
        match self {
            Job::Deliver(delivery) => delivery.run(failures),
            Job::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
}

impl<K: std::fmt::Debug, V> Delivery<K, V> {
    fn run(self, failures: &broadcast::Sender<DeliveryFailure<K>>) {
        let Delivery {
            topic,
            listener,
            payload,
        } = self;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.call(&payload)));
        if let Err(cause) = outcome {
            let message = panic_message(&*cause);
            error!(
                topic = ?topic,
                listener = %listener.id(),
                "Listener panicked: {message}"
            );
            // no receivers is fine, the failure has been logged
            let _ = failures.send(DeliveryFailure {
                topic,
                listener: listener.id(),
                message,
                failed_at: chrono::Utc::now().timestamp_millis(),
            });
        }
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
