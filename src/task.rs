use anyhow::{anyhow, Result};
use std::fmt;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Cloneable error so a failed promise can report the same failure to every
/// waiter.
#[derive(Clone)]
pub struct TaskError {
    inner: Arc<anyhow::Error>,
}

impl TaskError {
    pub fn new(err: anyhow::Error) -> Self {
        Self { inner: Arc::new(err) }
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err)
    }
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner.as_ref(), f)
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl std::error::Error for TaskError {
    // Expose the wrapped chain so sentinel errors (e.g. the registry's
    // NotFound) stay matchable through a failed promise.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(AsRef::<dyn std::error::Error + Send + Sync>::as_ref(self.inner.as_ref()))
    }
}

enum PromiseState<T> {
    Pending,
    Delivered(T),
    Failed(TaskError),
}

struct PromiseShared<T> {
    cell: Mutex<PromiseState<T>>,
    ready: Condvar,
}

/// Single-delivery result container. `deliver`/`fail` must be called exactly
/// once; `ready` and `wait` may be called any number of times afterwards and
/// from any thread.
pub struct Promise<T> {
    shared: Arc<PromiseShared<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T: Clone> Promise<T> {
    pub fn pending() -> Self {
        Self {
            shared: Arc::new(PromiseShared {
                cell: Mutex::new(PromiseState::Pending),
                ready: Condvar::new(),
            }),
        }
    }

    pub fn delivered(value: T) -> Self {
        let promise = Self::pending();
        promise.deliver(value);
        promise
    }

    pub fn failed(err: anyhow::Error) -> Self {
        let promise = Self::pending();
        promise.fail(err);
        promise
    }

    pub fn deliver(&self, value: T) {
        let mut cell = self.shared.cell.lock().expect("promise lock");
        match *cell {
            PromiseState::Pending => {
                *cell = PromiseState::Delivered(value);
                self.shared.ready.notify_all();
            }
            _ => panic!("promise resolved more than once"),
        }
    }

    pub fn fail(&self, err: impl Into<TaskError>) {
        let mut cell = self.shared.cell.lock().expect("promise lock");
        match *cell {
            PromiseState::Pending => {
                *cell = PromiseState::Failed(err.into());
                self.shared.ready.notify_all();
            }
            _ => panic!("promise resolved more than once"),
        }
    }

    pub fn ready(&self) -> bool {
        let cell = self.shared.cell.lock().expect("promise lock");
        !matches!(*cell, PromiseState::Pending)
    }

    /// Blocks until the promise is resolved and returns a clone of the
    /// outcome.
    pub fn wait(&self) -> Result<T> {
        let mut cell = self.shared.cell.lock().expect("promise lock");
        while matches!(*cell, PromiseState::Pending) {
            cell = self.shared.ready.wait(cell).expect("promise lock");
        }
        match &*cell {
            PromiseState::Delivered(value) => Ok(value.clone()),
            PromiseState::Failed(err) => Err(anyhow::Error::new(err.clone())),
            PromiseState::Pending => unreachable!(),
        }
    }
}

/// Waits for every promise in order; the first failure aborts the wait.
pub fn wait_all<T: Clone>(promises: &[Promise<T>]) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(promises.len());
    for promise in promises {
        values.push(promise.wait()?);
    }
    Ok(values)
}

type Job<C> = Box<dyn FnOnce(&mut C) + Send>;

/// A dedicated OS thread owning a context value. Scheduled closures run to
/// completion in submission order on that thread; there is no cancellation.
pub struct Worker<C> {
    sender: Option<mpsc::Sender<Job<C>>>,
    handle: Option<JoinHandle<()>>,
}

impl<C: Send + 'static> Worker<C> {
    pub fn spawn(name: &str, mut context: C) -> Self {
        let (sender, receiver) = mpsc::channel::<Job<C>>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    job(&mut context);
                }
            })
            .expect("worker thread");
        Self { sender: Some(sender), handle: Some(handle) }
    }

    pub fn schedule<T, F>(&self, job: F) -> Promise<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&mut C) -> Result<T> + Send + 'static,
    {
        let promise = Promise::pending();
        let delivery = promise.clone();
        let boxed: Job<C> = Box::new(move |context| match job(context) {
            Ok(value) => delivery.deliver(value),
            Err(err) => delivery.fail(err),
        });
        let sender = self.sender.as_ref().expect("worker sender");
        if sender.send(boxed).is_err() {
            promise.fail(anyhow!("worker has shut down"));
        }
        promise
    }

    pub fn schedule_void<F>(&self, job: F) -> Promise<()>
    where
        F: FnOnce(&mut C) -> Result<()> + Send + 'static,
    {
        self.schedule(job)
    }
}

impl<C> Drop for Worker<C> {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn promise_delivers_to_every_waiter() {
        let promise = Promise::pending();
        let clone = promise.clone();
        let waiter = thread::spawn(move || clone.wait().expect("delivered value"));
        promise.deliver(7u32);
        assert_eq!(waiter.join().expect("waiter thread"), 7);
        assert_eq!(promise.wait().expect("value still available"), 7);
        assert!(promise.ready());
    }

    #[test]
    #[should_panic(expected = "promise resolved more than once")]
    fn promise_rejects_double_delivery() {
        let promise = Promise::pending();
        promise.deliver(1u32);
        promise.deliver(2u32);
    }

    #[test]
    fn failed_promise_reports_to_every_waiter() {
        let promise: Promise<u32> = Promise::failed(anyhow!("boom"));
        assert!(promise.wait().is_err());
        assert!(promise.wait().is_err());
    }

    #[test]
    fn wait_all_aborts_on_first_failure() {
        let good = Promise::delivered(1u32);
        let bad: Promise<u32> = Promise::failed(anyhow!("broken"));
        assert!(wait_all(&[good.clone(), bad]).is_err());
        assert_eq!(wait_all(&[good.clone(), good]).expect("all delivered"), vec![1, 1]);
    }

    #[test]
    fn worker_runs_jobs_in_submission_order() {
        let worker = Worker::spawn("test", Vec::<u32>::new());
        let first = worker.schedule(|log: &mut Vec<u32>| {
            log.push(1);
            Ok(log.len())
        });
        let second = worker.schedule(|log: &mut Vec<u32>| {
            log.push(2);
            Ok(log.len())
        });
        assert_eq!(first.wait().expect("first job"), 1);
        assert_eq!(second.wait().expect("second job"), 2);
    }

    #[test]
    fn worker_propagates_job_errors() {
        let counter = Arc::new(AtomicUsize::new(0));
        let worker = Worker::spawn("test", ());
        let tally = counter.clone();
        let ok = worker.schedule(move |_| {
            tally.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let failing = worker.schedule_void(|_| Err(anyhow!("job failed")));
        ok.wait().expect("first job succeeds");
        assert!(failing.wait().is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
