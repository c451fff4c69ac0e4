use anyhow::Result;
use std::sync::{Arc, OnceLock};

use super::digest::{create_digest, Digest, Digestible};
use crate::task::TaskError;

/// A lazily evaluated builder-graph node: it can produce its value and a
/// stable content digest of everything that value depends on.
pub trait Provider: Send + Sync {
    type Output;

    fn get(&self) -> Result<Self::Output>;

    fn digest(&self) -> Result<Digest>;
}

pub type SharedProvider<T> = Arc<dyn Provider<Output = T>>;

/// Memoizes `get` and `digest` independently. Providers are shared across
/// build paths, so the wrapped computation must run exactly once even under
/// concurrent first access; `OnceLock` gives that guarantee.
pub struct OnceProvider<T> {
    inner: SharedProvider<T>,
    value: OnceLock<Result<T, TaskError>>,
    content_digest: OnceLock<Result<Digest, TaskError>>,
}

impl<T: Clone + Send + Sync + 'static> Provider for OnceProvider<T> {
    type Output = T;

    fn get(&self) -> Result<T> {
        self.value
            .get_or_init(|| self.inner.get().map_err(TaskError::from))
            .clone()
            .map_err(anyhow::Error::new)
    }

    fn digest(&self) -> Result<Digest> {
        self.content_digest
            .get_or_init(|| self.inner.digest().map_err(TaskError::from))
            .clone()
            .map_err(anyhow::Error::new)
    }
}

/// Wraps a provider with compute-once memoization.
pub fn once<T: Clone + Send + Sync + 'static>(inner: SharedProvider<T>) -> SharedProvider<T> {
    Arc::new(OnceProvider { inner, value: OnceLock::new(), content_digest: OnceLock::new() })
}

struct ConstProvider<T> {
    value: T,
}

impl<T> Provider for ConstProvider<T>
where
    T: Clone + Digestible + Send + Sync + 'static,
{
    type Output = T;

    fn get(&self) -> Result<T> {
        Ok(self.value.clone())
    }

    fn digest(&self) -> Result<Digest> {
        Ok(create_digest("const", |hasher| self.value.digest_content(hasher)))
    }
}

/// Leaf provider over a digestible constant.
pub fn const_value<T>(value: T) -> SharedProvider<T>
where
    T: Clone + Digestible + Send + Sync + 'static,
{
    Arc::new(ConstProvider { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        digest_calls: Arc<AtomicUsize>,
    }

    impl Provider for CountingProvider {
        type Output = u64;

        fn get(&self) -> Result<u64> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) as u64 + 41)
        }

        fn digest(&self) -> Result<Digest> {
            self.digest_calls.fetch_add(1, Ordering::SeqCst);
            Ok(create_digest("counting", |_| {}))
        }
    }

    #[test]
    fn once_invokes_the_underlying_get_exactly_once_under_contention() {
        let calls = Arc::new(AtomicUsize::new(0));
        let digest_calls = Arc::new(AtomicUsize::new(0));
        let provider = once(Arc::new(CountingProvider {
            calls: calls.clone(),
            digest_calls: digest_calls.clone(),
        }) as SharedProvider<u64>);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let shared = provider.clone();
            handles.push(thread::spawn(move || shared.get().expect("memoized value")));
        }
        let values: Vec<u64> = handles.into_iter().map(|h| h.join().expect("thread")).collect();
        assert!(values.iter().all(|v| *v == values[0]), "all callers see the same value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(digest_calls.load(Ordering::SeqCst), 0, "digest stays untouched by get");

        provider.digest().expect("digest");
        provider.digest().expect("digest again");
        assert_eq!(digest_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn const_values_digest_by_content() {
        let a = const_value(1.5f64);
        let b = const_value(1.5f64);
        let c = const_value(2.5f64);
        assert_eq!(a.digest().expect("digest"), b.digest().expect("digest"));
        assert_ne!(a.digest().expect("digest"), c.digest().expect("digest"));
        assert_eq!(a.get().expect("value"), 1.5);
    }
}
