//! Correlation id propagation
//!
//! A correlation id ties together every record logged for one unit of work.
//! The ambient id lives in thread-local storage, so concurrent requests
//! handled on different threads never observe each other's id. With the
//! `async-context` feature, [`CorrelationContext::scope`] binds an id to a
//! tokio task instead, which takes precedence over the thread-local value.
//!
//! Callers that prefer explicit context passing can skip the ambient store
//! entirely and put the id in [`LogMetadata`](super::log_context::LogMetadata).

use std::cell::RefCell;
use std::marker::PhantomData;

/// Header conventionally used to carry the id between services
pub const CORRELATION_HEADER: &str = "X-Correlation-ID";

thread_local! {
    static CURRENT_ID: RefCell<Option<String>> = const { RefCell::new(None) };
}

#[cfg(feature = "async-context")]
tokio::task_local! {
    static TASK_ID: String;
}

#[cfg(feature = "async-context")]
fn task_id() -> Option<String> {
    TASK_ID.try_with(|id| id.clone()).ok()
}

#[cfg(not(feature = "async-context"))]
fn task_id() -> Option<String> {
    None
}

/// Access to the ambient correlation id of the current unit of work
///
/// # Example
///
/// ```
/// use masked_logger::CorrelationContext;
///
/// {
///     let _guard = CorrelationContext::enter("req-42");
///     assert_eq!(CorrelationContext::get().as_deref(), Some("req-42"));
/// }
/// assert_eq!(CorrelationContext::get(), None);
/// ```
pub struct CorrelationContext;

impl CorrelationContext {
    /// Current id, if one is set
    pub fn get() -> Option<String> {
        task_id().or_else(|| CURRENT_ID.with(|current| current.borrow().clone()))
    }

    /// Set the id for the current thread until cleared or replaced
    pub fn set(id: impl Into<String>) {
        let id = id.into();
        CURRENT_ID.with(|current| *current.borrow_mut() = Some(id));
    }

    /// Reset the current thread to having no id
    pub fn clear() {
        CURRENT_ID.with(|current| current.borrow_mut().take());
    }

    /// Set the id for the lifetime of the returned guard
    ///
    /// The previous value (or absence) is restored when the guard drops.
    pub fn enter(id: impl Into<String>) -> CorrelationGuard {
        let id = id.into();
        let previous = CURRENT_ID.with(|current| current.borrow_mut().replace(id));
        CorrelationGuard {
            previous,
            _not_send: PhantomData,
        }
    }

    /// Run `f` with `id` as the ambient id
    pub fn with_id<R>(id: impl Into<String>, f: impl FnOnce() -> R) -> R {
        let _guard = Self::enter(id);
        f()
    }

    /// Install an id received from upstream, or a fresh one when it is
    /// missing or blank
    pub fn adopt_inbound(header_value: Option<&str>) -> CorrelationGuard {
        let id = header_value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(Self::generate_id);
        Self::enter(id)
    }

    /// Fresh 128-bit random id as 32 lowercase hex characters
    pub fn generate_id() -> String {
        format!("{:032x}", rand::random::<u128>())
    }

    /// Run a future with `id` bound to the current tokio task
    #[cfg(feature = "async-context")]
    pub async fn scope<F>(id: impl Into<String>, future: F) -> F::Output
    where
        F: std::future::Future,
    {
        TASK_ID.scope(id.into(), future).await
    }
}

/// Restores the previous correlation id when dropped
///
/// Not `Send`: it must be dropped on the thread that created it.
#[must_use = "the correlation id is reset as soon as the guard is dropped"]
pub struct CorrelationGuard {
    previous: Option<String>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for CorrelationGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_ID.with(|current| *current.borrow_mut() = previous);
    }
}
