//! Host-supplied collaborator contracts.
//!
//! Everything here is optional and advisory; implementations live in the
//! host application. None of these hooks may change decode outcomes except
//! [`ResultProcessor`], which is explicitly allowed to.

use crate::decode::TypeDescriptor;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;

/// Callback invoked after a successful tree swap, in registration order,
/// on the reloading thread. A panicking listener cannot roll back the
/// already-published tree.
pub trait ReloadListener: Send + Sync {
    /// The new tree is already visible to readers when this runs.
    fn on_reload(&self);
}

/// Post-processes a decode result before the facade returns it; may append
/// further validation errors or substitute a replacement value.
pub trait ResultProcessor: Send + Sync {
    /// Inspect or rewrite the result for `path`/`ty`.
    fn process(
        &self,
        path: &str,
        ty: &TypeDescriptor,
        result: ConfigResult<AnyValue>,
    ) -> ConfigResult<AnyValue>;
}

/// Masks sensitive values before they appear in diagnostics. Used only for
/// rendering; never applied to decoded values.
pub trait SecretMasker: Send + Sync {
    /// Render `value` at `path` for inclusion in an error message.
    fn mask(&self, path: &str, value: &str) -> String;
}

/// Well-known observation event names.
pub mod events {
    /// A get call produced a usable value.
    pub const GET_OK: &str = "config.get.ok";
    /// A cached result satisfied a get call.
    pub const CACHE_HIT: &str = "config.cache.hit";
    /// A decode accumulated at least one ERROR-level problem.
    pub const DECODE_ERROR: &str = "config.decode.error";
    /// A decode accumulated warnings or missing-value notes.
    pub const DECODE_WARNING: &str = "config.decode.warning";
    /// The tree was rebuilt and swapped.
    pub const RELOAD: &str = "config.reload";
    /// A source was registered.
    pub const SOURCE_ADDED: &str = "config.source.added";
}

/// Receives `(name, value, tags)` notifications on significant events.
/// Purely advisory; must never affect decode outcomes.
pub trait ObservationRecorder: Send + Sync {
    /// Record one observation.
    fn record(&self, name: &str, value: f64, tags: &Tags);
}
