use rustc_hash::FxHashSet;
use std::fmt::Display;
use std::sync::Mutex;

/// Deduplicating diagnostic sink for recoverable decode anomalies.
///
/// Corrupt world data surfaces the same condition once per block query, which
/// on a render pass means millions of times. Each warning carries a stable
/// identifier; the first occurrence is forwarded to the `log` facade, every
/// repeat is dropped for the lifetime of this sink. Sinks are shared
/// (`Arc<Diagnostics>`) between a `World` and the chunks it decodes, so the
/// suppression scope is explicit instead of a process-global.
#[derive(Debug, Default)]
pub struct Diagnostics {
    seen: Mutex<FxHashSet<&'static str>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Log `message` at warn level the first time `key` is seen.
    /// Returns whether the message was actually emitted.
    pub fn warn_once(&self, key: &'static str, message: impl Display) -> bool {
        if !self.mark(key) {
            return false;
        }
        log::warn!("{} (further warnings of this kind are suppressed)", message);
        true
    }

    /// Log `message` at error level the first time `key` is seen.
    pub fn error_once(&self, key: &'static str, message: impl Display) -> bool {
        if !self.mark(key) {
            return false;
        }
        log::error!("{} (further errors of this kind are suppressed)", message);
        true
    }

    fn mark(&self, key: &'static str) -> bool {
        match self.seen.lock() {
            Ok(mut seen) => seen.insert(key),
            // A poisoned set only ever means a panic mid-insert; logging twice
            // is harmless compared to silencing diagnostics entirely.
            Err(poisoned) => poisoned.into_inner().insert(key),
        }
    }
}
