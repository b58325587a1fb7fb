/*!
 * Loadable Module Reference
 * Reference counting that keeps a module's code alive while it runs
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// High bit of the state word marks a module that is being unloaded
const GOING: usize = 1 << (usize::BITS - 1);

/// Load state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Live,
    Going,
}

/// A loaded unit of kernel code
///
/// Refcount and unload state share one atomic word, so a pin can never be
/// taken after unload has been committed.
#[derive(Debug)]
pub struct ModuleRef {
    name: String,
    state: AtomicUsize,
}

impl ModuleRef {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `try_module_get`: pin the module unless it is going away
    pub fn try_get(self: &Arc<Self>) -> Option<ModulePin> {
        self.state
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |word| {
                if word & GOING != 0 {
                    None
                } else {
                    Some(word + 1)
                }
            })
            .ok()?;
        Some(ModulePin {
            module: Arc::clone(self),
        })
    }

    /// `try_stop_module`: commit to unloading if nobody holds a pin
    ///
    /// Returns false while pins are outstanding.
    pub fn begin_unload(&self) -> bool {
        self.state
            .compare_exchange(0, GOING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Forced unload: mark going even with pins outstanding
    pub fn force_unload(&self) {
        self.state.fetch_or(GOING, Ordering::AcqRel);
    }

    pub fn state(&self) -> ModuleState {
        if self.state.load(Ordering::Acquire) & GOING != 0 {
            ModuleState::Going
        } else {
            ModuleState::Live
        }
    }

    /// Outstanding pins
    pub fn refcount(&self) -> usize {
        self.state.load(Ordering::Acquire) & !GOING
    }
}

/// A pin on a module, released on drop (`module_put`)
#[must_use = "the module pin is released as soon as it is dropped"]
#[derive(Debug)]
pub struct ModulePin {
    module: Arc<ModuleRef>,
}

impl Drop for ModulePin {
    fn drop(&mut self) {
        self.module.state.fetch_sub(1, Ordering::Release);
    }
}
