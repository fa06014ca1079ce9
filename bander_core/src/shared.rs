//! The one lock around `MachineState`.
//!
//! The control cycle and the command handler are the only mutators. Callers
//! get field-group accessors and a scoped `update`; the guard never escapes,
//! so it cannot be held across hardware I/O.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::state::{Feedback, MachineState, ZoneEnables};

#[derive(Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<MachineState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MachineState> {
        // A panicked writer leaves a plain record behind; keep serving it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access. Keep `f` free of I/O.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut MachineState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Consistent copy of the whole record.
    pub fn snapshot(&self) -> MachineState {
        self.lock().clone()
    }

    pub fn run_enabled(&self) -> bool {
        self.lock().run_enabled
    }

    pub fn emergency(&self) -> bool {
        self.lock().emergency
    }

    pub fn error_message(&self) -> String {
        self.lock().error_message.clone()
    }

    pub fn enables(&self) -> ZoneEnables {
        self.lock().enable
    }

    pub fn feedback(&self) -> Feedback {
        self.lock().actual
    }

    /// `(position_mm, piece_present, piece_length_mm, tracking_active)`
    pub fn tracking(&self) -> (f64, bool, f64, bool) {
        let st = self.lock();
        (
            st.position_mm,
            st.piece_present,
            st.piece_length_mm,
            st.tracking_active,
        )
    }
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedState").field(&*self.lock()).finish()
    }
}
