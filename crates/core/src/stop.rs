// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative stop signal shared between a listener and its scheduler

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag checked at sleep boundaries and between items
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    stopping: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Clear the flag so the owner can be started again
    pub fn reset(&self) {
        self.stopping.store(false, Ordering::SeqCst);
    }
}
