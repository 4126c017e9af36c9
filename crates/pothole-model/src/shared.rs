//! The one model a process serves from.
//!
//! `init` at startup, `get` from any thread, `shutdown` before exit. Binaries
//! that can bail out early hold the [`ShutdownGuard`] from [`init_guarded`]
//! instead, so the release happens on every exit path.

use std::sync::{Arc, RwLock};

use log::info;

use crate::{ModelConfig, ModelError, Result, SegmentationModel};

/// A publish-once, take-on-shutdown holder.
pub(crate) struct Slot<T>(RwLock<Option<Arc<T>>>);

impl<T> Slot<T> {
    pub(crate) const fn new() -> Self {
        Self(RwLock::new(None))
    }

    pub(crate) fn init_with(&self, load: impl FnOnce() -> Result<T>) -> Result<Arc<T>> {
        let mut slot = self.0.write().map_err(|_| ModelError::SessionPoisoned)?;
        if slot.is_some() {
            return Err(ModelError::AlreadyInitialised);
        }
        let value = Arc::new(load()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    pub(crate) fn get(&self) -> Result<Arc<T>> {
        self.0
            .read()
            .map_err(|_| ModelError::SessionPoisoned)?
            .clone()
            .ok_or(ModelError::NotInitialised)
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.read().map(|s| s.is_some()).unwrap_or(false)
    }

    pub(crate) fn release(&self) -> bool {
        let taken = match self.0.write() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        taken.is_some()
    }
}

/// Releases its slot when dropped.
#[must_use = "the model is released as soon as the guard drops"]
pub struct Guard<'a, T> {
    slot: &'a Slot<T>,
}

impl<T> Drop for Guard<'_, T> {
    fn drop(&mut self) {
        if self.slot.release() {
            info!("shared model released");
        }
    }
}

pub type ShutdownGuard = Guard<'static, SegmentationModel>;

static SHARED: Slot<SegmentationModel> = Slot::new();

/// Load the model and publish it. Fails if one is already published.
pub fn init(config: &ModelConfig) -> Result<Arc<SegmentationModel>> {
    SHARED.init_with(|| SegmentationModel::load(config))
}

/// [`init`], plus a guard that calls [`shutdown`] when it goes out of scope.
pub fn init_guarded(config: &ModelConfig) -> Result<(Arc<SegmentationModel>, ShutdownGuard)> {
    let model = init(config)?;
    Ok((model, Guard { slot: &SHARED }))
}

/// The published model.
pub fn get() -> Result<Arc<SegmentationModel>> {
    SHARED.get()
}

pub fn is_initialised() -> bool {
    SHARED.is_set()
}

/// Unpublish the model. The session is released once the last outstanding
/// `Arc` from [`get`] drops. Returns whether anything was published.
pub fn shutdown() -> bool {
    let released = SHARED.release();
    if released {
        info!("shared model released");
    }
    released
}
