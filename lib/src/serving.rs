//! Holder for the pipeline a serving process is currently using.
//!
//! The slot is constructed explicitly and handed to whoever serves
//! predictions; there is no process-wide instance. Readers clone an
//! [`Arc<Pipeline>`] out of the slot, so a scaler and model pair observed by
//! one request can never be split by a concurrent replacement.

use crate::error::{Result, StressError};
use crate::features::FeatureVector;
use crate::pipeline::{Pipeline, Prediction, RunId};
use ndarray::Array1;
use std::path::Path;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
pub struct PipelineSlot {
    inner: RwLock<Option<Arc<Pipeline>>>,
}

impl PipelineSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            inner: RwLock::new(Some(Arc::new(pipeline))),
        }
    }

    /// Replace the current pipeline, returning the previous one.
    pub fn install(&self, pipeline: Pipeline) -> Option<Arc<Pipeline>> {
        let run_id = pipeline.run_id();
        let previous = self.write().replace(Arc::new(pipeline));
        tracing::info!(run_id = %run_id.short(), "installed pipeline");
        previous
    }

    /// Load an artifact and install it. The artifact is read and verified
    /// before the swap, so on error the slot keeps what it had.
    pub fn load_from<P: AsRef<Path>>(&self, path: P) -> Result<RunId> {
        let pipeline = Pipeline::load(path)?;
        let run_id = pipeline.run_id();
        self.install(pipeline);
        Ok(run_id)
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_some()
    }

    pub fn current(&self) -> Result<Arc<Pipeline>> {
        self.read().clone().ok_or(StressError::UninitializedModel)
    }

    pub fn transform(&self, answers: &FeatureVector) -> Result<Array1<f64>> {
        let pipeline = self.read().clone().ok_or(StressError::UninitializedScaler)?;
        pipeline.transform(answers)
    }

    pub fn predict(&self, answers: &FeatureVector) -> Result<Prediction> {
        self.current()?.predict(answers)
    }

    // Writers only ever do a single `Option::replace`, so a poisoned lock
    // still holds a whole pipeline.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Arc<Pipeline>>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<Pipeline>>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
