use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Context, Result};

use crate::tensor::TensorShape;

use super::model::LoadedModel;

/// Shared, hot-swappable slot holding the serving model.
///
/// Readers take a snapshot (`Arc<LoadedModel>`) and run against it without
/// holding the lock, so a request always sees one complete classifier and
/// label list, old or new, never a mix. Cloning the handle shares the slot.
#[derive(Clone, Default)]
pub struct ModelHandle {
    current: Arc<RwLock<Option<Arc<LoadedModel>>>>,
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, warm up and install a model, replacing the current one.
    ///
    /// On error the previously installed model (if any) keeps serving.
    pub fn install(&self, model: LoadedModel, expected: TensorShape) -> Result<()> {
        model.validate(expected)?;
        model
            .classifier()
            .warm_up()
            .with_context(|| format!("warm-up failed for model {}", model.fingerprint()))?;

        let fingerprint = model.fingerprint().to_string();
        let label_count = model.labels().len();
        let backend = model.classifier().name();
        let previous = {
            let mut guard = self
                .current
                .write()
                .map_err(|_| anyhow!("model handle lock poisoned"))?;
            guard.replace(Arc::new(model))
        };

        match previous {
            Some(old) => log::info!(
                "model {} replaced by {} ({} backend, {} labels)",
                old.fingerprint(),
                fingerprint,
                backend,
                label_count
            ),
            None => log::info!(
                "model {} installed ({} backend, {} labels)",
                fingerprint,
                backend,
                label_count
            ),
        }
        Ok(())
    }

    /// Drop the serving model; inference reports unavailable until the next install.
    pub fn clear(&self) {
        let previous = match self.current.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(old) = previous {
            log::info!("model {} unloaded", old.fingerprint());
        }
    }

    /// Current model, if one is installed.
    pub fn snapshot(&self) -> Option<Arc<LoadedModel>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(_) => {
                log::error!("model handle lock poisoned; treating classifier as unavailable");
                None
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }
}
