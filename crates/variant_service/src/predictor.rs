//! Prediction facade
//!
//! A [`Predictor`] owns the pipeline bound to one model and is immutable
//! after construction. [`SharedPredictor`] defers construction to first use
//! and guarantees it runs at most once per process.

use crate::config::ServiceConfig;
use crate::errors::Result;
use crate::model_store::{LoadedModel, ModelOrigin, ModelStore};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use snpath_core::gbdt::Model;
use snpath_core::{
    FixedWidthInterval, Pipeline, PredictionResponse, Result as PipelineResult, VariantIdentifier,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct Predictor {
    pipeline: Pipeline,
    model_hash: String,
    origin: ModelOrigin,
}

impl Predictor {
    /// Load or bootstrap the model and bind the pipeline
    pub fn initialize(config: &ServiceConfig) -> Result<Self> {
        let loaded = ModelStore::new(config).load_or_bootstrap()?;
        Self::from_loaded(loaded, config)
    }

    /// Bind an in-memory model, bypassing the store
    pub fn from_model(model: Model, config: &ServiceConfig) -> Result<Self> {
        let hash = model
            .hash_hex()
            .map_err(|err| crate::ServiceError::model_unavailable(err.to_string()))?;
        Self::from_loaded(
            LoadedModel {
                model,
                hash,
                origin: ModelOrigin::InMemory,
            },
            config,
        )
    }

    fn from_loaded(loaded: LoadedModel, config: &ServiceConfig) -> Result<Self> {
        let pipeline = Pipeline::with_options(
            Arc::new(loaded.model),
            config.explainer.top_k,
            Box::new(FixedWidthInterval::new(config.uncertainty.half_width)),
        )?;

        info!(
            "Predictor ready (model {}, origin {:?}, explainer degraded: {})",
            loaded.hash,
            loaded.origin,
            pipeline.explainer().is_degraded()
        );

        Ok(Self {
            pipeline,
            model_hash: loaded.hash,
            origin: loaded.origin,
        })
    }

    pub fn model_hash(&self) -> &str {
        &self.model_hash
    }

    pub fn origin(&self) -> ModelOrigin {
        self.origin
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Score one variant
    #[instrument(skip(self), level = "debug")]
    pub fn predict_single(
        &self,
        gene: &str,
        cdna_change: &str,
        protein_change: &str,
    ) -> PipelineResult<PredictionResponse> {
        self.predict_variant(&VariantIdentifier::new(gene, cdna_change, protein_change))
    }

    pub fn predict_variant(
        &self,
        variant: &VariantIdentifier,
    ) -> PipelineResult<PredictionResponse> {
        let response = self.pipeline.predict(variant)?;
        debug!(
            variant = %response.variant_id,
            probability = response.probability,
            classification = %response.classification,
            "prediction complete"
        );
        Ok(response)
    }

    /// Score many variants in parallel; results keep input order
    pub fn predict_batch(
        &self,
        variants: &[VariantIdentifier],
    ) -> Vec<PipelineResult<PredictionResponse>> {
        variants
            .par_iter()
            .map(|variant| self.predict_variant(variant))
            .collect()
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("model_hash", &self.model_hash)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Lazily initialized, process-wide predictor
#[derive(Debug)]
pub struct SharedPredictor {
    config: ServiceConfig,
    cell: OnceCell<Arc<Predictor>>,
}

impl SharedPredictor {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Initialize on first call; concurrent first callers block on one init.
    /// A failed init is retried by the next caller.
    pub fn get(&self) -> Result<Arc<Predictor>> {
        self.cell
            .get_or_try_init(|| Predictor::initialize(&self.config).map(Arc::new))
            .map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}
