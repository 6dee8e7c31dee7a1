//! Source model composition and the model-side response bridge.

use crate::parameter::{ParamKey, ParameterSet, ParameterStore};
use crate::spectral::SpectralModel;
use sl_core::{Error, EventLocation, ParamValues, Response, Result, SparseRate};

/// A named source with a spectral component and store-keyed parameters.
pub struct SourceModel {
    name: String,
    spectral: Box<dyn SpectralModel>,
    keys: Vec<ParamKey>,
}

impl SourceModel {
    /// Create a source model; `keys` maps the spectral component's
    /// parameters to the shared store.
    pub fn new(
        name: impl Into<String>,
        spectral: Box<dyn SpectralModel>,
        keys: Vec<ParamKey>,
    ) -> Result<Self> {
        if keys.len() != spectral.n_params() {
            return Err(Error::Validation(format!(
                "source model key count {} != spectral parameter count {}",
                keys.len(),
                spectral.n_params()
            )));
        }
        Ok(Self { name: name.into(), spectral, keys })
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store keys of this model's parameters.
    pub fn keys(&self) -> &[ParamKey] {
        &self.keys
    }
}

/// The composite model: the sum of all attached sources.
#[derive(Default)]
pub struct SourceModels {
    models: Vec<SourceModel>,
}

impl SourceModels {
    /// Create an empty model set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a source.
    pub fn push(&mut self, model: SourceModel) {
        self.models.push(model);
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Attached sources.
    pub fn models(&self) -> &[SourceModel] {
        &self.models
    }

    /// Parameter key lists of all sources, for [`ParameterSet::build`].
    pub fn key_lists(&self) -> impl Iterator<Item = &[ParamKey]> {
        self.models.iter().map(|m| m.keys())
    }

    /// Gather the physical parameter values of one source, combining free
    /// values from `raw` (scaled) with fixed values from the store.
    fn local_pars(
        &self,
        model: &SourceModel,
        store: &ParameterStore,
        pset: &ParameterSet,
        raw: &[f64],
        out: &mut Vec<f64>,
    ) -> Result<()> {
        out.clear();
        for &key in model.keys() {
            let value = match pset.index_of(key) {
                Some(j) => raw[j] * pset.scale(j),
                None => store.get(key)?.real_value(),
            };
            out.push(value);
        }
        Ok(())
    }

    /// Map a source's physical-space gradient into objective index space,
    /// applying the scale chain rule and accumulating duplicates so entry
    /// indices stay distinct (linked parameters shared between sources).
    fn push_sparse(
        pset: &ParameterSet,
        keys: &[ParamKey],
        local_grad: &[f64],
        out: &mut Vec<(usize, f64)>,
    ) {
        for (&key, &dg) in keys.iter().zip(local_grad) {
            let Some(j) = pset.index_of(key) else { continue };
            let g = dg * pset.scale(j);
            if g == 0.0 {
                continue;
            }
            match out.iter_mut().find(|(idx, _)| *idx == j) {
                Some((_, acc)) => *acc += g,
                None => out.push((j, g)),
            }
        }
    }

    /// Total differential rate at `energy` and its sparse gradient in
    /// objective index space.
    pub fn eval_gradients(
        &self,
        store: &ParameterStore,
        pset: &ParameterSet,
        raw: &[f64],
        energy: f64,
    ) -> Result<(f64, Vec<(usize, f64)>)> {
        let mut total = 0.0;
        let mut grad = Vec::new();
        let mut pars = Vec::new();
        let mut local = Vec::new();

        for model in &self.models {
            self.local_pars(model, store, pset, raw, &mut pars)?;
            local.clear();
            local.resize(model.spectral.n_params(), 0.0);
            total += model.spectral.eval_gradients(energy, &pars, &mut local);
            Self::push_sparse(pset, model.keys(), &local, &mut grad);
        }
        Ok((total, grad))
    }

    /// Total integrated rate over `[emin, emax]` and its sparse gradient in
    /// objective index space.
    pub fn flux_gradients(
        &self,
        store: &ParameterStore,
        pset: &ParameterSet,
        raw: &[f64],
        emin: f64,
        emax: f64,
    ) -> Result<(f64, Vec<(usize, f64)>)> {
        let mut total = 0.0;
        let mut grad = Vec::new();
        let mut pars = Vec::new();
        let mut local = Vec::new();

        for model in &self.models {
            self.local_pars(model, store, pset, raw, &mut pars)?;
            local.clear();
            local.resize(model.spectral.n_params(), 0.0);
            total += model.spectral.flux_gradients(emin, emax, &pars, &mut local);
            Self::push_sparse(pset, model.keys(), &local, &mut grad);
        }
        Ok((total, grad))
    }
}

/// Model-side [`Response`] implementation: the composite spectral model
/// folded with a flat effective exposure.
///
/// Energy dispersion and point-spread convolution belong to instrument
/// packages implementing [`Response`] themselves; this bridge covers
/// point-source analyses where the response reduces to an exposure
/// normalization, and serves as the reference implementation for tests.
pub struct SourceResponse {
    models: SourceModels,
    store: ParameterStore,
    pset: ParameterSet,
    /// Exposure normalization applied to every rate. For binned
    /// observations the evaluator additionally applies bin volume and
    /// livetime, so the normalization here excludes them.
    norm: f64,
    emin: f64,
    emax: f64,
}

impl SourceResponse {
    /// Create a response over `[emin, emax]` with exposure normalization
    /// `norm`. The store snapshot provides fixed-parameter values.
    pub fn new(
        models: SourceModels,
        store: ParameterStore,
        pset: ParameterSet,
        norm: f64,
        emin: f64,
        emax: f64,
    ) -> Result<Self> {
        if !(emin > 0.0 && emax > emin) {
            return Err(Error::Validation(format!(
                "SourceResponse requires 0 < emin < emax, got [{emin}, {emax}]"
            )));
        }
        Ok(Self { models, store, pset, norm, emin, emax })
    }

    fn validate_params(&self, params: &ParamValues<'_>) -> Result<()> {
        if params.len() != self.pset.len() {
            return Err(Error::Validation(format!(
                "parameter length mismatch: expected {}, got {}",
                self.pset.len(),
                params.len()
            )));
        }
        Ok(())
    }
}

impl Response for SourceResponse {
    fn rate(&self, at: &EventLocation, params: &ParamValues<'_>) -> Result<SparseRate> {
        self.validate_params(params)?;
        let (value, mut grad) =
            self.models.eval_gradients(&self.store, &self.pset, params.as_slice(), at.energy)?;
        for (_, g) in grad.iter_mut() {
            *g *= self.norm;
        }
        Ok(SparseRate::with_grad(value * self.norm, grad))
    }

    fn integrated_rate(&self, params: &ParamValues<'_>) -> Result<SparseRate> {
        self.validate_params(params)?;
        let (value, mut grad) = self.models.flux_gradients(
            &self.store,
            &self.pset,
            params.as_slice(),
            self.emin,
            self.emax,
        )?;
        for (_, g) in grad.iter_mut() {
            *g *= self.norm;
        }
        Ok(SparseRate::with_grad(value * self.norm, grad))
    }
}
