//! Model parameters and the free-parameter set.
//!
//! Parameters live in a [`ParameterStore`]; models reference them by stable
//! [`ParamKey`]. The [`ParameterSet`] is the ordered, flat view over all
//! *free* parameters that defines the dimension and index space of the
//! objective's gradient vector and curvature matrix.

use serde::{Deserialize, Serialize};
use sl_core::{Error, Result};
use std::collections::HashMap;

/// Stable handle of a parameter inside a [`ParameterStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamKey(usize);

/// A model parameter.
///
/// The physical value is `value * scale`; the minimizer works on the raw
/// `value`. The gradient slot is a reporting convenience filled in by the
/// fit driver after a fit, never read by the objective itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Stable parameter name.
    pub name: String,
    /// Raw value (minimizer space).
    pub value: f64,
    /// Scale factor; physical value = `value * scale`.
    pub scale: f64,
    /// Whether the parameter is free in the fit.
    pub free: bool,
    /// Raw-value bounds `(low, high)`.
    pub bounds: (f64, f64),
    /// Gradient of the objective with respect to the raw value.
    pub gradient: f64,
    /// Whether this parameter may be referenced by several models
    /// (explicit linking: same identity, single objective index).
    pub shared: bool,
}

impl Parameter {
    /// Create a free parameter with unit scale and wide-open bounds.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            scale: 1.0,
            free: true,
            bounds: (-1e30, 1e30),
            gradient: 0.0,
            shared: false,
        }
    }

    /// Set the scale factor.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the raw-value bounds.
    pub fn with_bounds(mut self, low: f64, high: f64) -> Self {
        self.bounds = (low, high);
        self
    }

    /// Fix the parameter (exclude it from the fit).
    pub fn fixed(mut self) -> Self {
        self.free = false;
        self
    }

    /// Allow the parameter to be referenced from several models.
    pub fn linked(mut self) -> Self {
        self.shared = true;
        self
    }

    /// Physical value.
    pub fn real_value(&self) -> f64 {
        self.value * self.scale
    }
}

/// Owning store of all model parameters.
///
/// Models never own parameters; they hold [`ParamKey`]s into this store, so
/// no aliasing of parameter state is possible.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    params: Vec<Parameter>,
}

impl ParameterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter and return its key.
    pub fn push(&mut self, param: Parameter) -> ParamKey {
        self.params.push(param);
        ParamKey(self.params.len() - 1)
    }

    /// Number of parameters in the store.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Access a parameter.
    pub fn get(&self, key: ParamKey) -> Result<&Parameter> {
        self.params
            .get(key.0)
            .ok_or_else(|| Error::Validation(format!("parameter key {} out of range", key.0)))
    }

    /// Mutable access to a parameter.
    pub fn get_mut(&mut self, key: ParamKey) -> Result<&mut Parameter> {
        self.params
            .get_mut(key.0)
            .ok_or_else(|| Error::Validation(format!("parameter key {} out of range", key.0)))
    }

    /// Iterate over `(key, parameter)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ParamKey, &Parameter)> {
        self.params.iter().enumerate().map(|(i, p)| (ParamKey(i), p))
    }
}

/// Ordered view over all free parameters across the attached models.
///
/// Index assignment is stable for the duration of one objective
/// evaluation; `len()` defines the dimension of the gradient vector and
/// curvature matrix. Built once per fit setup, not per evaluation.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    keys: Vec<ParamKey>,
    names: Vec<String>,
    scales: Vec<f64>,
    bounds: Vec<(f64, f64)>,
    index: HashMap<ParamKey, usize>,
}

impl ParameterSet {
    /// Build the free-parameter set from the store and the model key lists.
    ///
    /// A key encountered twice is fatal unless its parameter is declared
    /// shared: silently deduplicating an aliased free parameter would make
    /// gradient attribution ambiguous.
    pub fn build<'a, I>(store: &ParameterStore, model_keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [ParamKey]>,
    {
        let mut keys = Vec::new();
        let mut names = Vec::new();
        let mut scales = Vec::new();
        let mut bounds = Vec::new();
        let mut index = HashMap::new();

        for key_list in model_keys {
            for &key in key_list {
                let param = store.get(key)?;
                if !param.free {
                    continue;
                }
                if index.contains_key(&key) {
                    if param.shared {
                        continue;
                    }
                    return Err(Error::InconsistentModel(format!(
                        "free parameter '{}' is referenced by more than one model \
                         without being declared shared",
                        param.name
                    )));
                }
                index.insert(key, keys.len());
                keys.push(key);
                names.push(param.name.clone());
                scales.push(param.scale);
                bounds.push(param.bounds);
            }
        }

        Ok(Self { keys, names, scales, bounds, index })
    }

    /// Number of free parameters.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Objective index of a parameter key, if the parameter is free.
    pub fn index_of(&self, key: ParamKey) -> Option<usize> {
        self.index.get(&key).copied()
    }

    /// Key at objective index `i`.
    pub fn key(&self, i: usize) -> ParamKey {
        self.keys[i]
    }

    /// Parameter names in objective order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Scale factor at objective index `i`.
    pub fn scale(&self, i: usize) -> f64 {
        self.scales[i]
    }

    /// Raw-value bounds in objective order.
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Current raw values from the store, in objective order.
    pub fn raw_values(&self, store: &ParameterStore) -> Result<Vec<f64>> {
        self.keys.iter().map(|&k| store.get(k).map(|p| p.value)).collect()
    }

    /// Write raw values back into the store.
    pub fn store_values(&self, store: &mut ParameterStore, values: &[f64]) -> Result<()> {
        if values.len() != self.len() {
            return Err(Error::Validation(format!(
                "value length mismatch: expected {}, got {}",
                self.len(),
                values.len()
            )));
        }
        for (&key, &v) in self.keys.iter().zip(values) {
            store.get_mut(key)?.value = v;
        }
        Ok(())
    }

    /// Write objective gradients into the parameter gradient slots.
    pub fn store_gradients(&self, store: &mut ParameterStore, gradient: &[f64]) -> Result<()> {
        if gradient.len() != self.len() {
            return Err(Error::Validation(format!(
                "gradient length mismatch: expected {}, got {}",
                self.len(),
                gradient.len()
            )));
        }
        for (&key, &g) in self.keys.iter().zip(gradient) {
            store.get_mut(key)?.gradient = g;
        }
        Ok(())
    }
}
