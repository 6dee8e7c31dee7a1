//! Observations and the observation container.

use crate::event::{BinnedCube, EventList};
use serde::{Deserialize, Serialize};
use sl_core::{Error, Response, Result};
use std::fmt;
use std::sync::Arc;

/// Which likelihood formula applies to an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    /// Event-level Poisson likelihood with Npred normalization.
    PoissonUnbinned,
    /// Per-bin Poisson likelihood.
    PoissonBinned,
    /// Per-bin Gaussian (chi-square) likelihood.
    GaussianBinned,
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::PoissonUnbinned => write!(f, "POISSON_UNBINNED"),
            Statistic::PoissonBinned => write!(f, "POISSON_BINNED"),
            Statistic::GaussianBinned => write!(f, "GAUSSIAN_BINNED"),
        }
    }
}

/// Event data held by an observation.
#[derive(Debug, Clone)]
pub enum EventData {
    /// Individual events (unbinned analysis).
    Unbinned(EventList),
    /// Binned event cube.
    Binned(BinnedCube),
}

/// One exposure: event data, exposure bookkeeping and the instrument
/// response through which the model is evaluated.
///
/// Immutable during one objective evaluation.
pub struct Observation {
    name: String,
    statistic: Statistic,
    data: EventData,
    ontime: f64,
    livetime: f64,
    deadc: f64,
    response: Arc<dyn Response>,
}

impl std::fmt::Debug for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observation")
            .field("name", &self.name)
            .field("statistic", &self.statistic)
            .field("data", &self.data)
            .field("ontime", &self.ontime)
            .field("livetime", &self.livetime)
            .field("deadc", &self.deadc)
            .field("response", &"<dyn Response>")
            .finish()
    }
}

impl Observation {
    /// Create an observation.
    ///
    /// The statistic kind must match the event data: unbinned Poisson
    /// requires an event list, binned statistics require a cube.
    pub fn new(
        name: impl Into<String>,
        statistic: Statistic,
        data: EventData,
        ontime: f64,
        deadc: f64,
        response: Arc<dyn Response>,
    ) -> Result<Self> {
        let name = name.into();
        match (statistic, &data) {
            (Statistic::PoissonUnbinned, EventData::Binned(_)) => {
                return Err(Error::Validation(format!(
                    "observation '{name}': unbinned statistic requires an event list"
                )));
            }
            (Statistic::PoissonBinned | Statistic::GaussianBinned, EventData::Unbinned(_)) => {
                return Err(Error::Validation(format!(
                    "observation '{name}': binned statistic requires a binned cube"
                )));
            }
            _ => {}
        }
        if !(ontime >= 0.0) || !(0.0..=1.0).contains(&deadc) {
            return Err(Error::Validation(format!(
                "observation '{name}': invalid exposure (ontime = {ontime}, deadc = {deadc})"
            )));
        }
        Ok(Self {
            name,
            statistic,
            data,
            ontime,
            livetime: ontime * deadc,
            deadc,
            response,
        })
    }

    /// Observation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Statistic kind.
    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    /// Event data.
    pub fn data(&self) -> &EventData {
        &self.data
    }

    /// The event list, or a validation error for binned observations.
    pub fn events(&self) -> Result<&EventList> {
        match &self.data {
            EventData::Unbinned(events) => Ok(events),
            EventData::Binned(_) => Err(Error::Validation(format!(
                "observation '{}' holds binned data, not an event list",
                self.name
            ))),
        }
    }

    /// The binned cube, or a validation error for unbinned observations.
    pub fn binned(&self) -> Result<&BinnedCube> {
        match &self.data {
            EventData::Binned(cube) => Ok(cube),
            EventData::Unbinned(_) => Err(Error::Validation(format!(
                "observation '{}' holds an event list, not binned data",
                self.name
            ))),
        }
    }

    /// Ontime in seconds.
    pub fn ontime(&self) -> f64 {
        self.ontime
    }

    /// Livetime in seconds (`ontime * deadc`).
    pub fn livetime(&self) -> f64 {
        self.livetime
    }

    /// Deadtime correction factor in `[0, 1]`.
    pub fn deadc(&self) -> f64 {
        self.deadc
    }

    /// Instrument response.
    pub fn response(&self) -> &dyn Response {
        self.response.as_ref()
    }
}

/// Container of observations, iterated in append order by the objective.
#[derive(Default)]
pub struct ObservationContainer {
    observations: Vec<Observation>,
}

impl ObservationContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation.
    pub fn append(&mut self, obs: Observation) {
        self.observations.push(obs);
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Access by index.
    pub fn get(&self, index: usize) -> Option<&Observation> {
        self.observations.get(index)
    }

    /// Iterate in container order.
    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    /// Observations as a slice.
    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }
}
