//! Event-level and binned event data.

use serde::{Deserialize, Serialize};
use sl_core::EventLocation;

/// A list of detected events for unbinned analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventList {
    events: Vec<EventLocation>,
}

impl EventList {
    /// Create an empty event list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a vector of event locations.
    pub fn from_events(events: Vec<EventLocation>) -> Self {
        Self { events }
    }

    /// Append an event.
    pub fn push(&mut self, event: EventLocation) {
        self.events.push(event);
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over event locations.
    pub fn iter(&self) -> std::slice::Iter<'_, EventLocation> {
        self.events.iter()
    }
}

/// A discretized cell of the observation domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bin {
    /// Bin center.
    pub location: EventLocation,
    /// Observed counts (or measured value for Gaussian statistics).
    pub counts: f64,
    /// Solid angle of the bin in steradians.
    pub solid_angle: f64,
    /// Energy width of the bin in MeV.
    pub energy_width: f64,
    /// Measurement standard deviation; only meaningful for Gaussian
    /// statistics.
    pub sigma: f64,
}

impl Bin {
    /// Create a Poisson bin (no measurement error).
    pub fn new(location: EventLocation, counts: f64, solid_angle: f64, energy_width: f64) -> Self {
        Self { location, counts, solid_angle, energy_width, sigma: 0.0 }
    }

    /// Create a Gaussian bin carrying a measurement standard deviation.
    pub fn with_sigma(
        location: EventLocation,
        counts: f64,
        solid_angle: f64,
        energy_width: f64,
        sigma: f64,
    ) -> Self {
        Self { location, counts, solid_angle, energy_width, sigma }
    }
}

/// A binned event cube.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinnedCube {
    bins: Vec<Bin>,
}

impl BinnedCube {
    /// Create an empty cube.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a vector of bins.
    pub fn from_bins(bins: Vec<Bin>) -> Self {
        Self { bins }
    }

    /// Append a bin.
    pub fn push(&mut self, bin: Bin) {
        self.bins.push(bin);
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether the cube is empty.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Iterate over bins.
    pub fn iter(&self) -> std::slice::Iter<'_, Bin> {
        self.bins.iter()
    }

    /// Total observed counts.
    pub fn total_counts(&self) -> f64 {
        self.bins.iter().map(|b| b.counts).sum()
    }
}
