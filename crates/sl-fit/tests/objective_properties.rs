//! Cross-statistic properties of the observation objective.

use approx::assert_relative_eq;
use sl_core::{Error, EventLocation, ParamValues, Response, Result, SkyDir, SparseRate};
use sl_fit::{EvaluatorTable, ObservationsObjective};
use sl_obs::{
    Bin, BinnedCube, EventData, EventList, Observation, ObservationContainer, Statistic,
};
use std::sync::Arc;

/// Two-parameter toy model: rate = p0 + w * p1, where the weight w is
/// carried by the event/bin time so each location has its own mix.
struct MixResponse {
    npred: f64,
}

impl Response for MixResponse {
    fn rate(&self, at: &EventLocation, params: &ParamValues<'_>) -> Result<SparseRate> {
        let w = at.time;
        let value = params.get(0).unwrap() + w * params.get(1).unwrap();
        Ok(SparseRate::with_grad(value, vec![(0, 1.0), (1, w)]))
    }

    fn integrated_rate(&self, params: &ParamValues<'_>) -> Result<SparseRate> {
        let value = self.npred * params.get(0).unwrap();
        Ok(SparseRate::with_grad(value, vec![(0, self.npred)]))
    }
}

fn loc(w: f64) -> EventLocation {
    EventLocation::new(SkyDir::new(83.6, 22.0), 1000.0, w)
}

fn poisson_binned(name: &str) -> Observation {
    let bins = vec![
        Bin::new(loc(0.2), 5.0, 1.0, 1.0),
        Bin::new(loc(0.7), 0.0, 1.0, 1.0),
        Bin::new(loc(1.3), 2.0, 1.0, 1.0),
        Bin::new(loc(2.1), 0.0, 1.0, 1.0),
    ];
    Observation::new(
        name,
        Statistic::PoissonBinned,
        EventData::Binned(BinnedCube::from_bins(bins)),
        1.0,
        1.0,
        Arc::new(MixResponse { npred: 0.0 }),
    )
    .unwrap()
}

fn gaussian_binned(name: &str) -> Observation {
    let bins = vec![
        Bin::with_sigma(loc(0.5), 10.0, 1.0, 1.0, 2.0),
        Bin::with_sigma(loc(1.5), 6.5, 1.0, 1.0, 1.5),
    ];
    Observation::new(
        name,
        Statistic::GaussianBinned,
        EventData::Binned(BinnedCube::from_bins(bins)),
        1.0,
        1.0,
        Arc::new(MixResponse { npred: 0.0 }),
    )
    .unwrap()
}

fn poisson_unbinned(name: &str) -> Observation {
    let events = EventList::from_events(vec![loc(0.3), loc(0.9), loc(1.8)]);
    Observation::new(
        name,
        Statistic::PoissonUnbinned,
        EventData::Unbinned(events),
        1.0,
        1.0,
        Arc::new(MixResponse { npred: 10.0 }),
    )
    .unwrap()
}

fn mixed_container(reverse: bool) -> ObservationContainer {
    let mut names: Vec<fn(&str) -> Observation> =
        vec![poisson_binned, gaussian_binned, poisson_unbinned];
    if reverse {
        names.reverse();
    }
    let mut container = ObservationContainer::new();
    for (i, make) in names.into_iter().enumerate() {
        container.append(make(&format!("obs{i}")));
    }
    container
}

const PARAMS: [f64; 2] = [3.0, 1.2];

#[test]
fn test_summation_order_does_not_change_result() {
    let forward = ObservationsObjective::new(mixed_container(false), 2);
    let backward = ObservationsObjective::new(mixed_container(true), 2);

    let a = forward.evaluate(&PARAMS).unwrap();
    let b = backward.evaluate(&PARAMS).unwrap();

    assert_relative_eq!(a.value, b.value, max_relative = 1e-9);
    for i in 0..2 {
        assert_relative_eq!(a.gradient[i], b.gradient[i], max_relative = 1e-9);
        for j in 0..2 {
            assert_relative_eq!(
                a.curvature[(i, j)],
                b.curvature[(i, j)],
                max_relative = 1e-9
            );
        }
    }
    assert_relative_eq!(a.npred, b.npred, max_relative = 1e-9);
}

#[test]
fn test_curvature_is_exactly_symmetric() {
    let objective = ObservationsObjective::new(mixed_container(false), 2);
    let result = objective.evaluate(&PARAMS).unwrap();
    for i in 0..2 {
        for j in 0..2 {
            assert_eq!(
                result.curvature[(i, j)].to_bits(),
                result.curvature[(j, i)].to_bits()
            );
        }
    }
}

#[test]
fn test_reevaluation_yields_identical_triple() {
    let objective = ObservationsObjective::new(mixed_container(false), 2);
    let first = objective.evaluate(&PARAMS).unwrap();
    let second = objective.evaluate(&PARAMS).unwrap();
    assert_eq!(first.value.to_bits(), second.value.to_bits());
    assert_eq!(first.gradient, second.gradient);
    assert_eq!(first.curvature, second.curvature);
}

#[test]
fn test_analytic_gradient_matches_finite_differences() {
    let objective = ObservationsObjective::new(mixed_container(false), 2);
    let result = objective.evaluate(&PARAMS).unwrap();

    for i in 0..2 {
        let eps = 1e-6;
        let mut hi = PARAMS;
        let mut lo = PARAMS;
        hi[i] += eps;
        lo[i] -= eps;
        let numeric = (objective.evaluate(&hi).unwrap().value
            - objective.evaluate(&lo).unwrap().value)
            / (2.0 * eps);
        assert_relative_eq!(result.gradient[i], numeric, epsilon = 1e-5, max_relative = 1e-5);
    }
}

#[test]
fn test_unbinned_reference_scenario() {
    // Npred = 100 with unit gradient; two events with m = 2, g = 1:
    // value = 100 - 2 ln 2, gradient = 1 - (1/2 + 1/2) = 0.
    struct ReferenceResponse;
    impl Response for ReferenceResponse {
        fn rate(&self, _at: &EventLocation, _p: &ParamValues<'_>) -> Result<SparseRate> {
            Ok(SparseRate::with_grad(2.0, vec![(0, 1.0)]))
        }
        fn integrated_rate(&self, _p: &ParamValues<'_>) -> Result<SparseRate> {
            Ok(SparseRate::with_grad(100.0, vec![(0, 1.0)]))
        }
    }

    let events = EventList::from_events(vec![loc(0.0), loc(1.0)]);
    let mut container = ObservationContainer::new();
    container.append(
        Observation::new(
            "reference",
            Statistic::PoissonUnbinned,
            EventData::Unbinned(events),
            1.0,
            1.0,
            Arc::new(ReferenceResponse),
        )
        .unwrap(),
    );
    let objective = ObservationsObjective::new(container, 1);
    let result = objective.evaluate(&[1.0]).unwrap();

    assert_relative_eq!(result.value, 100.0 - 2.0 * 2.0f64.ln(), epsilon = 1e-9);
    assert_relative_eq!(result.gradient[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(result.npred, 100.0, epsilon = 1e-12);
}

#[test]
fn test_zero_rate_event_raises_instead_of_nan() {
    struct VanishingResponse;
    impl Response for VanishingResponse {
        fn rate(&self, _at: &EventLocation, params: &ParamValues<'_>) -> Result<SparseRate> {
            Ok(SparseRate::with_grad(params.get(0).unwrap(), vec![(0, 1.0)]))
        }
        fn integrated_rate(&self, params: &ParamValues<'_>) -> Result<SparseRate> {
            Ok(SparseRate::with_grad(params.get(0).unwrap(), vec![(0, 1.0)]))
        }
    }

    let events = EventList::from_events(vec![loc(0.0)]);
    let mut container = ObservationContainer::new();
    container.append(
        Observation::new(
            "dark",
            Statistic::PoissonUnbinned,
            EventData::Unbinned(events),
            1.0,
            1.0,
            Arc::new(VanishingResponse),
        )
        .unwrap(),
    );
    let objective = ObservationsObjective::new(container, 1);

    let err = objective.evaluate(&[0.0]).unwrap_err();
    assert!(matches!(err, Error::ZeroModelAtEvent { .. }));
}

#[test]
fn test_table_without_gaussian_rejects_gaussian_observation() {
    let mut table = EvaluatorTable::new();
    table.register(Arc::new(sl_fit::PoissonBinnedEvaluator));
    table.register(Arc::new(sl_fit::PoissonUnbinnedEvaluator));

    let mut container = ObservationContainer::new();
    container.append(gaussian_binned("gauss0"));
    let objective = ObservationsObjective::with_table(container, 2, table);

    let err = objective.evaluate(&PARAMS).unwrap_err();
    match err {
        Error::UnsupportedStatistic { observation, statistic } => {
            assert_eq!(observation, "gauss0");
            assert_eq!(statistic, Statistic::GaussianBinned.to_string());
        }
        other => panic!("expected UnsupportedStatistic, got {other}"),
    }
}
