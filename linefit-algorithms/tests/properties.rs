#![allow(clippy::float_cmp, clippy::cast_precision_loss, clippy::cast_possible_truncation)]
//! Randomised checks of the reduction stages' invariants.

use std::collections::HashMap;

use linefit_algorithms::{AmplitudeFilter, CoincidenceSelector, FirstHitReducer, HitMerger};
use linefit_core::geometry::{DetectorGeometry, Geometry, ModuleKey};
use linefit_core::hit::{Hit, HitData};

const MODULES: u32 = 12;
const SENSORS_PER_MODULE: u32 = 4;

struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = (self.0.wrapping_mul(1_103_515_245).wrapping_add(12_345)) & 0x7fff_ffff;
        (self.0 >> 8) as u32
    }

    fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound
    }
}

fn geometry() -> DetectorGeometry {
    DetectorGeometry::vertical_line(1, (0.0, 0.0), MODULES, SENSORS_PER_MODULE, 0.0, 9.0)
}

/// Hits with integral times and amplitudes so sums compare exactly.
fn random_hits(rng: &mut Lcg, geometry: &DetectorGeometry, n: usize) -> Vec<HitData> {
    (0..n)
        .map(|_| {
            let module = ModuleKey::new(1, 1 + rng.below(MODULES));
            let sensor_id = geometry
                .sensor_at(module, rng.below(SENSORS_PER_MODULE))
                .unwrap();
            HitData {
                sensor_id,
                time: f64::from(rng.below(600)),
                tot: f64::from(1 + rng.below(40)),
            }
        })
        .collect()
}

fn sorted_key(hits: &[HitData]) -> Vec<(u32, u64, u64)> {
    let mut key: Vec<_> = hits
        .iter()
        .map(|h| (h.sensor_id.0, h.time.to_bits(), h.tot.to_bits()))
        .collect();
    key.sort_unstable();
    key
}

#[test]
fn merge_accounts_every_contributor_once() {
    let mut rng = Lcg(12_345);
    for window in [0.0, 5.0, 10.0, 40.0] {
        let merger = HitMerger::new(window, true);
        for _ in 0..50 {
            let hits: Vec<HitData> = (0..20)
                .map(|i| HitData::new(i, f64::from(rng.below(200)), f64::from(1 + rng.below(30))))
                .collect();

            let clusters = merger.cluster_module(&hits);
            let contributors: Vec<HitData> = clusters.iter().flat_map(|c| c.iter().copied()).collect();
            assert_eq!(sorted_key(&contributors), sorted_key(&hits));

            for cluster in &clusters {
                let merged = cluster.combine().unwrap();
                let min_time = cluster.iter().map(|h| h.time).fold(f64::INFINITY, f64::min);
                let total: f64 = cluster.iter().map(|h| h.tot).sum();
                assert_eq!(merged.time, min_time);
                assert_eq!(merged.tot, total);
            }

            let merged = merger.merge_module(&hits);
            let total_in: f64 = hits.iter().map(|h| h.tot).sum();
            let total_out: f64 = merged.iter().map(|h| h.tot).sum();
            assert_eq!(merged.len(), clusters.len());
            assert_eq!(total_in, total_out);
        }
    }
}

#[test]
fn merge_clusters_are_separated_by_more_than_the_window() {
    let mut rng = Lcg(99);
    let merger = HitMerger::new(10.0, true);
    let hits: Vec<HitData> = (0..200)
        .map(|i| HitData::new(i, f64::from(rng.below(2000)), 1.0))
        .collect();
    let clusters = merger.cluster_module(&hits);
    for pair in clusters.windows(2) {
        let last = pair[0].last().unwrap().time;
        let first = pair[1].iter().next().unwrap().time;
        assert!(first - last > 10.0);
    }
}

#[test]
fn amplitude_filter_is_idempotent() {
    let geometry = geometry();
    let mut rng = Lcg(7);
    let filter = AmplitudeFilter::new(20.0);
    for _ in 0..20 {
        let hits = random_hits(&mut rng, &geometry, 100);
        let once = filter.filter(&hits);
        let twice = filter.filter(&once);
        assert_eq!(once, twice);
        assert!(once.iter().all(|h| h.tot >= 20.0));
    }
}

#[test]
fn first_hit_keeps_module_minimum() {
    let geometry = geometry();
    let mut rng = Lcg(2024);
    for _ in 0..20 {
        let hits = random_hits(&mut rng, &geometry, 80);
        let first = FirstHitReducer::new().reduce(&hits, &geometry).unwrap();

        let mut minimum: HashMap<ModuleKey, f64> = HashMap::new();
        for hit in &hits {
            let module = geometry.module_of(hit.sensor_id).unwrap();
            let entry = minimum.entry(module).or_insert(f64::INFINITY);
            *entry = entry.min(hit.time);
        }

        assert_eq!(first.len(), minimum.len());
        for hit in &first {
            let module = geometry.module_of(hit.sensor_id).unwrap();
            assert_eq!(hit.time, minimum[&module]);
        }
        assert!(first.windows(2).all(|w| w[0].time <= w[1].time));
    }
}

#[test]
fn coincidences_respect_windows() {
    let geometry = geometry();
    let mut rng = Lcg(31_337);
    let selector = CoincidenceSelector::new(20.0, 40.0);
    for _ in 0..20 {
        let hits = random_hits(&mut rng, &geometry, 60);
        let triggers = FirstHitReducer::new().reduce(&hits, &geometry).unwrap();
        let selected = selector.select(&triggers, &hits, &geometry).unwrap();

        let mut sensors: Vec<_> = selected.iter().map(Hit::sensor_id).collect();
        sensors.sort_unstable();
        sensors.dedup();
        assert_eq!(sensors.len(), selected.len());

        for hit in &selected {
            if triggers.contains(hit) {
                continue;
            }
            let module = geometry.module_of(hit.sensor_id).unwrap();
            let confirmed = triggers.iter().any(|trigger| {
                let trigger_module = geometry.module_of(trigger.sensor_id).unwrap();
                let dt = trigger.delay_to(hit);
                match trigger_module.floor_distance(&module) {
                    Some(1) => (0.0..=20.0).contains(&dt),
                    Some(2) => (0.0..=40.0).contains(&dt),
                    _ => false,
                }
            });
            assert!(confirmed, "hit {hit:?} has no confirming trigger");
        }
    }
}
