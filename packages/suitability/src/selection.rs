//! Greedy spatially-diversified selection.

use caresite_geometry::{KM_PER_DEGREE, degree_distance};
use caresite_models::SitingConfig;
use serde::{Deserialize, Serialize};

use crate::scoring::ScoredCandidate;

/// Factor applied to the separation threshold when a full scan of the pool
/// finds no qualifying candidate.
const RELAXATION: f64 = 0.9;

/// One recommended site with its rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedSite {
    /// 1-based rank in selection order.
    pub rank: usize,
    /// `true` when the site was taken through the forced-progress fallback
    /// and may sit closer to another site than the separation threshold.
    pub forced: bool,
    /// The scored candidate.
    #[serde(flatten)]
    pub candidate: ScoredCandidate,
}

/// The ranked sites plus the separation threshold finally in effect.
///
/// Any two non-forced sites are at least `final_separation_deg` apart in
/// planar degree distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Selected sites, best first.
    pub sites: Vec<SelectedSite>,
    /// Final separation threshold in degrees.
    pub final_separation_deg: f64,
    /// Final separation threshold converted back to kilometers.
    pub final_separation_km: f64,
}

/// Selects up to `k` high-scoring, spatially separated candidates.
///
/// Candidates are ordered descending by composite score (stable, so ties
/// keep their input order) and scanned greedily: the first candidate at
/// planar distance ≥ the current threshold from every already-selected site
/// is taken. A scan with no qualifying candidate relaxes the threshold by
/// ×0.9; once the next relaxation would drop below the configured floor,
/// relaxation stops and the best remaining candidate is taken
/// unconditionally, flagged `forced`, so the loop always makes progress.
#[must_use]
pub fn select_top_k(
    mut scored: Vec<ScoredCandidate>,
    k: usize,
    facility_type: &str,
    config: &SitingConfig,
) -> Selection {
    scored.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));

    let mut threshold = config.min_separation_km_for(facility_type) / KM_PER_DEGREE;
    let floor = config.separation_floor_km / KM_PER_DEGREE;

    let mut pool = scored;
    let mut sites: Vec<SelectedSite> = Vec::new();
    while sites.len() < k && !pool.is_empty() {
        let qualifying = pool.iter().position(|candidate| {
            sites
                .iter()
                .all(|site| degree_distance(site.candidate.location(), candidate.location()) >= threshold)
        });
        if let Some(index) = qualifying {
            let candidate = pool.remove(index);
            sites.push(SelectedSite {
                rank: sites.len() + 1,
                forced: false,
                candidate,
            });
        } else {
            let relaxed = threshold * RELAXATION;
            if relaxed < floor {
                let candidate = pool.remove(0);
                log::debug!(
                    "separation floor reached; forcing candidate ({}, {})",
                    candidate.longitude,
                    candidate.latitude
                );
                sites.push(SelectedSite {
                    rank: sites.len() + 1,
                    forced: true,
                    candidate,
                });
            } else {
                threshold = relaxed;
            }
        }
    }

    Selection {
        sites,
        final_separation_deg: threshold,
        final_separation_km: threshold * KM_PER_DEGREE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::SubScores;

    fn candidate(longitude: f64, latitude: f64, composite: f64) -> ScoredCandidate {
        ScoredCandidate {
            longitude,
            latitude,
            ward: None,
            population_served: 0.0,
            mean_density: 0.0,
            service_area_km2: 0.0,
            approximate_area: false,
            scores: SubScores {
                population: 0.0,
                density: 0.0,
                coverage: 0.0,
                ward_population: 0.0,
                accessibility: 0.0,
            },
            composite_score: composite,
        }
    }

    fn config_with_separation(km: f64) -> SitingConfig {
        let mut config = SitingConfig::default();
        config.default_min_separation_km = km;
        config
    }

    #[test]
    fn selection_never_exceeds_k() {
        let scored: Vec<ScoredCandidate> = (0..30)
            .map(|i| candidate(34.0 + f64::from(i), 0.0, f64::from(30 - i)))
            .collect();
        let selection = select_top_k(scored, 5, "Clinic", &config_with_separation(5.0));
        assert_eq!(selection.sites.len(), 5);
    }

    #[test]
    fn highest_score_seeds_the_selection() {
        let scored = vec![
            candidate(34.0, 0.0, 0.3),
            candidate(35.0, 0.0, 0.9),
            candidate(36.0, 0.0, 0.6),
        ];
        let selection = select_top_k(scored, 3, "Clinic", &config_with_separation(5.0));
        assert!((selection.sites[0].candidate.longitude - 35.0).abs() < f64::EPSILON);
        assert_eq!(selection.sites[0].rank, 1);
    }

    #[test]
    fn non_forced_sites_respect_the_final_threshold() {
        // A tight high-scoring cluster plus two well-separated points.
        let scored = vec![
            candidate(34.0, 0.0, 1.0),
            candidate(34.001, 0.0, 0.99),
            candidate(34.002, 0.0, 0.98),
            candidate(34.5, 0.0, 0.5),
            candidate(35.0, 0.0, 0.4),
        ];
        let selection = select_top_k(scored, 3, "Clinic", &config_with_separation(10.0));
        assert_eq!(selection.sites.len(), 3);
        for a in &selection.sites {
            for b in &selection.sites {
                if a.rank != b.rank && !a.forced && !b.forced {
                    let distance =
                        degree_distance(a.candidate.location(), b.candidate.location());
                    assert!(
                        distance >= selection.final_separation_deg,
                        "sites {} and {} are {distance} apart under threshold {}",
                        a.rank,
                        b.rank,
                        selection.final_separation_deg
                    );
                }
            }
        }
        // The cluster forces the threshold to skip the near-duplicates.
        let longitudes: Vec<f64> = selection
            .sites
            .iter()
            .map(|s| s.candidate.longitude)
            .collect();
        assert_eq!(longitudes, vec![34.0, 34.5, 35.0]);
    }

    #[test]
    fn relaxation_shrinks_the_threshold_to_admit_closer_sites() {
        // Two points 3 km apart under a 10 km requirement: only relaxation
        // (0.9^n) can admit the second one, and 3 km is above the 1 km floor.
        let spacing = 3.0 / KM_PER_DEGREE;
        let scored = vec![candidate(34.0, 0.0, 1.0), candidate(34.0 + spacing, 0.0, 0.9)];
        let selection = select_top_k(scored, 2, "Clinic", &config_with_separation(10.0));
        assert_eq!(selection.sites.len(), 2);
        assert!(selection.sites.iter().all(|s| !s.forced));
        assert!(selection.final_separation_km <= 3.0);
        assert!(selection.final_separation_km >= 1.0);
    }

    #[test]
    fn sub_floor_clusters_force_progress_with_a_flag() {
        // All candidates within ~100 m; the threshold can never relax far
        // enough, so everything after the seed must be forced.
        let scored: Vec<ScoredCandidate> = (0..4)
            .map(|i| candidate(34.0 + f64::from(i) * 0.001, 0.0, f64::from(4 - i)))
            .collect();
        let selection = select_top_k(scored, 4, "Clinic", &config_with_separation(10.0));
        assert_eq!(selection.sites.len(), 4);
        assert!(!selection.sites[0].forced);
        assert!(selection.sites[1..].iter().all(|s| s.forced));
        // Forced picks keep score order.
        let scores: Vec<f64> = selection
            .sites
            .iter()
            .map(|s| s.candidate.composite_score)
            .collect();
        assert_eq!(scores, vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn no_candidate_is_selected_twice() {
        let scored: Vec<ScoredCandidate> = (0..10)
            .map(|i| candidate(34.0 + f64::from(i) * 0.01, 0.0, 1.0))
            .collect();
        let selection = select_top_k(scored, 10, "Clinic", &config_with_separation(0.5));
        let mut seen: Vec<(u64, u64)> = selection
            .sites
            .iter()
            .map(|s| {
                (
                    s.candidate.longitude.to_bits(),
                    s.candidate.latitude.to_bits(),
                )
            })
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), selection.sites.len());
    }

    #[test]
    fn equal_scores_keep_their_input_order() {
        let scored = vec![
            candidate(34.0, 0.0, 0.5),
            candidate(35.0, 0.0, 0.5),
            candidate(36.0, 0.0, 0.5),
        ];
        let selection = select_top_k(scored, 3, "Clinic", &config_with_separation(5.0));
        let longitudes: Vec<f64> = selection
            .sites
            .iter()
            .map(|s| s.candidate.longitude)
            .collect();
        assert_eq!(longitudes, vec![34.0, 35.0, 36.0]);
    }

    #[test]
    fn empty_pool_selects_nothing() {
        let selection = select_top_k(Vec::new(), 5, "Clinic", &SitingConfig::default());
        assert!(selection.sites.is_empty());
    }

    #[test]
    fn pool_exhaustion_stops_short_of_k() {
        let scored = vec![candidate(34.0, 0.0, 1.0), candidate(35.0, 0.0, 0.5)];
        let selection = select_top_k(scored, 20, "Clinic", &config_with_separation(5.0));
        assert_eq!(selection.sites.len(), 2);
    }
}
