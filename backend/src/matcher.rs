use crate::{
    generator::Candidate,
    models::{Route, SurfaceProduct},
};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;
pub const MAX_LIVE_RESULTS: usize = 3;

#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub match_ratio: f64,
}

/// Select and order live candidates for the requested surface.
///
/// Candidates whose share of `surface` reaches `threshold` are kept and
/// sorted by that share, best first, at most `limit` of them. When none
/// qualifies the first candidate (request order) is returned alone so a
/// successful provider call always yields something.
pub fn rank(
    candidates: Vec<Candidate>,
    surface: SurfaceProduct,
    threshold: f64,
    limit: usize,
) -> Vec<RankedCandidate> {
    let scored: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|candidate| RankedCandidate {
            match_ratio: candidate.share.ratio(surface),
            candidate,
        })
        .collect();

    let (mut accepted, rejected): (Vec<_>, Vec<_>) = scored
        .into_iter()
        .partition(|ranked| ranked.match_ratio >= threshold);

    if accepted.is_empty() {
        if let Some(first) = rejected.into_iter().next() {
            tracing::debug!(
                "no candidate reaches {:.0}% {surface}, keeping {} at {:.0}%",
                threshold * 100.0,
                first.candidate.direction.id(),
                first.match_ratio * 100.0
            );
            return vec![first];
        }
        return Vec::new();
    }

    accepted.sort_by(|a, b| {
        b.match_ratio
            .partial_cmp(&a.match_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    accepted.truncate(limit);
    accepted
}

pub fn into_routes(ranked: Vec<RankedCandidate>) -> Vec<Route> {
    ranked.into_iter().map(|r| r.candidate.route).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        directions::RawRoute,
        generator::{Direction, GeneratedRoute},
        models::Coordinate,
        surface::RawSegment,
    };

    /// Candidate whose route is `park_pct` percent park, rest asphalt.
    fn candidate(direction: Direction, park_pct: f64) -> Candidate {
        let center = Coordinate::new(30.31, 59.94);
        GeneratedRoute {
            direction,
            waypoints: [center; 3],
            requested_km: 8.0,
            raw: RawRoute {
                distance_m: 8000.0,
                segments: vec![
                    RawSegment::new(0.0, park_pct, 17),
                    RawSegment::new(park_pct, 100.0, 3),
                ],
                geometry: Vec::new(),
            },
        }
        .into_candidate("Санкт-Петербург")
    }

    fn directions(ranked: &[RankedCandidate]) -> Vec<Direction> {
        ranked.iter().map(|r| r.candidate.direction).collect()
    }

    #[test]
    fn keeps_qualifying_candidates_best_first() {
        let ranked = rank(
            vec![
                candidate(Direction::North, 55.0),
                candidate(Direction::East, 20.0),
                candidate(Direction::South, 90.0),
                candidate(Direction::West, 50.0),
            ],
            SurfaceProduct::Park,
            DEFAULT_MATCH_THRESHOLD,
            MAX_LIVE_RESULTS,
        );
        assert_eq!(
            directions(&ranked),
            vec![Direction::South, Direction::North, Direction::West]
        );
    }

    #[test]
    fn falls_back_to_first_candidate_below_threshold() {
        let ranked = rank(
            vec![
                candidate(Direction::East, 10.0),
                candidate(Direction::South, 40.0),
            ],
            SurfaceProduct::Park,
            DEFAULT_MATCH_THRESHOLD,
            MAX_LIVE_RESULTS,
        );
        assert_eq!(directions(&ranked), vec![Direction::East]);
        assert!((ranked[0].match_ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn absent_surface_scores_zero() {
        let ranked = rank(
            vec![candidate(Direction::North, 100.0)],
            SurfaceProduct::Trail,
            DEFAULT_MATCH_THRESHOLD,
            MAX_LIVE_RESULTS,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].match_ratio, 0.0);
    }

    #[test]
    fn nothing_in_nothing_out() {
        assert!(rank(Vec::new(), SurfaceProduct::Park, 0.5, 3).is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_at_most_three_non_increasing(
                pcts in prop::collection::vec(0.0..=100.0f64, 0..12),
                threshold in 0.0..=1.0f64
            ) {
                let candidates = pcts
                    .iter()
                    .enumerate()
                    .map(|(i, pct)| candidate(Direction::ALL[i % 4], *pct))
                    .collect();
                let ranked = rank(candidates, SurfaceProduct::Park, threshold, MAX_LIVE_RESULTS);
                prop_assert!(ranked.len() <= MAX_LIVE_RESULTS);
                prop_assert_eq!(ranked.is_empty(), pcts.is_empty());
                for pair in ranked.windows(2) {
                    prop_assert!(pair[0].match_ratio >= pair[1].match_ratio);
                }
            }
        }
    }
}
