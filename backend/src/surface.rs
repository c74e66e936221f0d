use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::SurfaceProduct;

/// One raw `(start, end, surface code)` triple from the directions provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start_m: f64,
    pub end_m: f64,
    pub code: i64,
}

impl RawSegment {
    pub fn new(start_m: f64, end_m: f64, code: i64) -> Self {
        Self {
            start_m,
            end_m,
            code,
        }
    }

    /// Reversed segments count as zero length.
    fn length(&self) -> f64 {
        (self.end_m - self.start_m).max(0.0)
    }
}

/// Maps an OpenRouteService surface code onto the coarse product a runner
/// chooses between. Unknown codes count as asphalt.
pub fn product_for_code(code: i64) -> SurfaceProduct {
    match code {
        // unknown, paved, asphalt, concrete, metal
        0 | 1 | 3 | 4 | 6 => SurfaceProduct::Asphalt,
        // unpaved, wood, compacted gravel, gravel, dirt, ice, sand
        2 | 7 | 8 | 10 | 11 | 13 | 15 => SurfaceProduct::Trail,
        // ground, grass, grass paver
        12 | 17 | 18 => SurfaceProduct::Park,
        // paving stones
        14 => SurfaceProduct::Embankment,
        _ => SurfaceProduct::Asphalt,
    }
}

/// Fraction of a route's length per surface product.
///
/// Always holds at least one entry and the fractions sum to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceShare {
    shares: BTreeMap<SurfaceProduct, f64>,
}

impl Default for SurfaceShare {
    fn default() -> Self {
        Self {
            shares: BTreeMap::from([(SurfaceProduct::Asphalt, 1.0)]),
        }
    }
}

impl SurfaceShare {
    pub fn ratio(&self, product: SurfaceProduct) -> f64 {
        self.shares.get(&product).copied().unwrap_or(0.0)
    }

    /// Product covering the largest part of the route, ties broken by
    /// presentation order.
    pub fn dominant(&self) -> SurfaceProduct {
        SurfaceProduct::ALL
            .into_iter()
            .fold(None::<(SurfaceProduct, f64)>, |best, product| {
                let ratio = self.ratio(product);
                match best {
                    Some((_, best_ratio)) if best_ratio >= ratio => best,
                    _ => Some((product, ratio)),
                }
            })
            .map(|(product, _)| product)
            .unwrap_or(SurfaceProduct::Asphalt)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SurfaceProduct, f64)> + '_ {
        self.shares.iter().map(|(product, ratio)| (*product, *ratio))
    }

    pub fn total(&self) -> f64 {
        self.shares.values().sum()
    }
}

pub fn classify(segments: &[RawSegment]) -> SurfaceShare {
    let mut total_length = 0.0;
    let mut length_by_product: BTreeMap<SurfaceProduct, f64> = BTreeMap::new();

    for segment in segments {
        let length = segment.length();
        total_length += length;
        *length_by_product
            .entry(product_for_code(segment.code))
            .or_insert(0.0) += length;
    }

    if total_length <= 0.0 || !total_length.is_finite() {
        return SurfaceShare::default();
    }

    let shares = length_by_product
        .into_iter()
        .filter(|(_, length)| *length > 0.0)
        .map(|(product, length)| (product, length / total_length))
        .collect();

    SurfaceShare { shares }
}
