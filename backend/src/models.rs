pub use shared::{
    ApiError, ChatEvent, Choice, Coordinate, InboundEvent, OutboundMessage, Route, SearchCriteria,
    SurfaceProduct,
};

use crate::error::CriteriaError;

pub const MIN_DISTANCE_KM: f64 = 1.0;
pub const MAX_DISTANCE_KM: f64 = 50.0;

pub fn distance_in_range(distance_km: f64) -> bool {
    (MIN_DISTANCE_KM..=MAX_DISTANCE_KM).contains(&distance_km)
}

/// Field-by-field check for criteria that did not come through the dialogue.
pub fn validate_criteria(criteria: &SearchCriteria) -> Result<(), CriteriaError> {
    if criteria.city.trim().is_empty() {
        return Err(CriteriaError::EmptyCity);
    }
    if !distance_in_range(criteria.distance_km) {
        return Err(CriteriaError::DistanceOutOfRange {
            value: criteria.distance_km,
            min: MIN_DISTANCE_KM,
            max: MAX_DISTANCE_KM,
        });
    }
    Ok(())
}
