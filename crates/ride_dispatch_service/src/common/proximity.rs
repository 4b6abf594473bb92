/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::{registry::LocationRegistry, types::*, utils::distance_between_in_km};
use crate::tools::error::AppError;
use std::sync::Arc;

/// Geodesic distance in kilometers; must be symmetric and monotonic.
pub trait DistanceCalculator: Send + Sync {
    fn distance(&self, from: &Point, to: &Point) -> Kilometers;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Haversine;

impl DistanceCalculator for Haversine {
    fn distance(&self, from: &Point, to: &Point) -> Kilometers {
        distance_between_in_km(from, to)
    }
}

/// Answers "which drivers are within r km of this point" with a linear scan of the registry.
///
/// A spatial index (geohash buckets or an R-tree) can replace the scan behind `find_nearby`
/// once the driver population outgrows it.
pub struct ProximityMatcher {
    registry: Arc<LocationRegistry>,
    distance: Arc<dyn DistanceCalculator>,
}

impl ProximityMatcher {
    pub fn new(registry: Arc<LocationRegistry>, distance: Arc<dyn DistanceCalculator>) -> Self {
        Self { registry, distance }
    }

    pub async fn find_nearby(
        &self,
        origin: &Point,
        max_distance: Kilometers,
    ) -> Result<Vec<NearbyDriver>, AppError> {
        if !max_distance.is_valid_radius() {
            return Err(AppError::MalformedInput(format!(
                "search radius {} km is not a finite non-negative number",
                max_distance.0
            )));
        }

        let snapshot = self.registry.snapshot().await?;

        Ok(rank_by_distance(
            snapshot,
            origin,
            max_distance,
            self.distance.as_ref(),
        ))
    }
}

/// Keeps records within `max_distance` of `origin`, nearest first.
/// Equal distances keep their snapshot order.
pub fn rank_by_distance(
    records: Vec<DriverLocationRecord>,
    origin: &Point,
    max_distance: Kilometers,
    distance: &dyn DistanceCalculator,
) -> Vec<NearbyDriver> {
    let mut nearby: Vec<NearbyDriver> = records
        .into_iter()
        .map(|record| NearbyDriver {
            distance_km: distance.distance(origin, &record.pt),
            record,
        })
        .filter(|driver| driver.distance_km <= max_distance)
        .collect();

    nearby.sort_by(|a, b| a.distance_km.0.total_cmp(&b.distance_km.0));

    nearby
}
