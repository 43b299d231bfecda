//! Great-circle distance and proximity ranking.
//!
//! All distances are in statute miles, the unit ride zones use for their
//! pickup radius. Callers must reject missing or non-finite coordinates before
//! calling in; nothing here validates its inputs.

use serde::{Deserialize, Serialize};

/// Mean earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3963.19;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
  pub latitude:  f64,
  pub longitude: f64,
}

impl LatLng {
  pub fn new(latitude: f64, longitude: f64) -> Self {
    Self { latitude, longitude }
  }

  /// `true` when both components are finite numbers.
  pub fn is_finite(&self) -> bool {
    self.latitude.is_finite() && self.longitude.is_finite()
  }

  /// Haversine distance to `other` in miles.
  pub fn distance_to(&self, other: &LatLng) -> f64 { distance(*self, *other) }
}

/// Haversine distance between two points, in miles.
pub fn distance(a: LatLng, b: LatLng) -> f64 {
  let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
  let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());
  let dlat = lat2 - lat1;
  let dlon = lon2 - lon1;
  let sin_dlat = (dlat * 0.5).sin();
  let sin_dlon = (dlon * 0.5).sin();
  let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
  let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
  EARTH_RADIUS_MILES * c
}

/// `true` if `point` lies within `radius` miles of `center` (inclusive).
pub fn within_radius(point: LatLng, center: LatLng, radius: f64) -> bool {
  distance(point, center) <= radius
}

/// Rank `items` by distance from `origin`.
///
/// Items without a point are skipped, as is anything at or beyond `radius`.
/// The survivors are sorted ascending by distance and truncated to `limit`.
/// The sort is stable, so exact ties keep their input order.
pub fn nearest<T>(
  origin: LatLng,
  items: impl IntoIterator<Item = T>,
  point_of: impl Fn(&T) -> Option<LatLng>,
  radius: f64,
  limit: usize,
) -> Vec<(f64, T)> {
  let mut ranked: Vec<(f64, T)> = items
    .into_iter()
    .filter_map(|item| {
      let d = distance(origin, point_of(&item)?);
      (d < radius).then_some((d, item))
    })
    .collect();

  ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
  ranked.truncate(limit);
  ranked
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Degrees of latitude spanning `miles` along a meridian.
  fn lat_offset(miles: f64) -> f64 {
    (miles / EARTH_RADIUS_MILES).to_degrees()
  }

  #[test]
  fn distance_to_self_is_zero() {
    let p = LatLng::new(40.7128, -74.0060);
    assert_eq!(distance(p, p), 0.0);
  }

  #[test]
  fn distance_is_symmetric() {
    let nyc = LatLng::new(40.7128, -74.0060);
    let philly = LatLng::new(39.9526, -75.1652);
    assert!((distance(nyc, philly) - distance(philly, nyc)).abs() < 1e-9);
  }

  #[test]
  fn nyc_to_philadelphia_is_about_eighty_miles() {
    let nyc = LatLng::new(40.7128, -74.0060);
    let philly = LatLng::new(39.9526, -75.1652);
    let d = nyc.distance_to(&philly);
    assert!((78.0..83.0).contains(&d), "got {d}");
  }

  #[test]
  fn meridian_offset_matches_requested_miles() {
    let origin = LatLng::new(35.0, -80.0);
    let north = LatLng::new(35.0 + lat_offset(4.0), -80.0);
    assert!((distance(origin, north) - 4.0).abs() < 1e-6);
  }

  #[test]
  fn within_radius_is_inclusive_of_interior_points() {
    let center = LatLng::new(35.0, -80.0);
    let near = LatLng::new(35.0 + lat_offset(2.0), -80.0);
    let far = LatLng::new(35.0 + lat_offset(12.0), -80.0);
    assert!(within_radius(center, center, 0.0));
    assert!(within_radius(near, center, 10.0));
    assert!(!within_radius(far, center, 10.0));
  }

  #[test]
  fn nearest_filters_sorts_and_limits() {
    let origin = LatLng::new(35.0, -80.0);
    let at = |miles: f64| LatLng::new(35.0 + lat_offset(miles), -80.0);
    let items = vec![("six", at(6.0)), ("four", at(4.0)), ("one", at(1.0))];

    let ranked = nearest(origin, items, |(_, p)| Some(*p), 5.0, 2);
    let names: Vec<_> = ranked.iter().map(|(_, (n, _))| *n).collect();
    assert_eq!(names, ["one", "four"]);
    assert!((ranked[0].0 - 1.0).abs() < 1e-6);
    assert!((ranked[1].0 - 4.0).abs() < 1e-6);
  }

  #[test]
  fn nearest_excludes_points_exactly_at_radius() {
    let origin = LatLng::new(35.0, -80.0);
    let p = LatLng::new(35.0 + lat_offset(3.0), -80.0);
    let d = distance(origin, p);
    let ranked = nearest(origin, [p], |p| Some(*p), d, 10);
    assert!(ranked.is_empty());
  }

  #[test]
  fn nearest_skips_items_without_a_point() {
    let origin = LatLng::new(35.0, -80.0);
    let items = vec![None, Some(origin)];
    let ranked = nearest(origin, items, |p| *p, 1.0, 10);
    assert_eq!(ranked.len(), 1);
  }

  #[test]
  fn nearest_with_zero_limit_is_empty() {
    let origin = LatLng::new(35.0, -80.0);
    let ranked = nearest(origin, [origin], |p| Some(*p), 1.0, 0);
    assert!(ranked.is_empty());
  }
}
