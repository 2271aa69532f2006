use crate::error::ModelError;
use crate::ids::RecordId;

use std::fmt;
use std::str::FromStr;

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// `0,0` is what the backend stores for "no location yet".
    pub fn is_null_island(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    /// Range check for values that come from operators rather than devices.
    pub fn validate(self) -> Result<Self, ModelError> {
        if !self.is_finite() {
            return Err(ModelError::InvalidCoordinate(format!(
                "{self} is not finite"
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ModelError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(ModelError::InvalidCoordinate(format!(
                "longitude {} outside [-180, 180]",
                self.lng
            )));
        }
        Ok(self)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Parses `"lat,lng"`, e.g. `"11.2408,-74.1990"`.
impl FromStr for LatLng {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = value.split_once(',').ok_or_else(|| {
            ModelError::InvalidCoordinate(format!(
                "expected 'lat,lng', got '{value}'"
            ))
        })?;
        let parse = |part: &str| {
            part.trim().parse::<f64>().map_err(|err| {
                ModelError::InvalidCoordinate(format!("'{part}': {err}"))
            })
        };
        LatLng::new(parse(lat)?, parse(lng)?).validate()
    }
}

/// Axis-aligned bounding box. Does not model antimeridian wrap.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Degenerate bounds covering exactly one point.
    pub fn from_point(point: LatLng) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    /// Minimal box covering every point, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_point(first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn contains(&self, point: LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }

    pub fn lat_span(&self) -> f64 {
        self.north_east.lat - self.south_west.lat
    }

    pub fn lng_span(&self) -> f64 {
        self.north_east.lng - self.south_west.lng
    }
}

/// A pin rendered on the map for one courier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker {
    pub id: RecordId,
    pub position: LatLng,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_every_point() {
        let points = [
            LatLng::new(10.0, 20.0),
            LatLng::new(-5.0, 25.0),
            LatLng::new(3.0, -1.0),
        ];
        let bounds = LatLngBounds::from_points(points).unwrap();
        assert_eq!(bounds.south_west, LatLng::new(-5.0, -1.0));
        assert_eq!(bounds.north_east, LatLng::new(10.0, 25.0));
        assert!(points.iter().all(|p| bounds.contains(*p)));
    }

    #[test]
    fn bounds_of_nothing_is_none() {
        assert!(LatLngBounds::from_points(Vec::new()).is_none());
    }

    #[test]
    fn parses_lat_lng_pairs() {
        let point: LatLng = "11.2408, -74.1990".parse().unwrap();
        assert_eq!(point, LatLng::new(11.2408, -74.1990));
        assert!("91,0".parse::<LatLng>().is_err());
        assert!("abc".parse::<LatLng>().is_err());
    }
}
