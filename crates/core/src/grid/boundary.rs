//! Forest boundary polygons
//!
//! A `GeoJSON` `Polygon`/`MultiPolygon` (bare geometry, `Feature` or the first polygonal
//! feature of a `FeatureCollection`) used as a point-in-polygon predicate when the
//! graph domain is built.

use crate::error::{Result, SimError};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How boundary coordinates relate to simulation space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryFit {
    /// Stretch the polygon's bounding box over the node extent
    #[default]
    Domain,
    /// Coordinates already are simulation-space units
    Raw,
}

/// A ring is a closed sequence of vertices (closing vertex optional)
type Ring = Vec<Point2<f64>>;

/// Outer ring plus holes
#[derive(Debug, Clone, PartialEq)]
struct Polygon {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    fn contains(&self, p: &Point2<f64>) -> bool {
        ring_contains(&self.exterior, p) && !self.holes.iter().any(|h| ring_contains(h, p))
    }
}

/// Point-in-forest predicate built from `GeoJSON`
#[derive(Debug, Clone, PartialEq)]
pub struct ForestBoundary {
    polygons: Vec<Polygon>,
}

impl ForestBoundary {
    /// Parse a `GeoJSON` document
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SimError::InvalidBoundary(format!("not valid JSON: {e}")))?;
        Self::from_geojson(&value)
    }

    /// Build from an already-parsed `GeoJSON` value
    pub fn from_geojson(value: &Value) -> Result<Self> {
        let geometry = polygonal_geometry(value)?;
        let kind = geometry.get("type").and_then(Value::as_str);
        let coords = geometry
            .get("coordinates")
            .ok_or_else(|| SimError::InvalidBoundary("geometry has no coordinates".into()))?;

        let polygons = match kind {
            Some("Polygon") => vec![parse_polygon(coords)?],
            Some("MultiPolygon") => coords
                .as_array()
                .ok_or_else(|| SimError::InvalidBoundary("MultiPolygon coordinates must be an array".into()))?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?,
            other => {
                return Err(SimError::InvalidBoundary(format!(
                    "expected Polygon or MultiPolygon, got {}",
                    other.unwrap_or("no type")
                )))
            }
        };

        if polygons.is_empty() {
            return Err(SimError::InvalidBoundary("MultiPolygon has no polygons".into()));
        }
        Ok(Self { polygons })
    }

    /// Axis-aligned bounding box `(min, max)` over every exterior ring
    pub fn bounds(&self) -> (Point2<f64>, Point2<f64>) {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in self.polygons.iter().flat_map(|poly| poly.exterior.iter()) {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }

    /// Linearly map the bounding box onto `[lo, hi]` in both axes.
    ///
    /// Degenerate extents collapse onto the middle of the target range.
    pub fn fitted_to(&self, lo: f64, hi: f64) -> Self {
        let (min, max) = self.bounds();
        let span = hi - lo;
        let map = |v: f64, vmin: f64, vmax: f64| {
            if vmax > vmin {
                lo + (v - vmin) / (vmax - vmin) * span
            } else {
                lo + span / 2.0
            }
        };
        let map_ring = |ring: &Ring| -> Ring {
            ring.iter()
                .map(|p| Point2::new(map(p.x, min.x, max.x), map(p.y, min.y, max.y)))
                .collect()
        };

        Self {
            polygons: self
                .polygons
                .iter()
                .map(|poly| Polygon {
                    exterior: map_ring(&poly.exterior),
                    holes: poly.holes.iter().map(map_ring).collect(),
                })
                .collect(),
        }
    }

    /// Whether `p` lies inside any polygon (even-odd rule, holes excluded)
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        self.polygons.iter().any(|poly| poly.contains(p))
    }
}

fn polygonal_geometry(value: &Value) -> Result<&Value> {
    match value.get("type").and_then(Value::as_str) {
        Some("Feature") => value
            .get("geometry")
            .filter(|g| !g.is_null())
            .ok_or_else(|| SimError::InvalidBoundary("Feature has no geometry".into())),
        Some("FeatureCollection") => value
            .get("features")
            .and_then(Value::as_array)
            .and_then(|features| {
                features.iter().find_map(|f| {
                    let geometry = f.get("geometry")?;
                    matches!(
                        geometry.get("type").and_then(Value::as_str),
                        Some("Polygon" | "MultiPolygon")
                    )
                    .then_some(geometry)
                })
            })
            .ok_or_else(|| SimError::InvalidBoundary("FeatureCollection has no polygonal feature".into())),
        Some(_) => Ok(value),
        None => Err(SimError::InvalidBoundary("GeoJSON object has no type".into())),
    }
}

fn parse_polygon(value: &Value) -> Result<Polygon> {
    let rings = value
        .as_array()
        .ok_or_else(|| SimError::InvalidBoundary("polygon must be an array of rings".into()))?;
    let mut rings = rings.iter().map(parse_ring);
    let exterior = rings
        .next()
        .ok_or_else(|| SimError::InvalidBoundary("polygon has no exterior ring".into()))??;
    let holes = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon { exterior, holes })
}

fn parse_ring(value: &Value) -> Result<Ring> {
    let positions = value
        .as_array()
        .ok_or_else(|| SimError::InvalidBoundary("ring must be an array of positions".into()))?;
    let ring = positions
        .iter()
        .map(|pos| {
            let x = pos.get(0).and_then(Value::as_f64);
            let y = pos.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok(Point2::new(x, y)),
                _ => Err(SimError::InvalidBoundary(format!("bad position {pos}"))),
            }
        })
        .collect::<Result<Ring>>()?;
    if ring.len() < 3 {
        return Err(SimError::InvalidBoundary(format!(
            "ring needs at least 3 positions, got {}",
            ring.len()
        )));
    }
    Ok(ring)
}

/// Even-odd ray cast
fn ring_contains(ring: &Ring, p: &Point2<f64>) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[0,0],[10,0],[10,10],[0,10],[0,0]]]}"#;

    #[test]
    fn test_polygon_contains() {
        let b = ForestBoundary::from_geojson_str(SQUARE).unwrap();
        assert!(b.contains(&Point2::new(5.0, 5.0)));
        assert!(!b.contains(&Point2::new(15.0, 5.0)));
        assert!(!b.contains(&Point2::new(-0.5, 5.0)));
    }

    #[test]
    fn test_feature_with_hole() {
        let text = r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[
            [[0,0],[10,0],[10,10],[0,10]],
            [[4,4],[6,4],[6,6],[4,6]]
        ]}}"#;
        let b = ForestBoundary::from_geojson_str(text).unwrap();
        assert!(b.contains(&Point2::new(2.0, 2.0)));
        assert!(!b.contains(&Point2::new(5.0, 5.0)));
    }

    #[test]
    fn test_multipolygon_in_collection() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1,1]}},
            {"type":"Feature","geometry":{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,0],[1,1],[0,1]]],
                [[[5,5],[6,5],[6,6],[5,6]]]
            ]}}
        ]}"#;
        let b = ForestBoundary::from_geojson_str(text).unwrap();
        assert!(b.contains(&Point2::new(0.5, 0.5)));
        assert!(b.contains(&Point2::new(5.5, 5.5)));
        assert!(!b.contains(&Point2::new(3.0, 3.0)));
    }

    #[test]
    fn test_rejects_non_polygonal() {
        let text = r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#;
        assert!(matches!(
            ForestBoundary::from_geojson_str(text),
            Err(SimError::InvalidBoundary(_))
        ));
        assert!(ForestBoundary::from_geojson_str("not json").is_err());
        assert!(ForestBoundary::from_geojson_str(r#"{"type":"Polygon","coordinates":[[[0,0],[1,1]]]}"#).is_err());
    }

    #[test]
    fn test_fit_to_domain() {
        let geo = r#"{"type":"Polygon","coordinates":[[[-77.2,38.8],[-77.0,38.8],[-77.0,39.0],[-77.2,39.0]]]}"#;
        let b = ForestBoundary::from_geojson_str(geo).unwrap().fitted_to(2.0, 100.0);
        let (min, max) = b.bounds();
        assert!((min.x - 2.0).abs() < 1e-9 && (min.y - 2.0).abs() < 1e-9);
        assert!((max.x - 100.0).abs() < 1e-9 && (max.y - 100.0).abs() < 1e-9);
        assert!(b.contains(&Point2::new(50.0, 50.0)));
    }
}
