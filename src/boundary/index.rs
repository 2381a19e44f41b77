//! Spatial index over the polygons of a boundary.

use geo::{BoundingRect, Contains, Point, Polygon};
use rstar::{RTree, RTreeObject, AABB};

/// Wrapper for R-tree indexing of a single polygon
#[derive(Clone)]
pub struct IndexedPolygon {
    pub polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedPolygon {
    pub fn new(polygon: Polygon<f64>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        Some(Self {
            polygon,
            envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
        })
    }
}

/// R-tree of the component polygons of a (multi-)polygon boundary.
///
/// Country boundaries often have hundreds of island polygons; the envelope
/// filter keeps exact containment tests down to the few candidates around
/// the probe point.
pub struct PolygonIndex {
    tree: RTree<IndexedPolygon>,
}

impl PolygonIndex {
    pub fn build(polygons: impl IntoIterator<Item = Polygon<f64>>) -> Self {
        let indexed: Vec<IndexedPolygon> = polygons
            .into_iter()
            .filter_map(IndexedPolygon::new)
            .collect();

        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    /// True if any polygon strictly contains the point (points on an edge are outside)
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let point = Point::new(lon, lat);
        let query_envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .any(|ip| ip.polygon.contains(&point))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
