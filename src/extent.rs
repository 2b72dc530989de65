use geo::algorithm::bounding_rect::BoundingRect;
use geo::{Geometry, Rect};
use geojson::FeatureCollection;
use tracing::debug;

// Bounding box of every geometry in the collection, None if nothing has a geometry
pub fn collection_extent(collection: &FeatureCollection) -> Option<Rect<f64>> {
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;
    let mut found = false;

    for feature in &collection.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let geometry = match Geometry::<f64>::try_from(geometry.value.clone()) {
            Ok(geometry) => geometry,
            Err(err) => {
                debug!("Skipping unconvertible geometry: {}", err);
                continue;
            }
        };
        if let Some(bbox) = geometry.bounding_rect() {
            min_x = min_x.min(bbox.min().x);
            min_y = min_y.min(bbox.min().y);
            max_x = max_x.max(bbox.max().x);
            max_y = max_y.max(bbox.max().y);
            found = true;
        }
    }

    found.then(|| Rect::new((min_x, min_y), (max_x, max_y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Feature, Geometry as GeoJsonGeometry, Value};

    fn feature(value: Option<Value>) -> Feature {
        Feature {
            bbox: None,
            geometry: value.map(GeoJsonGeometry::new),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    #[test]
    fn test_extent_spans_all_geometries() {
        let collection = FeatureCollection {
            bbox: None,
            features: vec![
                feature(Some(Value::LineString(vec![
                    vec![-123.2, 49.2],
                    vec![-123.0, 49.3],
                ]))),
                feature(None),
                feature(Some(Value::Point(vec![-122.5, 49.1]))),
            ],
            foreign_members: None,
        };

        let extent = collection_extent(&collection).unwrap();
        assert_eq!(extent.min().x, -123.2);
        assert_eq!(extent.min().y, 49.1);
        assert_eq!(extent.max().x, -122.5);
        assert_eq!(extent.max().y, 49.3);
    }

    #[test]
    fn test_extent_of_geometry_free_collection() {
        let collection = FeatureCollection {
            bbox: None,
            features: vec![feature(None)],
            foreign_members: None,
        };
        assert!(collection_extent(&collection).is_none());
    }
}
