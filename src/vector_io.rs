use crate::types::*;
use gdal::vector::{FieldValue, LayerAccess};
use gdal::Dataset;
use geo::BoundingRect;
use geo_types::{Geometry, GeometryCollection};
use serde_json::{Map, Value};
use std::path::Path;

pub struct VectorIO;

impl VectorIO {
    /// Reads the first layer of a vector dataset into GeoJSON-ready features.
    pub fn read_layer(path: &Path) -> Result<VectorLayer, DashboardError> {
        let dataset = Dataset::open(path)?;
        if dataset.layer_count() == 0 {
            return Err(DashboardError::Shape(format!(
                "{} contains no vector layer",
                path.display()
            )));
        }
        let mut layer = dataset.layer(0)?;
        let columns: Vec<String> = layer.defn().fields().map(|field| field.name()).collect();

        let mut features = Vec::new();
        let mut shapes: Vec<Geometry<f64>> = Vec::new();
        for feature in layer.features() {
            let geometry = match feature.geometry() {
                Some(geometry) => {
                    if let Ok(shape) = geometry.to_geo() {
                        shapes.push(shape);
                    }
                    serde_json::from_str(&geometry.json()?).unwrap_or(Value::Null)
                }
                None => Value::Null,
            };

            let properties: Map<String, Value> = feature
                .fields()
                .map(|(name, value)| (name, value.map_or(Value::Null, field_to_json)))
                .collect();

            features.push(VectorFeature {
                geometry,
                properties,
            });
        }

        let extent = GeometryCollection::from(shapes).bounding_rect();
        tracing::debug!(
            file = %path.display(),
            features = features.len(),
            columns = columns.len(),
            "Read vector layer"
        );

        Ok(VectorLayer {
            features,
            columns,
            extent,
            filename: crate::catalog::basename(path),
        })
    }

    /// GeoJSON FeatureCollection; every feature carries its row index as `id`.
    pub fn to_geojson(layer: &VectorLayer) -> Value {
        let features: Vec<Value> = layer
            .features
            .iter()
            .enumerate()
            .map(|(idx, f)| {
                serde_json::json!({
                    "type": "Feature",
                    "id": idx,
                    "geometry": f.geometry,
                    "properties": f.properties,
                })
            })
            .collect();
        serde_json::json!({ "type": "FeatureCollection", "features": features })
    }
}

fn field_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::IntegerValue(v) => Value::from(v),
        FieldValue::Integer64Value(v) => Value::from(v),
        FieldValue::RealValue(v) => serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number),
        FieldValue::StringValue(v) => Value::String(v),
        other => other.into_string().map_or(Value::Null, Value::String),
    }
}
