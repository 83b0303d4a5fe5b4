//! Versioned JSON persistence of whole diagrams.
//!
//! A stored diagram is one record:
//!
//! ```json
//! { "version": { "major": 1, "minor": 1, "patch": 0 },
//!   "settings": { ... },
//!   "shapes": [ { "type": "RectShape", "id": "...", ..., "child_shapes": [ ... ] } ] }
//! ```
//!
//! Shape records are produced by the shape registry, so each record lists
//! the properties of its type's layers, ancestors first. Child lists are
//! always written: a shape that opted out of serialization is stored with
//! the disabled marker and comes back opted out.

use super::{Diagram, DiagramSettings, SETTINGS_TYPE, SettingsRegistry, settings_registry};
use crate::error::{DiagramError, DiagramResult, FormatVersion};
use crate::property::{Attribute, is_marked_disabled};
use crate::shapes::{ShapeId, ShapeNode, ShapeRegistry, ShapeType, shape_registry};
use serde_json::{Map, Value};

/// Version written by this build; data with a newer major/minor is rejected.
pub const FORMAT_VERSION: FormatVersion = FormatVersion::new(1, 1, 0);

const VERSION_KEY: &str = "version";
const SETTINGS_KEY: &str = "settings";
const SHAPES_KEY: &str = "shapes";
const TYPE_KEY: &str = "type";
const CHILDREN_KEY: &str = "child_shapes";

/// Property registries used to read and write diagrams.
#[derive(Debug)]
pub struct Schema {
    pub shapes: ShapeRegistry,
    pub settings: SettingsRegistry,
}

impl Schema {
    pub fn new() -> Self {
        Self {
            shapes: shape_registry(),
            settings: settings_registry(),
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagram {
    /// Serialize the whole diagram into its versioned record.
    pub fn to_value(&self) -> DiagramResult<Value> {
        let settings = self
            .schema
            .settings
            .serialize(&self.settings, SETTINGS_TYPE, &[])?;
        let shapes = self.serialize_shapes(&self.top_level)?;

        let mut root = Map::new();
        root.insert(VERSION_KEY.to_string(), serde_json::to_value(FORMAT_VERSION)?);
        root.insert(SETTINGS_KEY.to_string(), Value::Object(settings));
        root.insert(SHAPES_KEY.to_string(), Value::Array(shapes));
        Ok(Value::Object(root))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> DiagramResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    /// Parse a diagram using a fresh schema.
    pub fn from_json(json: &str) -> DiagramResult<Self> {
        let mut diagram = Diagram::new();
        diagram.load_json(json)?;
        Ok(diagram)
    }

    /// Replace the content of this diagram with the parsed `json`.
    ///
    /// On error the diagram is left exactly as it was.
    pub fn load_json(&mut self, json: &str) -> DiagramResult<()> {
        let value: Value = serde_json::from_str(json)?;
        self.load_value(&value)
    }

    /// Replace the content of this diagram with a stored record.
    pub fn load_value(&mut self, value: &Value) -> DiagramResult<()> {
        let root = value
            .as_object()
            .ok_or_else(|| DiagramError::Malformed("diagram record is not an object".into()))?;

        let version: FormatVersion = match root.get(VERSION_KEY) {
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| DiagramError::Malformed(format!("bad version: {}", e)))?,
            None => return Err(DiagramError::Malformed("missing version".into())),
        };
        let found = (version.major, version.minor);
        let supported = (FORMAT_VERSION.major, FORMAT_VERSION.minor);
        if found > supported {
            return Err(DiagramError::IncompatibleVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }
        let compat = found < supported;

        let mut fresh = Diagram::with_schema(self.schema.clone());
        if let Some(settings) = root.get(SETTINGS_KEY) {
            let record = settings
                .as_object()
                .ok_or_else(|| DiagramError::Malformed("settings record is not an object".into()))?;
            let mut restored = DiagramSettings::default();
            self.schema
                .settings
                .deserialize(&mut restored, SETTINGS_TYPE, record)?;
            fresh.replace_settings(restored);
        }
        if let Some(shapes) = root.get(SHAPES_KEY) {
            let records = shapes
                .as_array()
                .ok_or_else(|| DiagramError::Malformed("shapes is not a list".into()))?;
            fresh.read_shape_records(records, None)?;
        }
        fresh.warn_dangling_references();

        if compat {
            log::warn!(
                "Loading diagram format {} with compatibility for {}",
                version,
                FORMAT_VERSION
            );
        }
        fresh.set_compatibility_loading(compat);
        fresh.set_modified(false);
        log::info!("Loaded diagram with {} shape(s)", fresh.len());
        *self = fresh;
        Ok(())
    }

    /// Records of the given shapes and their subtrees, in order.
    pub(crate) fn serialize_shapes(&self, ids: &[ShapeId]) -> DiagramResult<Vec<Value>> {
        let mut records = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(record) = self.shape_record(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn shape_record(&self, id: ShapeId) -> DiagramResult<Option<Value>> {
        let Some(node) = self.get(id) else {
            return Ok(None);
        };
        let type_name = node.shape_type().name();
        let mut record = Map::new();
        record.insert(TYPE_KEY.to_string(), Value::String(type_name.to_string()));
        record.extend(self.schema.shapes.serialize(node, type_name, &[])?);
        let children = self.serialize_shapes(node.children())?;
        record.insert(CHILDREN_KEY.to_string(), Value::Array(children));
        Ok(Attribute::object(node.is_serialized(), &record).encode(true))
    }

    /// Insert shapes read from `records` under `parent`, without acceptance checks.
    pub(crate) fn read_shape_records(
        &mut self,
        records: &[Value],
        parent: Option<ShapeId>,
    ) -> DiagramResult<()> {
        for value in records {
            let record = value
                .as_object()
                .ok_or_else(|| DiagramError::Malformed("shape record is not an object".into()))?;
            let type_name = record
                .get(TYPE_KEY)
                .and_then(Value::as_str)
                .ok_or_else(|| DiagramError::Malformed("shape record without type".into()))?;
            let shape_type = ShapeType::from_name(type_name)
                .ok_or_else(|| {
                    DiagramError::Malformed(format!("unknown shape type `{}`", type_name))
                })?;

            let mut node = ShapeNode::new(shape_type);
            self.schema
                .shapes
                .deserialize(&mut node, shape_type.name(), record)?;
            node.set_serialized(!is_marked_disabled(value));
            if self.contains(node.id()) {
                return Err(DiagramError::Malformed(format!("duplicate shape ID {}", node.id())));
            }
            let id = self.insert_node(node, parent);

            match record.get(CHILDREN_KEY) {
                Some(Value::Array(children)) => self.read_shape_records(children, Some(id))?,
                Some(Value::Null) | None => {}
                Some(_) => {
                    return Err(DiagramError::Malformed(format!(
                        "{} of {} is not a list",
                        CHILDREN_KEY, id
                    )));
                }
            }
        }
        Ok(())
    }

    fn warn_dangling_references(&self) {
        for node in self.shapes() {
            let Some(line) = node.line() else {
                continue;
            };
            for end in [line.src_shape(), line.trg_shape()].into_iter().flatten() {
                if !self.contains(end) {
                    log::warn!("Connection {} refers to missing shape {}", node.id(), end);
                }
            }
        }
    }
}
