//! Reflection-free property registry.
//!
//! Each serializable type registers its own named properties once, together
//! with the name of its parent type. At registration the registry computes the
//! type's ordered list of serialization layers (ancestor layers first), so
//! serializing an instance is a flat walk over that list.
//!
//! Accessors are plain function pointers. A property declared without explicit
//! accessors is resolved through [`ConventionalAccess`] the first time it is
//! used, and the result is cached on the property.

mod attribute;

pub use attribute::{Attribute, DISABLED_MARKER, is_marked_disabled};

use crate::error::{PropertyError, PropertyResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

/// Reads a property from an instance.
pub type Getter<T> = fn(&T) -> Attribute;

/// Writes a property into an instance.
pub type Setter<T> = fn(&mut T, &Value) -> PropertyResult<()>;

/// Decode a stored value of `property`.
pub fn decode<T: DeserializeOwned>(property: &'static str, value: &Value) -> PropertyResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| PropertyError::malformed(property, e))
}

/// Implement [`ConventionalAccess::conventional`] for plain public fields.
///
/// Each listed field resolves to a getter serializing it and a setter
/// decoding into it, keyed by the field name.
macro_rules! conventional_fields {
    ($owner:ty; $($field:ident),* $(,)?) => {
        fn conventional(name: &str) -> Option<$crate::property::Accessors<Self>> {
            match name {
                $(stringify!($field) => Some($crate::property::Accessors::new(
                    |n: &$owner| $crate::property::Attribute::of(&n.$field),
                    |n: &mut $owner, v: &serde_json::Value| {
                        n.$field = $crate::property::decode(stringify!($field), v)?;
                        Ok(())
                    },
                )),)*
                _ => None,
            }
        }
    };
}

pub(crate) use conventional_fields;

/// A getter/setter pair, either of which may be absent.
pub struct Accessors<T> {
    pub get: Option<Getter<T>>,
    pub set: Option<Setter<T>>,
}

impl<T> Accessors<T> {
    pub fn new(get: Getter<T>, set: Setter<T>) -> Self {
        Self {
            get: Some(get),
            set: Some(set),
        }
    }

    pub fn none() -> Self {
        Self { get: None, set: None }
    }
}

impl<T> Clone for Accessors<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Accessors<T> {}

impl<T> std::fmt::Debug for Accessors<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessors")
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .finish()
    }
}

/// Name-based accessor lookup used for properties declared without explicit accessors.
///
/// Implementations map a property name to the type's `get_<name>`/`set_<name>` pair.
pub trait ConventionalAccess: Sized + 'static {
    fn conventional(name: &str) -> Option<Accessors<Self>> {
        let _ = name;
        None
    }
}

/// A single declared property.
pub struct Property<T> {
    name: &'static str,
    explicit: Accessors<T>,
    forced: bool,
    resolved: OnceLock<Accessors<T>>,
}

impl<T> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("forced", &self.forced)
            .finish()
    }
}

impl<T: ConventionalAccess> Property<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    fn accessors(&self) -> Accessors<T> {
        *self.resolved.get_or_init(|| {
            let fallback = T::conventional(self.name).unwrap_or_else(Accessors::none);
            Accessors {
                get: self.explicit.get.or(fallback.get),
                set: self.explicit.set.or(fallback.set),
            }
        })
    }

    fn read(&self, type_name: &'static str, instance: &T) -> PropertyResult<Attribute> {
        match self.accessors().get {
            Some(get) => Ok(get(instance)),
            None => Err(PropertyError::MissingGetter {
                type_name,
                property: self.name,
            }),
        }
    }

    fn write(&self, instance: &mut T, value: &Value) -> PropertyResult<()> {
        match self.accessors().set {
            Some(set) => set(instance, value),
            None => {
                log::trace!("Property {} has no setter, value ignored", self.name);
                Ok(())
            }
        }
    }
}

/// Properties contributed by one type in a chain.
#[derive(Debug)]
pub struct Layer<T> {
    type_name: &'static str,
    properties: Vec<Arc<Property<T>>>,
}

impl<T> Layer<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn property_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.properties.iter().map(|p| p.name)
    }
}

impl<T> Clone for Layer<T> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            properties: self.properties.clone(),
        }
    }
}

/// Collects the declarations of one type during registration.
pub struct TypeBuilder<T> {
    name: &'static str,
    own: Vec<Property<T>>,
    excluded: HashSet<&'static str>,
}

impl<T> TypeBuilder<T> {
    /// Declare a property with explicit accessors.
    pub fn property(&mut self, name: &'static str, get: Getter<T>, set: Setter<T>) -> &mut Self {
        self.declare(name, Accessors::new(get, set), false)
    }

    /// Declare a property that is written even when its object value is disabled.
    pub fn forced(&mut self, name: &'static str, get: Getter<T>, set: Setter<T>) -> &mut Self {
        self.declare(name, Accessors::new(get, set), true)
    }

    /// Declare a property that is serialized but never applied on load.
    pub fn read_only(&mut self, name: &'static str, get: Getter<T>) -> &mut Self {
        self.declare(
            name,
            Accessors {
                get: Some(get),
                set: None,
            },
            false,
        )
    }

    /// Declare a property resolved through [`ConventionalAccess`].
    pub fn conventional(&mut self, name: &'static str) -> &mut Self {
        self.declare(name, Accessors::none(), false)
    }

    /// Suppress an inherited property for this type and its descendants.
    pub fn exclude(&mut self, name: &'static str) -> &mut Self {
        self.excluded.insert(name);
        self
    }

    fn declare(&mut self, name: &'static str, explicit: Accessors<T>, forced: bool) -> &mut Self {
        if self.own.iter().any(|p| p.name == name) {
            panic!("duplicate property `{}` declared on `{}`", name, self.name);
        }
        self.own.push(Property {
            name,
            explicit,
            forced,
            resolved: OnceLock::new(),
        });
        self
    }
}

#[derive(Debug)]
struct TypeEntry<T> {
    parent: Option<&'static str>,
    layers: Vec<Layer<T>>,
}

/// Registry of serializable types over instances of `T`.
#[derive(Debug)]
pub struct PropertyRegistry<T> {
    types: HashMap<&'static str, TypeEntry<T>>,
}

impl<T> Default for PropertyRegistry<T> {
    fn default() -> Self {
        Self {
            types: HashMap::new(),
        }
    }
}

impl<T: ConventionalAccess> PropertyRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type and its own properties.
    ///
    /// # Panics
    ///
    /// Panics when the type is already registered, when `parent` is not
    /// registered yet, or when a property name is declared twice along the chain.
    pub fn register(
        &mut self,
        name: &'static str,
        parent: Option<&'static str>,
        declare: impl FnOnce(&mut TypeBuilder<T>),
    ) -> &mut Self {
        if self.types.contains_key(name) {
            panic!("type `{}` registered twice", name);
        }

        let mut builder = TypeBuilder {
            name,
            own: Vec::new(),
            excluded: HashSet::new(),
        };
        declare(&mut builder);

        let mut layers: Vec<Layer<T>> = match parent {
            Some(parent_name) => match self.types.get(parent_name) {
                Some(entry) => entry.layers.clone(),
                None => panic!("parent type `{}` of `{}` is not registered", parent_name, name),
            },
            None => Vec::new(),
        };

        for layer in &mut layers {
            layer
                .properties
                .retain(|p| !builder.excluded.contains(p.name));
        }

        for property in &builder.own {
            let inherited = layers
                .iter()
                .any(|layer| layer.properties.iter().any(|p| p.name == property.name));
            if inherited {
                panic!(
                    "property `{}` on `{}` duplicates an inherited declaration",
                    property.name, name
                );
            }
        }

        layers.push(Layer {
            type_name: name,
            properties: builder.own.into_iter().map(Arc::new).collect(),
        });

        log::debug!("Registered serializable type {} ({} layers)", name, layers.len());
        self.types.insert(name, TypeEntry { parent, layers });
        self
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Whether `name` is `ancestor` or derives from it.
    pub fn is_kind_of(&self, name: &str, ancestor: &str) -> bool {
        let mut current = Some(name);
        while let Some(type_name) = current {
            if type_name == ancestor {
                return true;
            }
            current = self.types.get(type_name).and_then(|e| e.parent);
        }
        false
    }

    /// Serialization layers of a type, ancestors first.
    pub fn layers(&self, name: &str) -> Option<&[Layer<T>]> {
        self.types.get(name).map(|e| e.layers.as_slice())
    }

    /// All effective property names of a type, in serialization order.
    pub fn property_names(&self, name: &str) -> Vec<&'static str> {
        self.layers(name)
            .map(|layers| layers.iter().flat_map(|l| l.property_names()).collect())
            .unwrap_or_default()
    }

    /// Serialize `instance` as a record of type `name`, skipping `excludes`.
    pub fn serialize(
        &self,
        instance: &T,
        name: &str,
        excludes: &[&str],
    ) -> PropertyResult<Map<String, Value>> {
        let layers = self
            .layers(name)
            .ok_or_else(|| PropertyError::UnknownType(name.to_string()))?;

        let mut record = Map::new();
        for layer in layers {
            for property in &layer.properties {
                if excludes.contains(&property.name) {
                    continue;
                }
                let attribute = property.read(layer.type_name, instance)?;
                if let Some(value) = attribute.encode(property.forced) {
                    record.insert(property.name.to_string(), value);
                }
            }
        }
        Ok(record)
    }

    /// Apply a record to `instance`. Keys not declared for the type are ignored.
    pub fn deserialize(
        &self,
        instance: &mut T,
        name: &str,
        record: &Map<String, Value>,
    ) -> PropertyResult<()> {
        let layers = self
            .layers(name)
            .ok_or_else(|| PropertyError::UnknownType(name.to_string()))?;

        for layer in layers {
            for property in &layer.properties {
                if let Some(value) = record.get(property.name) {
                    property.write(instance, value)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Item {
        value: i64,
        enabled: bool,
    }

    #[derive(Debug, Default)]
    struct Node {
        id: u32,
        label: String,
        width: f64,
        secret: String,
        item: Item,
        items: Vec<Item>,
    }

    impl Node {
        fn get_label(node: &Node) -> Attribute {
            Attribute::of(&node.label)
        }

        fn set_label(node: &mut Node, value: &Value) -> PropertyResult<()> {
            node.label = serde_json::from_value(value.clone())
                .map_err(|e| PropertyError::malformed("label", e))?;
            Ok(())
        }
    }

    impl ConventionalAccess for Node {
        fn conventional(name: &str) -> Option<Accessors<Self>> {
            match name {
                "label" => Some(Accessors::new(Node::get_label, Node::set_label)),
                _ => None,
            }
        }
    }

    fn item_attribute(item: &Item) -> Attribute {
        Attribute::object(item.enabled, &json!({ "value": item.value }))
    }

    fn registry() -> PropertyRegistry<Node> {
        let mut registry = PropertyRegistry::<Node>::new();
        registry
            .register("Base", None, |t| {
                t.property(
                    "id",
                    |n| Attribute::of(&n.id),
                    |n, v| {
                        n.id = serde_json::from_value(v.clone())
                            .map_err(|e| PropertyError::malformed("id", e))?;
                        Ok(())
                    },
                );
                t.conventional("label");
            })
            .register("Sized", Some("Base"), |t| {
                t.property(
                    "width",
                    |n| Attribute::of(&n.width),
                    |n, v| {
                        n.width = v.as_f64().unwrap_or_default();
                        Ok(())
                    },
                );
                t.read_only("secret", |n| Attribute::of(&n.secret));
            })
            .register("Unlabeled", Some("Sized"), |t| {
                t.exclude("label");
            })
            .register("Items", Some("Base"), |t| {
                t.property("item", |n| item_attribute(&n.item), |_, _| Ok(()));
                t.forced("forced_item", |n| item_attribute(&n.item), |_, _| Ok(()));
                t.property(
                    "items",
                    |n| Attribute::sequence(n.items.iter().map(item_attribute)),
                    |_, _| Ok(()),
                );
            });
        registry
    }

    #[test]
    fn test_ancestor_properties_first() {
        let registry = registry();
        assert_eq!(
            registry.property_names("Sized"),
            vec!["id", "label", "width", "secret"]
        );

        let node = Node {
            id: 7,
            label: "a".into(),
            width: 2.5,
            ..Default::default()
        };
        let record = registry.serialize(&node, "Sized", &[]).unwrap();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "label", "width", "secret"]);
        assert_eq!(record["label"], "a");
    }

    #[test]
    fn test_exclusion_does_not_leak_to_siblings() {
        let registry = registry();
        assert_eq!(registry.property_names("Unlabeled"), vec!["id", "width", "secret"]);
        assert!(registry.property_names("Sized").contains(&"label"));
        assert!(registry.property_names("Items").contains(&"label"));
    }

    #[test]
    fn test_caller_excludes() {
        let registry = registry();
        let record = registry
            .serialize(&Node::default(), "Sized", &["width", "id"])
            .unwrap();
        assert!(!record.contains_key("width"));
        assert!(!record.contains_key("id"));
        assert!(record.contains_key("label"));
    }

    #[test]
    fn test_round_trip_with_conventional_accessor() {
        let registry = registry();
        let node = Node {
            id: 3,
            label: "hello".into(),
            width: 10.0,
            ..Default::default()
        };
        let record = registry.serialize(&node, "Sized", &[]).unwrap();

        let mut restored = Node::default();
        registry.deserialize(&mut restored, "Sized", &record).unwrap();
        assert_eq!(restored.id, 3);
        assert_eq!(restored.label, "hello");
        assert!((restored.width - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_only_and_unknown_keys_ignored() {
        let registry = registry();
        let record = json!({ "secret": "x", "unknown": 1, "width": 4.0 });
        let mut node = Node::default();
        registry
            .deserialize(&mut node, "Sized", record.as_object().unwrap())
            .unwrap();
        assert!(node.secret.is_empty());
        assert!((node.width - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disabled_objects_filtered() {
        let registry = registry();
        let node = Node {
            item: Item {
                value: 1,
                enabled: false,
            },
            items: vec![
                Item {
                    value: 2,
                    enabled: true,
                },
                Item {
                    value: 3,
                    enabled: false,
                },
            ],
            ..Default::default()
        };
        let record = registry.serialize(&node, "Items", &[]).unwrap();
        assert!(!record.contains_key("item"));
        assert!(is_marked_disabled(&record["forced_item"]));
        assert_eq!(record["items"], json!([{ "value": 2 }]));
    }

    #[test]
    fn test_missing_getter_fails() {
        let mut registry = PropertyRegistry::<Node>::new();
        registry.register("Broken", None, |t| {
            t.conventional("nothing");
        });
        let err = registry.serialize(&Node::default(), "Broken", &[]).unwrap_err();
        assert!(matches!(err, PropertyError::MissingGetter { property: "nothing", .. }));

        // Writes through a missing setter are silently dropped.
        let record = json!({ "nothing": 1 });
        let mut node = Node::default();
        assert!(
            registry
                .deserialize(&mut node, "Broken", record.as_object().unwrap())
                .is_ok()
        );
    }

    #[test]
    fn test_unknown_type() {
        let registry = registry();
        assert!(matches!(
            registry.serialize(&Node::default(), "Nope", &[]),
            Err(PropertyError::UnknownType(_))
        ));
    }

    #[test]
    #[should_panic(expected = "duplicate property")]
    fn test_duplicate_declaration_panics() {
        let mut registry = PropertyRegistry::<Node>::new();
        registry.register("Twice", None, |t| {
            t.conventional("label");
            t.conventional("label");
        });
    }

    #[test]
    #[should_panic(expected = "duplicates an inherited declaration")]
    fn test_redeclaring_inherited_panics() {
        let mut registry = registry();
        registry.register("Again", Some("Base"), |t| {
            t.conventional("label");
        });
    }

    #[test]
    fn test_is_kind_of() {
        let registry = registry();
        assert!(registry.is_kind_of("Unlabeled", "Base"));
        assert!(registry.is_kind_of("Sized", "Sized"));
        assert!(!registry.is_kind_of("Items", "Sized"));
    }
}
