//! Schema definition types.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use strata_core::Value;

/// Category of an attribute type, used to decide which update paths apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Primitive,
    Enum,
    ObjectId,
    Array,
    Map,
}

/// The declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrType {
    String,
    Int,
    Long,
    Short,
    Float,
    Double,
    Boolean,
    Date,
    /// Enumeration, by enum definition name.
    Enum(String),
    /// Reference to an entity of the named type (or a subtype).
    ObjectId(String),
    Array(Box<AttrType>),
    /// String-keyed map with values of the given type.
    Map(Box<AttrType>),
}

impl AttrType {
    pub fn object_id(type_name: impl Into<String>) -> Self {
        AttrType::ObjectId(type_name.into())
    }

    pub fn array(element: AttrType) -> Self {
        AttrType::Array(Box::new(element))
    }

    pub fn map(value: AttrType) -> Self {
        AttrType::Map(Box::new(value))
    }

    /// Parse a primitive or container type name (`string`, `array<int>`,
    /// `map<string,long>`). Entity and enum references are not parsed here.
    pub fn parse_builtin(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(inner) = name.strip_prefix("array<").and_then(|s| s.strip_suffix('>')) {
            return Self::parse_builtin(inner).map(Self::array);
        }
        if let Some(inner) = name.strip_prefix("map<").and_then(|s| s.strip_suffix('>')) {
            let (key, value) = inner.split_once(',')?;
            if key.trim() != "string" {
                return None;
            }
            return Self::parse_builtin(value).map(Self::map);
        }
        match name {
            "string" => Some(AttrType::String),
            "int" => Some(AttrType::Int),
            "long" => Some(AttrType::Long),
            "short" => Some(AttrType::Short),
            "float" => Some(AttrType::Float),
            "double" => Some(AttrType::Double),
            "boolean" => Some(AttrType::Boolean),
            "date" => Some(AttrType::Date),
            _ => None,
        }
    }

    pub fn category(&self) -> TypeCategory {
        match self {
            AttrType::Enum(_) => TypeCategory::Enum,
            AttrType::ObjectId(_) => TypeCategory::ObjectId,
            AttrType::Array(_) => TypeCategory::Array,
            AttrType::Map(_) => TypeCategory::Map,
            _ => TypeCategory::Primitive,
        }
    }

    /// Element type for arrays.
    pub fn element_type(&self) -> Option<&AttrType> {
        match self {
            AttrType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// True for the integral numeric types.
    pub fn is_integral(&self) -> bool {
        matches!(self, AttrType::Int | AttrType::Long | AttrType::Short)
    }

    /// True for the floating point types.
    pub fn is_floating(&self) -> bool {
        matches!(self, AttrType::Float | AttrType::Double)
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::String => write!(f, "string"),
            AttrType::Int => write!(f, "int"),
            AttrType::Long => write!(f, "long"),
            AttrType::Short => write!(f, "short"),
            AttrType::Float => write!(f, "float"),
            AttrType::Double => write!(f, "double"),
            AttrType::Boolean => write!(f, "boolean"),
            AttrType::Date => write!(f, "date"),
            AttrType::Enum(name) | AttrType::ObjectId(name) => write!(f, "{}", name),
            AttrType::Array(element) => write!(f, "array<{}>", element),
            AttrType::Map(value) => write!(f, "map<string,{}>", value),
        }
    }
}

/// Attribute definition within a type.
#[derive(Debug, Clone)]
pub struct AttrDef {
    /// Attribute name.
    pub name: String,
    /// Declared type.
    pub attr_type: AttrType,
    /// Whether a value may be omitted.
    pub optional: bool,
    /// Whether the value identifies the entity within its type.
    pub unique: bool,
    /// Default value if not provided.
    pub default: Option<Value>,
    /// Maximum string length (business attributes).
    pub max_length: Option<usize>,
}

impl AttrDef {
    pub fn new(name: impl Into<String>, attr_type: AttrType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            optional: true,
            unique: false,
            default: None,
            max_length: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    /// Unique attributes are always required.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.optional = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// A relationship attribute: an object reference backed by a named relationship.
#[derive(Debug, Clone)]
pub struct RelationshipAttrDef {
    pub name: String,
    pub relationship_type: String,
    /// `ObjectId(..)` or `Array(ObjectId(..))`.
    pub attr_type: AttrType,
    /// The referenced entities are owned by the holder and are deleted with it.
    pub composite: bool,
}

/// Entity type definition.
#[derive(Debug, Clone)]
pub struct EntityTypeDef {
    pub name: String,
    pub supertypes: Vec<String>,
    pub attributes: HashMap<String, AttrDef>,
    pub relationship_attributes: HashMap<String, RelationshipAttrDef>,
}

impl EntityTypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            attributes: HashMap::new(),
            relationship_attributes: HashMap::new(),
        }
    }
}

/// Classification type definition.
#[derive(Debug, Clone)]
pub struct ClassificationTypeDef {
    pub name: String,
    pub supertypes: Vec<String>,
    pub attributes: HashMap<String, AttrDef>,
    /// Entity types this classification may be applied to; empty means any.
    pub entity_types: BTreeSet<String>,
}

/// A business attribute within a business-metadata namespace.
#[derive(Debug, Clone)]
pub struct BusinessAttrDef {
    pub namespace: String,
    pub attr: AttrDef,
    /// Entity types the attribute applies to; empty means any.
    pub applicable_entity_types: BTreeSet<String>,
}

impl BusinessAttrDef {
    pub fn name(&self) -> &str {
        &self.attr.name
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.attr.name)
    }

    /// Length check; strings are checked against `max_length`, arrays element-wise.
    pub fn is_valid_length(&self, value: &Value, default_max: usize) -> bool {
        let max = self.attr.max_length.unwrap_or(default_max);
        fn check(value: &Value, max: usize) -> bool {
            match value {
                Value::String(s) => s.chars().count() <= max,
                Value::List(items) => items.iter().all(|v| check(v, max)),
                _ => true,
            }
        }
        check(value, max)
    }
}

/// Business-metadata namespace definition.
#[derive(Debug, Clone)]
pub struct BusinessMetadataDef {
    pub name: String,
    pub attributes: HashMap<String, BusinessAttrDef>,
}

/// Enumeration definition.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumDef {
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// Precomputed transitive supertype relationships, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct SupertypeIndex {
    supertypes: HashMap<String, HashSet<String>>,
}

impl SupertypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from each type's direct supertypes.
    pub fn build<'a>(direct: impl Iterator<Item = (&'a String, &'a Vec<String>)>) -> Self {
        let direct: HashMap<&String, &Vec<String>> = direct.collect();
        let mut index = Self::new();

        for &name in direct.keys() {
            let mut all = HashSet::new();
            let mut pending: Vec<&String> = direct.get(name).map(|p| p.iter().collect()).unwrap_or_default();
            while let Some(parent) = pending.pop() {
                if all.insert(parent.clone()) {
                    if let Some(grand) = direct.get(parent) {
                        pending.extend(grand.iter());
                    }
                }
            }
            index.supertypes.insert(name.clone(), all);
        }

        index
    }

    /// All supertypes of a type (not including the type itself).
    pub fn supertypes_of(&self, name: &str) -> impl Iterator<Item = &String> + '_ {
        self.supertypes.get(name).into_iter().flatten()
    }

    /// Check if `sub` is `super_type` or one of its subtypes.
    pub fn is_subtype_or_self(&self, sub: &str, super_type: &str) -> bool {
        sub == super_type
            || self
                .supertypes
                .get(sub)
                .map(|s| s.contains(super_type))
                .unwrap_or(false)
    }
}
