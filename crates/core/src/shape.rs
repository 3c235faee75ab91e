//! Shape descriptions for runtime-directed decoding.
//!
//! A [`TypeDescriptor`] tells the value codec what a stored payload must
//! decode to:
//!
//! - `Raw`: hand back the payload bytes untouched
//! - `Simple(ShapeId)`: one flat shape (`Int`, `Text`, a named record, ...)
//! - `Parameterized(ShapeTree)`: a container whose every type argument is
//!   spelled out (`List<Foo>`, `Map<Text, List<Int>>`, ...)
//!
//! Containers built through [`ShapeTree::node`] or
//! [`TypeDescriptor::parameterized`] are arity-checked up front. A tree built
//! by hand (or deserialized) with missing arguments is rejected when it is used
//! for decoding.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A flat value shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeId {
    /// `true` / `false`
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float; integers are accepted and widened
    Float,
    /// UTF-8 text
    Text,
    /// Binary data
    Bytes,
    /// A named record with declared fields
    Record(RecordSchema),
}

impl ShapeId {
    /// Short name used in error messages.
    pub fn name(&self) -> &str {
        match self {
            ShapeId::Bool => "Bool",
            ShapeId::Int => "Int",
            ShapeId::Float => "Float",
            ShapeId::Text => "Text",
            ShapeId::Bytes => "Bytes",
            ShapeId::Record(schema) => &schema.name,
        }
    }
}

/// Declared fields of a record shape.
///
/// Fields present in a payload but not declared here are ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Record name, e.g. `"User"`
    pub name: String,
    /// Declared fields in declaration order
    pub fields: Vec<FieldSchema>,
}

/// One declared record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name as it appears in the payload
    pub name: String,
    /// Expected shape of the field value
    pub shape: ShapeTree,
    /// Whether the field may be absent or null
    #[serde(default)]
    pub optional: bool,
}

impl RecordSchema {
    /// Start a record with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a required field.
    pub fn field(mut self, name: impl Into<String>, shape: impl Into<ShapeTree>) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            shape: shape.into(),
            optional: false,
        });
        self
    }

    /// Add a field that may be missing or null.
    pub fn optional_field(mut self, name: impl Into<String>, shape: impl Into<ShapeTree>) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            shape: shape.into(),
            optional: true,
        });
        self
    }
}

/// Generic containers that take type arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    /// Ordered sequence, one argument (element)
    List,
    /// Unordered collection, one argument (member)
    Set,
    /// String-keyed map, two arguments (key, value); the key must be `Text`
    Map,
    /// Nullable value, one argument
    Optional,
}

impl Container {
    /// Number of type arguments this container requires.
    pub fn arity(self) -> usize {
        match self {
            Container::List | Container::Set | Container::Optional => 1,
            Container::Map => 2,
        }
    }
}

/// A fully nested shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeTree {
    /// A flat shape
    Leaf(ShapeId),
    /// A container with its type arguments
    Node {
        /// Outer container
        container: Container,
        /// Type arguments, `container.arity()` of them
        args: Vec<ShapeTree>,
    },
}

impl ShapeTree {
    /// Build a container node, checking its arity.
    pub fn node(container: Container, args: Vec<ShapeTree>) -> Result<Self> {
        if args.len() != container.arity() {
            return Err(Error::usage(format!(
                "{:?} takes {} type argument(s), got {}",
                container,
                container.arity(),
                args.len()
            )));
        }
        Ok(ShapeTree::Node { container, args })
    }

    /// `List<element>`
    pub fn list(element: impl Into<ShapeTree>) -> Self {
        ShapeTree::Node {
            container: Container::List,
            args: vec![element.into()],
        }
    }

    /// `Set<member>`
    pub fn set(member: impl Into<ShapeTree>) -> Self {
        ShapeTree::Node {
            container: Container::Set,
            args: vec![member.into()],
        }
    }

    /// `Map<key, value>`
    pub fn map(key: impl Into<ShapeTree>, value: impl Into<ShapeTree>) -> Self {
        ShapeTree::Node {
            container: Container::Map,
            args: vec![key.into(), value.into()],
        }
    }

    /// `Optional<inner>`
    pub fn optional(inner: impl Into<ShapeTree>) -> Self {
        ShapeTree::Node {
            container: Container::Optional,
            args: vec![inner.into()],
        }
    }

    /// Render the tree as `List<Map<Text, Int>>`.
    pub fn describe(&self) -> String {
        match self {
            ShapeTree::Leaf(id) => id.name().to_string(),
            ShapeTree::Node { container, args } => {
                let inner: Vec<String> = args.iter().map(ShapeTree::describe).collect();
                format!("{:?}<{}>", container, inner.join(", "))
            }
        }
    }
}

impl From<ShapeId> for ShapeTree {
    fn from(id: ShapeId) -> Self {
        ShapeTree::Leaf(id)
    }
}

impl From<RecordSchema> for ShapeTree {
    fn from(schema: RecordSchema) -> Self {
        ShapeTree::Leaf(ShapeId::Record(schema))
    }
}

/// What a payload should decode to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// Return the stored bytes unchanged
    Raw,
    /// Decode exactly one flat value
    Simple(ShapeId),
    /// Decode a container, checking every nested shape
    Parameterized(ShapeTree),
}

impl TypeDescriptor {
    /// Descriptor for a container with the given type arguments.
    ///
    /// Fails with `Usage` when an argument is missing or extra.
    pub fn parameterized(container: Container, args: Vec<ShapeTree>) -> Result<Self> {
        ShapeTree::node(container, args).map(TypeDescriptor::Parameterized)
    }

    /// Pick `Simple` or `Parameterized` based on the tree's root.
    pub fn of(tree: ShapeTree) -> Self {
        match tree {
            ShapeTree::Leaf(id) => TypeDescriptor::Simple(id),
            node => TypeDescriptor::Parameterized(node),
        }
    }
}

impl From<ShapeId> for TypeDescriptor {
    fn from(id: ShapeId) -> Self {
        TypeDescriptor::Simple(id)
    }
}
