//! Checking dynamic values against shape trees.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::{Error, Result};
use crate::shape::{Container, RecordSchema, ShapeId, ShapeTree};
use crate::value::Value;

/// Check `value` against `tree`, converting where the encoding lost
/// information (base64 bytes in JSON, integral floats).
///
/// Fields a record schema does not declare are dropped. Errors name the path
/// of the offending value, e.g. `$[3].owner.id`.
pub fn conform(value: Value, tree: &ShapeTree) -> Result<Value> {
    conform_at(value, tree, "$")
}

fn conform_at(value: Value, tree: &ShapeTree, path: &str) -> Result<Value> {
    match tree {
        ShapeTree::Leaf(id) => conform_leaf(value, id, path),
        ShapeTree::Node { container, args } => {
            if args.len() != container.arity() {
                return Err(Error::deserialization(format!(
                    "under-specified shape at {}: {:?} needs {} type argument(s), descriptor gives {}",
                    path,
                    container,
                    container.arity(),
                    args.len()
                )));
            }
            match (container, value) {
                (Container::Optional, Value::Null) => Ok(Value::Null),
                (Container::Optional, value) => conform_at(value, &args[0], path),
                (Container::List | Container::Set, Value::Array(items)) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| conform_at(item, &args[0], &format!("{}[{}]", path, i)))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array),
                (Container::Map, Value::Object(fields)) => {
                    if args[0] != ShapeTree::Leaf(ShapeId::Text) {
                        return Err(Error::deserialization(format!(
                            "map keys at {} must be Text, descriptor gives {}",
                            path,
                            args[0].describe()
                        )));
                    }
                    fields
                        .into_iter()
                        .map(|(k, v)| {
                            let child = format!("{}.{}", path, k);
                            conform_at(v, &args[1], &child).map(|v| (k, v))
                        })
                        .collect::<Result<HashMap<_, _>>>()
                        .map(Value::Object)
                }
                (_, other) => Err(mismatch(&tree.describe(), &other, path)),
            }
        }
    }
}

fn conform_leaf(value: Value, id: &ShapeId, path: &str) -> Result<Value> {
    match (id, value) {
        (ShapeId::Bool, v @ Value::Bool(_))
        | (ShapeId::Int, v @ Value::Int(_))
        | (ShapeId::Float, v @ Value::Float(_))
        | (ShapeId::Text, v @ Value::String(_))
        | (ShapeId::Bytes, v @ Value::Bytes(_)) => Ok(v),
        (ShapeId::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (ShapeId::Bytes, Value::String(s)) => BASE64
            .decode(s.as_bytes())
            .map(Value::Bytes)
            .map_err(|e| Error::deserialization(format!("invalid base64 at {}: {}", path, e))),
        (ShapeId::Bytes, Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Int(b) => u8::try_from(*b).ok(),
                _ => None,
            })
            .collect::<Option<Vec<u8>>>()
            .map(Value::Bytes)
            .ok_or_else(|| Error::deserialization(format!("expected byte array at {}", path))),
        (ShapeId::Record(schema), Value::Object(fields)) => conform_record(fields, schema, path),
        (id, other) => Err(mismatch(id.name(), &other, path)),
    }
}

fn conform_record(
    mut fields: HashMap<String, Value>,
    schema: &RecordSchema,
    path: &str,
) -> Result<Value> {
    let mut out = HashMap::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let child = format!("{}.{}", path, field.name);
        let value = match fields.remove(&field.name) {
            None | Some(Value::Null) if field.optional => Value::Null,
            None => {
                return Err(Error::deserialization(format!(
                    "missing field {} of {}",
                    child, schema.name
                )))
            }
            Some(v) => conform_at(v, &field.shape, &child)?,
        };
        out.insert(field.name.clone(), value);
    }
    Ok(Value::Object(out))
}

fn mismatch(expected: &str, found: &Value, path: &str) -> Error {
    Error::deserialization(format!(
        "expected {} at {}, found {}",
        expected,
        path,
        found.type_name()
    ))
}
