use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    types::{Field, Header, Structure},
    verifier::verify_header,
    error::FieldGenError,
};

/// Replaces every by-value structure field with the leaf fields of the
/// structure it names, recursively.
///
/// A field `atime` of type `struct evfs_timeval { long tv_sec; long tv_usec; }`
/// becomes `atime_tv_sec` and `atime_tv_usec`, in place of `atime`, with member
/// paths `atime.tv_sec` and `atime.tv_usec`. Each referenced structure is
/// flattened once and reused. The result holds no `struct_ref`, so flattening
/// it again returns an equal header.
///
/// The header is verified first, so resolution only ever follows references
/// to declared structures along an acyclic graph.
pub fn flatten_header(header: &Header) -> Result<Header, FieldGenError> {
    verify_header(header)?;

    let mut resolved: HashMap<String, Structure> = HashMap::new();
    for structure in header.iter() {
        resolve(&structure.name, header, &mut resolved)?;
    }

    let mut structures = IndexMap::with_capacity(header.len());
    for structure in header.iter() {
        if let Some(flat) = resolved.remove(&structure.name) {
            structures.insert(structure.name.clone(), flat);
        }
    }
    Ok(Header { structures })
}

fn resolve(
    name: &str,
    header: &Header,
    resolved: &mut HashMap<String, Structure>,
) -> Result<(), FieldGenError> {
    if resolved.contains_key(name) {
        return Ok(());
    }
    let structure = match header.get(name) {
        Some(structure) => structure,
        None => return Ok(()),
    };

    let mut fields: IndexMap<String, Field> = IndexMap::with_capacity(structure.fields.len());

    for field in structure.fields.values() {
        let referenced = match field.struct_ref {
            Some(ref referenced) => referenced,
            None => {
                insert_unique(&mut fields, structure, field.clone())?;
                continue;
            }
        };
        resolve(referenced, header, resolved)?;
        let nested = match resolved.get(referenced) {
            Some(nested) => nested,
            None => continue,
        };
        for leaf in nested.fields.values() {
            let mut path = Vec::with_capacity(leaf.path.len() + 1);
            path.push(field.name.clone());
            path.extend(leaf.path.iter().cloned());

            let flat = Field {
                name: format!("{}_{}", field.name, leaf.name),
                line: field.line,
                type_text: leaf.type_text.clone(),
                struct_ref: None,
                array_len: leaf.array_len.clone(),
                path,
            };
            debug!(structure = %structure.name, field = %flat.name, "flattened nested field");
            insert_unique(&mut fields, structure, flat)?;
        }
    }

    resolved.insert(
        name.to_string(),
        Structure {
            name: structure.name.clone(),
            line: structure.line,
            fields,
        },
    );
    Ok(())
}

fn insert_unique(
    fields: &mut IndexMap<String, Field>,
    owner: &Structure,
    field: Field,
) -> Result<(), FieldGenError> {
    if fields.contains_key(&field.name) {
        return Err(FieldGenError::DuplicateField {
            structure: owner.name.clone(),
            field:     field.name,
        });
    }
    fields.insert(field.name.clone(), field);
    Ok(())
}
