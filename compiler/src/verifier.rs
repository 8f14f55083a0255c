use std::collections::HashMap;

use crate::{
    types::Header,
    error::FieldGenError,
};

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    InProgress,
    Done,
}

/// Returns `Ok(())` if the header can be flattened: every structure has at
/// least one field, every by-value structure reference names a declared
/// structure, and no structure contains itself directly or transitively.
pub fn verify_header(header: &Header) -> Result<(), FieldGenError> {
    // 1) Empty structures have nothing to enumerate
    for structure in header.iter() {
        if structure.fields.is_empty() {
            return Err(FieldGenError::EmptyStructure(structure.name.clone()));
        }
    }

    // 2) Check that each nested structure is declared
    for structure in header.iter() {
        for field in structure.fields.values() {
            if let Some(ref referenced) = field.struct_ref {
                if header.get(referenced).is_none() {
                    return Err(FieldGenError::UnresolvedReference {
                        structure:  structure.name.clone(),
                        field:      field.name.clone(),
                        referenced: referenced.clone(),
                    });
                }
            }
        }
    }

    // 3) Check that structures do not contain themselves recursively
    fn check_recursion(
        name: &str,
        header: &Header,
        state: &mut HashMap<String, Visit>,
        chain: &mut Vec<String>,
    ) -> Result<(), FieldGenError> {
        let structure = match header.get(name) {
            Some(structure) => structure,
            None => return Ok(()),
        };
        chain.push(name.to_string());
        match state.get(name) {
            Some(Visit::InProgress) => {
                let start = chain.iter().position(|n| n == name).unwrap_or(0);
                return Err(FieldGenError::RecursiveNesting {
                    chain: chain[start..].to_vec(),
                });
            }
            Some(Visit::Done) => {
                chain.pop();
                return Ok(());
            }
            None => {}
        }
        state.insert(name.to_string(), Visit::InProgress);
        for field in structure.fields.values() {
            if let Some(ref referenced) = field.struct_ref {
                check_recursion(referenced, header, state, chain)?;
            }
        }
        state.insert(name.to_string(), Visit::Done);
        chain.pop();
        Ok(())
    }

    let mut state = HashMap::new();
    for structure in header.iter() {
        check_recursion(&structure.name, header, &mut state, &mut Vec::new())?;
    }

    Ok(())
}
