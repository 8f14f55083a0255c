use indexmap::IndexMap;
use serde::Serialize;

use crate::error::FieldGenError;

/// All structures of one header, in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub structures: IndexMap<String, Structure>,
}

/// One `struct <name> { ... }` block. Field order is the order of the
/// generated enum constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Structure {
    pub name:   String,
    pub line:   usize,
    pub fields: IndexMap<String, Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:       String,
    pub line:       usize,
    /// Declared type with the identifier removed, e.g. `unsigned long` or `char *`.
    pub type_text:  String,
    /// Tag of a by-value structure type, still waiting to be flattened.
    pub struct_ref: Option<String>,
    /// Text between the brackets of a primitive array declarator.
    pub array_len:  Option<String>,
    /// Member path from the owning structure down to this leaf.
    pub path:       Vec<String>,
}

impl Field {
    pub fn new(name: &str, type_text: &str, line: usize) -> Self {
        Field {
            name:       name.to_string(),
            line,
            type_text:  type_text.to_string(),
            struct_ref: None,
            array_len:  None,
            path:       vec![name.to_string()],
        }
    }

    /// Operand of the `sizeof` expression for this field.
    pub fn sizeof_operand(&self) -> String {
        match &self.array_len {
            Some(len) => format!("{}[{}]", self.type_text, len),
            None => self.type_text.clone(),
        }
    }

    /// C member access expression relative to a structure instance.
    pub fn member_access(&self) -> String {
        self.path.join(".")
    }
}

impl Header {
    pub fn get(&self, name: &str) -> Option<&Structure> {
        self.structures.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Structure> {
        self.structures.values()
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }
}

/// A verified, fully flattened header: every field is a leaf. Only the
/// compiler pipeline builds one, and emitters only accept this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldModel {
    header: Header,
}

impl FieldModel {
    pub(crate) fn new(header: Header) -> Self {
        FieldModel { header }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn iter(&self) -> impl Iterator<Item = &Structure> {
        self.header.iter()
    }
}

/// Accumulates structures and fields while parsing. The finished `Header`
/// is never mutated again; later stages build new values from it.
#[derive(Debug, Default)]
pub struct HeaderBuilder {
    structures: IndexMap<String, Structure>,
    current:    Option<String>,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new structure; following fields belong to it.
    pub fn begin_structure(&mut self, name: &str, line: usize) -> Result<(), FieldGenError> {
        if self.structures.contains_key(name) {
            return Err(FieldGenError::DuplicateStructure(name.to_string()));
        }
        self.structures.insert(
            name.to_string(),
            Structure {
                name: name.to_string(),
                line,
                fields: IndexMap::new(),
            },
        );
        self.current = Some(name.to_string());
        Ok(())
    }

    pub fn push_field(&mut self, field: Field) -> Result<(), FieldGenError> {
        let structure = self
            .current
            .as_ref()
            .and_then(|name| self.structures.get_mut(name))
            .ok_or_else(|| FieldGenError::ParseError {
                msg:    format!("Field \"{}\" is declared outside of a structure block", field.name),
                line:   field.line,
                column: 1,
            })?;

        if structure.fields.contains_key(&field.name) {
            return Err(FieldGenError::DuplicateField {
                structure: structure.name.clone(),
                field:     field.name,
            });
        }
        structure.fields.insert(field.name.clone(), field);
        Ok(())
    }

    pub fn finish(self) -> Header {
        Header {
            structures: self.structures,
        }
    }
}
