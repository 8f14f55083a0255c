use std::collections::HashMap;

use crate::{
    config::GenConfig,
    error::FieldGenError,
    types::{FieldModel, Header, Structure},
    utils::{constant_name, guard_name, short_name},
};

pub const INVALID_FIELD: &str = "INVALID_FIELD";

/// Suffix of each enum tag. C keeps struct and enum tags in one namespace,
/// so the enum can never reuse the structure's own name.
pub const ENUM_TAG_SUFFIX: &str = "_field";

const GENERATED_NOTICE: &str = "/* Auto-generated by fieldgen. Do not edit. */";

/// Names derived from one structure, shared by all three artifacts so that
/// they agree on every identifier.
struct Names<'a> {
    /// Structure name without the namespace prefix, e.g. `inode`.
    short:  &'a str,
    /// Enum constant prefix without the trailing `_`, e.g. `INODE`.
    prefix: String,
}

impl<'a> Names<'a> {
    fn new(structure: &'a Structure, config: &GenConfig) -> Self {
        let short = short_name(&structure.name, &config.namespace_prefix);
        Names {
            short,
            prefix: short.to_uppercase(),
        }
    }

    fn constant(&self, field: &str) -> String {
        constant_name(&[self.prefix.as_str(), field])
    }

    fn sizes(&self) -> String {
        format!("{}_sizes", self.short)
    }

    fn accessor(&self) -> String {
        format!("{}_enum_to_field", self.short)
    }
}

fn enum_tag(structure: &Structure) -> String {
    format!("{}{}", structure.name, ENUM_TAG_SUFFIX)
}

fn accessor_signature(structure: &Structure, names: &Names) -> String {
    format!(
        "int {}(int ev, struct {} *{}, void **fieldptr, unsigned int *size)",
        names.accessor(),
        structure.name,
        names.short
    )
}

/// Emits one enumeration per structure: the `INVALID_FIELD` sentinel first,
/// then one constant per field in model order.
pub fn emit_enum(structure: &Structure, config: &GenConfig) -> String {
    let names = Names::new(structure, config);
    let mut constants = vec![names.constant(INVALID_FIELD)];
    constants.extend(structure.fields.keys().map(|field| names.constant(field)));

    format!(
        "enum {} {{\n\t{}\n}};\n",
        enum_tag(structure),
        constants.join(",\n\t")
    )
}

/// Emits the size table of one structure, ordered like its enum minus the sentinel.
pub fn emit_size_table(structure: &Structure, config: &GenConfig) -> String {
    let names = Names::new(structure, config);
    let entries: Vec<String> = structure
        .fields
        .values()
        .map(|field| format!("sizeof({})", field.sizeof_operand()))
        .collect();

    format!(
        "const unsigned int {}[] = {{\n\t{}\n}};\n",
        names.sizes(),
        entries.join(",\n\t")
    )
}

/// Emits the accessor of one structure. Every field constant stores the
/// field's address and its size-table entry; anything else, including the
/// sentinel, returns `-EINVAL` without touching the outputs.
pub fn emit_accessor(structure: &Structure, config: &GenConfig) -> String {
    let names = Names::new(structure, config);
    let mut code: Vec<String> = Vec::new();

    code.push(accessor_signature(structure, &names));
    code.push("{".to_string());
    code.push("\tswitch (ev) {".to_string());
    for field in structure.fields.values() {
        let constant = names.constant(&field.name);
        code.push(format!("\tcase {}:", constant));
        code.push(format!("\t\t*fieldptr = &{}->{};", names.short, field.member_access()));
        // The size table has no sentinel entry, hence the - 1.
        code.push(format!("\t\t*size = {}[{} - 1];", names.sizes(), constant));
        code.push("\t\tbreak;".to_string());
    }
    code.push("\tdefault:".to_string());
    code.push("\t\treturn -EINVAL;".to_string());
    code.push("\t}".to_string());
    code.push("\treturn 0;".to_string());
    code.push("}".to_string());

    code.join("\n") + "\n"
}

/// Every C identifier the emitters derive from a header, paired with what
/// produced it. Tags (structures and enums) and ordinary identifiers
/// (constants, size tables, accessors) are separate C namespaces.
struct SymbolTable {
    tags:        HashMap<String, String>,
    identifiers: HashMap<String, String>,
}

impl SymbolTable {
    fn claim_tag(&mut self, symbol: String, owner: String) -> Result<(), FieldGenError> {
        claim(&mut self.tags, symbol, owner)
    }

    fn claim_identifier(&mut self, symbol: String, owner: String) -> Result<(), FieldGenError> {
        claim(&mut self.identifiers, symbol, owner)
    }
}

fn claim(
    seen: &mut HashMap<String, String>,
    symbol: String,
    owner: String,
) -> Result<(), FieldGenError> {
    if let Some(first) = seen.get(&symbol) {
        return Err(FieldGenError::DuplicateSymbol {
            symbol,
            first: first.clone(),
            second: owner,
        });
    }
    seen.insert(symbol, owner);
    Ok(())
}

/// Rejects headers whose generated identifiers would collide, either
/// within one structure (`x` and `X` both give `P_X`) or across structures
/// (`inode.property_inlined` and `inode_property.inlined` both give
/// `INODE_PROPERTY_INLINED`).
pub fn check_symbols(header: &Header, config: &GenConfig) -> Result<(), FieldGenError> {
    let mut table = SymbolTable {
        tags:        HashMap::new(),
        identifiers: HashMap::new(),
    };

    for structure in header.iter() {
        table.claim_tag(structure.name.clone(), format!("structure {}", structure.name))?;
    }

    for structure in header.iter() {
        let names = Names::new(structure, config);
        table.claim_tag(enum_tag(structure), format!("the enum of {}", structure.name))?;
        table.claim_identifier(
            names.constant(INVALID_FIELD),
            format!("the sentinel of {}", structure.name),
        )?;
        for field in structure.fields.keys() {
            table.claim_identifier(names.constant(field), format!("{}.{}", structure.name, field))?;
        }
        table.claim_identifier(names.sizes(), format!("the size table of {}", structure.name))?;
        table.claim_identifier(names.accessor(), format!("the accessor of {}", structure.name))?;
    }

    Ok(())
}

/// Compiles the model into the enum header: include guard, every enum, and
/// declarations of the size tables and accessors defined by the source.
pub fn emit_enum_header(model: &FieldModel, config: &GenConfig) -> String {
    let guard = guard_name(&config.header_name);
    let mut code: Vec<String> = Vec::new();

    code.push(GENERATED_NOTICE.to_string());
    code.push(format!("#ifndef {}", guard));
    code.push(format!("#define {}", guard));
    code.push(String::new());

    for structure in model.iter() {
        code.push(emit_enum(structure, config));
    }

    for structure in model.iter() {
        let names = Names::new(structure, config);
        code.push(format!("struct {};", structure.name));
        code.push(format!(
            "extern const unsigned int {}[{}];",
            names.sizes(),
            structure.fields.len()
        ));
        code.push(format!("{};", accessor_signature(structure, &names)));
        code.push(String::new());
    }

    code.push(format!("#endif /* {} */", guard));
    code.join("\n") + "\n"
}

/// Compiles every structure's size table.
pub fn emit_size_tables(model: &FieldModel, config: &GenConfig) -> String {
    model
        .iter()
        .map(|structure| emit_size_table(structure, config))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compiles every structure's accessor function.
pub fn emit_accessors(model: &FieldModel, config: &GenConfig) -> String {
    model
        .iter()
        .map(|structure| emit_accessor(structure, config))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assembles the source artifact: includes, then the size tables, then the accessors.
pub fn emit_source(size_tables: &str, accessors: &str, config: &GenConfig) -> String {
    let mut code: Vec<String> = Vec::new();

    code.push(GENERATED_NOTICE.to_string());
    for include in &config.includes {
        code.push(format!("#include {}", include));
    }
    code.push(format!("#include \"{}\"", config.struct_header));
    code.push(format!("#include \"{}\"", config.header_name));
    code.push(String::new());
    code.push(size_tables.to_string());
    code.push(accessors.to_string());

    code.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, HeaderBuilder};

    fn point() -> Structure {
        let mut builder = HeaderBuilder::new();
        builder.begin_structure("evfs_point", 1).unwrap();
        builder.push_field(Field::new("x", "int", 1)).unwrap();
        builder.push_field(Field::new("y", "unsigned long", 1)).unwrap();
        builder.finish().structures.swap_remove("evfs_point").unwrap()
    }

    #[test]
    fn test_emit_enum() {
        let expected = "enum evfs_point_field {\n\tPOINT_INVALID_FIELD,\n\tPOINT_X,\n\tPOINT_Y\n};\n";
        assert_eq!(emit_enum(&point(), &GenConfig::default()), expected);
    }

    #[test]
    fn test_emit_size_table() {
        let expected = "const unsigned int point_sizes[] = {\n\tsizeof(int),\n\tsizeof(unsigned long)\n};\n";
        assert_eq!(emit_size_table(&point(), &GenConfig::default()), expected);
    }

    #[test]
    fn test_emit_accessor() {
        let code = emit_accessor(&point(), &GenConfig::default());
        assert!(code.starts_with(
            "int point_enum_to_field(int ev, struct evfs_point *point, void **fieldptr, unsigned int *size)\n{\n"
        ));
        assert!(code.contains("\tcase POINT_X:\n\t\t*fieldptr = &point->x;\n\t\t*size = point_sizes[POINT_X - 1];\n\t\tbreak;\n"));
        assert!(code.contains("\tdefault:\n\t\treturn -EINVAL;\n\t}\n\treturn 0;\n}\n"));
        assert!(!code.contains("POINT_INVALID_FIELD"));
    }

    #[test]
    fn test_names_outside_namespace() {
        let mut builder = HeaderBuilder::new();
        builder.begin_structure("timeval", 1).unwrap();
        builder.push_field(Field::new("tv_sec", "long", 1)).unwrap();
        let timeval = builder.finish().structures.swap_remove("timeval").unwrap();

        let config = GenConfig::default();
        assert!(emit_enum(&timeval, &config).contains("TIMEVAL_INVALID_FIELD,\n\tTIMEVAL_TV_SEC\n"));
        assert!(emit_accessor(&timeval, &config).starts_with("int timeval_enum_to_field("));
    }

    fn parse(input: &str) -> Header {
        let lines = crate::tokenizer::normalize_header(input);
        crate::parser::parse_header(&lines, &[]).unwrap()
    }

    fn duplicate_symbol(input: &str) -> (String, String, String) {
        match check_symbols(&parse(input), &GenConfig::default()) {
            Err(FieldGenError::DuplicateSymbol { symbol, first, second }) => (symbol, first, second),
            other => panic!("expected DuplicateSymbol, got {:?}", other),
        }
    }

    #[test]
    fn test_enum_tag_differs_from_structure_tag() {
        let model = FieldModel::new(parse("struct evfs_point { int x; };"));
        let code = emit_enum_header(&model, &GenConfig::default());
        assert!(code.contains("enum evfs_point_field {"));
        assert!(code.contains("struct evfs_point;"));
        assert!(!code.contains("enum evfs_point {"));
    }

    #[test]
    fn test_check_symbols_case_collision() {
        let (symbol, first, second) = duplicate_symbol("struct evfs_p { int x; long X; };");
        assert_eq!(symbol, "P_X");
        assert_eq!(first, "evfs_p.x");
        assert_eq!(second, "evfs_p.X");
    }

    #[test]
    fn test_check_symbols_sentinel_collision() {
        let (symbol, _, second) = duplicate_symbol("struct evfs_p { int invalid_field; };");
        assert_eq!(symbol, "P_INVALID_FIELD");
        assert_eq!(second, "evfs_p.invalid_field");
    }

    #[test]
    fn test_check_symbols_enum_tag_collision() {
        let (symbol, first, _) =
            duplicate_symbol("struct evfs_p { int x; };\nstruct evfs_p_field { int y; };");
        assert_eq!(symbol, "evfs_p_field");
        assert_eq!(first, "structure evfs_p_field");
    }

    #[test]
    fn test_check_symbols_short_name_collision() {
        // `evfs_p` and `p` both shorten to `p`
        let (symbol, _, _) = duplicate_symbol("struct evfs_p { int x; };\nstruct p { int y; };");
        assert_eq!(symbol, "P_INVALID_FIELD");
    }

    #[test]
    fn test_check_symbols_accepts_distinct_names() {
        let header = parse("struct evfs_p { int x; };\nstruct evfs_q { int x; };");
        assert!(check_symbols(&header, &GenConfig::default()).is_ok());
    }
}
