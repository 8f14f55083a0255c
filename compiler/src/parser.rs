use std::collections::HashSet;

use tracing::debug;

use crate::{
    tokenizer::{tokenize_statement, Line, Token},
    types::{Field, Header, HeaderBuilder},
    utils::{error, quote},
    error::FieldGenError,
};

pub const STRUCT_KEYWORD: &str = "struct";
pub const CONST_KEYWORD:  &str = "const";

/// Primitive type keywords and qualifiers accepted in field declarations.
pub const TYPE_KEYWORDS: [&str; 11] = [
    "const", "struct", "unsigned", "signed", "long", "int", "short", "char", "double", "float", "void",
];

/// Lines of one structure block, before classification.
#[derive(Debug)]
struct Block<'a> {
    name:  String,
    line:  usize,
    lines: Vec<&'a Line>,
}

/// Parses normalized lines into a `Header`.
///
/// Runs in two passes: the first collects every structure block so that all
/// structure names are known, the second classifies each field line against
/// the keyword set, `extra_types` and those names. Forward references to
/// structures declared later in the file therefore classify the same way as
/// backward ones.
pub fn parse_header(lines: &[Line], extra_types: &[String]) -> Result<Header, FieldGenError> {
    let blocks = extract_blocks(lines)?;

    let structure_names: HashSet<&str> = blocks.iter().map(|b| b.name.as_str()).collect();
    let mut primitives: HashSet<&str> = TYPE_KEYWORDS.iter().copied().collect();
    primitives.extend(extra_types.iter().map(String::as_str));

    let mut builder = HeaderBuilder::new();
    for block in &blocks {
        builder.begin_structure(&block.name, block.line)?;
        for line in &block.lines {
            let field = classify_field(line, &primitives, &structure_names)?;
            builder.push_field(field)?;
        }
        debug!(structure = %block.name, fields = block.lines.len(), "extracted structure");
    }

    Ok(builder.finish())
}

/// Groups non-empty lines under the most recent `struct <name> {` opener.
fn extract_blocks(lines: &[Line]) -> Result<Vec<Block<'_>>, FieldGenError> {
    let mut blocks: Vec<Block> = Vec::new();

    for line in lines.iter().filter(|l| !l.text.is_empty()) {
        if line.text.contains('{') {
            let name = parse_block_opener(line)?;
            blocks.push(Block {
                name,
                line: line.line,
                lines: Vec::new(),
            });
            continue;
        }

        match blocks.last_mut() {
            Some(block) => block.lines.push(line),
            None => {
                return Err(error(
                    &format!("Declaration {} appears outside of a structure block", quote(&line.text)),
                    line.line,
                    line.column,
                ))
            }
        }
    }

    Ok(blocks)
}

/// Accepts exactly `struct <name> {`.
fn parse_block_opener(line: &Line) -> Result<String, FieldGenError> {
    let tokens = tokenize_statement(line)?;
    match tokens.as_slice() {
        [kw, name, brace]
            if kw.text == STRUCT_KEYWORD && is_identifier(&name.text) && brace.text == "{" =>
        {
            Ok(name.text.clone())
        }
        _ => Err(error(
            &format!("Expected \"struct <name> {{\" but found {}", quote(&line.text)),
            line.line,
            line.column,
        )),
    }
}

fn is_identifier(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

/// Splits one field line into its declared type and its single identifier.
fn classify_field(
    line: &Line,
    primitives: &HashSet<&str>,
    structure_names: &HashSet<&str>,
) -> Result<Field, FieldGenError> {
    let tokens = tokenize_statement(line)?;
    let malformed = |column: usize, why: &str| {
        error(
            &format!("Malformed declaration {}: {}", quote(&line.text), why),
            line.line,
            column,
        )
    };

    let mut type_parts: Vec<&str> = Vec::new();
    let mut residual: Vec<&Token> = Vec::new();
    let mut struct_ref: Option<String> = None;
    let mut array_len: Option<String> = None;
    let mut is_pointer = false;

    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let text = token.text.as_str();
        if array_len.is_some() {
            return Err(malformed(token.column, "nothing may follow an array declarator"));
        }
        if text == STRUCT_KEYWORD {
            let tag = iter
                .next()
                .filter(|t| is_identifier(&t.text))
                .ok_or_else(|| malformed(token.column, "expected a structure name after \"struct\""))?;
            type_parts.push(STRUCT_KEYWORD);
            type_parts.push(&tag.text);
            struct_ref = Some(tag.text.clone());
        } else if structure_names.contains(text) && struct_ref.is_none() && residual.is_empty() {
            type_parts.push(STRUCT_KEYWORD);
            type_parts.push(text);
            struct_ref = Some(text.to_string());
        } else if primitives.contains(text) {
            type_parts.push(text);
        } else if text == "*" {
            type_parts.push(text);
            is_pointer = true;
        } else if text.starts_with('[') {
            if residual.is_empty() {
                return Err(malformed(token.column, "array declarator without a field name"));
            }
            let len = text[1..text.len() - 1].trim();
            if len.is_empty() {
                return Err(malformed(token.column, "array declarator without a length"));
            }
            array_len = Some(len.to_string());
        } else if is_identifier(text) {
            residual.push(token);
        } else {
            return Err(malformed(token.column, &format!("unexpected token {}", quote(text))));
        }
    }

    let name = match residual.as_slice() {
        [single] => single.text.clone(),
        [] => return Err(malformed(line.column, "no field name")),
        many => {
            let names: Vec<&str> = many.iter().map(|t| t.text.as_str()).collect();
            return Err(malformed(many[0].column, &format!(
                "unknown type name among {}",
                quote(&names.join(" "))
            )));
        }
    };
    if type_parts.iter().all(|p| *p == CONST_KEYWORD) {
        return Err(malformed(line.column, "no type"));
    }
    if is_pointer {
        // Pointers to structures are leaves and are never flattened.
        struct_ref = None;
    } else if struct_ref.is_some() && array_len.is_some() {
        return Err(malformed(line.column, "arrays of structures are not supported"));
    }

    let mut field = Field::new(&name, &join_type(&type_parts), line.line);
    field.struct_ref = struct_ref;
    field.array_len = array_len;
    Ok(field)
}

/// Joins type tokens with spaces, keeping runs of `*` together.
fn join_type(parts: &[&str]) -> String {
    let mut out = String::new();
    for part in parts {
        if !(out.is_empty() || (*part == "*" && out.ends_with('*'))) {
            out.push(' ');
        }
        out.push_str(part);
    }
    out
}
