use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldGenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("The structure \"{0}\" is declared twice")]
    DuplicateStructure(String),

    #[error("The structure \"{0}\" declares no fields")]
    EmptyStructure(String),

    #[error("The field \"{field}\" is declared twice in structure \"{structure}\"")]
    DuplicateField {
        structure: String,
        field:     String,
    },

    #[error("Field \"{field}\" of structure \"{structure}\" references undeclared structure \"{referenced}\"")]
    UnresolvedReference {
        structure:  String,
        field:      String,
        referenced: String,
    },

    #[error("Generated symbol \"{symbol}\" is produced by both {first} and {second}")]
    DuplicateSymbol {
        symbol: String,
        first:  String,
        second: String,
    },

    #[error("Recursive nesting is not allowed: {}", .chain.join(" -> "))]
    RecursiveNesting {
        chain: Vec<String>,
    },
}
