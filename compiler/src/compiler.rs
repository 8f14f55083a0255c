use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    config::GenConfig,
    error::FieldGenError,
    flatten::flatten_header,
    gen_c::{check_symbols, emit_accessors, emit_enum_header, emit_size_tables, emit_source},
    parser::parse_header,
    tokenizer::normalize_header,
    types::FieldModel,
};

/// The generated text of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    /// Enum definitions plus declarations of everything in `source`.
    pub enum_header: String,
    /// Per-structure size tables.
    pub size_tables: String,
    /// Per-structure accessor functions.
    pub accessors:   String,
    /// Compilable unit holding the size tables and accessors.
    pub source:      String,
}

/// Compile header text into a flattened `FieldModel`.
/// Returns `Err(FieldGenError)` if parsing, verification or flattening fails,
/// or if two generated C identifiers would collide.
pub fn compile_header(text: &str, config: &GenConfig) -> Result<FieldModel, FieldGenError> {
    let lines = normalize_header(text);
    let header = parse_header(&lines, &config.extra_types)?;
    let flat = flatten_header(&header)?;
    check_symbols(&flat, config)?;
    debug!(structures = flat.len(), "compiled header");
    Ok(FieldModel::new(flat))
}

/// Render every artifact for a compiled model. Emission is pure, so the
/// artifacts of one model always agree on field order.
pub fn render_artifacts(model: &FieldModel, config: &GenConfig) -> Artifacts {
    let enum_header = emit_enum_header(model, config);
    let size_tables = emit_size_tables(model, config);
    let accessors = emit_accessors(model, config);
    let source = emit_source(&size_tables, &accessors, config);
    Artifacts {
        enum_header,
        size_tables,
        accessors,
        source,
    }
}

/// Compile header text and render its artifacts. Nothing is rendered
/// unless the whole header compiles.
pub fn generate_artifacts(text: &str, config: &GenConfig) -> Result<Artifacts, FieldGenError> {
    let model = compile_header(text, config)?;
    Ok(render_artifacts(&model, config))
}

/// One output file on its way into place.
struct Staged<'a> {
    target:    &'a Path,
    temp:      PathBuf,
    /// Where the previous target was moved, if there was one.
    backup:    Option<PathBuf>,
    committed: bool,
}

/// Write the enum header and the source file.
///
/// Both files are first written next to their targets. Once both writes
/// succeeded, each existing target is moved to a backup and the new file is
/// renamed into place. If any step fails, every target is restored from its
/// backup (or removed if it did not exist) and all temporary files are
/// deleted, so either both artifacts are replaced or neither is.
pub fn write_artifacts(
    artifacts: &Artifacts,
    header_path: &Path,
    source_path: &Path,
) -> Result<(), FieldGenError> {
    let outputs = [
        (header_path, artifacts.enum_header.as_str()),
        (source_path, artifacts.source.as_str()),
    ];

    let mut staged: Vec<Staged> = Vec::with_capacity(outputs.len());
    for (target, contents) in outputs {
        let temp = sibling_path(target, "tmp");
        let written = fs::write(&temp, contents);
        staged.push(Staged {
            target,
            temp,
            backup: None,
            committed: false,
        });
        if let Err(e) = written {
            rollback(&mut staged);
            return Err(FieldGenError::Io(e));
        }
    }

    for index in 0..staged.len() {
        if let Err(e) = commit(&mut staged[index]) {
            rollback(&mut staged);
            return Err(FieldGenError::Io(e));
        }
    }

    for entry in &staged {
        if let Some(backup) = &entry.backup {
            let _ = fs::remove_file(backup);
        }
        info!(path = %entry.target.display(), "wrote artifact");
    }
    Ok(())
}

fn commit(entry: &mut Staged) -> std::io::Result<()> {
    if entry.target.is_file() {
        let backup = sibling_path(entry.target, "bak");
        fs::rename(entry.target, &backup)?;
        entry.backup = Some(backup);
    }
    fs::rename(&entry.temp, entry.target)?;
    entry.committed = true;
    Ok(())
}

/// Undoes `commit` in reverse order. Errors are only logged: the error that
/// caused the rollback is the one reported.
fn rollback(staged: &mut [Staged]) {
    for entry in staged.iter_mut().rev() {
        if entry.committed {
            if let Err(e) = fs::remove_file(entry.target) {
                warn!(path = %entry.target.display(), error = %e, "cannot remove new artifact");
            }
            entry.committed = false;
        } else {
            let _ = fs::remove_file(&entry.temp);
        }
        if let Some(backup) = entry.backup.take() {
            if let Err(e) = fs::rename(&backup, entry.target) {
                warn!(path = %backup.display(), error = %e, "cannot restore previous artifact");
            }
        }
    }
}

/// Hidden sibling of `target`, e.g. `out/.enum.h.tmp`.
fn sibling_path(target: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(".");
    name.push(suffix);
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_path_is_hidden() {
        assert_eq!(sibling_path(Path::new("out/enum.h"), "tmp"), PathBuf::from("out/.enum.h.tmp"));
        assert_eq!(sibling_path(Path::new("enum.c"), "bak"), PathBuf::from(".enum.c.bak"));
    }

    #[test]
    fn test_generate_aborts_without_artifacts() {
        let result = generate_artifacts(
            "struct evfs_inode { struct evfs_missing field; };",
            &GenConfig::default(),
        );
        assert!(matches!(result, Err(FieldGenError::UnresolvedReference { .. })));
    }
}
