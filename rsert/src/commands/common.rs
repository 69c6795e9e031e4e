//! Common types and utilities for rsert commands.
//!
//! Input files are memory-mapped rather than read; the streams only ever
//! need a byte slice.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use rser_type::{Schema, TypeId, TypeRegistry};

use crate::error::{RsertError, Result};

// ============================================================================
// Input Files
// ============================================================================

/// Map an input file into memory.
pub fn map_input(path: &Path) -> Result<Mmap> {
    if !path.is_file() {
        return Err(RsertError::FileOperation(format!(
            "{} {}",
            error_messages::INPUT_PATH_NOT_FILE,
            path.display()
        )));
    }
    let file = File::open(path)?;
    // SAFETY: the map is read-only and dropped before the command returns;
    // a file truncated underneath it is outside what the tool supports.
    let map = unsafe { Mmap::map(&file)? };
    tracing::debug!("mapped {} ({} bytes)", path.display(), map.len());
    Ok(map)
}

// ============================================================================
// Schemas
// ============================================================================

/// A loaded schema plus the type used at the top of each stream.
#[derive(Debug, Clone)]
pub struct TypedInput {
    pub schema: Schema,
    pub root: String,
}

impl TypedInput {
    /// Load the schema and make sure it defines `root`.
    pub fn load(schema_path: &Path, root: &str) -> Result<Self> {
        let schema = Schema::load(schema_path)?;
        let typed = Self {
            schema,
            root: root.to_owned(),
        };
        typed.registry()?;
        Ok(typed)
    }

    /// Build a fresh registry and resolve the root type in it.
    pub fn registry(&self) -> Result<(TypeRegistry, TypeId)> {
        let registry = self.schema.clone().into_registry()?;
        let root = registry.id_of(&self.root)?;
        Ok((registry, root))
    }
}

// ============================================================================
// Error Messages
// ============================================================================

/// Standard error message templates.
pub mod error_messages {
    /// Error when no input files are specified.
    pub const NO_INPUT_FILES: &str = "No input files specified";

    /// Error when input path is not a file.
    pub const INPUT_PATH_NOT_FILE: &str = "Input path is not a file:";

    /// Error when target path is not a directory.
    pub const TARGET_NOT_DIR: &str = "Target path is not a directory:";

    /// Error when output file already exists.
    pub const OUTPUT_FILE_EXISTS: &str = "Output file already exists:";

    /// Error when a schema is given without a root type or the other way round.
    pub const SCHEMA_NEEDS_TYPE: &str = "--schema and --type must be given together";

    /// Error when files failed to process.
    pub const FILES_FAILED: &str = "file(s) failed:";
}

// ============================================================================
// Output Messages
// ============================================================================

/// Standard output message prefixes.
pub mod output_messages {
    /// Generic error prefix.
    pub const ERROR: &str = "❌";

    /// Prefix for a file that passed.
    pub const OK: &str = "✅";

    /// Message when a file is created.
    pub const CREATED_FILE: &str = "✅ Created file:";

    /// Message when a file is skipped.
    pub const SKIPPED_FILE: &str = "⚠️ Skipped existing file:";
}
