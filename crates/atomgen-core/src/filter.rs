//! Module filter
//!
//! Restricts a collation result to the atoms tagged for one output module.

use crate::atoms::Atoms;
use crate::error::FilterError;
use std::fmt;
use tracing::info;

/// Module name meaning "every atom".
pub const DEFAULT_MODULE_NAME: &str = "DEFAULT";

/// Which atoms an output is generated for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModuleFilter {
    #[default]
    All,
    Module(String),
}

impl ModuleFilter {
    /// Parse a `--module` value. `DEFAULT` and the empty string select all atoms.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "" | DEFAULT_MODULE_NAME => ModuleFilter::All,
            other => ModuleFilter::Module(other.to_string()),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ModuleFilter::All)
    }

    pub fn name(&self) -> &str {
        match self {
            ModuleFilter::All => DEFAULT_MODULE_NAME,
            ModuleFilter::Module(name) => name,
        }
    }
}

impl fmt::Display for ModuleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keep only the atoms in the requested module.
///
/// Signature maps are recomputed over the retained atoms, so buckets used
/// only by dropped atoms disappear. An empty result is an error since it
/// almost always means a misspelled module name.
pub fn filter_atoms(atoms: &Atoms, filter: &ModuleFilter) -> Result<Atoms, FilterError> {
    let ModuleFilter::Module(module) = filter else {
        return Ok(atoms.clone());
    };

    let retained: Vec<_> = atoms
        .iter()
        .filter(|decl| decl.modules.contains(module))
        .cloned()
        .collect();
    if retained.is_empty() {
        return Err(FilterError::EmptyModule(module.clone()));
    }

    let filtered = Atoms::from_decls(retained);
    info!(
        module = %module,
        atoms = filtered.len(),
        of = atoms.len(),
        "filtered atoms by module"
    );
    Ok(filtered)
}
