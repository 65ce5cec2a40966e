//! Generate command: load, collate, filter, render, write.

use crate::codegen::java::JavaEmitter;
use crate::codegen::jni::JniEmitter;
use crate::codegen::native::NativeEmitter;
use crate::codegen::rust::RustEmitter;
use crate::codegen::CodegenContext;
use crate::config::{GenerationPlan, SchemaSource};
use anyhow::{Context, Result};
use atomgen_core::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Run the generator for a validated plan.
pub fn run(plan: &GenerationPlan) -> Result<()> {
    let schema = load_schema(&plan.source)?;
    let files = render(plan, &schema)?;

    for (path, content) in &files {
        write_output(path, content)?;
    }

    info!(files = files.len(), "generation complete");
    Ok(())
}

fn load_schema(source: &SchemaSource) -> Result<AtomSchema> {
    match source {
        SchemaSource::Schema(path) => AtomSchema::from_file(path)
            .with_context(|| format!("Failed to load schema: {}", path.display())),
        SchemaSource::DescriptorSet { path, container } => {
            let pool = atomgen_proto::load_descriptor_pool(path)
                .with_context(|| format!("Failed to load descriptor set: {}", path.display()))?;
            atomgen_proto::schema_from_pool(&pool, container)
                .with_context(|| format!("Failed to read atoms from {container}"))
        }
    }
}

/// Render every requested output, in memory.
///
/// Returns `(path, content)` pairs; nothing is written here, so an error in
/// any step leaves the output directory untouched.
pub fn render(plan: &GenerationPlan, schema: &AtomSchema) -> Result<Vec<(PathBuf, String)>> {
    let registry = AnnotationRegistry::standard();
    let collation = Collator::new(&registry).collate(schema);

    if !collation.is_clean() {
        for err in &collation.errors {
            error!("{err}");
        }
        let details = collation
            .errors
            .iter()
            .map(|err| format!("  {err}"))
            .collect::<Vec<_>>()
            .join("\n");
        anyhow::bail!(
            "Schema has {} error(s):\n{}",
            collation.error_count(),
            details
        );
    }

    let atoms = filter_atoms(&collation.atoms, &plan.module)
        .with_context(|| format!("Failed to select atoms for module {}", plan.module.name()))?;
    debug!(
        atoms = atoms.len(),
        signatures = atoms.signatures.len(),
        pulled_signatures = atoms.pulled_signatures.len(),
        non_chained_signatures = atoms.non_chained_signatures.len(),
        "collated"
    );

    let ctx = CodegenContext {
        atoms: &atoms,
        attribution: &collation.attribution_decl,
        registry: &registry,
        module: &plan.module,
    };
    let outputs = &plan.outputs;
    let mut files = Vec::new();

    if outputs.header.is_some() || outputs.cpp.is_some() {
        let native = NativeEmitter::new(ctx, &plan.namespace, &plan.import_header);
        if let Some(path) = &outputs.header {
            files.push((path.clone(), native.render_header()));
        }
        if let Some(path) = &outputs.cpp {
            files.push((path.clone(), native.render_source()));
        }
    }
    if let Some(path) = &outputs.java {
        let java = JavaEmitter::new(ctx, &plan.java_package, &plan.java_class);
        files.push((path.clone(), java.render()));
    }
    if let Some(path) = &outputs.jni {
        let jni = JniEmitter::new(&plan.java_package, &plan.java_class);
        files.push((path.clone(), jni.render()));
    }
    if let Some(path) = &outputs.rust {
        files.push((path.clone(), RustEmitter::new(ctx).render()));
    }

    Ok(files)
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    info!(path = %path.display(), bytes = content.len(), "wrote");
    Ok(())
}
