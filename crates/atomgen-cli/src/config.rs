//! Generator configuration
//!
//! An optional `atomgen.toml` supplies the same settings as the command line.
//! Flags are merged over the file, then [`GeneratorConfig::validate`] checks
//! the combination and resolves defaults into a [`GenerationPlan`].

use anyhow::{Context, Result};
use atomgen_core::ModuleFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONTAINER: &str = "android.os.statsd.Atom";
pub const DEFAULT_NAMESPACE: &str = "android,util";
pub const DEFAULT_IMPORT_HEADER: &str = "statslog.h";
pub const DEFAULT_JAVA_PACKAGE: &str = "android.util";
pub const DEFAULT_JAVA_CLASS: &str = "StatsLogInternal";

/// atomgen.toml structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub input: InputSection,
    pub output: OutputSection,
    pub native: NativeSection,
    pub java: JavaSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputSection {
    pub schema: Option<PathBuf>,
    pub descriptor_set: Option<PathBuf>,
    pub container: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub cpp: Option<PathBuf>,
    pub header: Option<PathBuf>,
    pub java: Option<PathBuf>,
    pub jni: Option<PathBuf>,
    pub rust: Option<PathBuf>,
    pub module: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeSection {
    pub namespace: Option<String>,
    pub import_header: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JavaSection {
    pub package: Option<String>,
    pub class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// `EnvFilter` directive used when neither `RUST_LOG` nor `-v` is given
    pub level: Option<String>,
}

/// Where the schema comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    Schema(PathBuf),
    DescriptorSet { path: PathBuf, container: String },
}

/// Destination paths; each is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outputs {
    pub cpp: Option<PathBuf>,
    pub header: Option<PathBuf>,
    pub java: Option<PathBuf>,
    pub jni: Option<PathBuf>,
    pub rust: Option<PathBuf>,
}

/// A validated configuration with every default resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    pub source: SchemaSource,
    pub module: ModuleFilter,
    pub outputs: Outputs,
    pub namespace: String,
    pub import_header: String,
    pub java_package: String,
    pub java_class: String,
}

impl GeneratorConfig {
    /// Load config from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config: {:?}", path.as_ref()))?;

        Self::from_str(&content)
    }

    /// Parse config from string
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Layer `overrides` on top of `self`; set values in `overrides` win.
    pub fn merge(self, overrides: GeneratorConfig) -> GeneratorConfig {
        GeneratorConfig {
            input: InputSection {
                schema: overrides.input.schema.or(self.input.schema),
                descriptor_set: overrides.input.descriptor_set.or(self.input.descriptor_set),
                container: overrides.input.container.or(self.input.container),
            },
            output: OutputSection {
                cpp: overrides.output.cpp.or(self.output.cpp),
                header: overrides.output.header.or(self.output.header),
                java: overrides.output.java.or(self.output.java),
                jni: overrides.output.jni.or(self.output.jni),
                rust: overrides.output.rust.or(self.output.rust),
                module: overrides.output.module.or(self.output.module),
            },
            native: NativeSection {
                namespace: overrides.native.namespace.or(self.native.namespace),
                import_header: overrides.native.import_header.or(self.native.import_header),
            },
            java: JavaSection {
                package: overrides.java.package.or(self.java.package),
                class: overrides.java.class.or(self.java.class),
            },
            logging: LoggingSection {
                level: overrides.logging.level.or(self.logging.level),
            },
        }
    }

    /// Validate the combination of settings and resolve defaults.
    pub fn validate(&self) -> Result<GenerationPlan> {
        let source = match (&self.input.schema, &self.input.descriptor_set) {
            (Some(schema), None) => {
                if self.input.container.is_some() {
                    anyhow::bail!("--container only applies to --descriptor-set");
                }
                SchemaSource::Schema(schema.clone())
            }
            (None, Some(path)) => SchemaSource::DescriptorSet {
                path: path.clone(),
                container: self
                    .input
                    .container
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
            },
            (Some(_), Some(_)) => {
                anyhow::bail!("Supply only one of --schema and --descriptor-set")
            }
            (None, None) => anyhow::bail!("Must supply --schema or --descriptor-set"),
        };

        let outputs = Outputs {
            cpp: self.output.cpp.clone(),
            header: self.output.header.clone(),
            java: self.output.java.clone(),
            jni: self.output.jni.clone(),
            rust: self.output.rust.clone(),
        };
        if outputs.is_empty() {
            anyhow::bail!(
                "No output requested; supply at least one of --cpp, --header, --java, --jni, --rust"
            );
        }

        let module = ModuleFilter::parse(self.output.module.as_deref().unwrap_or_default());

        if !module.is_default() {
            let needs_namespace = outputs.cpp.is_some() || outputs.header.is_some();
            if needs_namespace && self.native.namespace.is_none() {
                anyhow::bail!("Must supply --namespace if supplying a specific module");
            }
            if outputs.cpp.is_some() && self.native.import_header.is_none() {
                anyhow::bail!("Must supply --import-header if supplying a specific module");
            }
            if outputs.java.is_some() && self.java.package.is_none() {
                anyhow::bail!("Must supply --java-package if supplying a specific module");
            }
        }

        if let Some(namespace) = &self.native.namespace
            && namespace.split(',').any(|part| part.trim().is_empty())
        {
            anyhow::bail!("Invalid namespace '{}': empty component", namespace);
        }

        Ok(GenerationPlan {
            source,
            module,
            outputs,
            namespace: resolved(&self.native.namespace, DEFAULT_NAMESPACE),
            import_header: resolved(&self.native.import_header, DEFAULT_IMPORT_HEADER),
            java_package: resolved(&self.java.package, DEFAULT_JAVA_PACKAGE),
            java_class: resolved(&self.java.class, DEFAULT_JAVA_CLASS),
        })
    }
}

impl Outputs {
    pub fn is_empty(&self) -> bool {
        self.cpp.is_none()
            && self.header.is_none()
            && self.java.is_none()
            && self.jni.is_none()
            && self.rust.is_none()
    }
}

fn resolved(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}
