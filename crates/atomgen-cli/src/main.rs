//! atomgen - Atom logging API generator
//!
//! Reads an atom schema (a TOML/JSON schema file or a compiled protobuf
//! descriptor set), collates it, and writes any of:
//! - a native C++ header and source pair (`--header`, `--cpp`)
//! - a Java class (`--java`) and its JNI registration source (`--jni`)
//! - a Rust module (`--rust`)
//!
//! Nothing is written unless every atom validates and every requested output
//! renders.

use clap::Parser;
use std::path::PathBuf;

mod codegen;
mod config;
mod generate;
mod logging;

use config::{
    GeneratorConfig, InputSection, JavaSection, LoggingSection, NativeSection, OutputSection,
};

#[derive(Parser)]
#[command(name = "atomgen")]
#[command(author, version, about = "Generate atom logging APIs from an atom schema", long_about = None)]
struct Cli {
    /// Generator config file (atomgen.toml); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Atom schema file (.toml or .json)
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Compiled FileDescriptorSet (protoc --include_imports --descriptor_set_out)
    #[arg(long)]
    descriptor_set: Option<PathBuf>,

    /// Full name of the container message in the descriptor set
    #[arg(long)]
    container: Option<String>,

    /// Output path for the native source file
    #[arg(long)]
    cpp: Option<PathBuf>,

    /// Output path for the native header file
    #[arg(long)]
    header: Option<PathBuf>,

    /// Output path for the Java class
    #[arg(long)]
    java: Option<PathBuf>,

    /// Output path for the JNI registration source
    #[arg(long)]
    jni: Option<PathBuf>,

    /// Output path for the Rust module
    #[arg(long)]
    rust: Option<PathBuf>,

    /// Only generate for atoms tagged with this module (default: all atoms)
    #[arg(short, long)]
    module: Option<String>,

    /// Comma-separated C++ namespaces, e.g. "android,util"
    #[arg(long)]
    namespace: Option<String>,

    /// Header the native source includes
    #[arg(long)]
    import_header: Option<String>,

    /// Package of the generated Java class
    #[arg(long)]
    java_package: Option<String>,

    /// Name of the generated Java class
    #[arg(long)]
    java_class: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// The flags expressed as a config layer.
    fn overrides(&self) -> GeneratorConfig {
        GeneratorConfig {
            input: InputSection {
                schema: self.schema.clone(),
                descriptor_set: self.descriptor_set.clone(),
                container: self.container.clone(),
            },
            output: OutputSection {
                cpp: self.cpp.clone(),
                header: self.header.clone(),
                java: self.java.clone(),
                jni: self.jni.clone(),
                rust: self.rust.clone(),
                module: self.module.clone(),
            },
            native: NativeSection {
                namespace: self.namespace.clone(),
                import_header: self.import_header.clone(),
            },
            java: JavaSection {
                package: self.java_package.clone(),
                class: self.java_class.clone(),
            },
            logging: LoggingSection { level: None },
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => GeneratorConfig::from_file(path)?,
        None => GeneratorConfig::default(),
    };
    let config = base.merge(cli.overrides());

    logging::init(cli.verbose, config.logging.level.as_deref())?;

    let plan = config.validate()?;
    generate::run(&plan)
}
