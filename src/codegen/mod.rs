//! Binding code generator
//!
//! Produces one Rust module per configured interface plus a module index, and
//! writes them without ever clobbering hand-written files.
//!
//! - `naming` - identifier conversion
//! - `ast` - statement tree and renderer
//! - `wrapper` - per-interface module rendering and the arity chain

pub mod ast;
pub mod naming;
pub mod wrapper;

use std::fs;
use std::path::{Path, PathBuf};

use crate::bindings::{wrapper_spec_for, Diagnostic, WrapperSpec};
use crate::config::BindgenConfig;
use crate::core::error::{BindgenError, BindgenResult, GenerateError};
use crate::idl::IdlSpec;

use ast::CodeWriter;
use naming::to_snake_case;

/// First line of every generated file.
pub const GENERATED_MARKER: &str = "// Code generated by script_bindings. DO NOT EDIT.";

/// Name of the generated module index.
pub const MODULE_INDEX: &str = "mod.rs";

/// A rendered file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// An interface that produced no output.
#[derive(Debug)]
pub struct GenerationFailure {
    pub interface: String,
    pub error: BindgenError,
}

/// Outcome of generating every configured interface.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub files: Vec<GeneratedFile>,
    pub failures: Vec<GenerationFailure>,
    /// Diagnostics of the successful interfaces, keyed by interface name.
    pub diagnostics: Vec<(String, Diagnostic)>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path.as_ref())
    }
}

/// Module file name for an interface (`EventTarget` -> `event_target.rs`).
pub fn module_name(interface_name: &str) -> String {
    to_snake_case(interface_name)
}

/// Renders the module for one interface.
pub fn generate_wrapper(spec: &WrapperSpec, imports: &[String]) -> GeneratedFile {
    GeneratedFile {
        path: PathBuf::from(format!("{}.rs", module_name(&spec.interface_name))),
        contents: wrapper::render_wrapper(spec, imports),
    }
}

/// Renders `mod.rs`: one `pub mod` per interface and `all_templates()`.
pub fn generate_module_index(specs: &[WrapperSpec], imports: &[String]) -> GeneratedFile {
    let mut writer = CodeWriter::new();
    writer.line(GENERATED_MARKER);
    writer.blank();
    for spec in specs {
        writer.line(&format!("pub mod {};", module_name(&spec.interface_name)));
    }
    writer.blank();
    for import in imports {
        writer.line(&format!("use {};", import));
    }
    if !imports.is_empty() {
        writer.blank();
    }
    writer.line("/// Templates of every generated interface.");
    writer.open("pub fn all_templates() -> Vec<FunctionTemplate>");
    writer.open_with("vec![");
    for spec in specs {
        writer.line(&format!(
            "{}::{}::create_prototype(),",
            module_name(&spec.interface_name),
            spec.wrapper_type_name
        ));
    }
    writer.close_with("]");
    writer.close();

    GeneratedFile {
        path: PathBuf::from(MODULE_INDEX),
        contents: writer.finish(),
    }
}

/// Generates every interface configured in `config`.
///
/// A failing interface is reported in [`GenerationReport::failures`] and
/// produces no file; the remaining interfaces are still generated.
pub fn generate_all(idl: &IdlSpec, config: &BindgenConfig) -> GenerationReport {
    let mut report = GenerationReport::default();
    let mut specs = Vec::new();

    for interface in &config.interfaces {
        match wrapper_spec_for(idl, interface, &config.ignored_attribute_types) {
            Ok(spec) => {
                tracing::info!(
                    target: "bindgen",
                    "Generated {} ({} diagnostics)",
                    spec.interface_name,
                    spec.diagnostics.len()
                );
                report.files.push(generate_wrapper(&spec, &config.output.imports));
                report.diagnostics.extend(
                    spec.diagnostics
                        .iter()
                        .map(|d| (spec.interface_name.clone(), d.clone())),
                );
                specs.push(spec);
            }
            Err(error) => {
                tracing::error!(
                    target: "bindgen",
                    "Failed to generate {}: {}",
                    interface.type_name,
                    error
                );
                report.failures.push(GenerationFailure {
                    interface: interface.type_name.clone(),
                    error,
                });
            }
        }
    }

    if config.output.module_index && !specs.is_empty() {
        report
            .files
            .push(generate_module_index(&specs, &config.output.imports));
    }
    report
}

/// Writes `files` below `output_dir`.
///
/// Every target is checked before anything is written: an existing file that
/// does not start with [`GENERATED_MARKER`] aborts the whole write.
pub fn write_files(output_dir: &Path, files: &[GeneratedFile]) -> BindgenResult<()> {
    for file in files {
        let target = output_dir.join(&file.path);
        if target.exists() {
            let existing = fs::read_to_string(&target)?;
            if !existing.starts_with(GENERATED_MARKER) {
                return Err(GenerateError::WouldOverwrite(target).into());
            }
        }
    }

    fs::create_dir_all(output_dir)?;
    for file in files {
        let target = output_dir.join(&file.path);
        fs::write(&target, &file.contents)?;
        tracing::debug!(target: "bindgen", "Wrote {}", target.display());
    }
    Ok(())
}

/// Loads the interface specification named by `config`, generates every
/// configured interface and writes the successful ones.
pub fn run(config: &BindgenConfig) -> BindgenResult<GenerationReport> {
    let idl = IdlSpec::from_json_file(&config.input.idl_path)?;
    let report = generate_all(&idl, config);
    write_files(&config.output.output_dir, &report.files)?;
    tracing::info!(
        target: "bindgen",
        "Wrote {} files to {}, {} interfaces failed",
        report.files.len(),
        config.output.output_dir.display(),
        report.failures.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> WrapperSpec {
        WrapperSpec {
            interface_name: name.to_string(),
            inner_type_name: name.to_string(),
            wrapper_type_name: format!("{}Wrapper", name),
            receiver: "info".to_string(),
            run_custom_code: false,
            inheritance: None,
            constructor: None,
            operations: Vec::new(),
            attributes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_module_index() {
        let index = generate_module_index(
            &[spec("EventTarget"), spec("Node")],
            &["script_bindings::scripting::prelude::*".to_string()],
        );
        assert_eq!(index.path, PathBuf::from("mod.rs"));
        let expected = "\
// Code generated by script_bindings. DO NOT EDIT.

pub mod event_target;
pub mod node;

use script_bindings::scripting::prelude::*;

/// Templates of every generated interface.
pub fn all_templates() -> Vec<FunctionTemplate> {
    vec![
        event_target::EventTargetWrapper::create_prototype(),
        node::NodeWrapper::create_prototype(),
    ]
}
";
        assert_eq!(index.contents, expected);
    }

    #[test]
    fn test_empty_interface_wrapper() {
        let file = generate_wrapper(&spec("EventTarget"), &[]);
        assert_eq!(file.path, PathBuf::from("event_target.rs"));
        let expected = "\
// Code generated by script_bindings. DO NOT EDIT.

pub struct EventTargetWrapper;

impl Converters for EventTargetWrapper {}

impl EventTargetWrapper {
    pub fn create_prototype() -> FunctionTemplate {
        let mut constructor = FunctionTemplate::new(\"EventTarget\", Self::construct);
        constructor.set_internal_field_count(1);
        constructor
    }

    fn construct<'js>(_info: &CallInfo<'js>) -> BindingResult<Value<'js>> {
        Err(BindingError::IllegalConstructor)
    }
}
";
        assert_eq!(file.contents, expected);
    }

    #[test]
    fn test_custom_constructor_is_only_installed() {
        let mut customization = crate::config::MethodCustomization::default();
        customization.custom_implementation = true;
        let mut text = spec("Text");
        text.constructor = Some(crate::bindings::Operation {
            name: "constructor".to_string(),
            return_type: None,
            arguments: Vec::new(),
            customization,
            not_implemented: false,
            custom_implementation: true,
            has_error: true,
        });

        let file = generate_wrapper(&text, &[]);
        assert!(file
            .contents
            .contains("FunctionTemplate::new(\"Text\", Self::construct);"));
        assert!(!file.contents.contains("fn construct<'js>"));
        assert!(!file.contents.contains("create_instance"));
    }

    #[test]
    fn test_write_files_refuses_hand_written() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("node.rs"), "// my own code\n").unwrap();
        let files = vec![
            GeneratedFile {
                path: PathBuf::from("event_target.rs"),
                contents: format!("{}\n", GENERATED_MARKER),
            },
            GeneratedFile {
                path: PathBuf::from("node.rs"),
                contents: format!("{}\n", GENERATED_MARKER),
            },
        ];

        let err = write_files(dir.path(), &files).unwrap_err();
        assert!(matches!(
            err,
            BindgenError::Generate(GenerateError::WouldOverwrite(_))
        ));
        // nothing was written
        assert!(!dir.path().join("event_target.rs").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("node.rs")).unwrap(),
            "// my own code\n"
        );
    }

    #[test]
    fn test_write_files_replaces_generated() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("node.rs");
        fs::write(&target, format!("{}\nold\n", GENERATED_MARKER)).unwrap();
        let files = vec![GeneratedFile {
            path: PathBuf::from("node.rs"),
            contents: format!("{}\nnew\n", GENERATED_MARKER),
        }];
        write_files(dir.path(), &files).unwrap();
        assert!(fs::read_to_string(&target).unwrap().ends_with("new\n"));
    }
}
