// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use krmfn_engine::{PipelineEngine, RunRequest};

use crate::error::KrmFnError;
use crate::function::{Function, FunctionConfig};
use crate::input::ResourceStream;
use crate::object::Object;
use crate::results::ResourceList;

/// A function of the pipeline: its name, which keys its results, and the
/// configuration resource handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineFunction {
    pub name: String,
    pub config: FunctionConfig,
}

/// Resources and functions to run, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    input: ResourceStream,
    functions: Vec<PipelineFunction>,
    working_dir: Option<std::path::PathBuf>,
}

fn temp_dir(prefix: &str) -> Result<tempfile::TempDir, KrmFnError> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .map_err(|err| KrmFnError::TempDir(err.to_string()))
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, raw: &[u8]) -> Result<(), KrmFnError> {
        self.input.add_raw(raw)
    }

    pub fn add_inputs<'a, O: Object + 'a>(&mut self, objects: impl IntoIterator<Item = &'a O>) -> Result<(), KrmFnError> {
        self.input.add_objects(objects)
    }

    /// Append functions, in order. Nothing is appended if any of them is
    /// invalid.
    pub fn add_functions(&mut self, functions: &[Function]) -> Result<(), KrmFnError> {
        let mut added = vec![];
        for function in functions {
            if function.name.is_empty() {
                return Err(KrmFnError::MissingFunctionName);
            }
            let config = FunctionConfig::build(function)?;
            log::debug!(
                "function #{} '{}': {}",
                self.functions.len() + added.len(),
                function.name,
                config.function_annotation().unwrap_or_default()
            );
            added.push(PipelineFunction {
                name: function.name.clone(),
                config,
            });
        }
        self.functions.extend(added);
        Ok(())
    }

    /// Set the directory in which exec functions run. It must exist.
    ///
    /// An empty path unsets it: a temporary directory is used again.
    pub fn set_working_dir(&mut self, dir: &std::path::Path) -> Result<(), KrmFnError> {
        if dir.as_os_str().is_empty() {
            self.working_dir = None;
            return Ok(());
        }
        let dir = crate::util::absolute_path(dir)?;
        if !dir.exists() {
            return Err(KrmFnError::WorkingDirectoryNotFound(dir));
        }
        if !dir.is_dir() {
            return Err(KrmFnError::WorkingDirectoryNotADirectory(dir));
        }
        self.working_dir = Some(dir);
        Ok(())
    }

    pub fn input(&self) -> &ResourceStream {
        &self.input
    }

    pub fn functions(&self) -> &[PipelineFunction] {
        &self.functions
    }

    pub fn working_dir(&self) -> Option<&std::path::Path> {
        self.working_dir.as_deref()
    }

    /// Run the functions over the input with the given engine.
    ///
    /// A temporary working directory is used if none was set. The temporary
    /// directories are removed before returning, on success and on failure.
    pub fn execute(&self, engine: &dyn PipelineEngine) -> Result<ResourceList, KrmFnError> {
        let scratch_dir;
        let working_dir = match &self.working_dir {
            Some(dir) => dir.as_path(),
            None => {
                scratch_dir = temp_dir("ExecWorkingDir")?;
                scratch_dir.path()
            }
        };
        let results_dir = temp_dir("Result")?;

        let descriptors = self
            .functions
            .iter()
            .map(|x| x.config.to_value())
            .collect::<Result<Vec<serde_yaml::Value>, KrmFnError>>()?;

        log::info!(
            "running {} function(s) on {} resource(s) in {}",
            self.functions.len(),
            self.input.len(),
            working_dir.display()
        );
        let output = engine
            .run(&RunRequest {
                functions: &descriptors,
                input: self.input.as_str(),
                working_dir,
                results_dir: results_dir.path(),
            })
            .map_err(|err| KrmFnError::PipelineExecution(format!("{:#}", err)))?;

        let names: Vec<&str> = self.functions.iter().map(|x| x.name.as_str()).collect();
        let resource_list = crate::results::collect(&output, results_dir.path(), &names);

        if let Err(err) = results_dir.close() {
            log::warn!("could not remove the result directory: {}", err);
        }
        resource_list
    }
}
