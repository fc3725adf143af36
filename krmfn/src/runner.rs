// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use krmfn_engine::{PipelineEngine, ProcessEngine};

use crate::error::KrmFnError;
use crate::function::Function;
use crate::object::Object;
use crate::pipeline::Pipeline;
use crate::results::ResourceList;

/// Fluent builder of a [`FunctionRunner`].
///
/// Every step is applied immediately: a failing step leaves the pipeline
/// untouched and its error is kept until [`RunnerBuilder::build`].
#[derive(Clone, Default)]
pub struct RunnerBuilder {
    pipeline: Pipeline,
    engine: Option<Arc<dyn PipelineEngine>>,
    errors: Vec<KrmFnError>,
}

impl std::fmt::Debug for RunnerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerBuilder")
            .field("pipeline", &self.pipeline)
            .field("custom_engine", &self.engine.is_some())
            .field("errors", &self.errors)
            .finish()
    }
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(mut self, res: Result<(), KrmFnError>) -> Self {
        if let Err(err) = res {
            log::debug!("runner builder: {}", err);
            self.errors.push(err);
        }
        self
    }

    /// Add raw resources, in JSON or YAML.
    pub fn with_input(mut self, raw: impl AsRef<[u8]>) -> Self {
        let res = self.pipeline.add_input(raw.as_ref());
        self.record(res)
    }

    /// Add typed resources.
    pub fn with_inputs<'a, O: Object + 'a>(mut self, objects: impl IntoIterator<Item = &'a O>) -> Self {
        let res = self.pipeline.add_inputs(objects);
        self.record(res)
    }

    pub fn with_functions(mut self, functions: impl IntoIterator<Item = Function>) -> Self {
        let functions: Vec<Function> = functions.into_iter().collect();
        let res = self.pipeline.add_functions(&functions);
        self.record(res)
    }

    /// Run exec functions in `dir` instead of a temporary directory.
    pub fn where_exec_working_dir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        let res = self.pipeline.set_working_dir(dir.as_ref());
        self.record(res)
    }

    /// Use a custom engine instead of a [`ProcessEngine`] with default settings.
    pub fn with_engine(mut self, engine: Arc<dyn PipelineEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Errors accumulated so far, in order.
    pub fn errors(&self) -> &[KrmFnError] {
        &self.errors
    }

    /// Return a runner, or the first error accumulated while building.
    pub fn build(&self) -> Result<FunctionRunner, KrmFnError> {
        if let Some(first) = self.errors.first() {
            for err in &self.errors {
                log::warn!("cannot build the function runner: {}", err);
            }
            return Err(first.clone());
        }
        if self.pipeline.input().is_empty() {
            return Err(KrmFnError::InputRequired);
        }
        if self.pipeline.functions().is_empty() {
            return Err(KrmFnError::FunctionRequired);
        }

        Ok(FunctionRunner {
            pipeline: self.pipeline.clone(),
            engine: match &self.engine {
                Some(engine) => engine.clone(),
                None => Arc::new(ProcessEngine::default()),
            },
        })
    }
}

/// A pipeline ready to be executed, possibly several times.
#[derive(Clone)]
pub struct FunctionRunner {
    pipeline: Pipeline,
    engine: Arc<dyn PipelineEngine>,
}

impl std::fmt::Debug for FunctionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRunner").field("pipeline", &self.pipeline).finish()
    }
}

impl FunctionRunner {
    pub fn execute(&self) -> Result<ResourceList, KrmFnError> {
        self.pipeline.execute(self.engine.as_ref())
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
