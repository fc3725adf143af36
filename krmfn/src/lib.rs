// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

//! Assemble a pipeline of KRM functions, run it over a set of resources and
//! collect the transformed resources together with the structured results
//! emitted by each function.
//!
//! ```no_run
//! use krmfn::{Function, RunnerBuilder};
//!
//! let runner = RunnerBuilder::new()
//!     .with_input(std::fs::read("service.yaml").unwrap())
//!     .with_functions([
//!         Function::from_image("Set Labels", "gcr.io/kpt-fn/set-labels:v0.1").with_config("env", "dev"),
//!         Function::from_exec("Clean Metadata", "./clean-metadata"),
//!     ])
//!     .build()
//!     .unwrap();
//! let resource_list = runner.execute().unwrap();
//! println!("{} resources", resource_list.items.len());
//! ```

pub mod error;
pub mod function;
pub mod image;
pub mod input;
pub mod object;
pub mod pipeline;
pub mod results;
pub mod runner;
pub mod util;

#[cfg(test)]
mod test_engine;

pub use error::KrmFnError;
pub use function::{Function, FunctionConfig};
pub use image::validate_function_image;
pub use input::ResourceStream;
pub use krmfn_engine::{FunctionInvocation, PipelineEngine, ProcessEngine};
pub use object::{Object, Unstructured, UnstructuredList};
pub use pipeline::{Pipeline, PipelineFunction};
pub use results::{FunctionResult, ResourceList, Severity};
pub use runner::{FunctionRunner, RunnerBuilder};
