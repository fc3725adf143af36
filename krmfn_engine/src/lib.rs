// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

pub mod annotations;
pub mod invocation;
pub mod process_engine;
pub mod resource_list;
pub mod settings;

pub use invocation::FunctionInvocation;
pub use process_engine::ProcessEngine;
pub use settings::{engine_default_conf, EngineSettings};

/// Separator between the documents of a multi-document resource stream.
pub const ITEM_SEPARATOR: &str = "---\n";

/// Prefix of the per-function result files, which are named
/// `<prefix>-<ordinal>.yaml`.
pub const RESULTS_FILE_PREFIX: &str = "results";

/// Name of the result file written for the function at position `ordinal`
/// (0-based) in the function list.
pub fn results_file_name(ordinal: usize) -> String {
    format!("{}-{}.yaml", RESULTS_FILE_PREFIX, ordinal)
}

/// Everything an engine needs to run a pipeline once.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    /// Function configuration resources, in execution order. Each one carries
    /// the function annotation telling how the function is invoked.
    pub functions: &'a [serde_yaml::Value],
    /// Multi-document resource stream fed to the first function.
    pub input: &'a str,
    /// Directory in which exec functions are run.
    pub working_dir: &'a std::path::Path,
    /// Directory receiving one result file per function.
    pub results_dir: &'a std::path::Path,
}

/// Runs an ordered list of KRM functions over a resource stream.
///
/// Implementations must run the functions strictly in order, feeding the
/// output of each one to the next, and must write the results of the function
/// at position `i` into `results_dir/results-<i>.yaml`.
/// The returned string is the final multi-document resource stream.
pub trait PipelineEngine: Send + Sync {
    fn run(&self, request: &RunRequest) -> anyhow::Result<String>;
}
