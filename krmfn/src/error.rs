// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KrmFnError {
    #[error("function must have a name")]
    MissingFunctionName,
    #[error("function must have either image or exec, none specified")]
    MissingFunctionTarget,
    #[error("function image {0:?} is invalid")]
    InvalidImageReference(String),
    #[error("could not resolve path {path:?}: {reason}")]
    PathResolution { path: String, reason: String },
    #[error("unsupported input of type List")]
    UnsupportedListInput,
    #[error("could not serialize input: {0}")]
    Serialization(String),
    #[error("{} does not exist", .0.display())]
    WorkingDirectoryNotFound(std::path::PathBuf),
    #[error("{} is not a directory", .0.display())]
    WorkingDirectoryNotADirectory(std::path::PathBuf),
    #[error("could not create temporary directory: {0}")]
    TempDir(String),
    #[error("pipeline execution failed: {0}")]
    PipelineExecution(String),
    #[error("could not parse pipeline output: {0}")]
    ResourceParse(String),
    #[error("malformed result file name: {0}")]
    MalformedResultFileName(String),
    #[error("result file {file} refers to function #{ordinal} but only {functions} function(s) were run")]
    ResultIndexOutOfRange { file: String, ordinal: usize, functions: usize },
    #[error("inputs are required")]
    InputRequired,
    #[error("at least one function is required")]
    FunctionRequired,
}
