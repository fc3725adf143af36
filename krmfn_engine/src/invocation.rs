// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// How a KRM function is invoked: as a container image or as a local
/// executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionInvocation {
    Container { image: String },
    Exec { path: String },
}

#[derive(serde::Deserialize)]
struct ContainerSpec {
    image: String,
}

#[derive(serde::Deserialize)]
struct ExecSpec {
    path: String,
}

#[derive(serde::Deserialize)]
struct InvocationSpec {
    container: Option<ContainerSpec>,
    exec: Option<ExecSpec>,
}

impl FunctionInvocation {
    /// Text stored as the value of the function annotation, e.g.,
    /// `container: {image: 'gcr.io/kpt-fn/set-labels:v0.1'}`.
    pub fn to_annotation(&self) -> String {
        match self {
            FunctionInvocation::Container { image } => format!("container: {{image: {}}}", single_quoted(image)),
            FunctionInvocation::Exec { path } => format!("exec: {{path: {}}}", single_quoted(path)),
        }
    }

    /// Parse the value of a function annotation.
    pub fn from_annotation(value: &str) -> anyhow::Result<Self> {
        let spec: InvocationSpec = match serde_yaml::from_str(value) {
            Ok(spec) => spec,
            Err(err) => anyhow::bail!("invalid function annotation '{}': {}", value, err),
        };
        match (spec.container, spec.exec) {
            (Some(container), _) if !container.image.is_empty() => Ok(FunctionInvocation::Container { image: container.image }),
            (_, Some(exec)) if !exec.path.is_empty() => Ok(FunctionInvocation::Exec { path: exec.path }),
            _ => Err(anyhow::anyhow!(
                "function annotation '{}' specifies neither a container image nor an exec path",
                value
            )),
        }
    }
}

impl std::fmt::Display for FunctionInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FunctionInvocation::Container { image } => write!(f, "container {}", image),
            FunctionInvocation::Exec { path } => write!(f, "exec {}", path),
        }
    }
}

// YAML single-quoted scalar: the only escape is a doubled quote.
fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
