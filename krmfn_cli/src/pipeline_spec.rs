// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// A pipeline read from a file, in YAML or JSON.
///
/// Relative paths are relative to the directory of the file.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PipelineSpec {
    /// Files with the resources to transform, in order.
    pub inputs: Vec<String>,
    /// Functions to apply, in order.
    pub functions: Vec<krmfn::Function>,
    /// Directory in which exec functions run, if not a temporary one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

impl PipelineSpec {
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => anyhow::bail!("cannot read pipeline specification {}: {}", path.display(), err),
        };
        // JSON is also valid YAML.
        match serde_yaml::from_str::<PipelineSpec>(&content) {
            Ok(spec) => Ok(spec),
            Err(err) => anyhow::bail!("invalid pipeline specification {}: {}", path.display(), err),
        }
    }
}
