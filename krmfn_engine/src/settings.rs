// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Settings of the process engine.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Binary used to run container functions, e.g., `docker` or `podman`.
    pub container_runtime: String,
    /// Allow container functions to access the network.
    pub network: bool,
    /// User the container functions run as; empty means the image default.
    pub user: String,
    /// Extra environment variables passed to every function.
    pub env: std::collections::BTreeMap<String, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            container_runtime: String::from("docker"),
            network: false,
            user: String::from("nobody"),
            env: std::collections::BTreeMap::new(),
        }
    }
}

pub fn engine_default_conf() -> String {
    String::from(
        r##"container_runtime = "docker"
network = false
user = "nobody"
# [env]
# LOG_LEVEL = "debug"
"##,
    )
}
