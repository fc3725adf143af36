// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use krmfn_engine::annotations::FUNCTION_ANNOTATION;
use krmfn_engine::FunctionInvocation;

use crate::error::KrmFnError;

const FUNCTION_CONFIG_NAME: &str = "function-input";
const FUNCTION_CONFIG_KIND: &str = "ConfigMap";
const FUNCTION_CONFIG_API_VERSION: &str = "v1";

/// A KRM function to run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Function {
    /// Name of the function, used as key of its results.
    pub name: String,
    /// Container image of the function, e.g., `gcr.io/kpt-fn/set-labels:v0.1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Executable of the function, either absolute or relative to the
    /// current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,
    /// Configuration passed to the function as the data of a ConfigMap.
    #[serde(default, alias = "configMap", skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

impl Function {
    pub fn from_image(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            image: Some(image.to_string()),
            ..Default::default()
        }
    }

    pub fn from_exec(name: &str, exec: &str) -> Self {
        Self {
            name: name.to_string(),
            exec: Some(exec.to_string()),
            ..Default::default()
        }
    }

    pub fn with_config(mut self, key: &str, value: &str) -> Self {
        self.config.insert(key.to_string(), value.to_string());
        self
    }

    /// The container image, if set and not empty.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|x| !x.is_empty())
    }

    /// The executable, if set and not empty.
    pub fn exec(&self) -> Option<&str> {
        self.exec.as_deref().filter(|x| !x.is_empty())
    }

    /// Return how the function is invoked. The image takes precedence when
    /// both an image and an executable are set.
    pub fn invocation(&self) -> Result<FunctionInvocation, KrmFnError> {
        match (self.image(), self.exec()) {
            (Some(image), _) => {
                crate::image::validate_function_image(image)?;
                Ok(FunctionInvocation::Container { image: image.to_string() })
            }
            (None, Some(exec)) => {
                let path = crate::util::absolute_path(std::path::Path::new(exec))?;
                match path.to_str() {
                    Some(path) => Ok(FunctionInvocation::Exec { path: path.to_string() }),
                    None => Err(KrmFnError::PathResolution {
                        path: exec.to_string(),
                        reason: String::from("the absolute path is not valid UTF-8"),
                    }),
                }
            }
            (None, None) => Err(KrmFnError::MissingFunctionTarget),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct FunctionConfigMetadata {
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// The configuration resource handed to a function, which also tells the
/// engine how to invoke it through the function annotation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionConfig {
    pub api_version: String,
    pub kind: String,
    pub metadata: FunctionConfigMetadata,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl FunctionConfig {
    /// Build the configuration resource of a function.
    ///
    /// The name of the function is not checked here.
    pub fn build(function: &Function) -> Result<Self, KrmFnError> {
        let invocation = function.invocation()?;

        let mut data = BTreeMap::new();
        for (key, value) in &function.config {
            data.insert(key.clone(), value.clone());
        }

        Ok(Self {
            api_version: String::from(FUNCTION_CONFIG_API_VERSION),
            kind: String::from(FUNCTION_CONFIG_KIND),
            metadata: FunctionConfigMetadata {
                name: String::from(FUNCTION_CONFIG_NAME),
                annotations: BTreeMap::from([(FUNCTION_ANNOTATION.to_string(), invocation.to_annotation())]),
            },
            data,
        })
    }

    /// The raw value of the function annotation.
    pub fn function_annotation(&self) -> Option<&str> {
        self.metadata.annotations.get(FUNCTION_ANNOTATION).map(|x| x.as_str())
    }

    /// The parsed function annotation.
    pub fn invocation(&self) -> Option<FunctionInvocation> {
        self.function_annotation().and_then(|x| FunctionInvocation::from_annotation(x).ok())
    }

    pub fn to_value(&self) -> Result<serde_yaml::Value, KrmFnError> {
        serde_yaml::to_value(self).map_err(|err| KrmFnError::Serialization(err.to_string()))
    }
}
