// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::KrmFnError;
use crate::object::Unstructured;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    #[serde(alias = "")]
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Reference to the resource a result is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

/// Field of the resource a result is about.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Field {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<serde_yaml::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_value: Option<serde_yaml::Value>,
}

/// File the resource a result is about was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct FileRef {
    pub path: String,
    pub index: usize,
}

/// A structured diagnostic emitted by a function.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FunctionResult {
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_ref: Option<ResourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Output of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ResourceList {
    /// Resources returned by the last function, in order.
    pub items: Vec<Unstructured>,
    /// First result emitted by each function, by function name.
    pub results: BTreeMap<String, FunctionResult>,
    /// All the results emitted by each function, by function name.
    #[serde(rename = "allResults")]
    pub all_results: BTreeMap<String, Vec<FunctionResult>>,
}

impl ResourceList {
    /// True if any function emitted a result with error severity.
    pub fn has_errors(&self) -> bool {
        self.all_results.values().flatten().any(|x| x.severity == Severity::Error)
    }
}

/// Parse the output stream of a pipeline into resources, dropping the
/// bookkeeping annotations added by the engine.
pub fn parse_items(output: &str) -> Result<Vec<Unstructured>, KrmFnError> {
    let mut items = vec![];
    for document in serde_yaml::Deserializer::from_str(output) {
        let mut value = serde_yaml::Value::deserialize(document).map_err(|err| KrmFnError::ResourceParse(err.to_string()))?;
        if value.is_null() {
            continue;
        }
        krmfn_engine::annotations::clear_bookkeeping_annotations(&mut value);
        items.push(Unstructured::from_yaml_value(value)?);
    }
    Ok(items)
}

/// Extract the ordinal from a result file name `<prefix>-<ordinal>.yaml`.
pub fn parse_result_file_name(file_name: &str) -> Result<usize, KrmFnError> {
    let stem = file_name.strip_suffix(".yaml").unwrap_or(file_name);
    match stem.rsplit_once('-') {
        Some((prefix, ordinal)) if !prefix.is_empty() && !ordinal.is_empty() && ordinal.bytes().all(|x| x.is_ascii_digit()) => ordinal
            .parse::<usize>()
            .map_err(|_| KrmFnError::MalformedResultFileName(file_name.to_string())),
        _ => Err(KrmFnError::MalformedResultFileName(file_name.to_string())),
    }
}

/// Read the results in a result file.
pub fn read_result_file(path: &std::path::Path) -> Result<Vec<FunctionResult>, KrmFnError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => return Err(KrmFnError::ResourceParse(format!("cannot read {}: {}", path.display(), err))),
    };
    if content.trim().is_empty() {
        return Ok(vec![]);
    }
    serde_yaml::from_str::<Option<Vec<FunctionResult>>>(&content)
        .map(|x| x.unwrap_or_default())
        .map_err(|err| KrmFnError::ResourceParse(format!("invalid results in {}: {}", path.display(), err)))
}

/// Assemble the output of a pipeline run from its output stream and the
/// result files in `results_dir`.
///
/// The result file with ordinal `i` belongs to the function `names[i]`.
pub fn collect(output: &str, results_dir: &std::path::Path, names: &[&str]) -> Result<ResourceList, KrmFnError> {
    let items = parse_items(output)?;

    let entries = match std::fs::read_dir(results_dir) {
        Ok(entries) => entries,
        Err(err) => {
            return Err(KrmFnError::ResourceParse(format!(
                "cannot list the result directory {}: {}",
                results_dir.display(),
                err
            )))
        }
    };
    let mut result_files = vec![];
    for entry in entries {
        let entry = entry.map_err(|err| KrmFnError::ResourceParse(err.to_string()))?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let ordinal = parse_result_file_name(&file_name)?;
        if ordinal >= names.len() {
            return Err(KrmFnError::ResultIndexOutOfRange {
                file: file_name,
                ordinal,
                functions: names.len(),
            });
        }
        result_files.push((ordinal, entry.path()));
    }
    result_files.sort();

    let mut results = BTreeMap::new();
    let mut all_results: BTreeMap<String, Vec<FunctionResult>> = BTreeMap::new();
    for (ordinal, path) in result_files {
        let name = names[ordinal];
        let function_results = read_result_file(&path)?;
        log::debug!("function #{} '{}' emitted {} result(s)", ordinal, name, function_results.len());

        // With duplicate function names the first function wins.
        results
            .entry(name.to_string())
            .or_insert_with(|| function_results.first().cloned().unwrap_or_default());
        all_results.entry(name.to_string()).or_default().extend(function_results);
    }

    Ok(ResourceList {
        items,
        results,
        all_results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"apiVersion: v1
kind: Service
metadata:
  name: frontend
  annotations:
    config.kubernetes.io/index: '0'
    internal.config.kubernetes.io/index: '0'
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: frontend
  annotations:
    config.kubernetes.io/index: '1'
    internal.config.kubernetes.io/path: 'deployment.yaml'
    owner: team-a
"#;

    const RESULTS: &str = r#"- field:
    path: spec
  message: Error message
  resourceRef:
    apiVersion: v1
    kind: Pod
    name: bar
    namespace: foo-ns
  severity: error
- message: second message
  severity: warning
"#;

    #[test]
    fn test_read_result() {
        let results: Vec<FunctionResult> = serde_yaml::from_str(RESULTS).unwrap();
        assert_eq!(2, results.len());
        assert_eq!("Error message", results[0].message);
        assert_eq!(Severity::Error, results[0].severity);
        assert_eq!("spec", results[0].field.as_ref().unwrap().path);
        assert_eq!(
            Some(ResourceRef {
                api_version: "v1".to_string(),
                kind: "Pod".to_string(),
                name: "bar".to_string(),
                namespace: "foo-ns".to_string(),
            }),
            results[0].resource_ref
        );
        assert_eq!(Severity::Warning, results[1].severity);
        assert!(results[1].resource_ref.is_none());
    }

    #[test]
    fn test_severity_defaults_to_info() {
        let results: Vec<FunctionResult> = serde_yaml::from_str("- message: a\n- message: b\n  severity: ''\n").unwrap();
        assert!(results.iter().all(|x| x.severity == Severity::Info));
        assert!(serde_yaml::from_str::<Vec<FunctionResult>>("- severity: fatal\n").is_err());
    }

    #[test]
    fn test_parse_items_strips_bookkeeping() {
        let items = parse_items(OUTPUT).unwrap();
        assert_eq!(2, items.len());
        assert_eq!("Service", items[0].kind());
        assert!(items[0].get(&["metadata", "annotations"]).is_none());
        assert_eq!(
            BTreeMap::from([("owner".to_string(), "team-a".to_string())]),
            items[1].annotations()
        );
        assert!(parse_items("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_items_non_string_keys() {
        let items = parse_items("apiVersion: v1\nkind: ConfigMap\ndata:\n  1: one\n").unwrap();
        assert_eq!(
            BTreeMap::from([("1".to_string(), "one".to_string())]),
            items[0].data_map()
        );
    }

    #[test]
    fn test_parse_items_errors() {
        for output in ["kind: A\n---\n- not\n- a\n- resource\n", "kind: [\n"] {
            assert!(matches!(parse_items(output), Err(KrmFnError::ResourceParse(_))), "{}", output);
        }
    }

    #[test]
    fn test_parse_result_file_name() {
        assert_eq!(Ok(0), parse_result_file_name("results-0.yaml"));
        assert_eq!(Ok(12), parse_result_file_name("results-12.yaml"));
        assert_eq!(Ok(3), parse_result_file_name("my-results-3.yaml"));
        assert_eq!(Ok(1), parse_result_file_name("results-1"));
        for malformed in ["results.yaml", "results-.yaml", "-1.yaml", "results-x.yaml", "results-+1.yaml", "results-1.5.yaml"] {
            assert_eq!(
                Err(KrmFnError::MalformedResultFileName(malformed.to_string())),
                parse_result_file_name(malformed)
            );
        }
    }

    #[test]
    fn test_collect() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("results-0.yaml"), RESULTS).unwrap();
        std::fs::write(dir.path().join("results-1.yaml"), "[]\n").unwrap();
        std::fs::write(dir.path().join("results-2.yaml"), "- message: done\n").unwrap();

        let resource_list = collect(OUTPUT, dir.path(), &["Validate", "Set Labels", "Clean Metadata"]).unwrap();
        assert_eq!(2, resource_list.items.len());
        assert_eq!(3, resource_list.results.len());
        assert_eq!("Error message", resource_list.results["Validate"].message);
        assert_eq!(FunctionResult::default(), resource_list.results["Set Labels"]);
        assert_eq!("done", resource_list.results["Clean Metadata"].message);
        assert_eq!(2, resource_list.all_results["Validate"].len());
        assert!(resource_list.all_results["Set Labels"].is_empty());
        assert!(resource_list.has_errors());
    }

    #[test]
    fn test_collect_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("results-1.yaml"), "- message: second\n").unwrap();
        std::fs::write(dir.path().join("results-0.yaml"), "- message: first\n").unwrap();

        let resource_list = collect("", dir.path(), &["fn", "fn"]).unwrap();
        assert_eq!("first", resource_list.results["fn"].message);
        assert_eq!(
            vec!["first", "second"],
            resource_list.all_results["fn"].iter().map(|x| x.message.as_str()).collect::<Vec<&str>>()
        );
    }

    #[test]
    fn test_collect_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("results-2.yaml"), "[]\n").unwrap();
        assert_eq!(
            Err(KrmFnError::ResultIndexOutOfRange {
                file: "results-2.yaml".to_string(),
                ordinal: 2,
                functions: 2
            }),
            collect(OUTPUT, dir.path(), &["a", "b"])
        );
    }

    #[test]
    fn test_collect_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("results.yaml"), "[]\n").unwrap();
        assert_eq!(
            Err(KrmFnError::MalformedResultFileName("results.yaml".to_string())),
            collect(OUTPUT, dir.path(), &["a"])
        );

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("results-0.yaml"), "message: not a list\n").unwrap();
        assert!(matches!(collect(OUTPUT, dir.path(), &["a"]), Err(KrmFnError::ResourceParse(_))));
    }

    #[test]
    fn test_collect_no_partial_list() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            collect("kind: A\n---\nkind: [\n", dir.path(), &["a"]),
            Err(KrmFnError::ResourceParse(_))
        ));
    }
}
