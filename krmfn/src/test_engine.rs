// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

// In-process engines that do not need a container runtime.

use krmfn_engine::annotations::{set_annotation, INDEX_ANNOTATION, INTERNAL_INDEX_ANNOTATION};
use krmfn_engine::resource_list::{parse_stream, to_stream};
use krmfn_engine::{results_file_name, PipelineEngine, RunRequest};

type SeenDirs = std::sync::Mutex<Vec<(std::path::PathBuf, std::path::PathBuf)>>;

fn record(seen: &SeenDirs, request: &RunRequest) {
    seen.lock()
        .unwrap()
        .push((request.working_dir.to_path_buf(), request.results_dir.to_path_buf()));
}

fn add_label(item: &mut serde_yaml::Value, key: &serde_yaml::Value, value: &serde_yaml::Value) -> anyhow::Result<()> {
    let metadata = item
        .as_mapping_mut()
        .ok_or_else(|| anyhow::anyhow!("resource is not a mapping"))?
        .entry("metadata".into())
        .or_insert(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    let labels = metadata
        .as_mapping_mut()
        .ok_or_else(|| anyhow::anyhow!("metadata is not a mapping"))?
        .entry("labels".into())
        .or_insert(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    labels
        .as_mapping_mut()
        .ok_or_else(|| anyhow::anyhow!("labels is not a mapping"))?
        .insert(key.clone(), value.clone());
    Ok(())
}

/// Adds the configuration data of every function as labels of all the
/// resources, and emits one info result per function.
#[derive(Default)]
pub(crate) struct LabelingEngine {
    /// Number of result files written for functions that do not exist.
    pub(crate) extra_results: usize,
    pub(crate) seen: SeenDirs,
}

impl LabelingEngine {
    pub(crate) fn seen_dirs(&self) -> Vec<(std::path::PathBuf, std::path::PathBuf)> {
        self.seen.lock().unwrap().clone()
    }
}

impl PipelineEngine for LabelingEngine {
    fn run(&self, request: &RunRequest) -> anyhow::Result<String> {
        record(&self.seen, request);

        let mut items = parse_stream(request.input)?;
        for (index, item) in items.iter_mut().enumerate() {
            set_annotation(item, INDEX_ANNOTATION, &index.to_string())?;
            set_annotation(item, INTERNAL_INDEX_ANNOTATION, &index.to_string())?;
        }

        for (ordinal, function) in request.functions.iter().enumerate() {
            let mut applied = 0;
            if let Some(data) = function.get("data").and_then(|x| x.as_mapping()) {
                for (key, value) in data {
                    for item in items.iter_mut() {
                        add_label(item, key, value)?;
                    }
                    applied += 1;
                }
            }
            std::fs::write(
                request.results_dir.join(results_file_name(ordinal)),
                format!("- message: 'function #{} applied {} label(s)'\n  severity: info\n", ordinal, applied),
            )?;
        }

        for ordinal in request.functions.len()..request.functions.len() + self.extra_results {
            std::fs::write(request.results_dir.join(results_file_name(ordinal)), "[]\n")?;
        }

        to_stream(&items)
    }
}

/// Fails on the second function, after the first one wrote its results.
#[derive(Default)]
pub(crate) struct FailingEngine {
    pub(crate) seen: SeenDirs,
}

impl FailingEngine {
    pub(crate) fn seen_dirs(&self) -> Vec<(std::path::PathBuf, std::path::PathBuf)> {
        self.seen.lock().unwrap().clone()
    }
}

impl PipelineEngine for FailingEngine {
    fn run(&self, request: &RunRequest) -> anyhow::Result<String> {
        record(&self.seen, request);
        std::fs::write(request.results_dir.join(results_file_name(0)), "[]\n")?;
        anyhow::bail!("function #1 exploded")
    }
}
