// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Annotation of a function configuration describing how to invoke the function.
pub const FUNCTION_ANNOTATION: &str = "config.kubernetes.io/function";

pub const INDEX_ANNOTATION: &str = "config.kubernetes.io/index";
pub const PATH_ANNOTATION: &str = "config.kubernetes.io/path";
pub const INTERNAL_INDEX_ANNOTATION: &str = "internal.config.kubernetes.io/index";
pub const INTERNAL_PATH_ANNOTATION: &str = "internal.config.kubernetes.io/path";
pub const SEQ_INDENT_ANNOTATION: &str = "internal.config.kubernetes.io/seqindent";

/// Bookkeeping annotations that only make sense inside the pipeline and must
/// be removed before resources are handed back to callers.
pub const BOOKKEEPING_ANNOTATIONS: [&str; 5] = [
    INDEX_ANNOTATION,
    PATH_ANNOTATION,
    INTERNAL_INDEX_ANNOTATION,
    INTERNAL_PATH_ANNOTATION,
    SEQ_INDENT_ANNOTATION,
];

/// Return the annotations of a resource, if it has any.
pub fn annotations(resource: &serde_yaml::Value) -> Option<&serde_yaml::Mapping> {
    resource.get("metadata")?.get("annotations")?.as_mapping()
}

/// Set an annotation, creating `metadata` and `metadata.annotations` if needed.
pub fn set_annotation(resource: &mut serde_yaml::Value, key: &str, value: &str) -> anyhow::Result<()> {
    let resource = match resource.as_mapping_mut() {
        Some(resource) => resource,
        None => anyhow::bail!("resource is not a mapping, cannot set annotation {}", key),
    };
    let metadata = resource
        .entry("metadata".into())
        .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    let metadata = match metadata.as_mapping_mut() {
        Some(metadata) => metadata,
        None => anyhow::bail!("metadata is not a mapping, cannot set annotation {}", key),
    };
    let annotations = metadata
        .entry("annotations".into())
        .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    match annotations.as_mapping_mut() {
        Some(annotations) => {
            annotations.insert(key.into(), value.into());
            Ok(())
        }
        None => anyhow::bail!("annotations are not a mapping, cannot set annotation {}", key),
    }
}

/// Remove the bookkeeping annotations of a resource. The annotations field
/// is dropped altogether if nothing else is left in it.
pub fn clear_bookkeeping_annotations(resource: &mut serde_yaml::Value) {
    let metadata = match resource.get_mut("metadata").and_then(|x| x.as_mapping_mut()) {
        Some(metadata) => metadata,
        None => return,
    };
    let now_empty = match metadata.get_mut("annotations").and_then(|x| x.as_mapping_mut()) {
        Some(annotations) => {
            for key in BOOKKEEPING_ANNOTATIONS {
                annotations.remove(key);
            }
            annotations.is_empty()
        }
        None => false,
    };
    if now_empty {
        metadata.remove("annotations");
    }
}
