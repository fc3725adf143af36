// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use pipeline_spec::PipelineSpec;

pub mod pipeline_spec;

fn resolve(parent_path: &std::path::Path, path: &str) -> std::path::PathBuf {
    let path = std::path::Path::new(path);
    match path.is_absolute() {
        true => path.to_path_buf(),
        false => parent_path.join(path),
    }
}

/// Fill a runner builder with the content of a pipeline specification.
///
/// Errors in the functions or the working directory are left in the builder.
pub fn pipeline_spec_to_runner(
    pipeline_spec: PipelineSpec,
    parent_path: &std::path::Path,
    engine: std::sync::Arc<dyn krmfn::PipelineEngine>,
) -> anyhow::Result<krmfn::RunnerBuilder> {
    let mut builder = krmfn::RunnerBuilder::new().with_engine(engine);
    for input in &pipeline_spec.inputs {
        let path = resolve(parent_path, input);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(err) => anyhow::bail!("cannot read input {}: {}", path.display(), err),
        };
        builder = builder.with_input(raw);
    }

    let functions = pipeline_spec.functions.into_iter().map(|mut function| {
        let exec = match function.image() {
            Some(_) => None,
            None => function.exec().map(|x| resolve(parent_path, x).to_string_lossy().to_string()),
        };
        if exec.is_some() {
            function.exec = exec;
        }
        function
    });
    builder = builder.with_functions(functions);

    if let Some(working_dir) = &pipeline_spec.working_dir {
        builder = builder.where_exec_working_dir(resolve(parent_path, working_dir));
    }
    Ok(builder)
}

/// Render the output of a pipeline: the resources as a multi-document YAML
/// stream, then the results.
pub fn format_resource_list(resource_list: &krmfn::ResourceList, all_results: bool) -> anyhow::Result<(String, String)> {
    let items = resource_list
        .items
        .iter()
        .map(|x| x.to_yaml())
        .collect::<Result<Vec<String>, krmfn::KrmFnError>>()?;
    let results = match all_results {
        true => serde_yaml::to_string(&resource_list.all_results)?,
        false => serde_yaml::to_string(&resource_list.results)?,
    };
    Ok((items.join(krmfn_engine::ITEM_SEPARATOR), results))
}

/// Write a configuration template, unless the file already exists.
pub fn create_template(path: &str, content: &str) -> anyhow::Result<()> {
    anyhow::ensure!(!path.is_empty(), "empty path for the configuration template");
    match std::path::Path::new(&path).exists() {
        true => anyhow::bail!("cannot overwrite configuration file: {}", path),
        false => {
            std::fs::write(path, content)?;
            Ok(())
        }
    }
}
