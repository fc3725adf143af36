// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use std::io::Write;

use crate::annotations;
use crate::invocation::FunctionInvocation;
use crate::resource_list::{parse_stream, to_stream, ResourceListDocument};
use crate::settings::EngineSettings;

/// Engine running every function as a child process, either a container
/// started through the configured container runtime or a local executable.
///
/// Resources flow through the functions wrapped in a `ResourceList` written
/// on the function's stdin; the function writes its own `ResourceList` on
/// stdout.
#[derive(Debug, Clone, Default)]
pub struct ProcessEngine {
    settings: EngineSettings,
}

struct FunctionOutput {
    status: std::process::ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ProcessEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn command(&self, invocation: &FunctionInvocation, working_dir: &std::path::Path) -> std::process::Command {
        match invocation {
            FunctionInvocation::Container { image } => {
                let mut command = std::process::Command::new(&self.settings.container_runtime);
                command.args(["run", "--rm", "-i"]);
                if !self.settings.network {
                    command.args(["--network", "none"]);
                }
                if !self.settings.user.is_empty() {
                    command.args(["--user", &self.settings.user]);
                }
                command.arg("--security-opt=no-new-privileges");
                for (key, value) in &self.settings.env {
                    command.args(["-e", &format!("{}={}", key, value)]);
                }
                command.arg(image);
                command
            }
            FunctionInvocation::Exec { path } => {
                let mut command = std::process::Command::new(path);
                command.current_dir(working_dir).envs(&self.settings.env);
                command
            }
        }
    }

    fn invoke(&self, invocation: &FunctionInvocation, input: &[u8], working_dir: &std::path::Path) -> anyhow::Result<FunctionOutput> {
        let mut child = match self
            .command(invocation, working_dir)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => anyhow::bail!("could not start function {}: {}", invocation, err),
        };

        // Feed stdin from another thread, the function may start writing
        // before it has consumed the whole input.
        let mut stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => anyhow::bail!("could not open the stdin of function {}", invocation),
        };
        let output = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(input));
            let output = child.wait_with_output();
            if let Ok(Err(err)) = writer.join() {
                // A function is allowed to exit without reading its input.
                log::debug!("could not write the whole input to function {}: {}", invocation, err);
            }
            output
        })?;

        Ok(FunctionOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

fn read_invocation(function_config: &serde_yaml::Value) -> anyhow::Result<FunctionInvocation> {
    let value = annotations::annotations(function_config)
        .and_then(|x| x.get(annotations::FUNCTION_ANNOTATION))
        .and_then(|x| x.as_str());
    match value {
        Some(value) => FunctionInvocation::from_annotation(value),
        None => anyhow::bail!("function config without the {} annotation", annotations::FUNCTION_ANNOTATION),
    }
}

fn write_results(results_dir: &std::path::Path, ordinal: usize, results: &[serde_yaml::Value]) -> anyhow::Result<()> {
    let path = results_dir.join(crate::results_file_name(ordinal));
    std::fs::write(&path, serde_yaml::to_string(results)?)?;
    log::debug!("wrote {} result(s) to {}", results.len(), path.display());
    Ok(())
}

impl crate::PipelineEngine for ProcessEngine {
    fn run(&self, request: &crate::RunRequest) -> anyhow::Result<String> {
        let mut items = parse_stream(request.input)?;
        for (index, item) in items.iter_mut().enumerate() {
            let index = index.to_string();
            annotations::set_annotation(item, annotations::INDEX_ANNOTATION, &index)?;
            annotations::set_annotation(item, annotations::INTERNAL_INDEX_ANNOTATION, &index)?;
        }

        for (ordinal, function_config) in request.functions.iter().enumerate() {
            let invocation = read_invocation(function_config)?;
            log::info!("running function #{} ({}) on {} resource(s)", ordinal, invocation, items.len());

            let input = serde_yaml::to_string(&ResourceListDocument::new(items, function_config.clone()))?;
            let output = self.invoke(&invocation, input.as_bytes(), request.working_dir)?;
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                log::debug!("function #{} ({}) stderr: {}", ordinal, invocation, stderr.trim());
            }

            if !output.status.success() {
                // Keep whatever structured results the function managed to emit.
                let results = ResourceListDocument::parse(&output.stdout).map(|x| x.results).unwrap_or_default();
                write_results(request.results_dir, ordinal, &results)?;
                anyhow::bail!(
                    "function #{} ({}) failed with {}: {}",
                    ordinal,
                    invocation,
                    output.status,
                    stderr.trim()
                );
            }

            let document = match ResourceListDocument::parse(&output.stdout) {
                Ok(document) => document,
                Err(err) => {
                    write_results(request.results_dir, ordinal, &[])?;
                    anyhow::bail!("function #{} ({}) produced an invalid output: {}", ordinal, invocation, err);
                }
            };
            write_results(request.results_dir, ordinal, &document.results)?;
            items = document.items;
        }

        to_stream(&items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineEngine;

    const INPUT: &str = r#"apiVersion: v1
kind: Service
metadata:
  name: frontend
  labels:
    app: guestbook
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: frontend
"#;

    #[cfg(unix)]
    fn testdata_function(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name);
        path.to_str().unwrap().to_string()
    }

    fn exec_config(path: &str) -> serde_yaml::Value {
        let mut config: serde_yaml::Value = serde_yaml::from_str("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: function-input\ndata: {}\n").unwrap();
        annotations::set_annotation(
            &mut config,
            annotations::FUNCTION_ANNOTATION,
            &FunctionInvocation::Exec { path: path.to_string() }.to_annotation(),
        )
        .unwrap();
        config
    }

    fn read_results(dir: &std::path::Path, ordinal: usize) -> Vec<serde_yaml::Value> {
        serde_yaml::from_str(&std::fs::read_to_string(dir.join(crate::results_file_name(ordinal))).unwrap()).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_testdata_functions_are_executable() {
        use std::os::unix::fs::PermissionsExt;
        for name in ["passthrough.sh", "generate.sh", "working-dir.sh", "fail.sh"] {
            let mode = std::fs::metadata(testdata_function(name)).unwrap().permissions().mode();
            assert_ne!(0, mode & 0o111, "{} is not executable", name);
        }
    }

    #[test]
    fn test_container_command_line() {
        let engine = ProcessEngine::new(EngineSettings {
            env: std::collections::BTreeMap::from([("LOG_LEVEL".to_string(), "debug".to_string())]),
            ..Default::default()
        });
        let command = engine.command(
            &FunctionInvocation::Container {
                image: "gcr.io/kpt-fn/set-labels:v0.1".to_string(),
            },
            std::path::Path::new("/tmp"),
        );
        assert_eq!("docker", command.get_program());
        let args: Vec<&std::ffi::OsStr> = command.get_args().collect();
        assert_eq!(
            vec![
                "run",
                "--rm",
                "-i",
                "--network",
                "none",
                "--user",
                "nobody",
                "--security-opt=no-new-privileges",
                "-e",
                "LOG_LEVEL=debug",
                "gcr.io/kpt-fn/set-labels:v0.1"
            ],
            args
        );

        let engine = ProcessEngine::new(EngineSettings {
            container_runtime: "podman".to_string(),
            network: true,
            user: String::new(),
            ..Default::default()
        });
        let command = engine.command(&FunctionInvocation::Container { image: "fn:v1".to_string() }, std::path::Path::new("/tmp"));
        assert_eq!("podman", command.get_program());
        let args: Vec<&std::ffi::OsStr> = command.get_args().collect();
        assert_eq!(vec!["run", "--rm", "-i", "--security-opt=no-new-privileges", "fn:v1"], args);
    }

    #[test]
    fn test_missing_annotation() {
        let results_dir = tempfile::tempdir().unwrap();
        let config: serde_yaml::Value = serde_yaml::from_str("apiVersion: v1\nkind: ConfigMap\n").unwrap();
        let res = ProcessEngine::default().run(&crate::RunRequest {
            functions: &[config],
            input: INPUT,
            working_dir: results_dir.path(),
            results_dir: results_dir.path(),
        });
        assert!(res.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_passthrough_function() {
        let working_dir = tempfile::tempdir().unwrap();
        let results_dir = tempfile::tempdir().unwrap();
        let functions = vec![exec_config(&testdata_function("passthrough.sh")), exec_config(&testdata_function("passthrough.sh"))];

        let output = ProcessEngine::default()
            .run(&crate::RunRequest {
                functions: &functions,
                input: INPUT,
                working_dir: working_dir.path(),
                results_dir: results_dir.path(),
            })
            .unwrap();

        let items = parse_stream(&output).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["kind"].as_str(), Some("Service"));
        assert_eq!(items[1]["kind"].as_str(), Some("Deployment"));
        assert_eq!(
            items[1]["metadata"]["annotations"][annotations::INDEX_ANNOTATION].as_str(),
            Some("1")
        );
        assert_eq!(items[0]["metadata"]["labels"]["app"].as_str(), Some("guestbook"));

        assert!(read_results(results_dir.path(), 0).is_empty());
        assert!(read_results(results_dir.path(), 1).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_function_with_results() {
        let working_dir = tempfile::tempdir().unwrap();
        let results_dir = tempfile::tempdir().unwrap();
        let functions = vec![exec_config(&testdata_function("generate.sh"))];

        let output = ProcessEngine::default()
            .run(&crate::RunRequest {
                functions: &functions,
                input: INPUT,
                working_dir: working_dir.path(),
                results_dir: results_dir.path(),
            })
            .unwrap();

        let items = parse_stream(&output).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["metadata"]["name"].as_str(), Some("generated"));

        let results = read_results(results_dir.path(), 0);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["message"].as_str(), Some("generated one config map"));
        assert_eq!(results[1]["severity"].as_str(), Some("warning"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_runs_in_working_dir() {
        let working_dir = tempfile::tempdir().unwrap();
        let results_dir = tempfile::tempdir().unwrap();
        let functions = vec![exec_config(&testdata_function("working-dir.sh"))];

        let output = ProcessEngine::default()
            .run(&crate::RunRequest {
                functions: &functions,
                input: INPUT,
                working_dir: working_dir.path(),
                results_dir: results_dir.path(),
            })
            .unwrap();

        let items = parse_stream(&output).unwrap();
        let reported = std::path::PathBuf::from(items[0]["metadata"]["name"].as_str().unwrap());
        assert_eq!(
            std::fs::canonicalize(working_dir.path()).unwrap(),
            std::fs::canonicalize(reported).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_function() {
        let working_dir = tempfile::tempdir().unwrap();
        let results_dir = tempfile::tempdir().unwrap();
        let functions = vec![
            exec_config(&testdata_function("passthrough.sh")),
            exec_config(&testdata_function("fail.sh")),
            exec_config(&testdata_function("passthrough.sh")),
        ];

        let err = ProcessEngine::default()
            .run(&crate::RunRequest {
                functions: &functions,
                input: INPUT,
                working_dir: working_dir.path(),
                results_dir: results_dir.path(),
            })
            .unwrap_err();
        let message = format!("{}", err);
        assert!(message.contains("function #1"), "{}", message);
        assert!(message.contains("replicas must be positive"), "{}", message);

        let results = read_results(results_dir.path(), 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["severity"].as_str(), Some("error"));

        // The pipeline stops at the failing function.
        assert!(!results_dir.path().join(crate::results_file_name(2)).exists());
    }

    #[test]
    fn test_missing_executable() {
        let working_dir = tempfile::tempdir().unwrap();
        let missing = working_dir.path().join("does-not-exist");
        let functions = vec![exec_config(missing.to_str().unwrap())];
        let res = ProcessEngine::default().run(&crate::RunRequest {
            functions: &functions,
            input: INPUT,
            working_dir: working_dir.path(),
            results_dir: working_dir.path(),
        });
        assert!(res.is_err());
    }
}
