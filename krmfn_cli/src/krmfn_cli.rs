// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT
use clap::Parser;

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Run the pipeline described in a YAML or JSON file.
    Run {
        spec_file: String,
        /// Print all the results of every function, not only the first one.
        #[arg(long, default_value_t = false)]
        all_results: bool,
        /// Print the resources and the results as a single JSON document.
        #[arg(long, default_value_t = false)]
        output_json: bool,
    },
    /// Check a function image reference.
    Validate { image: String },
}

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(short, long, default_value_t = String::from("krmfn.toml"))]
    config_file: String,
    #[arg(short, long, default_value_t = String::from(""))]
    template: String,
}

fn read_conf_from_file(filename: &str) -> anyhow::Result<krmfn_engine::EngineSettings> {
    Ok(toml::from_str::<krmfn_engine::EngineSettings>(&std::fs::read_to_string(filename)?)?)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    // Create a template engine configuration and exit.
    if !args.template.is_empty() {
        krmfn_cli::create_template(&args.template, krmfn_engine::engine_default_conf().as_str())?;
        return Ok(());
    }

    match args.command {
        None => log::debug!("Bye"),
        Some(Commands::Validate { image }) => {
            krmfn::validate_function_image(&image)?;
            println!("{}: valid", image);
        }
        Some(Commands::Run {
            spec_file,
            all_results,
            output_json,
        }) => {
            let settings = match std::path::Path::new(&args.config_file).exists() {
                true => read_conf_from_file(&args.config_file)?,
                false => {
                    log::info!("configuration file {} not found, using the default settings", args.config_file);
                    krmfn_engine::EngineSettings::default()
                }
            };
            log::debug!("engine settings: {:?}", settings);

            let spec_file = std::path::PathBuf::from(spec_file);
            let pipeline_spec = krmfn_cli::pipeline_spec::PipelineSpec::from_file(&spec_file)?;
            let parent_path = match spec_file.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => std::path::PathBuf::from("."),
            };

            let runner = krmfn_cli::pipeline_spec_to_runner(
                pipeline_spec,
                &parent_path,
                std::sync::Arc::new(krmfn::ProcessEngine::new(settings)),
            )?
            .build()?;
            let resource_list = runner.execute()?;

            if output_json {
                println!("{}", serde_json::to_string_pretty(&resource_list)?);
            } else {
                let (items, results) = krmfn_cli::format_resource_list(&resource_list, all_results)?;
                print!("{}", items);
                eprint!("{}", results);
            }
            anyhow::ensure!(!resource_list.has_errors(), "at least one function reported an error");
        }
    }
    Ok(())
}
