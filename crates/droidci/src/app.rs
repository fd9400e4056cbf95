use anyhow::{Context, Result};
use chrono::Local;
use droidci::pipeline::descriptor::ProjectDescriptor;
use droidci::pipeline::manifest::{self, MANIFEST_FILE};
use droidci::pipeline::summary::RunSummary;
use droidci::{Config, Pipeline, SystemExecutor, Target};
use tracing::info;

pub fn run(cli: crate::cli::Cli) -> Result<()> {
    let config = Config::resolve(cli.opts.overrides())?;

    match cli.cmd {
        crate::cli::Cmd::Run { summary } => run_pipeline(&config, summary.as_deref()),
        crate::cli::Cmd::Descriptor { target } => {
            print!("{}", ProjectDescriptor::for_target(target, &config).to_xml());
            Ok(())
        }
        crate::cli::Cmd::PatchManifest => {
            let path = config.source_dir(Target::Tests).join(MANIFEST_FILE);
            if manifest::patch_if_default(&path)? {
                info!(path = %path.display(), "switched test runner to the JUnit report runner");
            } else {
                info!(path = %path.display(), "default test runner not present, nothing to do");
            }
            Ok(())
        }
        crate::cli::Cmd::Clean => {
            let exec = SystemExecutor::new(config.command_timeout);
            Pipeline::new(&config, &exec).cleanup();
            Ok(())
        }
        crate::cli::Cmd::Uninstall => {
            let exec = SystemExecutor::new(config.command_timeout);
            Pipeline::new(&config, &exec).uninstall()?;
            Ok(())
        }
        crate::cli::Cmd::Config => {
            let settings =
                toml::to_string_pretty(&config.to_settings()).context("Serializing settings")?;
            print!("{settings}");
            Ok(())
        }
    }
}

fn run_pipeline(config: &Config, summary_path: Option<&std::path::Path>) -> Result<()> {
    println!("\n --------------------- BEGIN --------------------- ");
    println!(" {}", Local::now().format("%Y-%m-%d %H:%M:%S %z"));
    info!(
        workspace = %config.workspace.display(),
        package = %config.package_name(),
        device = %config.device,
        "starting pipeline"
    );

    let exec = SystemExecutor::new(config.command_timeout);
    let mut summary = RunSummary::start();
    let result = Pipeline::new(config, &exec).run_recorded(&mut summary);

    if let Some(path) = summary_path {
        summary
            .write_to(path)
            .with_context(|| format!("Writing run summary to {}", path.display()))?;
    }

    result?;
    println!(" ---------------------- END ---------------------- \n");
    Ok(())
}
