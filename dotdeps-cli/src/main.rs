mod app;
mod console;
mod files;
mod output;
#[cfg(test)]
mod test_support;
mod visualizers;

use std::{io::Write, process::ExitCode, sync::Arc};

use clap::{CommandFactory, Parser};
use dotdeps::{
    diagnostics::LogSink,
    loader::PeMetadataLoader,
    redirect::{BindingRedirects, NoRedirect, RedirectPolicy},
    AnalysisOptions, DependencyAnalyzer,
};
use log::{error, Level, LevelFilter};

use crate::{
    app::Cli,
    output::{missing_table, print_json, AnalysisSummary},
    visualizers::{Visualizer, VisualizerOptions},
};

fn main() -> ExitCode {
    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    }) {
        eprintln!("failed to set Ctrl+C handler: {e}");
    }

    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Messages plain, warnings and errors in their level color, all on stderr.
/// `--silent` and `--json` keep warnings and errors only; RUST_LOG overrides.
fn init_logging(cli: &Cli) {
    let level = if cli.silent || cli.json {
        LevelFilter::Warn
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_module("dotdeps", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .format(|buf, record| match record.level() {
            Level::Error | Level::Warn => {
                let style = buf.default_level_style(record.level());
                writeln!(buf, "{style}{}{style:#}", record.args())
            }
            _ => writeln!(buf, "{}", record.args()),
        });
    if cli.no_color {
        builder.write_style(env_logger::WriteStyle::Never);
    }
    builder.init();
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let Some(directory_or_file) = &cli.directory_or_file else {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let sink = LogSink;
    let discovery = files::discover(directory_or_file, cli.include_sub, &sink)?;

    let redirects: Arc<dyn RedirectPolicy> = match &cli.configuration_file {
        Some(path) => Arc::new(BindingRedirects::from_config(path)?),
        None => Arc::new(NoRedirect),
    };

    let mut analyzer = DependencyAnalyzer::new(discovery.files)
        .with_loader(Arc::new(loader(cli)))
        .with_redirect_policy(redirects)
        .with_options(analysis_options(cli));
    if let Some(root_file) = discovery.root_file {
        analyzer = analyzer.with_root_file(root_file);
    }

    let result = analyzer.analyze(&sink);

    if cli.json {
        print_json(&AnalysisSummary::new(&result))?;
    }

    let options = VisualizerOptions::from_cli(cli);
    for visualizer in Visualizer::configured(cli) {
        visualizer.render(&result, &options, &sink)?;
    }

    if cli.fail_on_missing && !result.missing_assemblies().is_empty() {
        error!("Missing Assemblies");
        if !cli.json {
            missing_table(&result).print();
        }
        return Ok(ExitCode::from(2));
    }

    Ok(ExitCode::SUCCESS)
}

fn loader(cli: &Cli) -> PeMetadataLoader {
    let mut loader = PeMetadataLoader::new();
    if !cli.loader.no_default_gac {
        loader = loader.with_default_locations();
    }

    let loader = cli
        .loader
        .global_caches
        .iter()
        .fold(loader, |loader, dir| loader.with_global_cache(dir));
    cli.loader
        .search_paths
        .iter()
        .fold(loader, |loader, dir| loader.with_search_path(dir))
}

fn analysis_options(cli: &Cli) -> AnalysisOptions {
    let options = AnalysisOptions::new()
        .skip_system(cli.nonsystem)
        .only_conflicts(!cli.all)
        .referenced_name_prefix(cli.referenced_starts_with.clone().unwrap_or_default());

    cli.exclude
        .iter()
        .fold(options, |options, prefix| options.exclude(prefix.as_str()))
}
