use std::path::PathBuf;

use clap::{Args, Parser};

/// dotdeps - list .NET assembly references and find version conflicts
#[derive(Debug, Parser)]
#[command(name = "dotdeps", version, about, long_about = None)]
pub struct Cli {
    /// The directory to search for assemblies, or the path of a single root assembly.
    #[arg(value_name = "DIRECTORY_OR_FILE")]
    pub directory_or_file: Option<PathBuf>,

    /// Do not show any message, only warnings and errors will be shown.
    #[arg(short, long)]
    pub silent: bool,

    /// Ignore 'System' assemblies.
    #[arg(short, long)]
    pub nonsystem: bool,

    /// List all assemblies and references, not only conflicting ones.
    #[arg(short, long)]
    pub all: bool,

    /// Only analyze references whose full name starts with the given value.
    #[arg(long = "referencedstartswith", visible_alias = "rsw", value_name = "PREFIX")]
    pub referenced_starts_with: Option<String>,

    /// A partial assembly name which should be excluded. Can be given multiple times.
    #[arg(short, long, value_name = "PREFIX")]
    pub exclude: Vec<String>,

    /// Include subdirectories in search.
    #[arg(short, long = "includesub")]
    pub include_sub: bool,

    /// Use the binding redirects of the given configuration file (Web.config or App.config).
    #[arg(short, long = "configurationFile", value_name = "FILE")]
    pub configuration_file: Option<PathBuf>,

    /// Exit with an error code when assemblies could not be found.
    #[arg(short, long = "failOnMissing")]
    pub fail_on_missing: bool,

    #[command(flatten)]
    pub visualizers: VisualizerArgs,

    #[command(flatten)]
    pub loader: LoaderArgs,

    /// Print a JSON summary of the analysis instead of the console views.
    #[arg(long)]
    pub json: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Switches selecting the visualizers and exporters.
#[derive(Debug, Args)]
pub struct VisualizerArgs {
    /// Do not show references on console.
    #[arg(long = "noconsole", visible_alias = "nc")]
    pub no_console: bool,

    /// Output a console tree view of dependencies.
    #[arg(long, visible_alias = "tr")]
    pub tree: bool,

    /// Show unreferenced assembly files on console.
    #[arg(long, visible_alias = "ua")]
    pub unref: bool,

    /// Export to a DGML file.
    #[arg(long, visible_alias = "dg", value_name = "FILE")]
    pub dgml: Option<PathBuf>,

    /// Show the assembly version on DGML node labels.
    #[arg(long = "dgshowversion", visible_alias = "dgsv")]
    pub dgml_show_version: bool,

    /// Export to a DOT file.
    #[arg(long, visible_alias = "dt", value_name = "FILE")]
    pub dot: Option<PathBuf>,

    /// Export to an XML file.
    #[arg(short = 'x', long, value_name = "FILE")]
    pub xml: Option<PathBuf>,

    /// Create binding redirects for conflicting assemblies.
    #[arg(short = 'b', long = "bindingredirect", value_name = "FILE")]
    pub binding_redirect: Option<PathBuf>,
}

/// Where identities that no input file provides are looked up.
#[derive(Debug, Args)]
pub struct LoaderArgs {
    /// Additional global assembly cache root. Can be given multiple times.
    #[arg(long = "gac", value_name = "DIR")]
    pub global_caches: Vec<PathBuf>,

    /// Additional directory probed for <Name>.dll and <Name>.exe. Can be given multiple times.
    #[arg(long = "search", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,

    /// Do not probe the well-known Mono and .NET Framework cache locations.
    #[arg(long)]
    pub no_default_gac: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_original_switches() {
        let cli = Cli::parse_from([
            "dotdeps",
            "bin",
            "-n",
            "-a",
            "--rsw",
            "Contoso",
            "-e",
            "Contoso.Tests",
            "-e",
            "Contoso.Mocks",
            "-i",
            "-c",
            "App.config",
            "-f",
            "--nc",
            "--tr",
            "--dg",
            "out.dgml",
            "--dgsv",
            "-x",
            "out.xml",
            "-b",
            "redirects.config",
        ]);

        assert_eq!(cli.directory_or_file, Some(PathBuf::from("bin")));
        assert!(cli.nonsystem && cli.all && cli.include_sub && cli.fail_on_missing);
        assert_eq!(cli.referenced_starts_with.as_deref(), Some("Contoso"));
        assert_eq!(cli.exclude, vec!["Contoso.Tests", "Contoso.Mocks"]);
        assert_eq!(cli.configuration_file, Some(PathBuf::from("App.config")));
        assert!(cli.visualizers.no_console && cli.visualizers.tree);
        assert!(cli.visualizers.dgml_show_version);
        assert_eq!(cli.visualizers.dgml, Some(PathBuf::from("out.dgml")));
        assert_eq!(cli.visualizers.xml, Some(PathBuf::from("out.xml")));
        assert_eq!(
            cli.visualizers.binding_redirect,
            Some(PathBuf::from("redirects.config"))
        );
    }

    #[test]
    fn long_names() {
        let cli = Cli::parse_from([
            "dotdeps",
            "--referencedstartswith",
            "X",
            "--configurationFile",
            "Web.config",
            "--failOnMissing",
            "--dot",
            "graph.dot",
            "--unref",
            "--gac",
            "/gac",
            "--search",
            "/lib",
            "--no-default-gac",
            "--json",
            "--no-color",
        ]);

        assert!(cli.directory_or_file.is_none());
        assert_eq!(cli.visualizers.dot, Some(PathBuf::from("graph.dot")));
        assert!(cli.visualizers.unref);
        assert_eq!(cli.loader.global_caches, vec![PathBuf::from("/gac")]);
        assert_eq!(cli.loader.search_paths, vec![PathBuf::from("/lib")]);
        assert!(cli.loader.no_default_gac && cli.json && cli.no_color);
    }
}
