use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use datepress::build::{build_site, parse_posts, resolve_routes};
use datepress::config::Config;
use log::info;
use std::path::{Path, PathBuf};

fn common_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name("project")
            .long("project")
            .short("p")
            .takes_value(true)
            .value_name("DIR")
            .help("Directory containing datepress.yaml (or a descendant of it)"),
        Arg::with_name("environment")
            .long("environment")
            .short("e")
            .takes_value(true)
            .value_name("NAME")
            .help("Apply the overrides of the named environment"),
    ]
}

fn load_config(matches: &ArgMatches, output: Option<&Path>) -> Result<Config> {
    let project = match matches.value_of("project") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("Getting the current directory")?,
    };
    let project = project
        .canonicalize()
        .with_context(|| format!("Resolving project directory `{}`", project.display()))?;
    Config::from_directory(&project, output, matches.value_of("environment"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("datepress")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site into the output directory")
                .args(&common_args())
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .takes_value(true)
                        .value_name("DIR")
                        .help("Output directory (defaults to `build` beside datepress.yaml)"),
                ),
        )
        .subcommand(
            SubCommand::with_name("routes")
                .about("Prints the permalink of every post without building")
                .args(&common_args()),
        )
        .get_matches();

    match matches.subcommand() {
        ("build", Some(matches)) => {
            let config = load_config(matches, matches.value_of("output").map(Path::new))?;
            info!(
                "building {} into {}",
                config.source_directory.display(),
                config.output_directory.display()
            );
            let summary = build_site(&config).context("Building site")?;
            info!("built {} posts into {} pages", summary.posts, summary.pages);
        }
        ("routes", Some(matches)) => {
            let config = load_config(matches, None)?;
            let posts = parse_posts(&config)?;
            for (post, route) in posts.iter().zip(resolve_routes(&config, &posts)?) {
                println!("{} -> {}", post.source_path.display(), route.permalink);
            }
        }
        _ => unreachable!("clap requires a subcommand"),
    }
    Ok(())
}
