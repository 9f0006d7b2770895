use clap::builder::BoolishValueParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};

use filesync::config::{Config, DiffConfig, PatternMode, RunConfig, SyncPair};
use filesync::logging::*;
use filesync::sync::SyncSession;
use filesync::watch;

///////////////////////
// Argument builders //
///////////////////////

fn bool_arg(id: &'static str, help: &'static str) -> Arg {
	Arg::new(id).long(id).value_name("BOOL").value_parser(BoolishValueParser::new()).help(help)
}

fn csv_arg(id: &'static str, help: &'static str) -> Arg {
	Arg::new(id).long(id).value_name("LIST").help(help)
}

fn diff_args() -> Vec<Arg> {
	vec![
		csv_arg("filters", "Only include paths matching one of these patterns"),
		csv_arg("excludes", "Skip paths matching one of these patterns"),
		csv_arg("filelist", "Only compare these paths (absolute or root-relative)"),
		Arg::new("pattern-mode")
			.long("pattern-mode")
			.value_name("MODE")
			.value_parser(value_parser!(PatternMode))
			.help("How patterns are interpreted: literal, regex or glob"),
		bool_arg("include-dirs", "Report directories in create/update"),
		Arg::new("time-precision")
			.long("time-precision")
			.value_name("DIGITS")
			.value_parser(value_parser!(u32))
			.help("Decimal digits of mtime compared"),
		bool_arg("recursive", "Descend into subdirectories"),
		bool_arg("newer", "Only update if the source file is newer than the destination"),
		bool_arg("force-update", "Update every common file regardless of mtime"),
		Arg::new("size-limit")
			.long("size-limit")
			.value_name("KB")
			.value_parser(value_parser!(u64))
			.help("Skip files smaller than this many kilobytes"),
	]
}

fn run_args() -> Vec<Arg> {
	vec![
		bool_arg("create", "Create files that don't currently exist in destination"),
		bool_arg("update", "Update files that are changed in the source folder"),
		bool_arg("purge", "Delete files that don't exist in the source folder"),
		bool_arg("make-target", "Create missing destination directories"),
		bool_arg("trimmed", "Apply the trimmed change set"),
		bool_arg("force-ownership", "Make read-only destination files writable before copying"),
		bool_arg("errors-to-debug", "Log per-file failures at debug level"),
	]
}

fn cli() -> Command {
	Command::new("filesync")
		.version(env!("CARGO_PKG_VERSION"))
		.author("Szilard Hajba <szilu@symbion.hu>")
		.about("One-way directory mirroring")
		.subcommand_required(true)
		.arg(
			Arg::new("source")
				.short('s')
				.long("source")
				.value_name("DIRS")
				.global(true)
				.help("Source folders (comma separated)"),
		)
		.arg(
			Arg::new("destination")
				.short('d')
				.long("destination")
				.value_name("DIRS")
				.global(true)
				.help("Destination folders (comma separated)"),
		)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.global(true)
				.help("Config file (toml, json or json5)"),
		)
		.arg(
			Arg::new("json")
				.long("json")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Print reports as JSON"),
		)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Debug logging"),
		)
		.subcommand(Command::new("diff").about("Show what a sync would change").args(diff_args()))
		.subcommand(
			Command::new("run")
				.about("Diff and apply the selected operations")
				.args(diff_args())
				.args(run_args())
				.arg(
					Arg::new("dry-run")
						.long("dry-run")
						.action(ArgAction::SetTrue)
						.help("Report what would be done without touching the destination"),
				),
		)
		.subcommand(
			Command::new("watch")
				.about("Watch the source folders and mirror changes to the destinations")
				.args(diff_args())
				.args(run_args())
				.arg(
					Arg::new("interval")
						.long("interval")
						.value_name("SECS")
						.value_parser(value_parser!(u64))
						.help("Seconds between cycles"),
				)
				.arg(Arg::new("watch-title").long("watch-title").value_name("TITLE").help("Banner title"))
				.arg(
					Arg::new("watch-message")
						.long("watch-message")
						.value_name("MESSAGE")
						.help("Banner message (\\n for new lines)"),
				),
		)
}

///////////////////////
// Utility functions //
///////////////////////

fn split_csv(value: &str) -> Vec<String> {
	value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn csv(matches: &ArgMatches, id: &str) -> Option<Vec<String>> {
	matches.get_one::<String>(id).map(|s| split_csv(s))
}

fn flag(matches: &ArgMatches, id: &str) -> Option<bool> {
	matches.get_one::<bool>(id).copied()
}

/// CLI flags override the loaded diff configuration
fn apply_diff_args(mut config: DiffConfig, m: &ArgMatches) -> DiffConfig {
	if let Some(v) = csv(m, "filters") {
		config.filters = v;
	}
	if let Some(v) = csv(m, "excludes") {
		config.excludes = v;
	}
	if let Some(v) = csv(m, "filelist") {
		config.filelist = v.into_iter().map(PathBuf::from).collect();
	}
	if let Some(v) = m.get_one::<PatternMode>("pattern-mode") {
		config.pattern_mode = *v;
	}
	if let Some(v) = flag(m, "include-dirs") {
		config.include_dirs = v;
	}
	if let Some(v) = m.get_one::<u32>("time-precision") {
		config.time_precision = *v;
	}
	if let Some(v) = flag(m, "recursive") {
		config.recursive = v;
	}
	if let Some(v) = flag(m, "newer") {
		config.newer = v;
	}
	if let Some(v) = flag(m, "force-update") {
		config.force_update = v;
	}
	if let Some(v) = m.get_one::<u64>("size-limit") {
		config.size_limit_kb = *v;
	}
	config
}

fn apply_run_args(mut config: RunConfig, m: &ArgMatches) -> RunConfig {
	let fields: [(&str, &mut bool); 7] = [
		("create", &mut config.create),
		("update", &mut config.update),
		("purge", &mut config.purge),
		("make-target", &mut config.make_target),
		("trimmed", &mut config.trimmed),
		("force-ownership", &mut config.force_ownership),
		("errors-to-debug", &mut config.errors_to_debug),
	];
	for (id, field) in fields {
		if let Some(v) = flag(m, id) {
			*field = v;
		}
	}
	config
}

/// Source/destination pairs from the CLI, falling back to the config file
fn resolve_pairs(m: &ArgMatches, config: &Config) -> Result<Vec<SyncPair>, Box<dyn Error>> {
	let sources = csv(m, "source").unwrap_or_default();
	let destinations = csv(m, "destination").unwrap_or_default();

	if sources.is_empty() && destinations.is_empty() {
		if config.pairs.is_empty() {
			return Err("Please supply both a source and destination folder.".into());
		}
		return Ok(config.pairs.clone());
	}
	if sources.len() != destinations.len() {
		return Err("Number of sources and destinations don't match.".into());
	}
	Ok(sources.iter().zip(destinations.iter()).map(|(s, d)| SyncPair::new(s, d)).collect())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = cli().get_matches();
	let (name, sub) = matches.subcommand().ok_or("a subcommand is required")?;

	let verbose = sub.get_flag("verbose");
	filesync::logging::init_tracing(if verbose { "debug" } else { "info" });

	let config_path = sub.get_one::<String>("config");
	let mut config = match config_path {
		Some(path) => Config::load(Path::new(path))?,
		None => Config::default(),
	};
	let pairs = resolve_pairs(sub, &config)?;
	let json = sub.get_flag("json");

	config.diff = apply_diff_args(config.diff, sub);

	match name {
		"diff" => {
			for pair in &pairs {
				let mut session =
					SyncSession::new(&pair.source, &pair.destination, config.diff.clone(), config.run.clone());
				session.diff()?;
				debug!("options: {:?}", session.options());
				match session.original() {
					Some(diff) if json => println!("{}", diff.to_json()?),
					Some(_) => println!("{}", session.diff_report().unwrap_or_default()),
					None => warn!("nothing to diff for {}", pair.source.display()),
				}
			}
		}
		"run" => {
			config.run = apply_run_args(config.run, sub);
			let dry_run = sub.get_flag("dry-run");
			for pair in &pairs {
				let mut session =
					SyncSession::new(&pair.source, &pair.destination, config.diff.clone(), config.run.clone());
				session.diff()?;
				let outcome = session.run(false, dry_run)?;
				debug!("run finished: {:?}", outcome);
				if json {
					println!("{}", serde_json::to_string_pretty(session.stats())?);
				} else {
					println!("{}", session.run_report());
				}
			}
		}
		"watch" => {
			if config_path.is_none() {
				config.run.create = true;
				config.run.update = true;
			}
			config.run = apply_run_args(config.run, sub);
			if let Some(secs) = sub.get_one::<u64>("interval") {
				config.watch.interval_secs = *secs;
			}
			if let Some(title) = sub.get_one::<String>("watch-title") {
				config.watch.title = title.clone();
			}
			if let Some(message) = sub.get_one::<String>("watch-message") {
				config.watch.message = message.replace("\\n", "\n");
			}

			println!("{}", watch::banner(&config.watch, &pairs));
			watch::watch_all(&pairs, &config.diff, &config.run, &config.watch).await?;
		}
		_ => return Err(format!("unknown subcommand: {}", name).into()),
	}

	Ok(())
}

// vim: ts=4
