use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use formgen_cli::Commands;
use formgen_cli::FormgenCli;
use formgen_cli::MergeModeArg;
use formgen_cli::OutputFormat;
use formgen_core::AnyEmptyResult;
use formgen_core::AnyResult;
use formgen_core::Design;
use formgen_core::DesignTree;
use formgen_core::FormgenResult;
use formgen_core::GenerateOptions;
use formgen_core::I18nMode;
use formgen_core::ItemBody;
use formgen_core::MergeHost;
use formgen_core::MergeMode;
use formgen_core::MergeOutcome;
use formgen_core::MergeSummary;
use formgen_core::NodeId;
use formgen_core::ProjectSettings;
use formgen_core::TagKind;
use formgen_core::generate_in_memory;
use formgen_core::merge_back;
use formgen_core::write_code;
use formgen_core::write_strings;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing::debug;
use tracing::info;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const SAMPLE_CONFIG: &str = "# formgen configuration\n\n# The design document code is \
                             generated from.\ndesign = \"design.json\"\n\n# Generated files are \
                             named <basename>.cxx and <basename>.h.\nbasename = \"hello\"\n\n# \
                             Close every generated block with a checksum tag so hand edits can \
                             be merged back.\nwrite_mergeback_data = true\n\n# [i18n]\n# mode = \
                             \"gnu\"\n# gnu_function = \"gettext\"\n";

const SAMPLE_DESIGN: &str = r##"{
  "items": [
    { "id": 1, "kind": "declaration", "text": "#include <stdio.h>" },
    {
      "id": 2,
      "kind": "function",
      "name": "make_window()",
      "return_type": "Fl_Double_Window*",
      "children": [
        {
          "id": 3,
          "kind": "widget",
          "class": "Fl_Double_Window",
          "name": "main_window",
          "label": "Hello",
          "w": 340,
          "h": 180,
          "children": [
            {
              "id": 4,
              "kind": "widget",
              "class": "Fl_Button",
              "label": "Save",
              "tooltip": "Save the document",
              "callback": "puts(\"saved\");",
              "x": 130,
              "y": 70,
              "w": 80,
              "h": 30
            }
          ]
        },
        { "id": 5, "kind": "code", "code": "return main_window;" }
      ]
    }
  ]
}
"##;

fn main() {
	let args = FormgenCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_logging(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Generate {
			source,
			header,
			preview,
			stdout,
		}) => run_generate(&args, source.as_deref(), header.as_deref(), *preview, *stdout),
		Some(Commands::Strings { output }) => run_strings(&args, output.as_deref()),
		Some(Commands::Merge {
			mode,
			source,
			format,
			diff,
			watch,
		}) => run_merge(&args, *mode, source.as_deref(), *format, *diff, *watch),
		None => {
			eprintln!("No subcommand specified. Run `formgen --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<formgen_core::FormgenError>() {
			Ok(formgen_err) => {
				let report: miette::Report = (*formgen_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool, use_color: bool) {
	let default_directives = if verbose {
		"formgen=debug,formgen_core=debug"
	} else {
		"warn"
	};
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.try_init();
}

fn resolve_root(args: &FormgenCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Settings and the absolute design path of the project at `root`.
fn load_project(root: &Path) -> AnyResult<(ProjectSettings, PathBuf)> {
	let settings = ProjectSettings::load_or_default(root)?;
	let design_path = root.join(&settings.design);
	Ok((settings, design_path))
}

fn run_init(args: &FormgenCli) -> AnyEmptyResult {
	let root = resolve_root(args);
	let config_path = root.join("formgen.toml");
	let design_path = root.join("design.json");

	let design_exists = design_path.exists();

	if config_path.exists() {
		println!("Config file already exists: {}", config_path.display());
	} else {
		std::fs::write(&config_path, SAMPLE_CONFIG)?;
		println!("Created formgen.toml");
	}

	if design_exists {
		println!("Design file already exists: {}", design_path.display());
	} else {
		std::fs::write(&design_path, SAMPLE_DESIGN)?;
		println!("Created design file: {}", design_path.display());
	}

	if !design_exists {
		println!();
		println!("Next steps:");
		println!("  1. Edit {} to describe your window", design_path.display());
		println!("  2. Run `formgen generate` to write hello.cxx and hello.h");
		println!("  3. Edit callbacks in hello.cxx, then run `formgen merge --mode go`");
	}

	Ok(())
}

fn run_generate(
	args: &FormgenCli,
	source: Option<&Path>,
	header: Option<&Path>,
	preview: bool,
	stdout: bool,
) -> AnyEmptyResult {
	let root = resolve_root(args);
	let (settings, design_path) = load_project(&root)?;
	let design = Design::load(&design_path)?;
	let options = GenerateOptions {
		preview,
		..GenerateOptions::default()
	};

	if stdout {
		let generated = generate_in_memory(&design, &settings, options)?;
		let mut out = std::io::stdout().lock();
		out.write_all(&generated.source)?;
		out.write_all(b"\n")?;
		out.write_all(&generated.header)?;
		return Ok(());
	}

	let source_path = source.map_or_else(|| root.join(settings.source_file()), Path::to_path_buf);
	let header_path = header.map_or_else(|| root.join(settings.header_file()), Path::to_path_buf);
	let report = write_code(
		&design,
		&settings,
		Some(&source_path),
		Some(&header_path),
		options,
	)?;

	println!(
		"Generated {} and {} from {} node(s).",
		make_relative(&source_path, &root),
		make_relative(&header_path, &root),
		report.nodes_written
	);

	Ok(())
}

fn run_strings(args: &FormgenCli, output: Option<&Path>) -> AnyEmptyResult {
	let root = resolve_root(args);
	let (settings, design_path) = load_project(&root)?;
	let design = Design::load(&design_path)?;

	let extension = match settings.i18n.mode {
		I18nMode::None => "txt",
		I18nMode::Gnu => "po",
		I18nMode::Posix => "msg",
	};
	let path = output.map_or_else(
		|| root.join(format!("{}.{extension}", settings.basename())),
		Path::to_path_buf,
	);

	let count = write_strings(&design, &settings, &path)?;
	println!("Wrote {count} string(s) to {}.", make_relative(&path, &root));

	Ok(())
}

fn run_merge(
	args: &FormgenCli,
	mode: MergeModeArg,
	source: Option<&Path>,
	format: OutputFormat,
	show_diff: bool,
	watch: bool,
) -> AnyEmptyResult {
	let root = resolve_root(args);
	let (settings, _) = load_project(&root)?;
	let source_path = source.map_or_else(|| root.join(settings.source_file()), Path::to_path_buf);

	let refused = run_merge_once(args, mode, &source_path, format, show_diff)?;

	if !watch {
		if refused {
			process::exit(1);
		}
		return Ok(());
	}

	println!(
		"\nWatching {} for changes... (press Ctrl+C to stop)",
		make_relative(&source_path, &root)
	);

	let watched = source_path.file_name().map(ToOwned::to_owned);
	let (tx, rx) = mpsc::channel();
	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_) | notify::EventKind::Create(_)
				) && event.paths.iter().any(|path| path.file_name() == watched.as_deref())
				{
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	let watch_dir = source_path.parent().unwrap_or(root.as_path());
	watcher.watch(watch_dir, notify::RecursiveMode::NonRecursive)?;

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nSource change detected, merging...");
		if let Err(e) = run_merge_once(args, mode, &source_path, format, show_diff) {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

/// Run one merge. Returns `true` when `check` found edits or the merge was
/// refused.
fn run_merge_once(
	args: &FormgenCli,
	mode: MergeModeArg,
	source_path: &Path,
	format: OutputFormat,
	show_diff: bool,
) -> AnyResult<bool> {
	let root = resolve_root(args);
	let (settings, design_path) = load_project(&root)?;
	let mut design = Design::load(&design_path)?;

	if !settings.write_mergeback_data {
		eprintln!(
			"{} write_mergeback_data is disabled in formgen.toml; nothing to merge.",
			colored!("warning:", yellow)
		);
	}

	let original = design.clone();
	let mut host = CliHost::new(design_path.clone());
	let outcome = merge_back(
		source_path,
		&mut design,
		&settings,
		MergeMode::from(mode),
		&mut host,
	)?;

	if matches!(outcome, MergeOutcome::Merged(_)) {
		design.save(&design_path)?;
		info!(path = %design_path.display(), "saved merged design");
	}

	let refused = match &outcome {
		MergeOutcome::Report(summary) => summary.has_changes(),
		MergeOutcome::Conflict(_) => true,
		MergeOutcome::NoChanges | MergeOutcome::Merged(_) | MergeOutcome::Cancelled => false,
	};

	match format {
		OutputFormat::Json => {
			let output = serde_json::json!({
				"ok": !refused,
				"source": make_relative(source_path, &root),
				"bits": outcome_summary(&outcome).map_or(0, MergeSummary::bits),
				"outcome": &outcome,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			print_outcome(&outcome, source_path, &design_path, &root, args.verbose);
			if show_diff {
				if let Some(summary) = outcome_summary(&outcome) {
					print_block_diffs(summary, &original);
				}
			}
		}
	}

	Ok(refused)
}

fn outcome_summary(outcome: &MergeOutcome) -> Option<&MergeSummary> {
	match outcome {
		MergeOutcome::Report(summary)
		| MergeOutcome::Merged(summary)
		| MergeOutcome::Conflict(summary) => Some(summary),
		MergeOutcome::NoChanges | MergeOutcome::Cancelled => None,
	}
}

fn print_outcome(
	outcome: &MergeOutcome,
	source_path: &Path,
	design_path: &Path,
	root: &Path,
	verbose: bool,
) {
	let source = make_relative(source_path, root);
	match outcome {
		MergeOutcome::NoChanges => {
			println!("No edits to merge: {source} matches the design.");
		}
		MergeOutcome::Cancelled => {
			println!("Merge cancelled; the design was not changed.");
		}
		MergeOutcome::Report(summary) if !summary.has_changes() => {
			println!("Check passed: {source} matches the design.");
		}
		MergeOutcome::Report(summary) => {
			eprintln!("Check found edits in {source}.");
			print_summary(summary);
			eprintln!();
			eprintln!("Run `formgen merge --mode go` to merge them into the design.");
		}
		MergeOutcome::Conflict(summary) => {
			eprintln!(
				"{} the generated structure of {source} was edited; nothing was merged.",
				colored!("error:", red)
			);
			print_summary(summary);
		}
		MergeOutcome::Merged(summary) => {
			println!(
				"{} {} block(s) into {}.",
				colored!("Merged", green),
				summary
					.blocks
					.iter()
					.filter(|block| block.kind.is_mergeable() && block.resolved)
					.count(),
				make_relative(design_path, root)
			);
			if summary.structural_changes > 0 {
				eprintln!(
					"{} {} edit(s) to generated structure will be lost on the next generation.",
					colored!("warning:", yellow),
					summary.structural_changes
				);
			}
			if verbose {
				print_summary(summary);
			}
		}
	}
}

fn print_summary(summary: &MergeSummary) {
	eprintln!("  structural edits: {}", summary.structural_changes);
	eprintln!("  code edits: {}", summary.code_changes);
	eprintln!("  callback edits: {}", summary.callback_changes);
	if summary.unresolved_ids > 0 {
		eprintln!("  edits without a design node: {}", summary.unresolved_ids);
	}

	eprintln!();
	eprintln!("Edited blocks:");
	for block in &summary.blocks {
		let what = match block.kind {
			TagKind::Generic => "generated structure",
			TagKind::Code => "code",
			TagKind::MenuCallback => "menu callback",
			TagKind::WidgetCallback => "widget callback",
		};
		let status = if !block.kind.is_mergeable() {
			colored!("lost", yellow)
		} else if block.resolved {
			colored!("mergeable", green)
		} else {
			colored!("no node", red)
		};
		eprintln!(
			"  {what} of node {} ending at line {} [{status}]",
			block.node_id, block.line
		);
	}
}

/// Diff the design's text against each edited code or callback block.
fn print_block_diffs(summary: &MergeSummary, design: &Design) {
	for block in summary.blocks.iter().filter(|block| block.kind.is_mergeable()) {
		let Some(current) = design_text(design, block.node_id) else {
			continue;
		};
		eprintln!();
		eprintln!("{}", colored!(format!("node {}:", block.node_id), bold));
		print_diff(&with_newline(&current), &with_newline(&block.text));
	}
}

fn design_text(design: &Design, id: NodeId) -> Option<String> {
	match design.find_by_id(id)?.body() {
		ItemBody::Code { code } => Some(code.clone()),
		ItemBody::Widget { callback, .. } | ItemBody::MenuItem { callback, .. } => {
			Some(callback.clone().unwrap_or_default())
		}
		_ => None,
	}
}

fn with_newline(text: &str) -> String {
	if text.ends_with('\n') {
		text.to_string()
	} else {
		format!("{text}\n")
	}
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, edited: &str) {
	let diff = TextDiff::from_lines(current, edited);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

/// The terminal side of a merge: backs up the design before it changes and
/// asks on stdin before an interactive merge.
struct CliHost {
	design_path: PathBuf,
}

impl CliHost {
	fn new(design_path: PathBuf) -> Self {
		Self { design_path }
	}

	fn backup_path(&self) -> PathBuf {
		let mut name = OsString::from(self.design_path.as_os_str());
		name.push(".bak");
		PathBuf::from(name)
	}
}

impl MergeHost for CliHost {
	fn checkpoint(&mut self) -> FormgenResult<()> {
		let backup = self.backup_path();
		std::fs::copy(&self.design_path, &backup)?;
		debug!(backup = %backup.display(), "backed up design");
		Ok(())
	}

	fn confirm(&mut self, _summary: &MergeSummary, message: &str) -> bool {
		eprintln!("{message}");
		eprint!("\nMerge these changes into the design? [y/N] ");
		let _ = std::io::stderr().flush();

		let mut answer = String::new();
		if std::io::stdin().read_line(&mut answer).is_err() {
			return false;
		}
		matches!(answer.trim(), "y" | "Y" | "yes" | "Yes")
	}

	fn message(&mut self, text: &str) {
		eprintln!("{} {text}", colored!("warning:", yellow));
	}
}
