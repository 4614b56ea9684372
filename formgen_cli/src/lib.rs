use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use formgen_core::MergeMode;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Generate C++ sources from a UI design and merge hand edits back into it.",
	long_about = "formgen turns a JSON UI design into a C++ source and header file.\n\nEvery \
	              generated block can be closed by a checksum tag, so code edited by hand in the \
	              generated source can be found again and copied back into the design.\n\nQuick \
	              start:\n  formgen init      Create formgen.toml and a sample design\n  formgen \
	              generate  Write the source and header files\n  formgen merge     Report hand \
	              edits in the generated source\n  formgen strings   Write the translation strings"
)]
pub struct FormgenCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize formgen in a project.
	///
	/// Creates `formgen.toml` and a sample `design.json` in the project root.
	/// Existing files are left untouched.
	Init,
	/// Generate the source and header files from the design.
	///
	/// File names come from `formgen.toml`; an extension-only name such as
	/// `.cxx` is appended to the project's base name.
	Generate {
		/// Write the source file here instead of the configured location.
		#[arg(long)]
		source: Option<PathBuf>,

		/// Write the header file here instead of the configured location.
		#[arg(long)]
		header: Option<PathBuf>,

		/// Replace large inline data with short placeholders, as a source
		/// preview would.
		#[arg(long, default_value_t = false)]
		preview: bool,

		/// Print the generated source and header instead of writing files.
		#[arg(long, default_value_t = false)]
		stdout: bool,
	},
	/// Write all label and tooltip texts to a translation file.
	///
	/// The format follows the `[i18n]` mode: one string per line, a GNU
	/// gettext `.po` file, or a POSIX message catalog.
	Strings {
		/// Output file. Defaults to the base name with `.txt`, `.po` or
		/// `.msg`, depending on the i18n mode.
		#[arg(long, short)]
		output: Option<PathBuf>,
	},
	/// Find hand edits in the generated source and merge them back.
	///
	/// Recomputes the checksum of every tagged block. Edited code and
	/// callback blocks can be copied into the design; edits elsewhere change
	/// generated structure and are lost on the next generation. Exits with
	/// status 1 when `check` finds edits or a merge is refused.
	Merge {
		/// What to do with the edits that were found.
		#[arg(long, value_enum, default_value_t = MergeModeArg::Check)]
		mode: MergeModeArg,

		/// Read this source file instead of the configured one.
		#[arg(long)]
		source: Option<PathBuf>,

		/// Output format for the report. Use `text` for human-readable output
		/// or `json` for programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Show a diff between the design and each edited block.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Watch the source file and run again whenever it changes.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MergeModeArg {
	/// Report edits without changing the design.
	Check,
	/// Describe the edits and ask before merging.
	Interactive,
	/// Merge every code and callback edit.
	Go,
	/// Merge only if the generated structure was not edited.
	GoSafe,
}

impl From<MergeModeArg> for MergeMode {
	fn from(mode: MergeModeArg) -> Self {
		match mode {
			MergeModeArg::Check => MergeMode::Check,
			MergeModeArg::Interactive => MergeMode::Interactive,
			MergeModeArg::Go => MergeMode::Go,
			MergeModeArg::GoSafe => MergeMode::GoSafe,
		}
	}
}
