use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum FormgenError {
	#[error(transparent)]
	#[diagnostic(code(formgen::io_error))]
	Io(#[from] std::io::Error),

	#[error("cannot open `{}` for writing", .path.display())]
	#[diagnostic(
		code(formgen::open_output),
		help("check that the directory exists and the file is not read-only")
	)]
	OpenOutput {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("malformed merge tag in line {line}: `{text}`")]
	#[diagnostic(
		code(formgen::malformed_tag),
		help(
			"tags have the form `//~fl~<kind>~<node id>~<checksum>~~`; regenerate the source \
			 file if a tag line was edited by hand"
		)
	)]
	MalformedTag {
		line: usize,
		text: String,
		#[source]
		source: crate::TagParseError,
	},

	#[error("failed to parse design file: {0}")]
	#[diagnostic(code(formgen::design_parse))]
	DesignParse(String),

	#[error("failed to serialize design: {0}")]
	#[diagnostic(code(formgen::design_serialize))]
	DesignSerialize(String),

	#[error("node id `{0:04x}` is used by more than one design node")]
	#[diagnostic(
		code(formgen::duplicate_node_id),
		help("remove the `id` field from one of the nodes so a fresh id is assigned")
	)]
	DuplicateNodeId(u16),

	#[error("design has more than {0} nodes")]
	#[diagnostic(code(formgen::too_many_nodes))]
	TooManyNodes(usize),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(formgen::config_parse),
		help("check that formgen.toml is valid TOML; see `formgen init` for a sample")
	)]
	ConfigParse(String),

	#[error("design file not found: `{}`", .0.display())]
	#[diagnostic(
		code(formgen::missing_design),
		help("run `formgen init` or set `design` in formgen.toml")
	)]
	MissingDesign(PathBuf),
}

pub type FormgenResult<T> = Result<T, FormgenError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
