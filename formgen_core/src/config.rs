use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::FormgenError;
use crate::FormgenResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["formgen.toml", ".formgen.toml", ".config/formgen.toml"];

/// Design document used when the config does not name one.
pub const DEFAULT_DESIGN_FILE: &str = "design.json";

/// Internationalization scheme used for labels and tooltips.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum I18nMode {
	/// Labels are written as plain string literals.
	#[default]
	None,
	/// GNU gettext: labels are wrapped in the configured gettext function.
	Gnu,
	/// POSIX message catalogs: labels are looked up through `catgets`.
	Posix,
}

/// The `[i18n]` table.
///
/// ```toml
/// [i18n]
/// mode = "gnu"
/// gnu_include = "<libintl.h>"
/// gnu_function = "gettext"
/// gnu_static_function = "gettext_noop"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct I18nSettings {
	pub mode: I18nMode,
	/// Header providing the gettext function.
	pub gnu_include: String,
	/// When set, the gettext include is wrapped in `#ifdef <conditional>`.
	pub gnu_conditional: String,
	/// Function used to translate labels at runtime.
	pub gnu_function: String,
	/// Marker macro used for labels in static initializers.
	pub gnu_static_function: String,
	/// Header providing `catgets`.
	pub posix_include: String,
	/// When set, the catalog include is wrapped in `#ifdef <conditional>`.
	pub posix_conditional: String,
	/// Name of an externally opened catalog. When empty the generated code
	/// opens its own catalog named after the project.
	pub posix_file: String,
	/// Message set number used in the catalog.
	pub posix_set: String,
}

impl Default for I18nSettings {
	fn default() -> Self {
		Self {
			mode: I18nMode::None,
			gnu_include: "<libintl.h>".to_string(),
			gnu_conditional: String::new(),
			gnu_function: "gettext".to_string(),
			gnu_static_function: "gettext_noop".to_string(),
			posix_include: "<nl_types.h>".to_string(),
			posix_conditional: String::new(),
			posix_file: String::new(),
			posix_set: "1".to_string(),
		}
	}
}

impl I18nSettings {
	/// The include line and `#ifdef` guard of the active mode.
	pub fn include_and_conditional(&self) -> (&str, &str) {
		match self.mode {
			I18nMode::Gnu => (&self.gnu_include, &self.gnu_conditional),
			I18nMode::None | I18nMode::Posix => (&self.posix_include, &self.posix_conditional),
		}
	}
}

/// Project settings loaded from `formgen.toml`.
///
/// ```toml
/// design = "design.json"
/// basename = "editor"
/// source_file_name = ".cxx"
/// header_file_name = ".h"
/// include_header_from_source = true
/// write_mergeback_data = true
/// utf8_in_source = false
///
/// [i18n]
/// mode = "none"
/// ```
///
/// A generation or merge-back run takes a snapshot of these settings; nothing
/// reads them from ambient state.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectSettings {
	/// Path of the design document, relative to the project root.
	pub design: PathBuf,
	/// Base name for generated files and the POSIX catalog. Defaults to the
	/// design file stem.
	pub basename: Option<String>,
	/// Source file name. A name starting with `.` is an extension appended to
	/// the base name.
	pub source_file_name: String,
	/// Header file name, resolved like `source_file_name`.
	pub header_file_name: String,
	/// Write `#include "<header>"` at the top of the source file.
	pub include_header_from_source: bool,
	/// Skip the toolkit include at the top of the header.
	pub avoid_early_includes: bool,
	/// Toolkit header included first in every generated header.
	pub toolkit_include: String,
	/// Tag generated blocks with checksums so hand edits can be merged back.
	pub write_mergeback_data: bool,
	/// Write bytes above 0x7f verbatim instead of as octal escapes.
	pub utf8_in_source: bool,
	pub i18n: I18nSettings,
}

impl Default for ProjectSettings {
	fn default() -> Self {
		Self {
			design: PathBuf::from(DEFAULT_DESIGN_FILE),
			basename: None,
			source_file_name: ".cxx".to_string(),
			header_file_name: ".h".to_string(),
			include_header_from_source: true,
			avoid_early_includes: false,
			toolkit_include: "<FL/Fl.H>".to_string(),
			write_mergeback_data: false,
			utf8_in_source: false,
			i18n: I18nSettings::default(),
		}
	}
}

impl ProjectSettings {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the settings from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> FormgenResult<Option<ProjectSettings>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let settings = Self::from_toml(&content)?;

		Ok(Some(settings))
	}

	/// Load the settings at `root`, falling back to the defaults.
	pub fn load_or_default(root: &Path) -> FormgenResult<ProjectSettings> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	pub fn from_toml(content: &str) -> FormgenResult<ProjectSettings> {
		toml::from_str(content).map_err(|e| FormgenError::ConfigParse(e.to_string()))
	}

	/// The base name of generated files: the configured `basename`, else the
	/// design file stem.
	pub fn basename(&self) -> String {
		if let Some(basename) = self.basename.as_deref().filter(|name| !name.is_empty()) {
			return basename.to_string();
		}

		self.design
			.file_stem()
			.map_or_else(|| "design".to_string(), |stem| stem.to_string_lossy().into_owned())
	}

	/// Resolved source file name, e.g. `editor.cxx`.
	pub fn source_file(&self) -> String {
		self.resolve_file_name(&self.source_file_name)
	}

	/// Resolved header file name, e.g. `editor.h`.
	pub fn header_file(&self) -> String {
		self.resolve_file_name(&self.header_file_name)
	}

	fn resolve_file_name(&self, name: &str) -> String {
		if name.starts_with('.') && !name.contains('/') {
			format!("{}{name}", self.basename())
		} else {
			name.to_string()
		}
	}
}
