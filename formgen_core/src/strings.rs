use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::FormgenError;
use crate::FormgenResult;
use crate::config::I18nMode;
use crate::config::ProjectSettings;
use crate::escape::catalog_escape;
use crate::generate::GENERATOR_VERSION;
use crate::node::DesignNode;
use crate::node::DesignTree;

/// Write every widget label and tooltip of `tree` to `path`, in the format
/// matching the project's i18n mode:
///
/// - none: one escaped string per line
/// - gnu: a gettext `.po` file with `msgid` / `msgstr` pairs
/// - posix: a `catgets` `.msg` file with numbered messages
///
/// Returns the number of strings written.
pub fn write_strings<T: DesignTree>(
	tree: &T,
	settings: &ProjectSettings,
	path: &Path,
) -> FormgenResult<usize> {
	let file = File::create(path).map_err(|source| {
		FormgenError::OpenOutput {
			path: path.to_path_buf(),
			source,
		}
	})?;

	let mut out = BufWriter::new(file);
	let count = extract_strings(tree, settings, &mut out)?;
	out.into_inner()
		.map_err(io::IntoInnerError::into_error)?
		.sync_all()?;
	debug!(count, path = %path.display(), "wrote translation strings");

	Ok(count)
}

/// Write the catalog for `tree` to any writer. See [`write_strings`].
pub fn extract_strings<T: DesignTree, W: Write>(
	tree: &T,
	settings: &ProjectSettings,
	out: &mut W,
) -> io::Result<usize> {
	let texts = tree
		.nodes()
		.iter()
		.filter(|node| node.is_widget())
		.flat_map(|node| [node.label(), node.tooltip()])
		.flatten()
		.map(catalog_escape);

	let mut count = 0;
	match settings.i18n.mode {
		I18nMode::None => {
			writeln!(out, "# generated by formgen version {GENERATOR_VERSION}")?;
			for text in texts {
				writeln!(out, "{text}")?;
				count += 1;
			}
		}
		I18nMode::Gnu => {
			writeln!(out, "# generated by formgen version {GENERATOR_VERSION}")?;
			for text in texts {
				writeln!(out, "msgid \"{text}\"")?;
				writeln!(out, "msgstr \"{text}\"")?;
				count += 1;
			}
		}
		I18nMode::Posix => {
			writeln!(out, "$ generated by formgen version {GENERATOR_VERSION}")?;
			writeln!(out, "$set {}", settings.i18n.posix_set)?;
			writeln!(out, "$quote \"")?;
			for text in texts {
				count += 1;
				writeln!(out, "{count} \"{text}\"")?;
			}
		}
	}

	Ok(count)
}
