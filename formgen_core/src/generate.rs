use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::FormgenResult;
use crate::config::I18nMode;
use crate::config::ProjectSettings;
use crate::node::DesignNode;
use crate::node::DesignTree;
use crate::node::NodeId;
use crate::node::NodeRanges;
use crate::node::SourceRange;
use crate::write_c;
use crate::write_h;
use crate::writer::CodeWriter;
use crate::writer::Output;

/// Version stamped into every generated file.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options for a single generation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
	/// Render for a live source view: large literals become placeholders.
	pub preview: bool,
	/// Record where each node's code lands in the generated files.
	pub track_offsets: bool,
}

/// What a generation run produced besides the files themselves.
#[derive(Debug, Default)]
pub struct GenerationReport {
	/// Byte ranges per node, when offsets were tracked.
	pub ranges: BTreeMap<NodeId, NodeRanges>,
	/// Number of nodes whose structural code was written.
	pub nodes_written: usize,
}

/// Source and header generated in memory.
#[derive(Debug)]
pub struct GeneratedCode {
	pub source: Vec<u8>,
	pub header: Vec<u8>,
	pub report: GenerationReport,
}

impl GeneratedCode {
	pub fn source_text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.source)
	}

	pub fn header_text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.header)
	}
}

/// Include guard macro for a header file name: every character that is not
/// an ASCII letter or digit becomes `_`, and a leading `_` is added unless
/// the name starts with a letter.
pub fn include_guard(header_file_name: &str) -> String {
	let mut guard = String::with_capacity(header_file_name.len() + 1);
	if !header_file_name
		.chars()
		.next()
		.is_some_and(|c| c.is_ascii_alphabetic())
	{
		guard.push('_');
	}
	guard.extend(header_file_name.chars().map(|c| {
		if c.is_ascii_alphanumeric() { c } else { '_' }
	}));
	guard
}

/// Write the source and header files for `tree`.
///
/// Existing files are overwritten. A missing path writes that file to
/// standard output. If the header cannot be opened the already opened
/// source is closed before the error is returned.
pub fn write_code<T: DesignTree>(
	tree: &T,
	settings: &ProjectSettings,
	source: Option<&Path>,
	header: Option<&Path>,
	options: GenerateOptions,
) -> FormgenResult<GenerationReport> {
	let body = Output::create_or_stdout(source)?;
	let header_output = match Output::create_or_stdout(header) {
		Ok(output) => output,
		Err(error) => {
			let _ = body.finish();
			return Err(error);
		}
	};

	let header_name = header
		.and_then(Path::file_name)
		.map_or_else(|| settings.header_file(), |name| name.to_string_lossy().into_owned());
	let include_name = header.map(|_| header_include_name(settings, &header_name));

	let mut writer = CodeWriter::new(settings.clone(), body, header_output, options.preview);
	let result = emit_all(
		&mut writer,
		tree.nodes(),
		&header_name,
		include_name.as_deref(),
		options,
	);
	let closed = writer.finish();

	let report = result?;
	closed?;
	debug!(
		nodes = report.nodes_written,
		source = ?source,
		header = ?header,
		"generated code"
	);

	Ok(report)
}

/// Generate source and header in memory, e.g. for a source preview.
pub fn generate_in_memory<T: DesignTree>(
	tree: &T,
	settings: &ProjectSettings,
	options: GenerateOptions,
) -> FormgenResult<GeneratedCode> {
	let header_name = settings.header_file();
	let include_name = header_include_name(settings, &header_name);
	let mut writer = CodeWriter::new(
		settings.clone(),
		Output::memory(),
		Output::memory(),
		options.preview,
	);

	let report = emit_all(
		&mut writer,
		tree.nodes(),
		&header_name,
		Some(&include_name),
		options,
	)?;
	let (source, header) = writer.finish()?;

	Ok(GeneratedCode {
		source: source.unwrap_or_default(),
		header: header.unwrap_or_default(),
		report,
	})
}

/// The name used in `#include "..."` in the source file: the header's file
/// name when the configured name is just an extension, else the configured
/// name verbatim.
fn header_include_name(settings: &ProjectSettings, header_name: &str) -> String {
	let configured = &settings.header_file_name;
	if configured.starts_with('.') && !configured.contains('/') {
		header_name.to_string()
	} else {
		configured.clone()
	}
}

fn emit_all<N: DesignNode>(
	writer: &mut CodeWriter,
	nodes: &[N],
	header_name: &str,
	include_name: Option<&str>,
	options: GenerateOptions,
) -> io::Result<GenerationReport> {
	writer.reset();
	let mut emitter = Emitter {
		writer,
		nodes,
		ranges: options.track_offsets.then(BTreeMap::new),
		nodes_written: 0,
	};

	emitter.emit_file(header_name, include_name)?;

	Ok(GenerationReport {
		ranges: emitter.ranges.unwrap_or_default(),
		nodes_written: emitter.nodes_written,
	})
}

#[derive(Clone, Copy)]
enum Phase {
	Static,
	Code1,
	Code2,
	Framing,
}

struct Emitter<'a, N> {
	writer: &'a mut CodeWriter,
	nodes: &'a [N],
	ranges: Option<BTreeMap<NodeId, NodeRanges>>,
	nodes_written: usize,
}

impl<N: DesignNode> Emitter<'_, N> {
	fn emit_file(&mut self, header_name: &str, include_name: Option<&str>) -> io::Result<()> {
		let nodes = self.nodes;
		let mut first = 0;

		// A leading comment is most likely a copyright notice and goes above
		// everything else. Comments have no children and no closing code.
		if let Some(node) = nodes.first().filter(|node| node.is_comment()) {
			self.tracked(node, Phase::Framing, |w| node.write_code1(w))?;
			first = 1;
		}

		self.emit_prologue(header_name, include_name)?;

		let mut index = first;
		while index < nodes.len() {
			self.emit_static(index)?;
			index = self.emit_node(index)?;
		}

		write_h!(self.writer, "#endif\n")?;

		if nodes.len() > first {
			if let Some(node) = nodes.last().filter(|node| node.is_comment()) {
				self.tracked(node, Phase::Framing, |w| node.write_code1(w))?;
			}
		}

		Ok(())
	}

	fn emit_prologue(&mut self, header_name: &str, include_name: Option<&str>) -> io::Result<()> {
		let banner = format!("// generated by formgen version {GENERATOR_VERSION}\n\n");
		write_h!(self.writer, "{banner}")?;
		write_c!(self.writer, "{banner}")?;

		let guard = include_guard(header_name);
		write_h!(self.writer, "#ifndef {guard}\n")?;
		write_h!(self.writer, "#define {guard}\n")?;

		if !self.writer.settings().avoid_early_includes {
			let include = format!("#include {}", self.writer.settings().toolkit_include);
			self.writer.write_h_once(&include)?;
		}

		if let Some(include_name) = include_name {
			if self.writer.settings().include_header_from_source {
				write_c!(self.writer, "#include \"{include_name}\"\n")?;
			}
		}

		self.emit_i18n_prologue()
	}

	fn emit_i18n_prologue(&mut self) -> io::Result<()> {
		let settings = self.writer.settings().clone();
		let i18n = &settings.i18n;
		let (include, conditional) = i18n.include_and_conditional();
		if i18n.mode == I18nMode::None || include.is_empty() {
			return Ok(());
		}

		let w = &mut *self.writer;
		let has_conditional = !conditional.is_empty();
		if has_conditional {
			write_c!(w, "#ifdef {conditional}\n")?;
			w.indent_more();
		}

		if include.starts_with(['<', '"']) {
			write_c!(w, "#{}include {include}\n", w.indent())?;
		} else {
			write_c!(w, "#{}include \"{include}\"\n", w.indent())?;
		}

		if i18n.mode == I18nMode::Posix {
			if i18n.posix_file.is_empty() {
				write_c!(w, "// Initialize I18N stuff now for menus...\n")?;
				write_c!(w, "#{}include <locale.h>\n", w.indent())?;
				write_c!(w, "static char *_locale = setlocale(LC_MESSAGES, \"\");\n")?;
				write_c!(
					w,
					"static nl_catd _catalog = catopen(\"{}\", 0);\n",
					settings.basename()
				)?;
			} else {
				write_c!(w, "extern nl_catd {};\n", i18n.posix_file)?;
			}
		}

		if has_conditional {
			write_c!(w, "#else\n")?;
			match i18n.mode {
				I18nMode::Gnu if !i18n.gnu_function.is_empty() => {
					let function = &i18n.gnu_function;
					write_c!(w, "#{}ifndef {function}\n", w.indent())?;
					write_c!(w, "#{}define {function}(text) text\n", w.indent_plus(1))?;
					write_c!(w, "#{}endif\n", w.indent())?;
				}
				I18nMode::Posix => {
					write_c!(w, "#{}ifndef catgets\n", w.indent())?;
					write_c!(
						w,
						"#{}define catgets(catalog, set, msgid, text) text\n",
						w.indent_plus(1)
					)?;
					write_c!(w, "#{}endif\n", w.indent())?;
				}
				_ => {}
			}
			w.indent_less();
			write_c!(w, "#endif\n")?;
		}

		if i18n.mode == I18nMode::Gnu && !i18n.gnu_static_function.is_empty() {
			let function = &i18n.gnu_static_function;
			write_c!(w, "#ifndef {function}\n")?;
			write_c!(w, "#{}define {function}(text) text\n", w.indent_plus(1))?;
			write_c!(w, "#endif\n")?;
		}

		Ok(())
	}

	/// Static code of the node at `index` and all of its descendants.
	fn emit_static(&mut self, index: usize) -> io::Result<()> {
		let nodes = self.nodes;
		let end = self.subtree_end(index);
		for node in &nodes[index..end] {
			self.tracked(node, Phase::Static, |w| node.write_static(w))?;
		}
		Ok(())
	}

	/// Structural code of the node at `index`, with its children between the
	/// two halves. Returns the index of the first node after the subtree.
	fn emit_node(&mut self, index: usize) -> io::Result<usize> {
		let nodes = self.nodes;
		let node = &nodes[index];
		let end = self.subtree_end(index);

		// the trailing comment is written after everything else
		if !(index + 1 == nodes.len() && node.is_comment()) {
			self.tracked(node, Phase::Code1, |w| node.write_code1(w))?;
		}
		self.nodes_written += 1;

		if node.is_class() {
			// Members first, so that deferred method bodies can use the
			// declarations completed by the class's closing code.
			let mut child = index + 1;
			while child < end {
				child = if nodes[child].is_function() {
					self.subtree_end(child)
				} else {
					self.emit_node(child)?
				};
			}

			self.tracked(node, Phase::Code2, |w| node.write_code2(w))?;

			let mut child = index + 1;
			while child < end {
				child = if nodes[child].is_function() {
					self.emit_node(child)?
				} else {
					self.subtree_end(child)
				};
			}

			write_h!(self.writer, "}};\n")?;
			self.writer.leave_class();
		} else {
			let mut child = index + 1;
			while child < end {
				child = self.emit_node(child)?;
			}

			self.tracked(node, Phase::Code2, |w| node.write_code2(w))?;
		}

		Ok(end)
	}

	/// Index of the first node after the subtree rooted at `index`: the
	/// first following node whose depth is not greater than the root's.
	fn subtree_end(&self, index: usize) -> usize {
		let depth = self.nodes[index].depth();
		self.nodes[index + 1..]
			.iter()
			.position(|node| node.depth() <= depth)
			.map_or(self.nodes.len(), |offset| index + 1 + offset)
	}

	fn tracked(
		&mut self,
		node: &N,
		phase: Phase,
		emit: impl FnOnce(&mut CodeWriter) -> io::Result<()>,
	) -> io::Result<()> {
		let body_start = self.writer.body_position();
		let header_start = self.writer.header_position();
		emit(&mut *self.writer)?;

		let Some(ranges) = self.ranges.as_mut() else {
			return Ok(());
		};
		let body = SourceRange {
			start: body_start,
			end: self.writer.body_position(),
		};
		let header = SourceRange {
			start: header_start,
			end: self.writer.header_position(),
		};
		let entry = ranges.entry(node.id()).or_default();
		match phase {
			Phase::Static => {
				entry.body_static = body;
				entry.header_static = header;
			}
			Phase::Code1 => {
				entry.body_code1 = body;
				entry.header_code1 = header;
			}
			Phase::Code2 => {
				entry.body_code2 = body;
				entry.header_code2 = header;
			}
			Phase::Framing => {
				entry.body_code1 = body;
				entry.body_code2 = body;
				entry.header_code1 = header;
				entry.header_code2 = header;
			}
		}

		Ok(())
	}
}
