use std::fmt;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::FormgenError;
use crate::FormgenResult;
use crate::checksum::RunningChecksum;
use crate::checksum::Tag;
use crate::checksum::TagKind;
use crate::config::ProjectSettings;
use crate::escape::byte_array;
use crate::escape::quote_bytes;
use crate::ident::IdentifierAllocator;
use crate::ident::ObjectId;
use crate::registry::DeclarationRegistry;
use crate::registry::DeclarationScope;
use crate::registry::ObjectRegistry;

/// In preview mode, literals longer than this are replaced by a short
/// placeholder.
pub const PREVIEW_PAYLOAD_LIMIT: usize = 300;

/// Deepest indentation, in spaces.
pub const MAX_INDENT: usize = 32;

const SPACES: &str = "                                ";

/// Write formatted text to the body of a [`CodeWriter`].
#[macro_export]
macro_rules! write_c {
	($writer:expr, $($arg:tt)*) => {
		$writer.write_c(format_args!($($arg)*))
	};
}

/// Write formatted text to the header of a [`CodeWriter`].
#[macro_export]
macro_rules! write_h {
	($writer:expr, $($arg:tt)*) => {
		$writer.write_h(format_args!($($arg)*))
	};
}

/// Indentation string for `depth`: two spaces per level, clamped to
/// `0..=16` levels.
pub fn indent_at(depth: i32) -> &'static str {
	let width = usize::try_from(depth.saturating_mul(2))
		.unwrap_or(0)
		.min(MAX_INDENT);
	&SPACES[MAX_INDENT - width..]
}

enum OutputTarget {
	Stdout(io::Stdout),
	File(BufWriter<File>),
	Memory(Vec<u8>),
}

/// A generated file being written, with its current byte position.
pub struct Output {
	target: OutputTarget,
	position: u64,
	path: Option<PathBuf>,
}

impl fmt::Debug for Output {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let target = match self.target {
			OutputTarget::Stdout(_) => "stdout",
			OutputTarget::File(_) => "file",
			OutputTarget::Memory(_) => "memory",
		};
		f.debug_struct("Output")
			.field("target", &target)
			.field("position", &self.position)
			.field("path", &self.path)
			.finish()
	}
}

impl Output {
	/// Create or truncate the file at `path`.
	pub fn create(path: &Path) -> FormgenResult<Self> {
		let file = File::create(path).map_err(|source| {
			FormgenError::OpenOutput {
				path: path.to_path_buf(),
				source,
			}
		})?;

		Ok(Self {
			target: OutputTarget::File(BufWriter::new(file)),
			position: 0,
			path: Some(path.to_path_buf()),
		})
	}

	/// `path`, or standard output when no path is given.
	pub fn create_or_stdout(path: Option<&Path>) -> FormgenResult<Self> {
		match path {
			Some(path) => Self::create(path),
			None => Ok(Self::stdout()),
		}
	}

	pub fn stdout() -> Self {
		Self {
			target: OutputTarget::Stdout(io::stdout()),
			position: 0,
			path: None,
		}
	}

	pub fn memory() -> Self {
		Self {
			target: OutputTarget::Memory(Vec::new()),
			position: 0,
			path: None,
		}
	}

	/// Bytes written so far.
	pub fn position(&self) -> u64 {
		self.position
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	pub fn is_stdout(&self) -> bool {
		matches!(self.target, OutputTarget::Stdout(_))
	}

	fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
		match &mut self.target {
			OutputTarget::Stdout(out) => out.write_all(bytes)?,
			OutputTarget::File(out) => out.write_all(bytes)?,
			OutputTarget::Memory(out) => out.extend_from_slice(bytes),
		}
		self.position += bytes.len() as u64;
		Ok(())
	}

	/// Flush and close. In-memory outputs return their content.
	pub fn finish(self) -> io::Result<Option<Vec<u8>>> {
		match self.target {
			OutputTarget::Stdout(mut out) => {
				out.flush()?;
				Ok(None)
			}
			OutputTarget::File(out) => {
				let file = out.into_inner().map_err(io::IntoInnerError::into_error)?;
				file.sync_all()?;
				Ok(None)
			}
			OutputTarget::Memory(out) => Ok(Some(out)),
		}
	}
}

/// Access specifier inside a generated class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
	Private,
	#[default]
	Public,
	Protected,
}

impl Visibility {
	pub const fn keyword(self) -> &'static str {
		match self {
			Self::Private => "private",
			Self::Public => "public",
			Self::Protected => "protected",
		}
	}
}

#[derive(Debug)]
struct ClassScope {
	name: String,
	visibility: Option<Visibility>,
}

/// Streams generated code into a body (source) and a header output.
///
/// Every byte written to the body passes through a [`RunningChecksum`] when
/// merge tracking is enabled; [`CodeWriter::write_tag`] closes a block by
/// writing the checksum and resetting it. The writer also owns the per-run
/// identifier allocator and the once-only registries.
pub struct CodeWriter {
	body: Output,
	header: Output,
	settings: ProjectSettings,
	preview: bool,
	identifiers: IdentifierAllocator,
	declarations: DeclarationRegistry,
	objects: ObjectRegistry,
	checksum: RunningChecksum,
	indentation: i32,
	var_used_test: bool,
	var_used: bool,
	class_scope: Option<ClassScope>,
}

impl fmt::Debug for CodeWriter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CodeWriter")
			.field("body", &self.body)
			.field("header", &self.header)
			.field("preview", &self.preview)
			.field("checksum", &self.checksum)
			.field("indentation", &self.indentation)
			.finish_non_exhaustive()
	}
}

impl CodeWriter {
	pub fn new(settings: ProjectSettings, body: Output, header: Output, preview: bool) -> Self {
		Self {
			body,
			header,
			settings,
			preview,
			identifiers: IdentifierAllocator::new(),
			declarations: DeclarationRegistry::default(),
			objects: ObjectRegistry::default(),
			checksum: RunningChecksum::new(),
			indentation: 0,
			var_used_test: false,
			var_used: false,
			class_scope: None,
		}
	}

	/// A writer whose outputs are kept in memory.
	pub fn in_memory(settings: ProjectSettings) -> Self {
		Self::new(settings, Output::memory(), Output::memory(), false)
	}

	pub fn settings(&self) -> &ProjectSettings {
		&self.settings
	}

	/// Whether this run renders a preview rather than the real files.
	pub fn is_preview(&self) -> bool {
		self.preview
	}

	pub fn merge_tracking(&self) -> bool {
		self.settings.write_mergeback_data
	}

	/// Current checksum of the open block.
	pub fn block_checksum(&self) -> u32 {
		self.checksum.value()
	}

	pub fn body_position(&self) -> u64 {
		self.body.position()
	}

	pub fn header_position(&self) -> u64 {
		self.header.position()
	}

	/// Forget identifiers, declarations and seen objects, and return to the
	/// outermost indentation.
	pub fn reset(&mut self) {
		self.identifiers.clear();
		self.declarations.clear();
		self.objects.clear();
		self.checksum.reset();
		self.indentation = 0;
		self.class_scope = None;
	}

	// identifiers and registries

	/// See [`IdentifierAllocator::allocate`].
	pub fn unique_id(
		&mut self,
		owner: ObjectId,
		kind: &str,
		name: Option<&str>,
		label: Option<&str>,
	) -> String {
		self.identifiers.allocate(owner, kind, name, label)
	}

	/// Returns `true` if the static code of `object` was already written.
	/// Marks it as written otherwise.
	pub fn seen_object(&mut self, object: ObjectId) -> bool {
		self.objects.seen(object)
	}

	/// Write `line` to the header unless it was written there before.
	/// Returns whether it was written.
	pub fn write_h_once(&mut self, line: &str) -> io::Result<bool> {
		if self.var_used_test {
			return Ok(false);
		}
		if !self.declarations.claim(DeclarationScope::Header, line) {
			return Ok(false);
		}
		self.header.write_all(line.as_bytes())?;
		self.header.write_all(b"\n")?;
		Ok(true)
	}

	/// Write `line` to the body unless it was written to the body or the
	/// header before. Returns whether it was written.
	pub fn write_c_once(&mut self, line: &str) -> io::Result<bool> {
		if self.var_used_test {
			self.var_used = true;
			return Ok(false);
		}
		if !self.declarations.claim(DeclarationScope::Body, line) {
			return Ok(false);
		}
		self.put_body(line.as_bytes())?;
		self.put_body(b"\n")?;
		Ok(true)
	}

	// indentation

	pub fn indentation(&self) -> i32 {
		self.indentation
	}

	pub fn set_indentation(&mut self, depth: i32) {
		self.indentation = depth;
	}

	pub fn indent_more(&mut self) {
		self.indentation += 1;
	}

	pub fn indent_less(&mut self) {
		self.indentation -= 1;
	}

	/// Indentation for the current depth.
	pub fn indent(&self) -> &'static str {
		indent_at(self.indentation)
	}

	/// Indentation for the current depth plus `offset`, without changing the
	/// current depth.
	pub fn indent_plus(&self, offset: i32) -> &'static str {
		indent_at(self.indentation + offset)
	}

	// body and header text

	/// Write formatted text to the body.
	pub fn write_c(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
		if self.var_used_test {
			self.var_used = true;
			return Ok(());
		}
		match args.as_str() {
			Some(text) => self.put_body(text.as_bytes()),
			None => self.put_body(args.to_string().as_bytes()),
		}
	}

	/// Write formatted text to the header.
	pub fn write_h(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
		if self.var_used_test {
			return Ok(());
		}
		match args.as_str() {
			Some(text) => self.header.write_all(text.as_bytes()),
			None => self.header.write_all(args.to_string().as_bytes()),
		}
	}

	/// Write one statement to the body, adding `;` unless the code already
	/// ends in `;` or `}`, followed by an optional comment.
	pub fn write_cc(&mut self, indent: &str, code: &str, comment: &str) -> io::Result<()> {
		let line = statement_line(indent, code, comment);
		self.write_c(format_args!("{line}"))
	}

	/// Header counterpart of [`CodeWriter::write_cc`].
	pub fn write_hc(&mut self, indent: &str, code: &str, comment: &str) -> io::Result<()> {
		let line = statement_line(indent, code, comment);
		self.write_h(format_args!("{line}"))
	}

	/// Write one or more lines of code, each indented at the current depth
	/// plus `extra`. Empty lines get no indentation and preprocessor lines
	/// starting with `#` are never indented. `trail` is written after the
	/// last line.
	pub fn write_c_indented(&mut self, text: &str, extra: i32, trail: Option<char>) -> io::Result<()> {
		let indent = self.indent_plus(extra);
		let mut lines = text.split('\n').peekable();

		while let Some(line) = lines.next() {
			if line.is_empty() {
				// no trailing blanks on empty lines
			} else if line.starts_with('#') {
				self.write_c(format_args!("{line}"))?;
			} else {
				self.write_c(format_args!("{indent}{line}"))?;
			}

			if lines.peek().is_some() {
				self.write_c(format_args!("\n"))?;
			} else if let Some(trail) = trail {
				self.write_c(format_args!("{trail}"))?;
			}
		}

		Ok(())
	}

	/// Write `text` as a quoted C string literal. `None` marks text of
	/// unknown size, which is reported inside the generated file.
	pub fn emit_quoted_text(&mut self, text: Option<&[u8]>) -> io::Result<()> {
		if self.var_used_test {
			self.var_used = true;
			return Ok(());
		}

		if self.preview {
			match text {
				None => return self.put_body(b"\" ... text... \""),
				Some(bytes) if bytes.len() > PREVIEW_PAYLOAD_LIMIT => {
					let placeholder = format!("\" ... {} bytes of text... \"", bytes.len());
					return self.put_body(placeholder.as_bytes());
				}
				Some(_) => {}
			}
		}

		let Some(bytes) = text else {
			self.put_body(b"\n#error  string not found\n")?;
			return self.put_body(b"\" ... undefined size text... \"");
		};

		let literal = quote_bytes(bytes, self.settings.utf8_in_source);
		self.put_body(&literal)
	}

	/// Write a string as a quoted C string literal.
	pub fn write_cstring(&mut self, text: &str) -> io::Result<()> {
		self.emit_quoted_text(Some(text.as_bytes()))
	}

	/// Write binary data as an array initializer `{1,2,200}`. `None` marks
	/// data of unknown size, which is reported inside the generated file.
	pub fn emit_byte_array(&mut self, data: Option<&[u8]>) -> io::Result<()> {
		if self.var_used_test {
			self.var_used = true;
			return Ok(());
		}

		if self.preview {
			match data {
				None => return self.put_body(b"{ /* ... binary data... */ }"),
				Some(bytes) if bytes.len() > PREVIEW_PAYLOAD_LIMIT => {
					let placeholder = format!("{{ /* ... {} bytes of binary data... */ }}", bytes.len());
					return self.put_body(placeholder.as_bytes());
				}
				Some(_) => {}
			}
		}

		let Some(bytes) = data else {
			self.put_body(b"\n#error  data not found\n")?;
			return self.put_body(b"{ /* ... undefined size binary data... */ }");
		};

		self.put_body(byte_array(bytes).as_bytes())
	}

	// merge tags

	/// Close the current block with a tag line carrying its checksum, then
	/// start a new block. Writes nothing unless merge tracking is enabled.
	pub fn write_tag(&mut self, kind: TagKind, node_id: u16) -> io::Result<()> {
		if self.var_used_test {
			return Ok(());
		}
		if self.merge_tracking() {
			let tag = Tag {
				kind,
				node_id,
				checksum: self.checksum.value(),
			};
			self.body.write_all(format!("{tag}\n").as_bytes())?;
		}
		self.checksum.reset();
		Ok(())
	}

	// used-variable dry run

	/// Run `emit` without writing anything and report whether it tried to
	/// write code or literals to the body. Used to avoid declaring local
	/// variables that the generated code would never reference.
	pub fn test_var_used(
		&mut self,
		emit: impl FnOnce(&mut Self) -> io::Result<()>,
	) -> io::Result<bool> {
		let outer = (self.var_used_test, self.var_used);
		self.var_used_test = true;
		self.var_used = false;
		let result = emit(self);
		let used = self.var_used;
		(self.var_used_test, self.var_used) = outer;
		result.map(|()| used)
	}

	pub fn is_var_used_test(&self) -> bool {
		self.var_used_test
	}

	// class scopes

	/// Enter the declaration of class `name`. Access specifiers are written
	/// lazily by [`CodeWriter::write_public`].
	pub fn enter_class(&mut self, name: &str, initial: Option<Visibility>) {
		self.class_scope = Some(ClassScope {
			name: name.to_string(),
			visibility: initial,
		});
	}

	pub fn leave_class(&mut self) {
		self.class_scope = None;
	}

	pub fn current_class(&self) -> Option<&str> {
		self.class_scope.as_ref().map(|scope| scope.name.as_str())
	}

	/// Write `public:`, `private:` or `protected:` to the header when inside
	/// a class and the access level changes.
	pub fn write_public(&mut self, visibility: Visibility) -> io::Result<()> {
		if self.var_used_test {
			return Ok(());
		}
		let Some(scope) = self.class_scope.as_mut() else {
			return Ok(());
		};
		if scope.visibility == Some(visibility) {
			return Ok(());
		}
		scope.visibility = Some(visibility);
		self.write_h(format_args!("{}:\n", visibility.keyword()))
	}

	/// Flush and close both outputs. Both are closed even if the first one
	/// fails; the first error is returned.
	pub fn finish(self) -> io::Result<(Option<Vec<u8>>, Option<Vec<u8>>)> {
		let body = self.body.finish();
		let header = self.header.finish();
		Ok((body?, header?))
	}

	fn put_body(&mut self, bytes: &[u8]) -> io::Result<()> {
		if self.merge_tracking() {
			self.checksum.add(bytes);
		}
		self.body.write_all(bytes)
	}
}

fn statement_line(indent: &str, code: &str, comment: &str) -> String {
	let mut line = format!("{indent}{code}");
	if !code.ends_with(['}', ';']) {
		line.push(';');
	}
	if !comment.is_empty() {
		line.push(' ');
		line.push_str(comment);
	}
	line.push('\n');
	line
}
