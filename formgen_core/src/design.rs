//! The design document: a JSON file of nested items that `formgen` generates
//! code from and merges hand edits back into.
//!
//! ```json
//! {
//!   "resources": { "logo": { "bytes": [137, 80, 78, 71] } },
//!   "items": [
//!     { "kind": "function", "name": "make_window()", "return_type": "Fl_Double_Window*",
//!       "children": [
//!         { "kind": "widget", "class": "Fl_Double_Window", "name": "w", "w": 320, "h": 200,
//!           "children": [
//!             { "kind": "widget", "class": "Fl_Button", "label": "Save",
//!               "callback": "save_document();", "x": 10, "y": 10, "w": 80, "h": 25 }
//!           ] },
//!         { "kind": "code", "code": "return w;" }
//!       ] }
//!   ]
//! }
//! ```
//!
//! Items without an `id` receive a fresh one when loaded; ids are written
//! back on save so merge tags in generated files keep pointing at the same
//! items.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::FormgenError;
use crate::FormgenResult;
use crate::checksum::TagKind;
use crate::config::I18nMode;
use crate::ident::ObjectId;
use crate::ident::is_ident_char;
use crate::node::DesignNode;
use crate::node::DesignTree;
use crate::node::NodeId;
use crate::node::NodeKind;
use crate::write_c;
use crate::write_h;
use crate::writer::CodeWriter;
use crate::writer::Visibility;
use crate::writer::indent_at;

/// Most nodes a design can hold: one per 16-bit id.
pub const MAX_NODES: usize = u16::MAX as usize;

/// Shared data referenced by name from widgets (images) and data items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
	Text(String),
	Bytes(Vec<u8>),
}

impl Resource {
	pub fn as_bytes(&self) -> &[u8] {
		match self {
			Self::Text(text) => text.as_bytes(),
			Self::Bytes(bytes) => bytes,
		}
	}
}

/// How a data item is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
	/// `const unsigned char name[] = {...};`
	#[default]
	Binary,
	/// `const char *name = "...";`
	Text,
}

/// The content of a design item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBody {
	Comment {
		text: String,
		#[serde(default = "default_true")]
		in_source: bool,
		#[serde(default)]
		in_header: bool,
	},
	Code {
		code: String,
	},
	CodeBlock {
		open: String,
		#[serde(default, skip_serializing_if = "String::is_empty")]
		close: String,
	},
	Declaration {
		text: String,
		#[serde(default = "default_private")]
		visibility: Visibility,
	},
	Function {
		/// Name and argument list, e.g. `make_window(int x)`.
		name: String,
		#[serde(default, skip_serializing_if = "String::is_empty")]
		return_type: String,
		#[serde(default)]
		visibility: Visibility,
	},
	WidgetClass {
		name: String,
		#[serde(default = "default_class_base")]
		base: String,
	},
	Widget {
		class: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		name: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		label: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		tooltip: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		callback: Option<String>,
		/// Name of a resource used as the widget's image.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		image: Option<String>,
		#[serde(default)]
		x: i32,
		#[serde(default)]
		y: i32,
		#[serde(default)]
		w: i32,
		#[serde(default)]
		h: i32,
	},
	MenuItem {
		label: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		shortcut: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		callback: Option<String>,
	},
	Data {
		name: String,
		resource: String,
		#[serde(default)]
		format: DataFormat,
		#[serde(default = "default_private")]
		visibility: Visibility,
	},
}

fn default_true() -> bool {
	true
}

fn default_private() -> Visibility {
	Visibility::Private
}

fn default_class_base() -> String {
	"Fl_Group".to_string()
}

impl ItemBody {
	pub fn kind(&self) -> NodeKind {
		match self {
			Self::Comment { .. } => NodeKind::Comment,
			Self::Code { .. } => NodeKind::Code,
			Self::CodeBlock { .. } => NodeKind::CodeBlock,
			Self::Declaration { .. } => NodeKind::Declaration,
			Self::Function { .. } => NodeKind::Function,
			Self::WidgetClass { .. } => NodeKind::WidgetClass,
			Self::Widget { .. } => NodeKind::Widget,
			Self::MenuItem { .. } => NodeKind::MenuItem,
			Self::Data { .. } => NodeKind::Data,
		}
	}
}

/// One item of the document with its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignItem {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<u16>,
	#[serde(flatten)]
	pub body: ItemBody,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<DesignItem>,
}

impl DesignItem {
	pub fn new(body: ItemBody) -> Self {
		Self {
			id: None,
			body,
			children: Vec::new(),
		}
	}

	#[must_use]
	pub fn with_id(mut self, id: u16) -> Self {
		self.id = Some(id);
		self
	}

	#[must_use]
	pub fn with_children(mut self, children: Vec<DesignItem>) -> Self {
		self.children = children;
		self
	}
}

/// The on-disk form of a design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignDocument {
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub resources: BTreeMap<String, Resource>,
	#[serde(default)]
	pub items: Vec<DesignItem>,
}

/// Where a node's declarations end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeScope {
	/// File scope.
	Global,
	/// Member of the enclosing widget class.
	Class,
	/// Inside a function body or code block.
	Local,
}

/// A flattened design item.
#[derive(Debug, Clone)]
pub struct Node {
	id: NodeId,
	depth: usize,
	scope: NodeScope,
	has_children: bool,
	has_child_widgets: bool,
	body: ItemBody,
	resource: Option<Arc<Resource>>,
	label_msgid: usize,
	tooltip_msgid: usize,
}

impl Node {
	pub fn body(&self) -> &ItemBody {
		&self.body
	}

	pub fn scope(&self) -> NodeScope {
		self.scope
	}

	pub fn has_children(&self) -> bool {
		self.has_children
	}

	/// Callback function name for a widget or menu item.
	fn callback_name(&self, writer: &mut CodeWriter) -> String {
		let (name, label) = match &self.body {
			ItemBody::Widget { name, label, .. } => (name.as_deref(), label.as_deref()),
			ItemBody::MenuItem { label, .. } => (None, Some(label.as_str())),
			_ => (None, None),
		};
		writer.unique_id(ObjectId::of(self), "cb", name, label)
	}

	/// Static callback function holding the callback code, unless the
	/// callback is just the name of an existing function.
	fn write_callback_function(
		&self,
		writer: &mut CodeWriter,
		callback: &str,
		target_type: &str,
		kind: TagKind,
	) -> io::Result<()> {
		if is_function_name(callback) {
			writer.write_h_once(&format!("extern void {callback}({target_type}*, void*);"))?;
			return Ok(());
		}

		let name = self.callback_name(writer);
		write_c!(writer, "\nstatic void {name}({target_type}* o, void* v) {{\n")?;
		writer.write_tag(TagKind::Generic, self.id.get())?;
		writer.write_c_indented(callback, 1, Some('\n'))?;
		writer.write_tag(kind, self.id.get())?;
		write_c!(writer, "}}\n")
	}

	fn callback_expression(&self, writer: &mut CodeWriter, callback: &str) -> String {
		if is_function_name(callback) {
			callback.to_string()
		} else {
			self.callback_name(writer)
		}
	}

	/// A label or tooltip literal, wrapped for the configured translation
	/// scheme.
	fn write_label(writer: &mut CodeWriter, text: &str, msgid: usize) -> io::Result<()> {
		let i18n = writer.settings().i18n.clone();
		match i18n.mode {
			I18nMode::None => writer.write_cstring(text),
			I18nMode::Gnu => {
				write_c!(writer, "{}(", i18n.gnu_function)?;
				writer.write_cstring(text)?;
				write_c!(writer, ")")
			}
			I18nMode::Posix => {
				let catalog = if i18n.posix_file.is_empty() {
					"_catalog"
				} else {
					i18n.posix_file.as_str()
				};
				write_c!(writer, "catgets({catalog},{},{msgid},", i18n.posix_set)?;
				writer.write_cstring(text)?;
				write_c!(writer, ")")
			}
		}
	}

	fn image_variable(&self, writer: &mut CodeWriter, image: &str) -> Option<(String, usize)> {
		let resource = self.resource.as_deref()?;
		let variable = writer.unique_id(ObjectId::of(resource), "idata", Some(image), None);
		Some((variable, resource.as_bytes().len()))
	}

	/// Statements configuring a widget after construction. All of them use
	/// the local `o`.
	fn write_widget_setters(&self, writer: &mut CodeWriter) -> io::Result<()> {
		let ItemBody::Widget {
			tooltip,
			callback,
			image,
			..
		} = &self.body
		else {
			return Ok(());
		};

		if let Some(tooltip) = tooltip {
			write_c!(writer, "{}o->tooltip(", writer.indent())?;
			Self::write_label(writer, tooltip, self.tooltip_msgid)?;
			write_c!(writer, ");\n")?;
		}

		if let Some(image) = image.as_deref() {
			if let Some((variable, size)) = self.image_variable(writer, image) {
				write_c!(
					writer,
					"{}o->image(new Fl_PNG_Image(\"{image}\", {variable}, {size}));\n",
					writer.indent()
				)?;
			}
		}

		if let Some(callback) = callback.as_deref().filter(|text| !text.trim().is_empty()) {
			let expression = self.callback_expression(writer, callback);
			write_c!(
				writer,
				"{}o->callback((Fl_Callback*){expression});\n",
				writer.indent()
			)?;
		}

		Ok(())
	}

	fn write_widget_static(&self, writer: &mut CodeWriter) -> io::Result<()> {
		let ItemBody::Widget {
			class,
			name,
			callback,
			image,
			..
		} = &self.body
		else {
			return Ok(());
		};

		if let Some(name) = name.as_deref().filter(|_| self.scope != NodeScope::Class) {
			write_h!(writer, "extern {class} *{name};\n")?;
			write_c!(writer, "{class} *{name}=({class} *)0;\n")?;
		}

		if let (Some(image), Some(resource)) = (image.as_deref(), self.resource.as_deref()) {
			writer.write_h_once("#include <FL/Fl_PNG_Image.H>")?;
			let owner = ObjectId::of(resource);
			let variable = writer.unique_id(owner, "idata", Some(image), None);
			if !writer.seen_object(owner) {
				write_c!(writer, "static const unsigned char {variable}[] =\n")?;
				writer.emit_byte_array(Some(resource.as_bytes()))?;
				write_c!(writer, ";\n")?;
			}
		}

		if let Some(callback) = callback.as_deref().filter(|text| !text.trim().is_empty()) {
			self.write_callback_function(writer, callback, class, TagKind::WidgetCallback)?;
		}

		Ok(())
	}

	fn write_widget_code1(&self, writer: &mut CodeWriter) -> io::Result<()> {
		let ItemBody::Widget {
			class,
			name,
			label,
			x,
			y,
			w,
			h,
			..
		} = &self.body
		else {
			return Ok(());
		};

		if let Some(name) = name.as_deref().filter(|_| self.scope == NodeScope::Class) {
			writer.write_public(Visibility::Public)?;
			write_h!(writer, "{}{class} *{name};\n", indent_at(1))?;
		}

		let uses_o = self.has_children || writer.test_var_used(|w| self.write_widget_setters(w))?;
		write_c!(writer, "{}{{ ", writer.indent())?;
		match (name.as_deref(), uses_o) {
			(Some(name), true) => write_c!(writer, "{class}* o = {name} = new {class}(")?,
			(Some(name), false) => write_c!(writer, "{name} = new {class}(")?,
			(None, true) => write_c!(writer, "{class}* o = new {class}(")?,
			(None, false) => write_c!(writer, "new {class}(")?,
		}
		write_c!(writer, "{x}, {y}, {w}, {h}, ")?;
		match label {
			Some(label) => Self::write_label(writer, label, self.label_msgid)?,
			None => write_c!(writer, "0")?,
		}
		write_c!(writer, ");\n")?;

		writer.indent_more();
		self.write_widget_setters(writer)
	}

	fn write_widget_code2(&self, writer: &mut CodeWriter) -> io::Result<()> {
		let ItemBody::Widget { class, name, .. } = &self.body else {
			return Ok(());
		};

		if self.has_child_widgets {
			write_c!(writer, "{}o->end();\n", writer.indent())?;
		}
		writer.indent_less();
		write_c!(
			writer,
			"{}}} // {class}* {}\n",
			writer.indent(),
			name.as_deref().unwrap_or("o")
		)
	}

	fn write_declaration(
		&self,
		writer: &mut CodeWriter,
		text: &str,
		visibility: Visibility,
	) -> io::Result<()> {
		let text = text.trim();
		if text.is_empty() {
			return Ok(());
		}

		if text.starts_with('#') {
			if visibility == Visibility::Private {
				writer.write_c_once(text)?;
			} else {
				writer.write_h_once(text)?;
			}
			return Ok(());
		}

		match self.scope {
			NodeScope::Class => {
				writer.write_public(visibility)?;
				writer.write_hc(indent_at(1), text, "")
			}
			NodeScope::Local => writer.write_cc(writer.indent(), text, ""),
			NodeScope::Global if visibility == Visibility::Private => {
				writer.write_cc("", &format!("static {text}"), "")
			}
			NodeScope::Global => {
				writer.write_hc("", &format!("extern {text}"), "")?;
				writer.write_cc("", text, "")
			}
		}
	}

	fn write_data(
		&self,
		writer: &mut CodeWriter,
		name: &str,
		format: DataFormat,
		visibility: Visibility,
	) -> io::Result<()> {
		let data = self.resource.as_deref().map(Resource::as_bytes);
		let public = visibility != Visibility::Private && self.scope == NodeScope::Global;
		let storage = if public { "" } else { "static " };

		match format {
			DataFormat::Binary => {
				let size = data.map(|bytes| bytes.len().to_string()).unwrap_or_default();
				if public {
					write_h!(writer, "extern const unsigned char {name}[{size}];\n")?;
				}
				write_c!(writer, "{storage}const unsigned char {name}[{size}] =\n")?;
				writer.emit_byte_array(data)?;
			}
			DataFormat::Text => {
				if public {
					write_h!(writer, "extern const char *{name};\n")?;
				}
				write_c!(writer, "{storage}const char *{name} =\n")?;
				writer.emit_quoted_text(data)?;
			}
		}

		write_c!(writer, ";\n")
	}
}

impl DesignNode for Node {
	fn id(&self) -> NodeId {
		self.id
	}

	fn depth(&self) -> usize {
		self.depth
	}

	fn kind(&self) -> NodeKind {
		self.body.kind()
	}

	fn label(&self) -> Option<&str> {
		match &self.body {
			ItemBody::Widget { label, .. } => label.as_deref(),
			ItemBody::MenuItem { label, .. } => Some(label),
			_ => None,
		}
	}

	fn tooltip(&self) -> Option<&str> {
		match &self.body {
			ItemBody::Widget { tooltip, .. } => tooltip.as_deref(),
			_ => None,
		}
	}

	fn write_static(&self, writer: &mut CodeWriter) -> io::Result<()> {
		match &self.body {
			ItemBody::Widget { .. } => self.write_widget_static(writer),
			ItemBody::MenuItem {
				callback: Some(callback),
				..
			} if !callback.trim().is_empty() => {
				self.write_callback_function(writer, callback, "Fl_Menu_", TagKind::MenuCallback)
			}
			_ => Ok(()),
		}
	}

	fn write_code1(&self, writer: &mut CodeWriter) -> io::Result<()> {
		match &self.body {
			ItemBody::Comment {
				text,
				in_source,
				in_header,
			} => {
				for line in text.lines() {
					let separator = if line.is_empty() { "" } else { " " };
					if *in_source {
						write_c!(writer, "{}//{separator}{line}\n", writer.indent())?;
					}
					if *in_header {
						write_h!(writer, "//{separator}{line}\n")?;
					}
				}
				Ok(())
			}
			ItemBody::Code { code } => {
				writer.write_tag(TagKind::Generic, self.id.get())?;
				writer.write_c_indented(code, 0, Some('\n'))?;
				writer.write_tag(TagKind::Code, self.id.get())
			}
			ItemBody::CodeBlock { open, .. } => {
				write_c!(writer, "{}{open} {{\n", writer.indent())?;
				writer.indent_more();
				Ok(())
			}
			ItemBody::Declaration { text, visibility } => {
				self.write_declaration(writer, text, *visibility)
			}
			ItemBody::Function {
				name,
				return_type,
				visibility,
			} => {
				let return_type = if return_type.is_empty() {
					"void"
				} else {
					return_type.as_str()
				};
				let class = match self.scope {
					NodeScope::Class => writer.current_class().map(str::to_string),
					NodeScope::Global | NodeScope::Local => None,
				};

				if let Some(class) = class {
					writer.write_public(*visibility)?;
					write_h!(writer, "{}{return_type} {name};\n", indent_at(1))?;
					write_c!(writer, "\n{return_type} {class}::{name} {{\n")?;
				} else if *visibility == Visibility::Private {
					write_c!(writer, "\nstatic {return_type} {name} {{\n")?;
				} else {
					write_h!(writer, "{return_type} {name};\n")?;
					write_c!(writer, "\n{return_type} {name} {{\n")?;
				}
				writer.write_tag(TagKind::Generic, self.id.get())?;
				writer.set_indentation(1);
				Ok(())
			}
			ItemBody::WidgetClass { name, base } => {
				write_h!(writer, "\nclass {name} : public {base} {{\n")?;
				writer.enter_class(name, Some(Visibility::Private));
				writer.write_public(Visibility::Public)?;
				write_h!(
					writer,
					"{}{name}(int X, int Y, int W, int H, const char *L = 0);\n",
					indent_at(1)
				)?;
				write_c!(
					writer,
					"\n{name}::{name}(int X, int Y, int W, int H, const char *L)\n"
				)?;
				write_c!(writer, "{}: {base}(X, Y, W, H, L) {{\n", indent_at(1))?;
				writer.write_tag(TagKind::Generic, self.id.get())?;
				writer.set_indentation(1);
				Ok(())
			}
			ItemBody::Widget { .. } => self.write_widget_code1(writer),
			ItemBody::MenuItem {
				label,
				shortcut,
				callback,
			} => {
				write_c!(writer, "{}o->add(", writer.indent())?;
				Self::write_label(writer, label, self.label_msgid)?;
				let shortcut = shortcut.as_deref().unwrap_or("0");
				let callback = callback
					.as_deref()
					.filter(|text| !text.trim().is_empty())
					.map_or_else(|| "0".to_string(), |text| self.callback_expression(writer, text));
				write_c!(writer, ", {shortcut}, (Fl_Callback*){callback});\n")
			}
			ItemBody::Data {
				name,
				format,
				visibility,
				..
			} => self.write_data(writer, name, *format, *visibility),
		}
	}

	fn write_code2(&self, writer: &mut CodeWriter) -> io::Result<()> {
		match &self.body {
			ItemBody::CodeBlock { close, .. } => {
				writer.indent_less();
				if close.is_empty() {
					write_c!(writer, "{}}}\n", writer.indent())
				} else {
					write_c!(writer, "{}}} {close}\n", writer.indent())
				}
			}
			ItemBody::Function { .. } => {
				writer.write_tag(TagKind::Generic, self.id.get())?;
				writer.set_indentation(0);
				write_c!(writer, "}}\n")
			}
			ItemBody::WidgetClass { .. } => {
				write_c!(writer, "{}end();\n", writer.indent())?;
				writer.write_tag(TagKind::Generic, self.id.get())?;
				writer.set_indentation(0);
				write_c!(writer, "}}\n")
			}
			ItemBody::Widget { .. } => self.write_widget_code2(writer),
			_ => Ok(()),
		}
	}

	fn set_callback(&mut self, text: &str) -> bool {
		match &mut self.body {
			ItemBody::Widget { callback, .. } | ItemBody::MenuItem { callback, .. } => {
				*callback = Some(text.to_string());
				true
			}
			_ => false,
		}
	}

	fn set_code(&mut self, text: &str) -> bool {
		match &mut self.body {
			ItemBody::Code { code } => {
				*code = text.to_string();
				true
			}
			_ => false,
		}
	}
}

/// A loaded design: the document's items flattened in depth-first order.
#[derive(Debug, Clone, Default)]
pub struct Design {
	nodes: Vec<Node>,
	resources: BTreeMap<String, Arc<Resource>>,
}

impl DesignTree for Design {
	type Node = Node;

	fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	fn find_by_id_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|node| node.id == id)
	}
}

struct FlatItem {
	id: Option<u16>,
	depth: usize,
	scope: NodeScope,
	has_children: bool,
	has_child_widgets: bool,
	body: ItemBody,
}

fn flatten(items: Vec<DesignItem>, depth: usize, scope: NodeScope, out: &mut Vec<FlatItem>) {
	for item in items {
		let child_scope = match item.body {
			ItemBody::WidgetClass { .. } => NodeScope::Class,
			ItemBody::Function { .. } | ItemBody::CodeBlock { .. } => NodeScope::Local,
			_ => scope,
		};
		let has_child_widgets = item
			.children
			.iter()
			.any(|child| matches!(child.body, ItemBody::Widget { .. }));

		out.push(FlatItem {
			id: item.id,
			depth,
			scope,
			has_children: !item.children.is_empty(),
			has_child_widgets,
			body: item.body,
		});
		flatten(item.children, depth + 1, child_scope, out);
	}
}

impl Design {
	pub fn new() -> Self {
		Self::default()
	}

	/// Flatten `document`, assigning ids to items that have none.
	pub fn from_document(document: DesignDocument) -> FormgenResult<Self> {
		let resources: BTreeMap<String, Arc<Resource>> = document
			.resources
			.into_iter()
			.map(|(name, resource)| (name, Arc::new(resource)))
			.collect();

		let mut flat = Vec::new();
		flatten(document.items, 0, NodeScope::Global, &mut flat);
		if flat.len() > MAX_NODES {
			return Err(FormgenError::TooManyNodes(MAX_NODES));
		}

		let mut used = HashSet::new();
		for id in flat.iter().filter_map(|item| item.id) {
			if !used.insert(id) {
				return Err(FormgenError::DuplicateNodeId(id));
			}
		}

		let mut next_free = (1..=u16::MAX).chain([0]).filter(|id| !used.contains(id));
		let mut next_msgid = 1;
		let mut nodes = Vec::with_capacity(flat.len());

		for item in flat {
			let id = match item.id {
				Some(id) => id,
				None => next_free.next().ok_or(FormgenError::TooManyNodes(MAX_NODES))?,
			};

			let resource_name = match &item.body {
				ItemBody::Widget { image, .. } => image.as_deref(),
				ItemBody::Data { resource, .. } => Some(resource.as_str()),
				_ => None,
			};
			let resource = resource_name.and_then(|name| {
				let resource = resources.get(name).cloned();
				if resource.is_none() {
					warn!(node = %NodeId(id), resource = name, "unknown resource");
				}
				resource
			});

			let mut node = Node {
				id: NodeId(id),
				depth: item.depth,
				scope: item.scope,
				has_children: item.has_children,
				has_child_widgets: item.has_child_widgets,
				body: item.body,
				resource,
				label_msgid: 0,
				tooltip_msgid: 0,
			};

			// message numbers follow the order of the strings file
			if node.is_widget() {
				if node.label().is_some() {
					node.label_msgid = next_msgid;
					next_msgid += 1;
				}
				if node.tooltip().is_some() {
					node.tooltip_msgid = next_msgid;
					next_msgid += 1;
				}
			}

			nodes.push(node);
		}

		Ok(Self { nodes, resources })
	}

	/// Rebuild the nested document, including every node's id.
	pub fn to_document(&self) -> DesignDocument {
		let mut roots = Vec::new();
		let mut open: Vec<(usize, DesignItem)> = Vec::new();

		for node in &self.nodes {
			close_items(&mut open, &mut roots, node.depth);
			open.push((
				node.depth,
				DesignItem::new(node.body.clone()).with_id(node.id.get()),
			));
		}
		close_items(&mut open, &mut roots, 0);

		DesignDocument {
			resources: self
				.resources
				.iter()
				.map(|(name, resource)| (name.clone(), Resource::clone(resource)))
				.collect(),
			items: roots,
		}
	}

	pub fn from_json(json: &str) -> FormgenResult<Self> {
		let document: DesignDocument =
			serde_json::from_str(json).map_err(|e| FormgenError::DesignParse(e.to_string()))?;
		Self::from_document(document)
	}

	pub fn to_json(&self) -> FormgenResult<String> {
		serde_json::to_string_pretty(&self.to_document())
			.map_err(|e| FormgenError::DesignSerialize(e.to_string()))
	}

	/// Load the design document at `path`.
	pub fn load(path: &Path) -> FormgenResult<Self> {
		if !path.is_file() {
			return Err(FormgenError::MissingDesign(path.to_path_buf()));
		}

		let json = std::fs::read_to_string(path)?;
		let design = Self::from_json(&json)?;
		debug!(path = %path.display(), nodes = design.nodes.len(), "loaded design");

		Ok(design)
	}

	/// Write the design to `path`, replacing the file atomically.
	pub fn save(&self, path: &Path) -> FormgenResult<()> {
		let mut json = self.to_json()?;
		json.push('\n');

		let temp_path = path.with_extension(format!("json.tmp-{}", std::process::id()));
		std::fs::write(&temp_path, json)?;
		if let Err(error) = std::fs::rename(&temp_path, path) {
			let _ = std::fs::remove_file(&temp_path);
			return Err(error.into());
		}
		debug!(path = %path.display(), "saved design");

		Ok(())
	}

	pub fn resource(&self, name: &str) -> Option<&Resource> {
		self.resources.get(name).map(Arc::as_ref)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

/// Pop every open item at `depth` or deeper, attaching each to its parent.
fn close_items(open: &mut Vec<(usize, DesignItem)>, roots: &mut Vec<DesignItem>, depth: usize) {
	while open.last().is_some_and(|(open_depth, _)| *open_depth >= depth) {
		let Some((_, item)) = open.pop() else {
			break;
		};
		match open.last_mut() {
			Some((_, parent)) => parent.children.push(item),
			None => roots.push(item),
		}
	}
}

/// Callbacks naming an existing function are referenced directly instead of
/// being wrapped in a generated static function.
fn is_function_name(callback: &str) -> bool {
	let callback = callback.trim();
	callback.bytes().next().is_some_and(|first| !first.is_ascii_digit())
		&& callback.bytes().all(is_ident_char)
}
