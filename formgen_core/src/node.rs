use std::io;

use derive_more::Display;
use serde::Deserialize;
use serde::Serialize;

use crate::writer::CodeWriter;

/// Stable identifier of a design node, written into merge tags.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[display("{_0:04x}")]
#[serde(transparent)]
pub struct NodeId(pub u16);

impl NodeId {
	pub const fn get(self) -> u16 {
		self.0
	}
}

/// The kinds of design node the generator distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum NodeKind {
	/// Free comment text. A comment first or last in the design frames the
	/// whole file.
	Comment,
	/// Verbatim code lines. Edits merge back into the node's text.
	Code,
	/// A braced block (`if (...) {` ... `}`) around its children.
	CodeBlock,
	/// A declaration or `#include` line.
	Declaration,
	/// A function or method; inside a class its emission is deferred until
	/// the class members are declared.
	Function,
	/// A generated widget subclass.
	WidgetClass,
	/// A widget instance.
	Widget,
	/// A menu item with an optional callback.
	MenuItem,
	/// Inline binary or text data.
	Data,
}

/// One node of the design tree, as seen by the generator.
///
/// The tree itself is an ordered, depth-annotated list: a node's children
/// are the nodes following it whose depth is strictly greater.
pub trait DesignNode {
	fn id(&self) -> NodeId;

	/// Nesting depth, 0 for top-level nodes.
	fn depth(&self) -> usize;

	fn kind(&self) -> NodeKind;

	/// Label text, for widgets.
	fn label(&self) -> Option<&str> {
		None
	}

	/// Tooltip text, for widgets.
	fn tooltip(&self) -> Option<&str> {
		None
	}

	/// One-time setup code: callbacks, static data, global declarations.
	fn write_static(&self, writer: &mut CodeWriter) -> io::Result<()>;

	/// Code written before the node's children.
	fn write_code1(&self, writer: &mut CodeWriter) -> io::Result<()>;

	/// Code written after the node's children.
	fn write_code2(&self, writer: &mut CodeWriter) -> io::Result<()>;

	/// Replace the callback text. Returns `false` if this node has no
	/// callback.
	fn set_callback(&mut self, _text: &str) -> bool {
		false
	}

	/// Replace the code text. Returns `false` if this node holds no code.
	fn set_code(&mut self, _text: &str) -> bool {
		false
	}

	fn is_comment(&self) -> bool {
		self.kind() == NodeKind::Comment
	}

	/// A class-like node whose function children are deferred.
	fn is_class(&self) -> bool {
		self.kind() == NodeKind::WidgetClass
	}

	fn is_function(&self) -> bool {
		self.kind() == NodeKind::Function
	}

	fn is_code(&self) -> bool {
		self.kind() == NodeKind::Code
	}

	/// Nodes whose label and tooltip are user-visible strings.
	fn is_widget(&self) -> bool {
		matches!(
			self.kind(),
			NodeKind::Widget | NodeKind::WidgetClass | NodeKind::MenuItem
		)
	}
}

/// The design being generated from or merged into.
pub trait DesignTree {
	type Node: DesignNode;

	/// All nodes in depth-first order.
	fn nodes(&self) -> &[Self::Node];

	fn find_by_id(&self, id: NodeId) -> Option<&Self::Node> {
		self.nodes().iter().find(|node| node.id() == id)
	}

	fn find_by_id_mut(&mut self, id: NodeId) -> Option<&mut Self::Node>;
}

/// A half-open byte range in a generated file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceRange {
	pub start: u64,
	pub end: u64,
}

impl SourceRange {
	pub fn is_empty(&self) -> bool {
		self.start >= self.end
	}
}

/// Where one node's code landed in the generated files, for a source view
/// that highlights the code of the selected node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeRanges {
	pub body_static: SourceRange,
	pub header_static: SourceRange,
	pub body_code1: SourceRange,
	pub header_code1: SourceRange,
	pub body_code2: SourceRange,
	pub header_code2: SourceRange,
}
