use std::collections::BTreeSet;
use std::collections::HashSet;

use derive_more::Deref;

use crate::ident::ObjectId;

/// The output a once-only declaration is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationScope {
	Header,
	Body,
}

/// Lines already written by `write_h_once` / `write_c_once`.
///
/// The header is included by the body, so a line declared in the header also
/// counts as present in the body. Body lines never suppress header lines.
#[derive(Debug, Default)]
pub struct DeclarationRegistry {
	header: BTreeSet<String>,
	body: BTreeSet<String>,
}

impl DeclarationRegistry {
	/// Record `text` in `scope`. Returns `true` if the caller must write it,
	/// `false` if it is already visible in that scope.
	pub fn claim(&mut self, scope: DeclarationScope, text: &str) -> bool {
		if self.header.contains(text) {
			return false;
		}

		match scope {
			DeclarationScope::Header => self.header.insert(text.to_string()),
			DeclarationScope::Body => {
				if self.body.contains(text) {
					return false;
				}
				self.body.insert(text.to_string())
			}
		}
	}

	pub fn contains(&self, scope: DeclarationScope, text: &str) -> bool {
		match scope {
			DeclarationScope::Header => self.header.contains(text),
			DeclarationScope::Body => self.header.contains(text) || self.body.contains(text),
		}
	}

	pub fn clear(&mut self) {
		self.header.clear();
		self.body.clear();
	}
}

/// Objects whose one-time static code was already written in this run.
#[derive(Debug, Default, Deref)]
pub struct ObjectRegistry(HashSet<ObjectId>);

impl ObjectRegistry {
	/// Returns `true` if `object` was seen before. Marks it as seen
	/// otherwise.
	pub fn seen(&mut self, object: ObjectId) -> bool {
		!self.0.insert(object)
	}

	pub fn clear(&mut self) {
		self.0.clear();
	}
}
