use std::collections::BTreeMap;

use derive_more::Display;

/// Longest candidate identifier, leaving room for an eight digit hexadecimal
/// suffix within a 128 byte budget.
pub const MAX_IDENTIFIER_LEN: usize = 128 - 8 - 1;

/// Identity of an object that owns generated identifiers or one-time static
/// code. Two references to the same value have the same identity for as long
/// as the value is not moved, which holds for the duration of a generation
/// run because the design tree is borrowed immutably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("object@{_0:#x}")]
pub struct ObjectId(usize);

impl ObjectId {
	/// The identity of `value`.
	pub fn of<T: ?Sized>(value: &T) -> Self {
		Self(std::ptr::from_ref(value).cast::<()>() as usize)
	}

	/// An identity derived from a plain number, for owners that are not
	/// borrowed values (e.g. node ids).
	pub const fn from_raw(raw: usize) -> Self {
		Self(raw)
	}
}

/// Returns true if `c` can appear in a C identifier. Deliberately ASCII only,
/// independent of any locale.
pub const fn is_ident_char(c: u8) -> bool {
	c.is_ascii_alphanumeric() || c == b'_'
}

/// Generates unique but human-readable identifiers.
///
/// Identifiers combine a type word with a name or label, e.g.
/// `cb_Save` for the callback of a widget labeled "&Save...". A second
/// object asking for the same identifier receives a hexadecimal suffix
/// (`cb_Save1`, `cb_Save2`, ...). The same object asking again receives its
/// previous identifier.
#[derive(Debug, Default)]
pub struct IdentifierAllocator {
	taken: BTreeMap<String, ObjectId>,
}

impl IdentifierAllocator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Return a unique identifier for `owner`.
	///
	/// `name` is used when non-empty, else `label`. Leading characters that
	/// cannot start the identifier part are skipped, and copying stops at the
	/// first character that cannot appear in an identifier.
	pub fn allocate(
		&mut self,
		owner: ObjectId,
		kind: &str,
		name: Option<&str>,
		label: Option<&str>,
	) -> String {
		let base = candidate(kind, name, label);
		let mut text = base.clone();
		let mut which: u32 = 0;

		loop {
			match self.taken.get(&text) {
				None => break,
				Some(existing) if *existing == owner => return text,
				Some(_) => {
					which += 1;
					text = format!("{base}{which:x}");
				}
			}
		}

		self.taken.insert(text.clone(), owner);
		text
	}

	/// Forget all identifiers. Called at the start of every generation run.
	pub fn clear(&mut self) {
		self.taken.clear();
	}

	pub fn len(&self) -> usize {
		self.taken.len()
	}

	pub fn is_empty(&self) -> bool {
		self.taken.is_empty()
	}
}

fn candidate(kind: &str, name: Option<&str>, label: Option<&str>) -> String {
	let mut text = String::with_capacity(32);
	text.extend(kind.chars().take(MAX_IDENTIFIER_LEN - 1));
	text.push('_');

	let hint = name
		.filter(|n| !n.is_empty())
		.or(label)
		.unwrap_or_default()
		.as_bytes();
	let start = hint
		.iter()
		.position(|c| is_ident_char(*c))
		.unwrap_or(hint.len());

	for &c in &hint[start..] {
		if !is_ident_char(c) || text.len() >= MAX_IDENTIFIER_LEN {
			break;
		}
		text.push(char::from(c));
	}

	text
}
