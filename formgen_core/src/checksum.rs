use std::fmt;
use std::str::FromStr;

use flate2::Crc;
use serde::Serialize;
use thiserror::Error;

/// Every merge tag starts with this marker.
pub const TAG_MARKER: &str = "//~fl~";

/// What a tagged block contains, and therefore whether edits to it can be
/// merged back into the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
	/// Generated structure. Edits cannot be merged back.
	Generic = 0,
	/// The text of a code node.
	Code = 1,
	/// The callback body of a menu item.
	MenuCallback = 2,
	/// The callback body of a widget.
	WidgetCallback = 3,
}

impl TagKind {
	pub const LAST: u8 = 3;

	pub fn from_index(index: i64) -> Option<Self> {
		match index {
			0 => Some(Self::Generic),
			1 => Some(Self::Code),
			2 => Some(Self::MenuCallback),
			3 => Some(Self::WidgetCallback),
			_ => None,
		}
	}

	pub const fn index(self) -> u8 {
		self as u8
	}

	/// Whether edits inside a block of this kind can be written back into a
	/// design node.
	pub const fn is_mergeable(self) -> bool {
		!matches!(self, Self::Generic)
	}

	pub const fn is_callback(self) -> bool {
		matches!(self, Self::MenuCallback | Self::WidgetCallback)
	}
}

/// The checksum line closing a generated block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
	pub kind: TagKind,
	pub node_id: u16,
	pub checksum: u32,
}

impl fmt::Display for Tag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{TAG_MARKER}{}~{:04x}~{:08x}~~",
			self.kind.index(),
			self.node_id,
			self.checksum
		)
	}
}

/// Reasons a tag line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagParseError {
	#[error("the line has no `//~fl~` marker")]
	MissingMarker,
	#[error("the {0} field is missing")]
	MissingField(&'static str),
	#[error("the {0} field is not valid")]
	InvalidField(&'static str),
	#[error("block kind {0} is out of range (0 to 3)")]
	UnknownKind(i64),
}

impl FromStr for Tag {
	type Err = TagParseError;

	/// Parse a tag from the text starting at the tag marker. Trailing text
	/// after the checksum is ignored.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let rest = s
			.strip_prefix(TAG_MARKER)
			.ok_or(TagParseError::MissingMarker)?;
		let mut fields = rest.splitn(3, '~');

		let kind = fields.next().ok_or(TagParseError::MissingField("kind"))?;
		let kind: i64 = kind
			.parse()
			.map_err(|_| TagParseError::InvalidField("kind"))?;
		let kind = TagKind::from_index(kind).ok_or(TagParseError::UnknownKind(kind))?;

		let node_id = fields.next().ok_or(TagParseError::MissingField("node id"))?;
		let node_id = parse_hex_field(node_id, 4).ok_or(TagParseError::InvalidField("node id"))?;

		let checksum = fields
			.next()
			.ok_or(TagParseError::MissingField("checksum"))?;
		let checksum = checksum.split('~').next().unwrap_or_default();
		let checksum =
			parse_hex_field(checksum, 8).ok_or(TagParseError::InvalidField("checksum"))?;

		Ok(Self {
			kind,
			node_id: node_id as u16,
			checksum,
		})
	}
}

fn parse_hex_field(field: &str, max_digits: usize) -> Option<u32> {
	let digits = field.trim_end();
	if digits.is_empty() || digits.len() > max_digits {
		return None;
	}
	u32::from_str_radix(digits, 16).ok()
}

/// CRC-32 over generated text, ignoring indentation and line-ending style.
///
/// Leading blanks of every physical line are skipped, so re-indenting a
/// block keeps its checksum. Blank lines therefore contribute nothing. `\r`
/// is dropped so files converted to CRLF still match.
pub struct RunningChecksum {
	crc: Crc,
	line_start: bool,
}

impl fmt::Debug for RunningChecksum {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RunningChecksum")
			.field("value", &format_args!("{:08x}", self.value()))
			.field("line_start", &self.line_start)
			.finish()
	}
}

impl Default for RunningChecksum {
	fn default() -> Self {
		Self {
			crc: Crc::new(),
			line_start: true,
		}
	}
}

impl RunningChecksum {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feed `bytes` into the checksum.
	pub fn add(&mut self, bytes: &[u8]) {
		for &byte in bytes {
			if self.line_start {
				if is_c_space(byte) {
					continue;
				}
				if byte != 0 {
					self.line_start = false;
				}
			}
			if byte == b'\r' {
				continue;
			}
			if byte == b'\n' {
				self.line_start = true;
			}
			self.crc.update(&[byte]);
		}
	}

	pub fn value(&self) -> u32 {
		self.crc.sum()
	}

	/// Back to the initial seed, at the start of a line.
	pub fn reset(&mut self) {
		self.crc.reset();
		self.line_start = true;
	}
}

/// `isspace` in the C locale.
const fn is_c_space(byte: u8) -> bool {
	matches!(byte, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

/// Checksum of a complete block of text, as the writer would compute it.
pub fn block_checksum(text: &[u8]) -> u32 {
	let mut checksum = RunningChecksum::new();
	checksum.add(text);
	checksum.value()
}
