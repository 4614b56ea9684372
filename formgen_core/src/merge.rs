//! Merging hand edits of a generated source file back into the design.
//!
//! Every block the generator writes ends in a tag line carrying the CRC-32 of
//! the block as generated. Reading the file again and recomputing the
//! checksums shows which blocks were edited. Edits to code and callback
//! blocks can be copied back into the node named by the tag; edits anywhere
//! else change generated structure and are lost on the next generation.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::FormgenError;
use crate::FormgenResult;
use crate::checksum::RunningChecksum;
use crate::checksum::TAG_MARKER;
use crate::checksum::Tag;
use crate::checksum::TagKind;
use crate::config::ProjectSettings;
use crate::node::DesignNode;
use crate::node::DesignTree;
use crate::node::NodeId;
use crate::node::NodeKind;

/// What [`merge_back`] should do with the changes it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
	/// Report changes without touching the design.
	Check,
	/// Report changes and let the host decide whether to merge.
	Interactive,
	/// Merge every mergeable change. Structural edits are dropped.
	Go,
	/// Merge only if no structural edits were found.
	GoSafe,
}

/// A tagged block whose content no longer matches its checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedBlock {
	pub kind: TagKind,
	pub node_id: NodeId,
	/// 1-based line of the closing tag.
	pub line: usize,
	/// The block's current text, de-indented.
	pub text: String,
	/// Whether a node that can take this text exists in the design.
	pub resolved: bool,
}

/// Changes found in a generated source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
	pub structural_changes: usize,
	pub code_changes: usize,
	pub callback_changes: usize,
	/// Changed code or callback blocks without a matching design node.
	pub unresolved_ids: usize,
	pub blocks: Vec<ChangedBlock>,
}

impl MergeSummary {
	/// The summary as a bit set: 1 structural changes, 2 code changes, 4
	/// callback changes, 8 changes without a matching node.
	pub fn bits(&self) -> u8 {
		let mut bits = 0;
		if self.structural_changes > 0 {
			bits |= 1;
		}
		if self.code_changes > 0 {
			bits |= 2;
		}
		if self.callback_changes > 0 {
			bits |= 4;
		}
		if self.unresolved_ids > 0 {
			bits |= 8;
		}
		bits
	}

	pub fn has_changes(&self) -> bool {
		self.structural_changes + self.code_changes + self.callback_changes > 0
	}

	/// Whether any code or callback block was edited.
	pub fn has_mergeable_changes(&self) -> bool {
		self.code_changes + self.callback_changes > 0
	}

	/// A human readable description of the changes, as shown before an
	/// interactive merge.
	pub fn describe(&self) -> String {
		let mut message = format!(
			"Found {} modifications in code blocks and {} modifications in callbacks.",
			self.code_changes, self.callback_changes
		);
		if self.unresolved_ids > 0 {
			let _ = write!(
				message,
				"\n\nWARNING: for {} of these modifications no design node can be found. The \
				 design diverged from the source file and these modifications can't be merged \
				 back.",
				self.unresolved_ids
			);
		}
		if self.structural_changes > 0 {
			let _ = write!(
				message,
				"\n\nWARNING: {} modifications in the generated structure can't be merged back \
				 and will be lost.",
				self.structural_changes
			);
		}
		message
	}
}

/// The result of a [`merge_back`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
	/// [`MergeMode::Check`] finished.
	Report(MergeSummary),
	/// Nothing to merge.
	NoChanges,
	/// Changes were copied into the design.
	Merged(MergeSummary),
	/// The host declined the merge.
	Cancelled,
	/// The merge was refused because of structural changes.
	Conflict(MergeSummary),
}

/// The application around a merge: it can save a restore point, ask the
/// user, and refresh whatever shows the design.
pub trait MergeHost {
	/// Called once right before the design is modified.
	fn checkpoint(&mut self) -> FormgenResult<()> {
		Ok(())
	}

	/// Ask whether the described changes should be merged.
	fn confirm(&mut self, _summary: &MergeSummary, _message: &str) -> bool {
		false
	}

	/// Show a message that needs no answer.
	fn message(&mut self, _text: &str) {}

	/// The design was changed and needs saving.
	fn set_modified(&mut self) {}

	/// Views of the design must reload.
	fn refresh_views(&mut self) {}
}

/// A host without a user: nothing is saved or shown, and interactive merges
/// are declined.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl MergeHost for NoopHost {}

/// Merge changes in the generated source file at `path` back into `tree`.
///
/// The whole file is read and classified before anything in `tree` is
/// modified. A malformed tag line aborts with
/// [`FormgenError::MalformedTag`]. Nothing happens when the project does not
/// write merge tags.
pub fn merge_back<T: DesignTree>(
	path: &Path,
	tree: &mut T,
	settings: &ProjectSettings,
	mode: MergeMode,
	host: &mut dyn MergeHost,
) -> FormgenResult<MergeOutcome> {
	if !settings.write_mergeback_data {
		return Ok(MergeOutcome::NoChanges);
	}

	let source = std::fs::read(path)?;
	let summary = scan_source(&source, tree)?;

	match mode {
		MergeMode::Check => Ok(MergeOutcome::Report(summary)),
		MergeMode::Go => apply_changes(tree, summary, host),
		MergeMode::GoSafe => {
			if summary.structural_changes > 0 {
				warn!(
					structural = summary.structural_changes,
					"refusing to merge: generated structure was edited"
				);
				return Ok(MergeOutcome::Conflict(summary));
			}
			apply_changes(tree, summary, host)
		}
		MergeMode::Interactive => {
			if !summary.has_changes() {
				return Ok(MergeOutcome::NoChanges);
			}

			if !summary.has_mergeable_changes() {
				host.message(&format!(
					"Found {} modifications in the generated structure of the source file. \
					 These changes can't be merged back and will be lost.",
					summary.structural_changes
				));
				return Ok(MergeOutcome::Conflict(summary));
			}

			if !host.confirm(&summary, &summary.describe()) {
				return Ok(MergeOutcome::Cancelled);
			}

			apply_changes(tree, summary, host)
		}
	}
}

/// Compare every tagged block of `source` with its checksum.
pub fn scan_source<T: DesignTree>(source: &[u8], tree: &T) -> FormgenResult<MergeSummary> {
	let mut summary = MergeSummary::default();
	let mut checksum = RunningChecksum::new();
	let mut block_start = 0;
	let mut block_end = 0;
	let mut offset = 0;

	for (index, line) in source.split_inclusive(|&byte| byte == b'\n').enumerate() {
		offset += line.len();

		let Some(marker) = find_marker(line) else {
			checksum.add(line);
			block_end = offset;
			continue;
		};

		let tag_text = String::from_utf8_lossy(&line[marker..]);
		let tag: Tag = tag_text.parse().map_err(|source| {
			FormgenError::MalformedTag {
				line: index + 1,
				text: tag_text.trim_end().to_string(),
				source,
			}
		})?;

		if checksum.value() != tag.checksum {
			let node_id = NodeId(tag.node_id);
			let resolved = match tag.kind {
				TagKind::Generic => {
					summary.structural_changes += 1;
					true
				}
				TagKind::Code => {
					summary.code_changes += 1;
					accepts(tree, node_id, tag.kind)
				}
				TagKind::MenuCallback | TagKind::WidgetCallback => {
					summary.callback_changes += 1;
					accepts(tree, node_id, tag.kind)
				}
			};
			if !resolved {
				summary.unresolved_ids += 1;
			}

			let text = source
				.get(block_start..block_end.max(block_start))
				.map(unindent)
				.unwrap_or_default();
			summary.blocks.push(ChangedBlock {
				kind: tag.kind,
				node_id,
				line: index + 1,
				text,
				resolved,
			});
		}

		checksum.reset();
		block_start = offset;
	}

	Ok(summary)
}

/// Strip up to two leading blanks from every line and drop `\r`. Trailing
/// line breaks are removed, since the generator adds its own.
pub fn unindent(block: &[u8]) -> String {
	let mut out = Vec::with_capacity(block.len());
	let mut line_start = true;
	let mut skipped = 0;

	for &byte in block {
		if byte == b'\r' {
			continue;
		}
		if line_start && skipped < 2 && matches!(byte, b' ' | b'\t') {
			skipped += 1;
			continue;
		}
		line_start = byte == b'\n';
		if line_start {
			skipped = 0;
		}
		out.push(byte);
	}

	while out.last() == Some(&b'\n') {
		out.pop();
	}

	String::from_utf8_lossy(&out).into_owned()
}

fn find_marker(line: &[u8]) -> Option<usize> {
	line.windows(TAG_MARKER.len())
		.position(|window| window == TAG_MARKER.as_bytes())
}

/// Whether `tree` has a node with `id` that can take text from a block of
/// `kind`.
fn accepts<T: DesignTree>(tree: &T, id: NodeId, kind: TagKind) -> bool {
	tree.find_by_id(id).is_some_and(|node| {
		match kind {
			TagKind::Code => node.is_code(),
			TagKind::MenuCallback | TagKind::WidgetCallback => {
				matches!(node.kind(), NodeKind::Widget | NodeKind::MenuItem)
			}
			TagKind::Generic => false,
		}
	})
}

fn apply_changes<T: DesignTree>(
	tree: &mut T,
	summary: MergeSummary,
	host: &mut dyn MergeHost,
) -> FormgenResult<MergeOutcome> {
	if !summary.blocks.iter().any(|block| block.kind.is_mergeable() && block.resolved) {
		if summary.unresolved_ids > 0 {
			warn!(
				unresolved = summary.unresolved_ids,
				"changed blocks have no matching design node"
			);
		}
		return Ok(MergeOutcome::NoChanges);
	}

	host.checkpoint()?;

	let mut applied = 0;
	for block in summary.blocks.iter().filter(|block| block.kind.is_mergeable()) {
		let Some(node) = tree.find_by_id_mut(block.node_id) else {
			warn!(node = %block.node_id, line = block.line, "no design node for changed block");
			continue;
		};

		let merged = if block.kind.is_callback() {
			node.set_callback(&block.text)
		} else {
			node.set_code(&block.text)
		};

		if merged {
			info!(node = %block.node_id, kind = ?block.kind, "merged edited block");
			applied += 1;
		} else {
			warn!(node = %block.node_id, kind = ?block.kind, "design node cannot take edited block");
		}
	}

	if applied == 0 {
		return Ok(MergeOutcome::NoChanges);
	}

	host.set_modified();
	host.refresh_views();

	Ok(MergeOutcome::Merged(summary))
}
