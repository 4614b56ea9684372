use rstest::fixture;

use crate::Design;
use crate::FormgenResult;
use crate::MergeHost;
use crate::MergeSummary;
use crate::ProjectSettings;

/// A window with one button and a `return` statement. Ids are assigned in
/// order: function 1, window 2, button 3, code 4.
pub const WINDOW_DESIGN: &str = r#"{
	"items": [
		{
			"kind": "function",
			"name": "make_window()",
			"return_type": "Fl_Double_Window*",
			"children": [
				{
					"kind": "widget",
					"class": "Fl_Double_Window",
					"name": "w",
					"w": 320,
					"h": 200,
					"children": [
						{
							"kind": "widget",
							"class": "Fl_Button",
							"label": "Save",
							"callback": "save_document();",
							"x": 10,
							"y": 10,
							"w": 80,
							"h": 25
						}
					]
				},
				{ "kind": "code", "code": "return w;" }
			]
		}
	]
}"#;

/// Labels, a tooltip and a menu for string extraction.
pub const STRINGS_DESIGN: &str = r#"{
	"items": [
		{
			"kind": "function",
			"name": "make_window()",
			"children": [
				{
					"kind": "widget",
					"class": "Fl_Button",
					"label": "Save \"it\"",
					"tooltip": "Saves",
					"w": 80,
					"h": 25
				},
				{
					"kind": "widget",
					"class": "Fl_Menu_Bar",
					"w": 320,
					"h": 25,
					"children": [
						{ "kind": "menu_item", "label": "Quit", "shortcut": "FL_COMMAND+'q'", "callback": "quit_cb" }
					]
				}
			]
		}
	]
}"#;

pub fn settings() -> ProjectSettings {
	ProjectSettings {
		basename: Some("editor".to_string()),
		..ProjectSettings::default()
	}
}

#[fixture]
pub fn tracked_settings() -> ProjectSettings {
	ProjectSettings {
		write_mergeback_data: true,
		..settings()
	}
}

#[fixture]
pub fn window_design() -> Design {
	Design::from_json(WINDOW_DESIGN).unwrap_or_else(|e| panic!("invalid fixture: {e}"))
}

pub fn design(json: &str) -> FormgenResult<Design> {
	Design::from_json(json)
}

/// Decode a C string literal (possibly split and soft-wrapped) back to its
/// bytes.
pub fn decode_c_literal(literal: &[u8]) -> Vec<u8> {
	let mut out = Vec::new();
	let mut in_string = false;
	let mut index = 0;

	while index < literal.len() {
		let byte = literal[index];
		if !in_string {
			in_string = byte == b'"';
			index += 1;
			continue;
		}

		match byte {
			b'"' => {
				in_string = false;
				index += 1;
			}
			b'\\' => {
				let next = literal[index + 1];
				index += 2;
				match next {
					b'\n' => {}
					b'0'..=b'7' => {
						let mut value = u32::from(next - b'0');
						let mut digits = 1;
						while digits < 3 && index < literal.len() && (b'0'..=b'7').contains(&literal[index])
						{
							value = value * 8 + u32::from(literal[index] - b'0');
							index += 1;
							digits += 1;
						}
						out.push(value as u8);
					}
					b'b' => out.push(0x08),
					b't' => out.push(b'\t'),
					b'n' => out.push(b'\n'),
					b'f' => out.push(0x0c),
					b'r' => out.push(b'\r'),
					other => out.push(other),
				}
			}
			_ => {
				out.push(byte);
				index += 1;
			}
		}
	}

	out
}

/// Decode a `{1,2,3}` array initializer.
pub fn decode_byte_array(array: &str) -> Vec<u8> {
	array
		.trim_start_matches('{')
		.trim_end_matches('}')
		.split(',')
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(|value| value.parse().unwrap_or_else(|e| panic!("bad value `{value}`: {e}")))
		.collect()
}

/// A merge host that records what the merge asked of it.
#[derive(Debug, Default)]
pub struct RecordingHost {
	pub answer: bool,
	pub checkpoints: usize,
	pub confirmations: Vec<String>,
	pub messages: Vec<String>,
	pub modified: bool,
	pub refreshed: bool,
}

impl RecordingHost {
	pub fn answering(answer: bool) -> Self {
		Self {
			answer,
			..Self::default()
		}
	}
}

impl MergeHost for RecordingHost {
	fn checkpoint(&mut self) -> FormgenResult<()> {
		self.checkpoints += 1;
		Ok(())
	}

	fn confirm(&mut self, _summary: &MergeSummary, message: &str) -> bool {
		self.confirmations.push(message.to_string());
		self.answer
	}

	fn message(&mut self, text: &str) {
		self.messages.push(text.to_string());
	}

	fn set_modified(&mut self) {
		self.modified = true;
	}

	fn refresh_views(&mut self) {
		self.refreshed = true;
	}
}
