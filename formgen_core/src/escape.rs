//! C and C++ literal escaping.
//!
//! Both functions produce complete literals (quotes or braces included) and
//! keep every output line below 80 columns by soft-wrapping. The wrap
//! columns depend on the width of the next token so that no token pushes a
//! line past the cap.

/// Quote `bytes` as a C string literal.
///
/// Control characters with a letter escape and `"`, `'` and `\` are written
/// with a backslash. `??` is written as `?\?` so it can never start a
/// trigraph. All other bytes outside 32..=126 become octal escapes; when the
/// next byte is a hex digit the literal is closed and reopened, because some
/// compilers keep consuming digits after an octal escape.
///
/// With `utf8_verbatim`, bytes of multi-byte UTF-8 sequences are copied
/// unchanged and lines are only broken in front of a lead byte.
pub fn quote_bytes(bytes: &[u8], utf8_verbatim: bool) -> Vec<u8> {
	let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 8 + 2);
	let mut line_length = 1;

	out.push(b'"');
	for (index, &byte) in bytes.iter().enumerate() {
		let escape = match byte {
			0x08 => Some(b'b'),
			b'\t' => Some(b't'),
			b'\n' => Some(b'n'),
			0x0c => Some(b'f'),
			b'\r' => Some(b'r'),
			b'"' | b'\'' | b'\\' => Some(byte),
			b'?' if index > 0 && bytes[index - 1] == b'?' => Some(b'?'),
			_ => None,
		};

		if let Some(letter) = escape {
			wrap_if(&mut out, &mut line_length, 77);
			out.push(b'\\');
			out.push(letter);
			line_length += 2;
			continue;
		}

		if (b' '..127).contains(&byte) {
			wrap_if(&mut out, &mut line_length, 78);
			out.push(byte);
			line_length += 1;
			continue;
		}

		if utf8_verbatim && byte & 0x80 != 0 {
			// 0b11xxxxxx starts a sequence; never split inside one.
			if byte & 0x40 != 0 {
				wrap_if(&mut out, &mut line_length, 78);
			}
			out.push(byte);
			line_length += 1;
			continue;
		}

		let (threshold, width) = match byte {
			0..8 => (76, 2),
			8..64 => (75, 3),
			_ => (74, 4),
		};
		wrap_if(&mut out, &mut line_length, threshold);
		out.extend_from_slice(format!("\\{byte:o}").as_bytes());
		line_length += width;

		if bytes.get(index + 1).is_some_and(u8::is_ascii_hexdigit) {
			out.push(b'"');
			line_length += 1;
			if line_length >= 79 {
				out.push(b'\n');
				line_length = 0;
			}
			out.push(b'"');
			line_length += 1;
		}
	}
	out.push(b'"');

	out
}

/// Write `bytes` as a C array initializer of unsigned decimal values, e.g.
/// `{0,1,2,250}`. Lines are broken between values.
pub fn byte_array(bytes: &[u8]) -> String {
	let mut out = String::with_capacity(bytes.len() * 4 + 2);
	let mut line_length = 1;

	out.push('{');
	for (index, byte) in bytes.iter().enumerate() {
		line_length += match byte {
			100.. => 4,
			10..100 => 3,
			_ => 2,
		};
		if line_length >= 77 {
			out.push('\n');
			line_length = 0;
		}
		out.push_str(&byte.to_string());
		if index + 1 < bytes.len() {
			out.push(',');
		}
	}
	out.push('}');

	out
}

/// Escape a label for a translation catalog: control characters, bytes
/// outside printable ASCII and `"` become three digit octal escapes.
pub fn catalog_escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for byte in text.bytes() {
		if byte < 32 || byte > 126 || byte == b'"' {
			out.push_str(&format!("\\{byte:03o}"));
		} else {
			out.push(char::from(byte));
		}
	}
	out
}

fn wrap_if(out: &mut Vec<u8>, line_length: &mut usize, threshold: usize) {
	if *line_length >= threshold {
		out.extend_from_slice(b"\\\n");
		*line_length = 0;
	}
}
