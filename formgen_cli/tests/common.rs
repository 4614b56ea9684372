#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use formgen_core::AnyEmptyResult;
use insta_cmd::get_cargo_bin;

pub fn formgen_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("formgen"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

/// Run `formgen init` and `formgen generate` in `root`.
pub fn init_and_generate(root: &Path) -> AnyEmptyResult {
	formgen_cmd()
		.arg("init")
		.arg("--path")
		.arg(root)
		.assert()
		.success();
	formgen_cmd()
		.arg("generate")
		.arg("--path")
		.arg(root)
		.assert()
		.success();

	Ok(())
}

/// Replace `from` with `to` in the generated `hello.cxx`.
pub fn edit_source(root: &Path, from: &str, to: &str) -> AnyEmptyResult {
	let path = root.join("hello.cxx");
	let source = std::fs::read_to_string(&path)?;
	assert!(source.contains(from), "`{from}` not found in hello.cxx");
	std::fs::write(&path, source.replace(from, to))?;

	Ok(())
}
