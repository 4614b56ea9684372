mod common;

use formgen_core::AnyEmptyResult;

#[test]
fn strings_writes_plain_list() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::formgen_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	common::formgen_cmd()
		.arg("strings")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Wrote 3 string(s) to hello.txt."));

	let content = std::fs::read_to_string(tmp.path().join("hello.txt"))?;
	assert!(content.starts_with("# generated by formgen version "));
	assert!(content.ends_with("\nHello\nSave\nSave the document\n"));

	Ok(())
}

#[test]
fn strings_follow_the_gettext_mode() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::formgen_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();
	std::fs::write(
		tmp.path().join("formgen.toml"),
		"basename = \"hello\"\n\n[i18n]\nmode = \"gnu\"\n",
	)?;

	common::formgen_cmd()
		.arg("strings")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let content = std::fs::read_to_string(tmp.path().join("hello.po"))?;
	assert!(content.contains("msgid \"Save\"\nmsgstr \"Save\"\n"));

	Ok(())
}

#[test]
fn strings_to_custom_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::formgen_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let output = tmp.path().join("catalog.txt");
	common::formgen_cmd()
		.arg("strings")
		.arg("--path")
		.arg(tmp.path())
		.arg("--output")
		.arg(&output)
		.assert()
		.success();

	assert!(output.is_file());

	Ok(())
}
