mod common;

use formgen_cli::Commands;
use formgen_cli::FormgenCli;
use formgen_cli::MergeModeArg;
use formgen_core::AnyEmptyResult;
use formgen_core::Design;
use formgen_core::DesignTree;
use formgen_core::ItemBody;
use formgen_core::NodeId;
use rstest::rstest;
use serde_json::Value;

fn callback(root: &std::path::Path) -> Result<Option<String>, formgen_core::FormgenError> {
	let design = Design::load(&root.join("design.json"))?;
	Ok(match design.find_by_id(NodeId(4)).map(|node| node.body()) {
		Some(ItemBody::Widget { callback, .. }) => callback.clone(),
		_ => None,
	})
}

#[test]
fn check_passes_on_fresh_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::init_and_generate(tmp.path())?;

	common::formgen_cmd()
		.arg("merge")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Check passed"));

	Ok(())
}

#[test]
fn check_reports_edited_callback() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::init_and_generate(tmp.path())?;
	common::edit_source(tmp.path(), "  puts(\"saved\");\n", "  puts(\"saved!\");\n")?;

	common::formgen_cmd()
		.arg("merge")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("callback edits: 1"))
		.stderr(predicates::str::contains("widget callback of node 0004"))
		.stderr(predicates::str::contains("+puts(\"saved!\");"));

	assert_eq!(callback(tmp.path())?.as_deref(), Some("puts(\"saved\");"));

	Ok(())
}

#[test]
fn check_reports_json() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::init_and_generate(tmp.path())?;
	common::edit_source(tmp.path(), "  return main_window;\n", "  return 0;\n")?;

	let output = common::formgen_cmd()
		.arg("merge")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;

	assert_eq!(output.status.code(), Some(1));
	let json: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["ok"], Value::Bool(false));
	assert_eq!(json["bits"], 2);
	assert_eq!(json["outcome"]["status"], "report");
	assert_eq!(json["outcome"]["code_changes"], 1);

	Ok(())
}

#[test]
fn go_merges_into_the_design() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::init_and_generate(tmp.path())?;
	let design_before = std::fs::read_to_string(tmp.path().join("design.json"))?;
	common::edit_source(
		tmp.path(),
		"  puts(\"saved\");\n",
		"  puts(\"saved\");\n  fflush(stdout);\n",
	)?;

	common::formgen_cmd()
		.arg("merge")
		.arg("--mode")
		.arg("go")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Merged 1 block(s) into design.json."));

	assert_eq!(
		callback(tmp.path())?.as_deref(),
		Some("puts(\"saved\");\nfflush(stdout);")
	);
	let backup = std::fs::read_to_string(tmp.path().join("design.json.bak"))?;
	similar_asserts::assert_eq!(backup, design_before);

	// regenerating from the merged design leaves nothing to merge
	common::formgen_cmd()
		.arg("generate")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();
	common::formgen_cmd()
		.arg("merge")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	Ok(())
}

#[test]
fn go_safe_refuses_structural_edits() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::init_and_generate(tmp.path())?;
	common::edit_source(tmp.path(), "  puts(\"saved\");\n", "  puts(\"done\");\n")?;
	common::edit_source(tmp.path(), "make_window() {", "make_window(void) {")?;

	common::formgen_cmd()
		.arg("merge")
		.arg("--mode")
		.arg("go-safe")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("nothing was merged"));

	assert_eq!(callback(tmp.path())?.as_deref(), Some("puts(\"saved\");"));
	assert!(!tmp.path().join("design.json.bak").exists());

	Ok(())
}

#[rstest]
#[case::declined("n\n", "puts(\"saved\");")]
#[case::accepted("y\n", "puts(\"done\");")]
fn interactive_merge_reads_the_answer(
	#[case] answer: &str,
	#[case] expected: &str,
) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::init_and_generate(tmp.path())?;
	common::edit_source(tmp.path(), "  puts(\"saved\");\n", "  puts(\"done\");\n")?;

	common::formgen_cmd()
		.arg("merge")
		.arg("--mode")
		.arg("interactive")
		.arg("--path")
		.arg(tmp.path())
		.write_stdin(answer)
		.assert()
		.success()
		.stderr(predicates::str::contains("1 modifications in callbacks"));

	assert_eq!(callback(tmp.path())?.as_deref(), Some(expected));

	Ok(())
}

#[test]
fn malformed_tag_is_an_error() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::init_and_generate(tmp.path())?;
	common::edit_source(tmp.path(), "//~fl~3~0004~", "//~fl~9~0004~")?;

	common::formgen_cmd()
		.arg("merge")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("malformed merge tag"))
		.stderr(predicates::str::contains("block kind 9 is out of range"));

	Ok(())
}

#[test]
fn parses_merge_flags() -> AnyEmptyResult {
	use clap::Parser;

	let cli = FormgenCli::try_parse_from(["formgen", "merge", "--mode", "go-safe", "--diff"])?;

	assert!(matches!(
		cli.command,
		Some(Commands::Merge {
			mode: MergeModeArg::GoSafe,
			diff: true,
			watch: false,
			..
		})
	));

	Ok(())
}
