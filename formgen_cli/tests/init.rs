mod common;

use formgen_core::AnyEmptyResult;
use formgen_core::Design;
use formgen_core::DesignTree;
use formgen_core::ItemBody;
use formgen_core::NodeId;
use formgen_core::ProjectSettings;

#[test]
fn can_init() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let assert = common::formgen_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();
	assert
		.stdout(predicates::str::contains("Created formgen.toml"))
		.stdout(predicates::str::contains("Created design file"))
		.stdout(predicates::str::contains("Next steps:"));

	let settings = ProjectSettings::load(tmp.path())?;
	let settings = settings.ok_or("formgen.toml was not created")?;
	assert_eq!(settings.basename(), "hello");
	assert!(settings.write_mergeback_data);

	let design = Design::load(&tmp.path().join("design.json"))?;
	assert_eq!(design.len(), 5);
	let include = design.find_by_id(NodeId(1)).map(|node| node.body().clone());
	assert!(matches!(
		include,
		Some(ItemBody::Declaration { text, .. }) if text == "#include <stdio.h>"
	));

	Ok(())
}

#[test]
fn init_does_not_overwrite() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config_path = tmp.path().join("formgen.toml");
	let design_path = tmp.path().join("design.json");
	std::fs::write(&config_path, "existing config")?;
	std::fs::write(&design_path, "existing design")?;

	common::formgen_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("already exists"));

	assert_eq!(std::fs::read_to_string(&config_path)?, "existing config");
	assert_eq!(std::fs::read_to_string(&design_path)?, "existing design");

	Ok(())
}

#[test]
fn no_subcommand_fails() {
	common::formgen_cmd()
		.assert()
		.code(1)
		.stderr(predicates::str::contains("No subcommand specified"));
}
