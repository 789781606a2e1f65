// Allow deprecated APIs (assert_cmd::cargo_bin is deprecated but still works)
#![allow(deprecated)]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_app(root: &Path, entry: &str) {
    fs::create_dir_all(root.join("app")).unwrap();
    fs::write(root.join("app").join("main.tsx"), entry).unwrap();
    fs::write(root.join("importmap.json"), r#"{"imports": {}}"#).unwrap();
}

#[test]
fn test_help() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("emerald-bundle")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--import-map"))
        .stdout(predicate::str::contains("--allow-env"))
        .stdout(predicate::str::contains("--global-name"))
        .stdout(predicate::str::contains("identifiers are not renamed"));
    Ok(())
}

#[test]
fn test_default_build_is_iife_assigned_to_global() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    write_app(temp.path(), "export const greeting = 'hi';
console.log(greeting);
");

    Command::cargo_bin("emerald-bundle")?
        .current_dir(temp.path())
        .arg("--no-scaffold")
        .assert()
        .success();
    let bundle = fs::read_to_string(temp.path().join("dist").join("main.js"))?;
    assert!(bundle.starts_with("var Emerald ="));

    Command::cargo_bin("emerald-bundle")?
        .current_dir(temp.path())
        .arg("--no-scaffold")
        .arg("--global-name").arg("Garnet")
        .assert()
        .success();
    let bundle = fs::read_to_string(temp.path().join("dist").join("main.js"))?;
    assert!(bundle.starts_with("var Garnet ="));
    Ok(())
}

#[test]
fn test_external_flag_keeps_import_unbundled() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    write_app(
        temp.path(),
        "import htmx from \"htmx\";\nhtmx.process(document.body);\n",
    );

    Command::cargo_bin("emerald-bundle")?
        .current_dir(temp.path())
        .arg("--no-scaffold")
        .arg("--format").arg("esm")
        .arg("--external").arg("htmx")
        .assert()
        .success();

    let bundle = fs::read_to_string(temp.path().join("dist").join("main.js"))?;
    assert!(bundle.contains("\"htmx\""));
    Ok(())
}

#[test]
fn test_build_local_project_with_env() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    write_app(
        temp.path(),
        "import env from \"env\";\nconst api: string = env.EMERALD_TEST_API_URL;\nconsole.log(api);\n",
    );

    Command::cargo_bin("emerald-bundle")?
        .current_dir(temp.path())
        .env("EMERALD_TEST_API_URL", "https://api.example.test")
        .env("EMERALD_TEST_SECRET", "do-not-ship")
        .arg("--allow-env").arg("EMERALD_TEST_API_URL")
        .assert()
        .success()
        .stdout(predicate::str::contains("Build complete"));

    let bundle = fs::read_to_string(temp.path().join("dist").join("main.js"))?;
    assert!(bundle.contains("https://api.example.test"));
    assert!(!bundle.contains("do-not-ship"));
    // deno.json is scaffolded even when the app exists
    assert!(temp.path().join("deno.json").symlink_metadata().is_ok());
    Ok(())
}

#[rstest]
#[case("none", false)]
#[case("external", true)]
fn test_sourcemap_flag(
    #[case] mode: &str,
    #[case] expect_map_file: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    write_app(temp.path(), "console.log('sourcemap-flag');\n");

    Command::cargo_bin("emerald-bundle")?
        .current_dir(temp.path())
        .arg("--no-scaffold")
        .arg("--sourcemap").arg(mode)
        .arg("--outdir").arg("public")
        .assert()
        .success();

    assert!(temp.path().join("public").join("main.js").exists());
    assert_eq!(
        temp.path().join("public").join("main.js.map").exists(),
        expect_map_file
    );
    assert!(!temp.path().join("deno.json").exists());
    Ok(())
}

#[test]
fn test_syntax_error_exits_with_failure() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    write_app(temp.path(), "const = ;\n");

    Command::cargo_bin("emerald-bundle")?
        .current_dir(temp.path())
        .arg("--no-scaffold")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Build failed"));

    assert!(!temp.path().join("dist").exists());
    Ok(())
}

#[test]
fn test_missing_import_map_without_scaffold() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    write_app(temp.path(), "console.log(1);\n");
    fs::remove_file(temp.path().join("importmap.json"))?;

    Command::cargo_bin("emerald-bundle")?
        .current_dir(temp.path())
        .arg("--no-scaffold")
        .assert()
        .failure()
        .stderr(predicate::str::contains("importmap.json"));
    Ok(())
}

#[test]
fn test_invalid_format_rejected() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("emerald-bundle")?
        .arg("--format").arg("cjs")
        .assert()
        .failure();
    Ok(())
}
