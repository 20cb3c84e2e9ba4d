use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// One job with an execution template and a test/demo1 override.
fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(
        &temp.path().join("config-templates/audience/job_a/execution_config.yml.j2"),
        "forceRun: {{ forceRun | default(false) }}\n\
         runDay: \"{{ run_date.strftime(version_date_format) }}\"\n",
    );
    write(
        &temp.path().join("config-overrides/test/demo1/audience/job_a/config.yml"),
        "forceRun: true\n",
    );
    temp
}

fn confgen(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("confgen").unwrap();
    cmd.arg("--root").arg(root).env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("confgen")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build").and(predicate::str::contains("runtime")));
}

#[test]
fn build_writes_merged_config() {
    let temp = project();
    confgen(temp.path())
        .args(["build", "env=test", "exp=demo1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated 1 files for 1 jobs"));

    let out = fs::read_to_string(
        temp.path().join("configs/test/demo1/audience/job_a/execution_config.yml"),
    )
    .unwrap();
    assert!(out.contains("forceRun: true\n"), "{}", out);
    assert!(out.contains("environment: test\n"), "{}", out);
    assert!(out.contains("experimentName: demo1\n"), "{}", out);
}

#[test]
fn build_with_exp_all_covers_every_experiment() {
    let temp = project();
    write(
        &temp.path().join("config-overrides/test/demo2/audience/job_a/config.yml"),
        "forceRun: false\n",
    );
    confgen(temp.path())
        .args(["build", "env=test", "exp=all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated 2 files for 2 jobs"));

    for exp in ["demo1", "demo2"] {
        let out = fs::read_to_string(
            temp.path()
                .join("configs/test")
                .join(exp)
                .join("audience/job_a/execution_config.yml"),
        )
        .unwrap();
        assert!(out.contains(&format!("experimentName: {}\n", exp)), "{}", out);
    }

    confgen(temp.path())
        .args(["build", "env=prod", "exp=all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("experiment not allowed under prod"));
}

#[test]
fn invalid_selector_fails_before_touching_files() {
    let temp = project();
    confgen(temp.path())
        .args(["build", "env=prod", "exp=demo1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("experiment not allowed under prod"));

    confgen(temp.path())
        .args(["build", "env=all", "group=audience"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("overly specific field under env=all"));

    confgen(temp.path())
        .args(["build", "env=test"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing experiment"));

    assert!(!temp.path().join("configs").exists());
}

#[test]
fn unknown_and_duplicate_parameters_are_rejected() {
    let temp = project();
    confgen(temp.path())
        .args(["build", "env=prod", "owner=x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown parameter 'owner'"));

    confgen(temp.path())
        .args(["build", "env=prod", "env=test"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("given more than once"));
}

#[test]
fn missing_required_field_names_job_and_field() {
    let temp = project();
    write(
        &temp.path().join("config-templates/audience/job_a/identity_config.yml.j2"),
        "inputPath: \"{{ inputPath }}\"\n",
    );
    confgen(temp.path())
        .args(["build", "env=test", "exp=demo1"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("audience/job_a")
                .and(predicate::str::contains("inputPath"))
                .and(predicate::str::contains("env=test exp=demo1")),
        );
    assert!(!temp.path().join("configs/test/demo1/audience/job_a").exists());
}

#[test]
fn runtime_resolves_run_date_after_build() {
    let temp = project();
    write(
        &temp.path().join("config-templates/audience/job_a/identity_config.yml.j2"),
        "model: m\n",
    );
    confgen(temp.path())
        .args(["build", "env=test", "exp=demo1"])
        .assert()
        .success();

    confgen(temp.path())
        .args(["runtime", "env=test", "exp=demo1", "run_date=20240307"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test/demo1/audience/job_a ->"));

    let job_dir = temp.path().join("runtime-configs/test/demo1/audience/job_a");
    let hash_dir = fs::read_dir(&job_dir).unwrap().next().unwrap().unwrap().path();
    let execution = fs::read_to_string(hash_dir.join("execution_config.yml")).unwrap();
    assert!(execution.contains("runDay: \"20240307\"\n"), "{}", execution);
}

#[test]
fn runtime_requires_run_date() {
    let temp = project();
    confgen(temp.path())
        .args(["runtime", "env=prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("run_date is required"));
}
