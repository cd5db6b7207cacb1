//! CLI integration tests for mgmt-patch binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mgmt-patch"));
    for var in [
        "MGMT_PATCH_ENDPOINT",
        "MGMT_PATCH_SUBSCRIPTION",
        "MGMT_PATCH_TOKEN",
        "MGMT_PATCH_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const GROUP: &str = r#"{
    "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Insights/actionGroups/ag",
    "name": "ag",
    "location": "Global",
    "tags": { "env": "dev" },
    "properties": {
        "enabled": true,
        "groupShortName": "ag",
        "emailReceivers": [
            { "name": "ops", "emailAddress": "ops@example.com", "status": "Enabled" }
        ]
    }
}"#;

mod schema_command {
    use super::*;

    #[test]
    fn request_schema() {
        cmd()
            .args(["schema", "--request"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""required":["location"]"#))
            .stdout(predicate::str::contains(r#""readOnly""#).not());
    }

    #[test]
    fn response_schema_pretty() {
        cmd()
            .args(["schema", "--response", "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"))
            .stdout(predicate::str::contains(r#""readOnly": true"#));
    }

    #[test]
    fn direction_required() {
        cmd().arg("schema").assert().failure();
    }

    #[test]
    fn directions_conflict() {
        cmd()
            .args(["schema", "--request", "--response"])
            .assert()
            .failure();
    }
}

mod patch_command {
    use super::*;

    #[test]
    fn prints_request_body() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", GROUP);

        cmd()
            .args(["patch", doc.to_str().unwrap(), "--set", "tags.env=prod"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""tags":{"env":"prod"}"#))
            .stdout(predicate::str::contains(r#""id""#).not())
            .stdout(predicate::str::contains("Enabled").not());
    }

    #[test]
    fn set_parses_json_values() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", GROUP);

        cmd()
            .args(["patch", doc.to_str().unwrap(), "--set", "properties.enabled=false"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""enabled":false"#));
    }

    #[test]
    fn set_number_and_bool_text_on_string_fields() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", GROUP);

        cmd()
            .args([
                "patch",
                doc.to_str().unwrap(),
                "--set",
                "tags.build=42",
                "--set",
                "properties.group_short_name=true",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""build":"42""#))
            .stdout(predicate::str::contains(r#""groupShortName":"true""#));
    }

    #[test]
    fn append_and_clear() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", GROUP);

        cmd()
            .args([
                "patch",
                doc.to_str().unwrap(),
                "--append",
                r#"properties.sms_receivers={"name":"oncall","countryCode":"1","phoneNumber":"5555550100"}"#,
                "--clear",
                "properties.email_receivers",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""emailReceivers":[]"#))
            .stdout(predicate::str::contains(r#""phoneNumber":"5555550100""#));
    }

    #[test]
    fn reads_stdin() {
        cmd()
            .args(["patch", "-", "--set", "location=westus"])
            .write_stdin(GROUP)
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""location":"westus""#));
    }

    #[test]
    fn identity_pseudo_fields() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", GROUP);

        cmd()
            .args([
                "patch",
                doc.to_str().unwrap(),
                "--set",
                "identity.system_assigned=True",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""identity":{"type":"SystemAssigned"}"#,
            ));
    }

    #[test]
    fn unknown_path_exit_code_2() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", GROUP);

        cmd()
            .args(["patch", doc.to_str().unwrap(), "--set", "properties.bogus=1"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("schema mismatch"));
    }

    #[test]
    fn missing_required_exit_code_1() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", GROUP);

        cmd()
            .args(["patch", doc.to_str().unwrap(), "--clear", "location"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"));
    }

    #[test]
    fn malformed_binding() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", GROUP);

        cmd()
            .args(["patch", doc.to_str().unwrap(), "--set", "location"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("PATH=VALUE"));
    }

    #[test]
    fn missing_document_exit_code_3() {
        cmd()
            .args(["patch", "/nonexistent/ag.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn invalid_document_exit_code_2() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", "not json");

        cmd()
            .args(["patch", doc.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn unknown_policy_rejected() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "ag.json", GROUP);

        cmd()
            .args(["patch", doc.to_str().unwrap(), "--policy", "merge"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown policy"));
    }
}

#[cfg(feature = "remote")]
mod identity_assign_command {
    use super::*;
    use mockito::{Matcher, Server};

    fn path() -> Matcher {
        Matcher::Regex(
            "^/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Insights/actionGroups/ag"
                .into(),
        )
    }

    #[test]
    fn assigns_system_identity() {
        let mut server = Server::new();
        server
            .mock("GET", path())
            .with_status(200)
            .with_body(GROUP)
            .create();
        let put = server
            .mock("PUT", path())
            .match_body(Matcher::PartialJson(serde_json::json!({
                "identity": { "type": "SystemAssigned" }
            })))
            .with_status(200)
            .with_body(GROUP.replacen(
                r#""location""#,
                r#""identity": { "type": "SystemAssigned", "principalId": "p-1" }, "location""#,
                1,
            ))
            .create();

        let url = server.url();
        cmd()
            .args([
                "identity",
                "assign",
                "-n",
                "ag",
                "-g",
                "rg",
                "--system-assigned",
                "--endpoint",
                url.as_str(),
                "--subscription",
                "sub",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""principalId":"p-1""#))
            .stdout(predicate::str::contains(r#""type":"SystemAssigned""#));

        put.assert();
    }

    #[test]
    fn aliases_and_subscription_from_env() {
        let mut server = Server::new();
        server
            .mock("GET", path())
            .with_status(200)
            .with_body(GROUP)
            .create();
        let put = server
            .mock("PUT", path())
            .match_body(Matcher::PartialJson(serde_json::json!({
                "identity": {
                    "type": "UserAssigned",
                    "userAssignedIdentities": { "id1": {}, "id2": {} }
                }
            })))
            .with_status(201)
            .with_body(GROUP)
            .create();

        cmd()
            .env("MGMT_PATCH_SUBSCRIPTION", "sub")
            .env("MGMT_PATCH_ENDPOINT", server.url())
            .args([
                "identity",
                "assign",
                "--action-group-name",
                "ag",
                "--resource-group",
                "rg",
                "--mi-user-assigned",
                "id1",
                "id2",
            ])
            .assert()
            .success();

        put.assert();
    }

    #[test]
    fn not_found_exit_code_3() {
        let mut server = Server::new();
        server
            .mock("GET", path())
            .with_status(404)
            .with_body(r#"{"error":{"code":"ResourceNotFound","message":"not found"}}"#)
            .create();
        let put = server.mock("PUT", Matcher::Any).expect(0).create();

        let url = server.url();
        cmd()
            .args([
                "identity",
                "assign",
                "-n",
                "ag",
                "-g",
                "rg",
                "--system-assigned",
                "--endpoint",
                url.as_str(),
                "--subscription",
                "sub",
            ])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("ResourceNotFound"));

        put.assert();
    }

    #[test]
    fn missing_subscription_exit_code_1() {
        let mut server = Server::new();
        let get = server.mock("GET", Matcher::Any).expect(0).create();

        let url = server.url();
        cmd()
            .args([
                "identity",
                "assign",
                "-n",
                "ag",
                "-g",
                "rg",
                "--system-assigned",
                "--endpoint",
                url.as_str(),
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("subscriptionId"));

        get.assert();
    }
}
