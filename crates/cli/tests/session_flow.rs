use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const CORPUS: &str = "filename,label\n\
land_policy_report_2023.docx,report\n\
cafeteria_menu.xlsx,menu\n\
Policy_Memo.hwp,memo\n";

fn setup() -> TempDir {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("corpus.csv"), CORPUS).unwrap();
    temp
}

fn run_session(workdir: &Path, extra: &[&str], script: &[&str]) -> Vec<Value> {
    let mut stdin = script.join("\n");
    stdin.push('\n');
    let output = cargo_bin_cmd!("evidence-finder")
        .current_dir(workdir)
        .env_remove("OPENAI_API_KEY")
        .env_remove("EVIDENCE_API_KEY")
        .args(["--quiet", "--log-dir", "logs", "session", "--corpus", "corpus.csv"])
        .args(extra)
        .write_stdin(stdin)
        .output()
        .expect("session run");
    assert!(
        output.status.success(),
        "session exited with {:?}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("one JSON response per line"))
        .collect()
}

fn ledger_events(workdir: &Path, participant: &str) -> Vec<String> {
    let text = fs::read_to_string(workdir.join(format!("logs/phase_b/{participant}.csv"))).unwrap();
    text.lines()
        .skip(1)
        .map(|line| line.split(',').nth(1).unwrap_or_default().to_string())
        .collect()
}

fn notice_kinds(response: &Value) -> Vec<String> {
    response["notices"]
        .as_array()
        .map(|notices| {
            notices
                .iter()
                .map(|n| n["kind"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn search_select_commit_and_export() {
    let temp = setup();
    let root = temp.path();
    let responses = run_session(
        root,
        &[],
        &[
            r#"{"action":"identify","payload":{"participant":"p01"}}"#,
            r#"{"action":"keywords","payload":{"text":"policy, 2023"}}"#,
            r#"{"action":"search"}"#,
            r#"{"action":"select","payload":{"filename":"Policy_Memo.hwp"}}"#,
            r#"{"action":"toggle","payload":{"filename":"land_policy_report_2023.docx"}}"#,
            r#"{"action":"commit"}"#,
            r#"{"action":"commit"}"#,
            r#"{"action":"evidence"}"#,
            r#"{"action":"export","payload":{"dest":"out/p01.csv"}}"#,
        ],
    );
    assert_eq!(responses.len(), 9);
    assert!(responses.iter().all(|r| r["status"] == "ok"), "{responses:?}");

    assert_eq!(notice_kinds(&responses[0]), vec!["intro"]);
    assert_eq!(responses[1]["data"]["base_keywords"][0], "policy");
    assert_eq!(responses[2]["data"]["total"], 2);
    assert_eq!(responses[2]["data"]["page"]["page"], 1);
    assert_eq!(responses[5]["data"]["total"], 2);
    assert_eq!(notice_kinds(&responses[6]), vec!["no_new_evidence"]);
    assert_eq!(
        responses[7]["data"]["evidence"],
        serde_json::json!(["Policy_Memo.hwp", "land_policy_report_2023.docx"])
    );

    let ledger = root.join("logs/phase_b/p01.csv");
    let exported = root.join("out/p01.csv");
    assert_eq!(fs::read(&ledger).unwrap(), fs::read(&exported).unwrap());
    assert_eq!(
        ledger_events(root, "p01"),
        vec![
            "phase_B_start",
            "phase_B_step1_popup",
            "search",
            "search_results",
            "evidence_mark",
        ]
    );
}

#[test]
fn request_errors_do_not_end_the_session() {
    let temp = setup();
    let responses = run_session(
        temp.path(),
        &[],
        &[
            r#"{"action":"search"}"#,
            "not json",
            r#"{"action":"identify","payload":{"participant":"../escape"}}"#,
            r#"{"action":"identify","payload":{"participant":"p02"}}"#,
            r#"{"action":"select","payload":{"filename":"cafeteria_menu.xlsx"}}"#,
            r#"{"action":"suggest"}"#,
            r#"{"action":"status"}"#,
        ],
    );
    let codes: Vec<&str> = responses
        .iter()
        .map(|r| r["error"]["code"].as_str().unwrap_or("ok"))
        .collect();
    assert_eq!(
        codes,
        vec![
            "identity_required",
            "invalid_request",
            "invalid_identity",
            "ok",
            "not_in_results",
            "no_keywords",
            "ok",
        ]
    );
    assert_eq!(responses[6]["data"]["phase"], "keyword_entry");
    assert!(!temp.path().join("logs/phase_b/..").join("escape.csv").exists());
}

#[test]
fn disabled_gateway_reports_no_suggestions() {
    let temp = setup();
    let responses = run_session(
        temp.path(),
        &[],
        &[
            r#"{"action":"identify","payload":{"participant":"p03"}}"#,
            r#"{"action":"keywords","payload":{"text":"land"}}"#,
            r#"{"action":"suggest"}"#,
        ],
    );
    assert_eq!(responses[2]["status"], "ok");
    assert_eq!(notice_kinds(&responses[2]), vec!["no_suggestions"]);
    let events = ledger_events(temp.path(), "p03");
    assert_eq!(&events[2..], ["click_generate", "llm_keywords"]);
}

#[test]
fn expired_session_only_allows_export() {
    let temp = setup();
    let responses = run_session(
        temp.path(),
        &["--limit-seconds", "0"],
        &[
            r#"{"action":"identify","payload":{"participant":"p04"}}"#,
            r#"{"action":"keywords","payload":{"text":"policy"}}"#,
            r#"{"action":"tick"}"#,
            r#"{"action":"export","payload":{"dest":"p04.csv"}}"#,
        ],
    );
    assert_eq!(notice_kinds(&responses[0]), vec!["intro", "auto_saved"]);
    assert_eq!(responses[0]["data"]["phase"], "finalized");
    assert_eq!(responses[1]["error"]["code"], "finalized");
    assert_eq!(responses[2]["data"]["expired"], true);
    assert_eq!(responses[3]["status"], "ok");

    assert_eq!(
        ledger_events(temp.path(), "p04"),
        vec!["phase_B_start", "phase_B_step1_popup", "phase_B_end"]
    );
}

#[test]
fn restarted_session_recovers_evidence() {
    let temp = setup();
    let root = temp.path();
    run_session(
        root,
        &[],
        &[
            r#"{"action":"identify","payload":{"participant":"p05"}}"#,
            r#"{"action":"keywords","payload":{"text":"menu"}}"#,
            r#"{"action":"search"}"#,
            r#"{"action":"select_page"}"#,
            r#"{"action":"commit"}"#,
        ],
    );
    let responses = run_session(
        root,
        &[],
        &[
            r#"{"action":"identify","payload":{"participant":"p05"}}"#,
            r#"{"action":"keywords","payload":{"text":"menu"}}"#,
            r#"{"action":"search"}"#,
            r#"{"action":"select_page"}"#,
            r#"{"action":"commit"}"#,
        ],
    );
    assert_eq!(responses[0]["data"]["recovered"], 1);
    assert_eq!(responses[2]["data"]["page"]["items"][0]["evidence"], true);
    assert_eq!(notice_kinds(&responses[4]), vec!["no_new_evidence"]);

    let marks = ledger_events(root, "p05")
        .into_iter()
        .filter(|event| event == "evidence_mark")
        .count();
    assert_eq!(marks, 1);
}
