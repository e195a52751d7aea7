// End-to-end tests for the `nzn` binary.
//
// Each test gets its own scratch directory with a settings file pointing the
// record store, archive and dataset at it.
//
// Run with: cargo test -p nzn-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use nzn_io::marc21;
use nzn_recon::MarcRecord;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("settings.toml"),
            "[paths]\nstore_dir = \"newspapers\"\narchive_dir = \"marc\"\ndataset_file = \"site/newspapers.json\"\n",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn nzn(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_nzn"))
            .current_dir(self.dir.path())
            .env_remove("NZN_STORE_DIR")
            .env_remove("NZN_POLICY")
            .env("RUST_LOG", "nzn=warn")
            .arg("--config")
            .arg(self.path("settings.toml"))
            .args(args)
            .output()
            .expect("run nzn")
    }

    fn write_record(&self, id: &str, json: &str) {
        let dir = self.path("newspapers");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{id}.json")), json).unwrap();
    }

    fn read_record(&self, id: &str) -> serde_json::Value {
        let text = fs::read_to_string(self.path("newspapers").join(format!("{id}.json"))).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn write_marc(&self, name: &str, records: &[MarcRecord]) -> PathBuf {
        let mut bytes = Vec::new();
        for record in records {
            bytes.extend(marc21::encode(record));
        }
        let path = self.path(name);
        fs::write(&path, bytes).unwrap();
        path
    }
}

fn newspaper(cn: &str, title: &str, date1: &str, date2: &str) -> MarcRecord {
    let mut record = MarcRecord::new("00000cas a2200000 a 4500");
    record
        .push_control("008", format!("860101d{date1}{date2}nz dr np      0   a0eng d"))
        .push_data("035", [' ', ' '], &[('a', format!("(Nz){cn}").as_str())])
        .push_data("245", ['0', '0'], &[('a', title)])
        .push_data("260", [' ', ' '], &[('a', "Reefton, N.Z. :")])
        .push_data("310", [' ', ' '], &[('a', "Daily")]);
    record
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const REGISTRY: &str = "ID\tTitle\tGenre\tPlace\tPlacecode\tDistrict\tRegion\tFirst Year\tFinal Year\tCurrent?\tMARC Control Number\tModified By\n\
    3\tInangahua Times\tDaily\tReefton\trf\tBuller District\tWest Coast\t187u\t1943\tno\t(Nz)77\tadmin\n";

// ===========================================================================
// Full workflow
// ===========================================================================

#[test]
fn import_reconcile_export() {
    let ws = Workspace::new();
    fs::write(ws.path("registry.tsv"), REGISTRY).unwrap();

    let out = ws.nzn(&["import", "registry.tsv"]);
    assert_exit(&out, 0);
    assert!(stderr(&out).contains("1 created"));
    let imported = ws.read_record("3");
    assert_eq!(imported["nzn-placecode"], "rf");
    assert_eq!(imported["revision"], 1);
    assert!(imported.get("modified-by").is_none());

    ws.write_marc(
        "catalogue.mrc",
        &[
            newspaper("77", "Inangahua Times", "1872", "1943"),
            newspaper("88", "Kumara Times", "1876", "9999"),
        ],
    );

    let out = ws.nzn(&["reconcile", "catalogue.mrc", "--mode", "add-new-records"]);
    assert_exit(&out, 0);
    let created = ws.read_record("4");
    assert_eq!(created["title"], "Kumara Times");
    assert_eq!(created["genre"], "Unknown");
    assert_eq!(created["is-current"], true);
    assert_eq!(created["revision"], 1);
    assert!(ws.path("marc/4.mrk").is_file());

    let out = ws.nzn(&["reconcile", "catalogue.mrc", "--mode", "update-existing-records"]);
    assert_exit(&out, 0);
    let updated = ws.read_record("3");
    assert_eq!(updated["first-year"], "1872");
    assert_eq!(updated["revision"], 2);

    let changes = fs::read_to_string(ws.path("newspapers/_changes.jsonl")).unwrap();
    assert!(changes.contains("Reconciled from MARC record (Nz)77"));

    let out = ws.nzn(&["export"]);
    assert_exit(&out, 0);
    let doc: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(ws.path("site/newspapers.json")).unwrap()).unwrap();
    let ids: Vec<&str> = doc.iter().map(|e| e["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["3", "4"]);
}

#[test]
fn report_mode_is_a_dry_run() {
    let ws = Workspace::new();
    ws.write_record("1", r#"{"id": "1", "title": "Star", "place": "Reefton", "first-year": "18uu", "marc-control-number": "77", "revision": 2}"#);
    ws.write_marc(
        "catalogue.mrc",
        &[
            newspaper("77", "Star", "1872", "1943"),
            newspaper("88", "Kumara Times", "1876", "9999"),
        ],
    );
    let before = fs::read_to_string(ws.path("newspapers/1.json")).unwrap();

    let out = ws.nzn(&["reconcile", "catalogue.mrc", "--json"]);
    assert_exit(&out, 0);

    let summary: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&out.stdout).trim()).unwrap();
    assert_eq!(summary["mode"], "report");
    assert_eq!(summary["stats"]["updated"], 1);
    assert_eq!(summary["stats"]["created"], 1);
    assert_eq!(summary["stats"]["written"], 0);

    assert_eq!(fs::read_to_string(ws.path("newspapers/1.json")).unwrap(), before);
    assert!(!ws.path("newspapers/2.json").exists());
    assert!(!ws.path("newspapers/_changes.jsonl").exists());
    assert!(!ws.path("marc").exists());
    assert!(stderr(&out).contains("dry run"));
}

#[test]
fn update_marc_files_writes_archive_only() {
    let ws = Workspace::new();
    ws.write_record("1", r#"{"id": "1", "title": "Star", "first-year": "1872", "final-year": "1943", "marc-control-number": "77"}"#);
    ws.write_marc("catalogue.mrc", &[newspaper("77", "Star", "1872", "1943")]);

    let out = ws.nzn(&["reconcile", "catalogue.mrc", "--mode", "update-marc-files", "--archive-dir", "copies"]);
    assert_exit(&out, 0);
    let text = fs::read_to_string(ws.path("copies/1.mrk")).unwrap();
    assert!(text.contains("=035  \\\\$a(Nz)77"));
    assert!(!ws.path("newspapers/_changes.jsonl").exists());
}

// ===========================================================================
// Exit codes
// ===========================================================================

#[test]
fn duplicate_control_number_exits_3() {
    let ws = Workspace::new();
    ws.write_record("1", r#"{"id": "1", "title": "Star", "marc-control-number": "77"}"#);
    ws.write_record("2", r#"{"id": "2", "title": "Evening Star", "marc-control-number": "(Nz)77"}"#);
    ws.write_marc("catalogue.mrc", &[newspaper("88", "Kumara Times", "1876", "9999")]);

    let out = ws.nzn(&["reconcile", "catalogue.mrc", "--mode", "add-new-records"]);
    assert_exit(&out, 3);
    let err = stderr(&out);
    assert!(err.contains("Star") && err.contains("Evening Star"), "{err}");
    assert!(!ws.path("newspapers/3.json").exists());
}

#[test]
fn truncated_marc_exits_4() {
    let ws = Workspace::new();
    let path = ws.write_marc("catalogue.mrc", &[newspaper("88", "Kumara Times", "1876", "9999")]);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 20]).unwrap();

    let out = ws.nzn(&["reconcile", "catalogue.mrc"]);
    assert_exit(&out, 4);
    assert!(stderr(&out).contains("truncated"));
}

#[test]
fn missing_input_exits_1() {
    let ws = Workspace::new();
    let out = ws.nzn(&["reconcile", "nowhere.mrc"]);
    assert_exit(&out, 1);
    assert!(stderr(&out).contains("nowhere.mrc"));
}

#[test]
fn malformed_record_json_exits_1() {
    let ws = Workspace::new();
    ws.write_record("1", "{ broken");
    ws.write_marc("catalogue.mrc", &[newspaper("88", "Kumara Times", "1876", "9999")]);

    let out = ws.nzn(&["reconcile", "catalogue.mrc"]);
    assert_exit(&out, 1);
    assert!(stderr(&out).contains("1.json"));
}

#[test]
fn unknown_mode_is_a_usage_error() {
    let ws = Workspace::new();
    let out = ws.nzn(&["reconcile", "catalogue.mrc", "--mode", "everything"]);
    assert_exit(&out, 2);
}

#[test]
fn import_row_without_id_exits_1() {
    let ws = Workspace::new();
    fs::write(ws.path("registry.tsv"), "ID\tTitle\n\tNo id\n").unwrap();
    let out = ws.nzn(&["import", "registry.tsv"]);
    assert_exit(&out, 1);
    assert!(stderr(&out).contains("line 2"));
}

// ===========================================================================
// validate-policy
// ===========================================================================

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn validate_policy() {
    let ws = Workspace::new();
    let good = write(
        ws.dir.path(),
        "policy.toml",
        "excluded_places = [\"Samoa\", \"Fiji\"]\ninfrequent_frequencies = [\"Monthly\"]\n",
    );
    let out = ws.nzn(&["validate-policy", good.to_str().unwrap()]);
    assert_exit(&out, 0);
    assert!(stderr(&out).contains("2 excluded places"));

    let bad = write(ws.dir.path(), "bad.toml", "progress_interval_secs = 0\n");
    let out = ws.nzn(&["validate-policy", bad.to_str().unwrap()]);
    assert_exit(&out, 2);
    assert!(stderr(&out).contains("progress_interval_secs"));
}

#[test]
fn policy_changes_skip_rules() {
    let ws = Workspace::new();
    write(ws.dir.path(), "policy.toml", "excluded_places = [\"Reefton\"]\n");
    ws.write_marc("catalogue.mrc", &[newspaper("88", "Kumara Times", "1876", "9999")]);

    let out = ws.nzn(&["reconcile", "catalogue.mrc", "--policy", "policy.toml", "--json"]);
    assert_exit(&out, 0);
    let summary: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&out.stdout).trim()).unwrap();
    assert_eq!(summary["stats"]["no_place"], 1);
    assert_eq!(summary["stats"]["created"], 0);
}
