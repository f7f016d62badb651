use std::path::{Path, PathBuf};
use std::process::Command;

fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next(); // consume '['
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
            continue;
        }
        out.push(ch);
    }

    out
}

fn normalize_output(output: &str, workspace_root: &Path) -> String {
    let mut normalized = output.replace("\r\n", "\n").replace('\\', "/");
    normalized = strip_ansi(&normalized);

    let mut prefixes = vec![workspace_root.to_string_lossy().replace('\\', "/")];
    if let Ok(canonical) = workspace_root.canonicalize() {
        prefixes.push(canonical.to_string_lossy().replace('\\', "/"));
    }

    for prefix in prefixes {
        if prefix.is_empty() {
            continue;
        }
        let with_slash = format!("{prefix}/");
        normalized = normalized.replace(&with_slash, "");
        normalized = normalized.replace(&prefix, "");
    }

    normalized
}

fn run_transcript(rel: &str) -> String {
    let workspace_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let gale_bin = PathBuf::from(env!("CARGO_BIN_EXE_gale"));
    let script = workspace_root.join(rel);

    let output = Command::new(&gale_bin)
        .arg("run")
        .arg(&script)
        .env("NO_COLOR", "1")
        .output()
        .unwrap_or_else(|e| panic!("failed to run gale for `{}`: {e}", script.display()));

    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    let exit_code = output.status.code().unwrap_or(-1);
    format!(
        "$ gale run {rel}\nexit_code: {exit_code}\n\n{}",
        normalize_output(&combined, workspace_root)
    )
}

#[test]
fn cli_run_transcripts() {
    let cases = [
        ("demo__church", "demos/church.gl"),
        ("demo__compose", "demos/compose.gl"),
        (
            "fixture__duplicate_binding",
            "tests/fixtures/duplicate_binding.gl",
        ),
        ("fixture__stalled_hole", "tests/fixtures/stalled_hole.gl"),
    ];

    for (snapshot, rel) in cases {
        let transcript = run_transcript(rel);

        insta::with_settings!({
            snapshot_path => "snapshots",
            prepend_module_to_snapshot => false,
            omit_expression => true,
        }, {
            insta::assert_snapshot!(snapshot, transcript);
        });
    }
}
