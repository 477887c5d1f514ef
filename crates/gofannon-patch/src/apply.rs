//! Applies a unified diff to file text via `patch(1)`.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::line_break::{LineBreak, normalize_to_lf};

/// Stdout signals from `patch --forward` that mean the diff is already
/// applied rather than broken.
const ALREADY_APPLIED_SIGNALS: [&str; 3] = [
    "already exists!",
    "Ignoring previously applied (or reversed) patch.",
    "Reversed (or previously applied) patch detected!",
];

/// Outcome of applying a diff to file text.
///
/// Exactly one variant holds per call; callers branch on the variant
/// rather than inferring state from field emptiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The diff applied cleanly. `modified_text` uses the original
    /// file's line-break style.
    Applied {
        /// The new file content.
        modified_text: String,
    },
    /// The diff legitimately reduced the file to empty content or
    /// removed it.
    Emptied,
    /// The diff was already applied to this content. Benign no-op.
    AlreadyApplied {
        /// Explanation for the model, including the offending diff.
        message: String,
    },
    /// Some hunks applied, some were rejected.
    Partial {
        /// Content after the applied hunks.
        modified_text: String,
        /// The rejected hunks, with whitespace made visible.
        reject_text: String,
        /// Explanation for the model.
        message: String,
    },
    /// Nothing was applied: malformed diff, process launch failure, or
    /// I/O failure.
    Failed {
        /// Explanation for the model.
        message: String,
    },
}

impl PatchOutcome {
    /// True for the variants the caller treats as "file content changed".
    pub fn changed_file(&self) -> bool {
        matches!(
            self,
            PatchOutcome::Applied { .. } | PatchOutcome::Emptied | PatchOutcome::Partial { .. }
        )
    }
}

/// Apply `diff_text` to `original_text`, returning the outcome.
///
/// The original's line-break style is detected up front and restored on
/// every text the outcome carries, regardless of the diff's own style.
/// This function never panics and never returns an error past its
/// boundary; see [`PatchOutcome::Failed`].
pub fn apply(original_text: &str, diff_text: &str) -> PatchOutcome {
    let line_break = LineBreak::detect(original_text);

    // The patch mechanism operates on LF text only.
    let mut original_lf = normalize_to_lf(original_text);
    if !original_lf.is_empty() && !original_lf.ends_with('\n') {
        original_lf.push('\n');
    }
    let mut diff_lf = normalize_to_lf(diff_text);
    if !diff_lf.ends_with('\n') {
        diff_lf.push('\n');
    }

    // File creation: patch cannot create a file from nothing on every
    // platform, so reconstruct the content from the added lines directly.
    if original_lf.is_empty() && diff_lf.contains("--- /dev/null") {
        let content = reconstruct_new_file(&diff_lf);
        if content.is_empty() {
            return PatchOutcome::Emptied;
        }
        return PatchOutcome::Applied {
            modified_text: line_break.restore(&content),
        };
    }

    let outcome = run_patch(&original_lf, &diff_lf, line_break);
    sweep_stray_rejects();
    outcome
}

/// Rebuild a brand-new file's content from the diff's `+` lines.
fn reconstruct_new_file(diff_lf: &str) -> String {
    let mut lines = Vec::new();
    let mut in_hunk = false;
    for line in diff_lf.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        if !in_hunk {
            continue;
        }
        if let Some(added) = line.strip_prefix('+') {
            lines.push(added);
        }
    }
    if lines.is_empty() {
        return String::new();
    }
    let mut content = lines.join("\n");
    content.push('\n');
    content
}

/// Run `patch -u --fuzz=3 --forward` against a scratch copy of the
/// original, feeding the diff on stdin.
fn run_patch(original_lf: &str, diff_lf: &str, line_break: LineBreak) -> PatchOutcome {
    // Scratch file is RAII-scoped: released on every exit path below.
    let org_file = match tempfile::NamedTempFile::new() {
        Ok(f) => f,
        Err(e) => {
            return PatchOutcome::Failed {
                message: format!("Error: failed to create scratch file: {e}"),
            };
        }
    };
    if let Err(e) = std::fs::write(org_file.path(), original_lf) {
        return PatchOutcome::Failed {
            message: format!("Error: failed to write scratch file: {e}"),
        };
    }

    let output = match spawn_patch(org_file.path(), diff_lf) {
        Ok(o) => o,
        Err(e) => {
            return PatchOutcome::Failed {
                message: format!("Error: failed to run patch: {e}"),
            };
        }
    };

    let rej_path = format!("{}.rej", org_file.path().display());
    let outcome = if output.status.success() {
        read_success(org_file.path(), line_break)
    } else {
        classify_failure(org_file.path(), &rej_path, &output, diff_lf, line_break)
    };

    // The reject file is patch-generated, outside the tempfile's RAII.
    let _ = std::fs::remove_file(&rej_path);
    outcome
}

fn spawn_patch(org_path: &Path, diff_lf: &str) -> std::io::Result<std::process::Output> {
    // --forward: never assume a reversed patch, never apply anyway.
    let mut child = Command::new("patch")
        .args(["-u", "--fuzz=3", "--forward"])
        .arg(org_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Feed stdin from a separate thread so the write cannot block against
    // a full stdout pipe when the diff and the per-hunk chatter are both
    // larger than the pipe buffer.
    let writer = child.stdin.take().map(|mut stdin| {
        let diff = diff_lf.to_owned();
        std::thread::spawn(move || stdin.write_all(diff.as_bytes()))
    });
    let output = child.wait_with_output()?;
    if let Some(handle) = writer
        && let Ok(Err(e)) = handle.join()
        && e.kind() != std::io::ErrorKind::BrokenPipe
    {
        return Err(e);
    }
    Ok(output)
}

fn read_success(org_path: &Path, line_break: LineBreak) -> PatchOutcome {
    // A deletion diff removes the scratch file entirely.
    let content = match std::fs::read_to_string(org_path) {
        Ok(c) => c,
        Err(_) => return PatchOutcome::Emptied,
    };
    if content.is_empty() {
        return PatchOutcome::Emptied;
    }
    PatchOutcome::Applied {
        modified_text: line_break.restore(&strip_trailing_spaces(&content)),
    }
}

fn classify_failure(
    org_path: &Path,
    rej_path: &str,
    output: &std::process::Output,
    diff_lf: &str,
    line_break: LineBreak,
) -> PatchOutcome {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if ALREADY_APPLIED_SIGNALS.iter().any(|s| stdout.contains(s)) {
        tracing::debug!("patch reported the diff as already applied");
        return PatchOutcome::AlreadyApplied {
            message: format!(
                "Failed to apply patch because the diff is already applied. \
                 But it's OK, move on to the next fix!\n\ndiff_text:\n{diff_lf}\n\nstderr:\n{stderr}\n"
            ),
        };
    }

    let modified_text = std::fs::read_to_string(org_path)
        .map(|c| line_break.restore(&strip_trailing_spaces(&c)))
        .unwrap_or_default();
    let reject_text = std::fs::read_to_string(rej_path)
        .map(|c| mark_whitespace(&c))
        .unwrap_or_default();

    tracing::warn!(
        exit = ?output.status.code(),
        rejects = !reject_text.is_empty(),
        "patch failed to apply diff"
    );

    let message = format!(
        "Failed to apply patch partially or entirely because something is wrong in diff. \
         Analyze the reason from stderr and rej_text, modify the diff, and try again.\n\n\
         diff_text:\n{}\n\nstderr:\n{stderr}\n\nrej_text:\n{reject_text}\n",
        mark_whitespace(diff_lf),
    );

    if !modified_text.is_empty() && !reject_text.is_empty() {
        PatchOutcome::Partial {
            modified_text,
            reject_text,
            message,
        }
    } else {
        PatchOutcome::Failed { message }
    }
}

/// Make tabs and spaces visible so whitespace-sensitive diff mistakes are
/// diagnosable from the error message.
fn mark_whitespace(text: &str) -> String {
    text.replace(' ', "·").replace('\t', "→").replace("\\t", "→")
}

/// Drop trailing spaces and tabs from every line, preserving line
/// structure and the trailing newline.
fn strip_trailing_spaces(text: &str) -> String {
    let had_trailing_newline = text.ends_with('\n');
    let mut out = text
        .split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n");
    if had_trailing_newline && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Remove stray reject artifacts patch may drop in the working directory
/// when it cannot derive a target name. Best effort only.
fn sweep_stray_rejects() {
    let Ok(entries) = std::fs::read_dir(".") else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with("Oops.rej") {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "line 1\nline 2\nline 3\n";

    const SINGLE_LINE_DIFF: &str = "\
--- a/file.txt
+++ b/file.txt
@@ -1,3 +1,3 @@
 line 1
-line 2
+line 2 modified
 line 3
";

    #[test]
    fn test_single_line_modification() {
        let outcome = apply(ORIGINAL, SINGLE_LINE_DIFF);
        assert_eq!(
            outcome,
            PatchOutcome::Applied {
                modified_text: "line 1\nline 2 modified\nline 3\n".to_string()
            }
        );
    }

    #[test]
    fn test_crlf_original_preserves_style() {
        let original = "line 1\r\nline 2\r\nline 3\r\n";
        let outcome = apply(original, SINGLE_LINE_DIFF);
        assert_eq!(
            outcome,
            PatchOutcome::Applied {
                modified_text: "line 1\r\nline 2 modified\r\nline 3\r\n".to_string()
            }
        );
    }

    #[test]
    fn test_diff_without_trailing_newline() {
        let diff = SINGLE_LINE_DIFF.trim_end();
        let outcome = apply(ORIGINAL, diff);
        assert!(matches!(outcome, PatchOutcome::Applied { .. }));
    }

    #[test]
    fn test_new_file_creation_from_dev_null() {
        let diff = "\
--- /dev/null
+++ b/new.txt
@@ -0,0 +1,3 @@
+alpha
+beta
+gamma
";
        let outcome = apply("", diff);
        assert_eq!(
            outcome,
            PatchOutcome::Applied {
                modified_text: "alpha\nbeta\ngamma\n".to_string()
            }
        );
    }

    #[test]
    fn test_new_file_skips_context_lines() {
        // Only `+` lines inside the hunk contribute to a new file.
        let diff = "\
--- /dev/null
+++ b/new.txt
@@ -0,0 +1,2 @@
+one
+two
";
        let outcome = apply("", diff);
        assert_eq!(
            outcome,
            PatchOutcome::Applied {
                modified_text: "one\ntwo\n".to_string()
            }
        );
    }

    #[test]
    fn test_already_applied_is_benign() {
        let already_modified = "line 1\nline 2 modified\nline 3\n";
        let outcome = apply(already_modified, SINGLE_LINE_DIFF);
        match outcome {
            PatchOutcome::AlreadyApplied { message } => {
                assert!(message.contains("already applied"));
            }
            other => panic!("expected AlreadyApplied, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_application_keeps_both_texts() {
        let original = "\
alpha
bravo
charlie
delta
echo
foxtrot
golf
hotel
india
juliet
";
        // First hunk matches; second hunk's context exists nowhere.
        let diff = "\
--- a/file.txt
+++ b/file.txt
@@ -1,3 +1,3 @@
 alpha
-bravo
+bravo modified
 charlie
@@ -50,3 +50,3 @@
 xray
-yankee
+yankee modified
 zulu
";
        let outcome = apply(original, diff);
        match outcome {
            PatchOutcome::Partial {
                modified_text,
                reject_text,
                message,
            } => {
                assert!(modified_text.contains("bravo modified"));
                assert!(!reject_text.is_empty());
                assert!(reject_text.contains("yankee"));
                assert!(message.contains("rej_text"));
            }
            other => panic!("expected Partial, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_diff_fails_without_panic() {
        let outcome = apply(ORIGINAL, "this is not a diff at all\n");
        match outcome {
            PatchOutcome::Failed { message } => {
                assert!(message.contains("something is wrong in diff"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_diff_emptying_file_returns_emptied() {
        let original = "only line\n";
        let diff = "\
--- a/file.txt
+++ b/file.txt
@@ -1 +0,0 @@
-only line
";
        assert_eq!(apply(original, diff), PatchOutcome::Emptied);
    }

    #[test]
    fn test_diff_larger_than_pipe_buffer() {
        // Rewrites every line of a 4000-line file; the diff alone is well
        // past a 64 KiB pipe buffer.
        let original: String = (0..4000).map(|i| format!("value {i} old\n")).collect();
        let mut diff = String::from("--- a/big.txt\n+++ b/big.txt\n@@ -1,4000 +1,4000 @@\n");
        for i in 0..4000 {
            diff.push_str(&format!("-value {i} old\n"));
        }
        for i in 0..4000 {
            diff.push_str(&format!("+value {i} new\n"));
        }

        match apply(&original, &diff) {
            PatchOutcome::Applied { modified_text } => {
                assert!(modified_text.starts_with("value 0 new\n"));
                assert!(modified_text.ends_with("value 3999 new\n"));
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[test]
    fn test_original_without_trailing_newline() {
        let outcome = apply("line 1\nline 2\nline 3", SINGLE_LINE_DIFF);
        assert!(matches!(outcome, PatchOutcome::Applied { .. }));
    }

    #[test]
    fn test_strip_trailing_spaces() {
        assert_eq!(strip_trailing_spaces("a  \nb\t\nc\n"), "a\nb\nc\n");
        assert_eq!(strip_trailing_spaces("no newline  "), "no newline");
    }

    #[test]
    fn test_mark_whitespace() {
        assert_eq!(mark_whitespace(" \ta"), "·→a");
    }

    #[test]
    fn test_changed_file_predicate() {
        assert!(
            PatchOutcome::Applied {
                modified_text: "x\n".into()
            }
            .changed_file()
        );
        assert!(PatchOutcome::Emptied.changed_file());
        assert!(
            !PatchOutcome::AlreadyApplied {
                message: "m".into()
            }
            .changed_file()
        );
        assert!(!PatchOutcome::Failed { message: "m".into() }.changed_file());
    }
}
