//! Test manifest runner patching.
//!
//! The stock `InstrumentationTestRunner` prints results to the console only.
//! The JUnit report runner writes `junit-report.xml` into the application's
//! private files directory, which is what the report fetcher pulls.

use crate::error::{PipelineError, PipelineResult};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const MANIFEST_FILE: &str = "AndroidManifest.xml";

pub const DEFAULT_RUNNER: &str = r#"android:name="android.test.InstrumentationTestRunner""#;
pub const REPORT_RUNNER: &str =
    r#"android:name="com.zutubi.android.junitreport.JUnitReportTestRunner""#;

/// Fully qualified class of the report runner, as addressed by `am instrument`.
pub const REPORT_RUNNER_CLASS: &str = "com.zutubi.android.junitreport.JUnitReportTestRunner";

/// Replace every default-runner marker in `contents`, or `None` if there is none.
///
/// Works on raw bytes since the markers are ASCII and the manifest may declare
/// any encoding; everything outside the markers is copied unchanged.
pub fn patch_bytes(contents: &[u8]) -> Option<Vec<u8>> {
    let from = DEFAULT_RUNNER.as_bytes();
    let to = REPORT_RUNNER.as_bytes();

    let mut out = Vec::with_capacity(contents.len() + to.len());
    let mut rest = contents;
    let mut replaced = false;
    while let Some(at) = find(rest, from) {
        out.extend_from_slice(&rest[..at]);
        out.extend_from_slice(to);
        rest = &rest[at + from.len()..];
        replaced = true;
    }
    if !replaced {
        return None;
    }
    out.extend_from_slice(rest);
    Some(out)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Switch the manifest at `path` to the report runner.
///
/// Returns `false` without touching the file when the default marker is
/// absent, so a second call after a successful patch is a no-op.
pub fn patch_if_default(path: &Path) -> PipelineResult<bool> {
    let contents = fs::read(path).map_err(PipelineError::io("read", path))?;
    let Some(patched) = patch_bytes(&contents) else {
        return Ok(false);
    };
    replace_contents(path, &patched)?;
    Ok(true)
}

/// Write through a sibling temp file and rename it over `path`.
fn replace_contents(path: &Path, contents: &[u8]) -> PipelineResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp =
        NamedTempFile::new_in(dir).map_err(PipelineError::io("create temp file in", dir))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(PipelineError::io("write", tmp.path()))?;

    let perms = fs::metadata(path)
        .map_err(PipelineError::io("stat", path))?
        .permissions();
    fs::set_permissions(tmp.path(), perms).map_err(PipelineError::io("chmod", tmp.path()))?;

    tmp.persist(path)
        .map_err(|e| PipelineError::io("replace", path)(e.error))?;
    Ok(())
}
