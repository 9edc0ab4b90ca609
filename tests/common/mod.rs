//! Shared helpers for integration tests
//!
//! djLint itself is never needed: each test writes a small shell script that
//! stands in for the Python interpreter and ignores `-m djlint -`.

#![cfg(unix)]
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Echoes the template back unchanged.
pub const UNCHANGED: &str = "#!/bin/sh\ncat\n";

/// "Formats" by upper-casing everything.
pub const UPPERCASE: &str = "#!/bin/sh\ntr 'a-z' 'A-Z'\n";

/// Reports one problem in the delimited layout and exits 1 like djLint does.
pub const ONE_PROBLEM: &str = r#"#!/bin/sh
cat > /dev/null
echo '<filename>-</filename><line>2:4</line><code>H025</code><message>Orphan tag found.</message>'
echo 'Linting 1/1 files' >&2
exit 1
"#;

/// Reports two problems in the legacy layout.
pub const LEGACY_PROBLEMS: &str = r#"#!/bin/sh
cat > /dev/null
echo 'H006 1:0 Img tag should have height and width attributes.'
echo 'T001 3:12 Variables should be wrapped in a whitespace.'
exit 1
"#;

/// Takes three seconds when the template contains `SLOW`; the code in the
/// report tells the two runs apart.
pub const SLOW_ON_MARKER: &str = r#"#!/bin/sh
input=$(cat)
case "$input" in
  *SLOW*)
    sleep 3
    echo '<filename>-</filename><line>1:0</line><code>OLD1</code><message>Slow run.</message>'
    ;;
  *)
    echo '<filename>-</filename><line>1:0</line><code>NEW1</code><message>Fast run.</message>'
    ;;
esac
exit 1
"#;

/// Interpreter without the djlint module.
pub const NOT_INSTALLED: &str = r#"#!/bin/sh
cat > /dev/null
echo "/usr/bin/python3: No module named djlint" >&2
exit 1
"#;

/// Crashes with an unrecognised error.
pub const CRASH: &str = r#"#!/bin/sh
cat > /dev/null
echo 'Traceback (most recent call last): boom' >&2
exit 1
"#;

/// Killed by a signal after swallowing the template.
pub const KILLED: &str = "#!/bin/sh\ncat > /dev/null\nkill -9 $$\n";

/// Prints its arguments, one per line, instead of a report.
pub const PRINT_ARGS: &str = "#!/bin/sh\ncat > /dev/null\nfor arg in \"$@\"; do echo \"$arg\"; done\n";

/// Write an executable fake interpreter into `dir`.
pub fn fake_python(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
