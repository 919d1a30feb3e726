//! Version-stamp patching for `AssemblyInfo.cs`-style source files.
//!
//! Rewrites the string argument of `[assembly: AssemblyVersion("…")]`,
//! `AssemblyFileVersion` and `AssemblyInformationalVersion`. Attributes
//! preceded by `//` on their line are left alone, and files whose content
//! would not change are never rewritten.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

static VERSION_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(\[\s*assembly\s*:\s*Assembly(?:File|Informational)?Version\s*\(\s*")[^"]+("\s*\)\s*\])"#,
    )
    .unwrap()
});

/// Replace every stamped version in `content`.
pub fn patch_versions<'a>(content: &'a str, version: &str) -> Cow<'a, str> {
    let mut changed = false;
    let mut out = String::with_capacity(content.len());

    for line in content.split_inclusive('\n') {
        let comment = line.find("//");
        let patched = VERSION_ATTRIBUTE.replace_all(line, |caps: &regex::Captures| {
            match (comment, caps.get(0)) {
                (Some(at), Some(whole)) if at < whole.start() => whole.as_str().to_string(),
                _ => format!("{}{}{}", &caps[1], version, &caps[2]),
            }
        });
        if patched != line {
            changed = true;
        }
        out.push_str(&patched);
    }

    if changed && out != content {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(content)
    }
}

/// Files named `file_name` anywhere below `root`, sorted.
pub fn find_stamp_files(root: &Path, file_name: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .standard_filters(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(file_name))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Patch every stamp file below `root`. Returns the files that changed.
///
/// With `dry_run` nothing is written; the result lists what would change.
pub fn stamp_directory(
    root: &Path,
    file_name: &str,
    version: &str,
    dry_run: bool,
) -> Result<Vec<PathBuf>> {
    let mut patched = Vec::new();
    for path in find_stamp_files(root, file_name) {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let updated = patch_versions(&content, version);
        let Cow::Owned(updated) = updated else {
            debug!("No version stamps changed in {}", path.display());
            continue;
        };
        if dry_run {
            info!("Would patch versions in {}", path.display());
        } else {
            fs::write(&path, updated)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Patched versions in {}", path.display());
        }
        patched.push(path);
    }
    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSEMBLY_INFO: &str = r#"using System.Reflection;

[assembly: AssemblyTitle("Contoso.Core")]
[assembly: AssemblyVersion("1.4.2")]
[assembly : AssemblyFileVersion( "1.4.2.0" ) ]
[assembly: AssemblyInformationalVersion("1.4.2-beta")]
// [assembly: AssemblyVersion("0.0.1")]
"#;

    #[test]
    fn test_patch_all_version_attributes() {
        let patched = patch_versions(ASSEMBLY_INFO, "2.0.0");
        assert!(patched.contains(r#"[assembly: AssemblyVersion("2.0.0")]"#));
        assert!(patched.contains(r#"[assembly : AssemblyFileVersion( "2.0.0" ) ]"#));
        assert!(patched.contains(r#"[assembly: AssemblyInformationalVersion("2.0.0")]"#));
        assert!(patched.contains(r#"[assembly: AssemblyTitle("Contoso.Core")]"#));
    }

    #[test]
    fn test_commented_attribute_untouched() {
        let patched = patch_versions(ASSEMBLY_INFO, "2.0.0");
        assert!(patched.contains(r#"// [assembly: AssemblyVersion("0.0.1")]"#));
    }

    #[test]
    fn test_slashes_inside_version_string_are_not_a_comment() {
        let content = "[assembly: AssemblyInformationalVersion(\"1.0 http://contoso.com\")] // note\n";
        let patched = patch_versions(content, "1.1.0");
        assert_eq!(
            patched,
            "[assembly: AssemblyInformationalVersion(\"1.1.0\")] // note\n"
        );
    }

    #[test]
    fn test_unchanged_content_is_borrowed() {
        let content = "[assembly: AssemblyVersion(\"3.0.0\")]\r\n";
        assert!(matches!(patch_versions(content, "3.0.0"), Cow::Borrowed(_)));
        assert!(matches!(patch_versions("no stamps", "3.0.0"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_stamp_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src").join("Properties");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("AssemblyInfo.cs"), ASSEMBLY_INFO).unwrap();
        fs::write(
            dir.path().join("AssemblyInfo.cs"),
            "[assembly: AssemblyVersion(\"2.0.0\")]\n",
        )
        .unwrap();

        let dry = stamp_directory(dir.path(), "AssemblyInfo.cs", "2.0.0", true).unwrap();
        assert_eq!(dry, vec![nested.join("AssemblyInfo.cs")]);
        let untouched = fs::read_to_string(nested.join("AssemblyInfo.cs")).unwrap();
        assert_eq!(untouched, ASSEMBLY_INFO);

        let patched = stamp_directory(dir.path(), "AssemblyInfo.cs", "2.0.0", false).unwrap();
        assert_eq!(patched.len(), 1);
        let written = fs::read_to_string(nested.join("AssemblyInfo.cs")).unwrap();
        assert!(written.contains(r#"AssemblyVersion("2.0.0")"#));
    }
}
