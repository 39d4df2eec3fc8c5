/// Placeholder replaced with the generated `// @match` lines.
pub const MATCH_MARKER: &str = "DYNAMIC_MATCHES_WILL_BE_INSERTED_HERE";

/// Renders a metadata header template: substitutes the generated match
/// lines at the marker and stamps the current version.
pub fn render_header(template: &str, match_lines: &[String], version: &str) -> String {
    let rendered = template.replace(MATCH_MARKER, &match_lines.join("\n"));
    stamp_version(&rendered, version)
}

/// Rewrites every `// @version` line to the given version, leaving the
/// rest of the text untouched.
pub fn stamp_version(text: &str, version: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if line.trim_start().starts_with("// @version") {
            out.push_str(&format!("// @version      {version}"));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    if !text.ends_with('\n') {
        out.pop();
    }
    out
}
