//! Managed-section parsing and rendering.
//!
//! The managed section is the only part of the hosts file habitlock owns:
//! a contiguous run of loopback-redirect lines bounded by two sentinel
//! comments. Everything outside the sentinels is preserved byte-for-byte.
//!
//! These functions are pure string transforms; all I/O lives in the
//! [`crate::HostsFile`] manager.

/// Sentinel opening the managed section.
pub const SECTION_BEGIN: &str = "# habitlock:begin";
/// Sentinel closing the managed section.
pub const SECTION_END: &str = "# habitlock:end";

const LOOPBACK: &str = "127.0.0.1";

/// Extract the domains of every redirect entry inside the managed section.
///
/// Blank lines and comments inside the section are skipped; lines outside
/// the sentinels are never inspected.
pub fn managed_domains(content: &str) -> Vec<String> {
    let mut domains = Vec::new();
    let mut inside = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed == SECTION_BEGIN {
            inside = true;
            continue;
        }
        if trimmed == SECTION_END {
            inside = false;
            continue;
        }
        if !inside || trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        if parts.next() == Some(LOOPBACK) {
            if let Some(domain) = parts.next() {
                domains.push(domain.to_string());
            }
        }
    }
    domains
}

/// Remove any managed section(s) wholesale, preserving every other byte.
///
/// The section owns the separator newline written before its begin
/// sentinel (see [`replace_section`]), so that newline is removed with
/// the sentinels and clearing restores the original file exactly, even
/// when it had no trailing newline. At most one section should exist
/// (that is the invariant `apply` maintains), but stray duplicates from
/// interrupted runs are removed too. An unterminated section swallows
/// to end of input.
pub fn strip_section(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut inside = false;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed == SECTION_BEGIN {
            inside = true;
            // Drop the section-owned separator newline.
            if out.ends_with('\n') {
                out.pop();
            }
            continue;
        }
        if trimmed == SECTION_END {
            inside = false;
            continue;
        }
        if !inside {
            out.push_str(line);
        }
    }
    out
}

/// Render a fresh managed section for `domains`.
///
/// Each apex domain also gets a `www.` variant entry; domains already
/// carrying a `www.` prefix are written as-is.
pub fn render_section(domains: &[String]) -> String {
    let mut section = String::new();
    section.push_str(SECTION_BEGIN);
    section.push('\n');
    for domain in domains {
        section.push_str(&format!("{LOOPBACK} {domain}\n"));
        if !domain.starts_with("www.") {
            section.push_str(&format!("{LOOPBACK} www.{domain}\n"));
        }
    }
    section.push_str(SECTION_END);
    section.push('\n');
    section
}

/// Strip any existing section and, when `domains` is non-empty, append
/// a freshly rendered one.
///
/// The separator newline written between the prior content and the
/// begin sentinel belongs to the section, not the file: `strip_section`
/// removes it again, so files without a trailing newline survive an
/// apply-then-clear cycle byte-for-byte.
pub fn replace_section(content: &str, domains: &[String]) -> String {
    let mut out = strip_section(content);
    if domains.is_empty() {
        return out;
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&render_section(domains));
    out
}
