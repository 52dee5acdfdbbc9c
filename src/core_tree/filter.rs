use git2::{AttrCheckFlags, AttrValue, Blob, Oid, Repository};
use std::path::{Path, PathBuf};

/// Renders a blob the way a checkout of `path` would write it.
///
/// Two conversions are applied, in checkout order: `$Id$` expansion for
/// paths with the `ident` attribute, then `\n` to `\r\n` when the line
/// ending resolves to CRLF. Binary blobs only ever get the first.
pub fn render_for_checkout(
    repo: &Repository,
    path: &[u8],
    blob: &Blob<'_>,
) -> Result<Vec<u8>, git2::Error> {
    let attr_path = attr_path(path);
    let flags = AttrCheckFlags::FILE_THEN_INDEX;

    let mut content = if is_set(repo.get_attr(&attr_path, "ident", flags)?) {
        expand_ident(blob.content(), blob.id())
    } else {
        blob.content().to_vec()
    };

    if !blob.is_binary() && wants_crlf(repo, &attr_path)? {
        content = lf_to_crlf(&content);
    }
    Ok(content)
}

/// Resolves the checkout line ending from the attributes, then
/// `core.autocrlf`, then `core.eol`.
fn wants_crlf(repo: &Repository, path: &Path) -> Result<bool, git2::Error> {
    let flags = AttrCheckFlags::FILE_THEN_INDEX;
    let text = AttrValue::from_string(repo.get_attr(path, "text", flags)?);
    if matches!(text, AttrValue::False) {
        return Ok(false);
    }

    match repo.get_attr(path, "eol", flags)? {
        Some("crlf") => return Ok(true),
        Some("lf") => return Ok(false),
        _ => {}
    }

    let config = repo.config()?;
    // "input" is not a boolean and means no conversion on checkout
    if config.get_bool("core.autocrlf").unwrap_or(false) {
        return Ok(true);
    }

    let marked_text = matches!(text, AttrValue::True | AttrValue::String("auto"));
    Ok(marked_text && config.get_string("core.eol").ok().as_deref() == Some("crlf"))
}

fn is_set(value: Option<&str>) -> bool {
    matches!(AttrValue::from_string(value), AttrValue::True)
}

#[cfg(unix)]
fn attr_path(path: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(path))
}

#[cfg(not(unix))]
fn attr_path(path: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(path).into_owned())
}

/// Replaces `$Id$` and `$Id: ... $` with `$Id: <blob id> $`. A keyword
/// whose closing `$` is not on the same line is left alone.
pub fn expand_ident(content: &[u8], id: Oid) -> Vec<u8> {
    let stamp = format!("$Id: {} $", id);
    let mut out = Vec::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.windows(3).position(|window| window == b"$Id") {
        out.extend_from_slice(&rest[..start]);
        let after = &rest[start + 3..];
        let close = match after.first() {
            Some(b'$') => Some(0),
            Some(b':') => after
                .iter()
                .position(|&byte| byte == b'$' || byte == b'\n')
                .filter(|&end| after[end] == b'$'),
            _ => None,
        };
        match close {
            Some(end) => {
                out.extend_from_slice(stamp.as_bytes());
                rest = &after[end + 1..];
            }
            None => {
                out.extend_from_slice(b"$Id");
                rest = after;
            }
        }
    }

    out.extend_from_slice(rest);
    out
}

/// Expands bare `\n` into `\r\n`; existing `\r\n` pairs are kept as is.
pub fn lf_to_crlf(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + content.len() / 16);
    let mut previous = None;
    for &byte in content {
        if byte == b'\n' && previous != Some(b'\r') {
            out.push(b'\r');
        }
        out.push(byte);
        previous = Some(byte);
    }
    out
}
