use crate::constants::{LIST_GROUP, LIST_OWNER};
use crate::core_tree::{DirEntry, NodeKind};
use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use std::fmt::Display;

/// Renders a directory listing, one `ls -l` style line per entry.
pub fn format_listing(entries: &[DirEntry], now: &DateTime<Local>) -> Vec<u8> {
    entries
        .iter()
        .flat_map(|entry| format_list_line(entry, &local_time(entry.modified), now.year()))
        .collect()
}

/// One listing line. The name goes out as raw bytes, except that `\r` and
/// `\n` become `?` so every entry stays on its own line.
pub fn format_list_line<Tz: TimeZone>(
    entry: &DirEntry,
    modified: &DateTime<Tz>,
    current_year: i32,
) -> Vec<u8>
where
    Tz::Offset: Display,
{
    let (permissions, size) = match entry.kind {
        NodeKind::Directory => ("drwxr-xr-x", 0),
        NodeKind::ExecutableFile => ("-rwxr-xr-x", entry.size),
        NodeKind::File => ("-rw-r--r--", entry.size),
    };

    let mut line = format!(
        "{} {:>4} {:<8} {:<8} {:>12} {} ",
        permissions,
        entry.links,
        LIST_OWNER,
        LIST_GROUP,
        size,
        format_list_date(modified, current_year),
    )
    .into_bytes();
    line.extend(entry.name.iter().map(|&byte| match byte {
        b'\r' | b'\n' => b'?',
        byte => byte,
    }));
    line.extend_from_slice(b"\r\n");
    line
}

/// `Mon DD HH:MM` within the current year, `Mon DD  YYYY` otherwise. Both
/// are twelve characters wide.
pub fn format_list_date<Tz: TimeZone>(when: &DateTime<Tz>, current_year: i32) -> String
where
    Tz::Offset: Display,
{
    if when.year() == current_year {
        when.format("%b %e %H:%M").to_string()
    } else {
        when.format("%b %e  %Y").to_string()
    }
}

fn local_time(seconds: i64) -> DateTime<Local> {
    Local
        .timestamp_opt(seconds, 0)
        .earliest()
        .unwrap_or_else(|| DateTime::<Utc>::default().with_timezone(&Local))
}
