//! Target path templates
//!
//! A template is an ordinary path with `{token}` placeholders:
//!
//! - `{filename}` - the source file's name with extension
//! - `{%Y-%m-%d}` - any token containing `%` is a strftime pattern
//! - `{yyyy-MM-dd}` - anything else is a .NET-style custom date pattern
//!
//! Date tokens are formatted from the source file's creation time (falling
//! back to the modification time) in local time. A token the formatter
//! cannot interpret is left in the path verbatim.

use std::fmt::Write as _;
use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Timelike};

use crate::core::error::{MediaError, Result};

/// Placeholder replaced by the volume root
pub const ROOT_TOKEN: &str = "{ROOT}";

/// Placeholder replaced by the source file name
const FILENAME_TOKEN: &str = "filename";

/// Replace `{ROOT}` with `root` (trailing separators already trimmed)
pub fn substitute_root(template: &str, root: &str) -> String {
    template.replace(ROOT_TOKEN, root)
}

/// Expand `template` for `source_file` into an absolute, normalised path
pub fn expand(template: &str, source_file: &Path) -> Result<PathBuf> {
    let file_name = source_file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut timestamp = None;
    let expanded = expand_tokens(template, |token| {
        if token == FILENAME_TOKEN {
            return Ok(file_name.clone());
        }
        if timestamp.is_none() {
            timestamp = Some(file_timestamp(source_file)?);
        }
        Ok(timestamp
            .as_ref()
            .map(|time| format_timestamp(token, time))
            .unwrap_or_default())
    })?;

    normalize_path(Path::new(&expanded))
}

/// Expand with a known name and time; no filesystem access except the
/// current directory for relative templates.
pub fn expand_with(template: &str, file_name: &str, time: &DateTime<Local>) -> Result<PathBuf> {
    let expanded = expand_tokens(template, |token| {
        Ok(if token == FILENAME_TOKEN {
            file_name.to_string()
        } else {
            format_timestamp(token, time)
        })
    })?;

    normalize_path(Path::new(&expanded))
}

/// Walk `template`, replacing each `{token}` with `replace(token)`.
///
/// `{}` and an unterminated `{` are kept literally.
fn expand_tokens<F>(template: &str, mut replace: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) if close > 0 => {
                output.push_str(&replace(&after[..close])?);
                rest = &after[close + 1..];
            }
            Some(_) => {
                output.push_str("{}");
                rest = &after[1..];
            }
            None => {
                output.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    output.push_str(rest);
    Ok(output)
}

/// Creation time, or modification time where creation is not recorded
fn file_timestamp(path: &Path) -> Result<DateTime<Local>> {
    let metadata = fs::metadata(path).map_err(|e| MediaError::io(path, e))?;
    let time = metadata
        .created()
        .or_else(|_| metadata.modified())
        .map_err(|e| MediaError::io(path, e))?;
    Ok(DateTime::<Local>::from(time))
}

// ===== Date formatting =====

/// Format `time` with a strftime or .NET-style pattern.
///
/// Returns `token` unchanged if it cannot be interpreted.
pub fn format_timestamp(token: &str, time: &DateTime<Local>) -> String {
    let pattern = if token.contains('%') {
        token.to_string()
    } else {
        dotnet_to_strftime(token, time)
    };

    let items: Vec<Item<'_>> = StrftimeItems::new(&pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return token.to_string();
    }

    let mut formatted = String::new();
    match write!(formatted, "{}", time.format_with_items(items.into_iter())) {
        Ok(()) => formatted,
        Err(_) => token.to_string(),
    }
}

/// Translate a .NET custom date/time pattern into strftime syntax.
///
/// Quoted text and backslash escapes become literals. Characters without a
/// meaning are copied as-is. Fractional seconds and the one-letter `t`
/// designator have no strftime equivalent, so they are rendered from `time`
/// directly and emitted as literals.
pub fn dotnet_to_strftime(pattern: &str, time: &DateTime<Local>) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut output = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' || c == '"' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                push_literal(&mut output, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                push_literal(&mut output, next);
            }
            i += 2;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        i += run;

        match (c, run) {
            ('y', 1) => output.push_str("%-y"),
            ('y', 2) => output.push_str("%y"),
            ('y', _) => output.push_str("%Y"),
            ('M', 1) => output.push_str("%-m"),
            ('M', 2) => output.push_str("%m"),
            ('M', 3) => output.push_str("%b"),
            ('M', _) => output.push_str("%B"),
            ('d', 1) => output.push_str("%-d"),
            ('d', 2) => output.push_str("%d"),
            ('d', 3) => output.push_str("%a"),
            ('d', _) => output.push_str("%A"),
            ('h', 1) => output.push_str("%-I"),
            ('h', _) => output.push_str("%I"),
            ('H', 1) => output.push_str("%-H"),
            ('H', _) => output.push_str("%H"),
            ('m', 1) => output.push_str("%-M"),
            ('m', _) => output.push_str("%M"),
            ('s', 1) => output.push_str("%-S"),
            ('s', _) => output.push_str("%S"),
            ('f', _) => push_fraction(&mut output, time, run, false),
            ('F', _) => push_fraction(&mut output, time, run, true),
            ('t', 1) => push_literal(&mut output, if time.hour() < 12 { 'A' } else { 'P' }),
            ('t', _) => output.push_str("%p"),
            ('z', 1 | 2) => output.push_str("%z"),
            ('z', _) | ('K', _) => output.push_str("%:z"),
            _ => (0..run).for_each(|_| push_literal(&mut output, c)),
        }
    }

    output
}

/// First `digits` digits of the second's fraction, truncated.
///
/// With `trim`, trailing zeros are dropped, and an all-zero fraction also
/// drops the `.` before it.
fn push_fraction(output: &mut String, time: &DateTime<Local>, digits: usize, trim: bool) {
    let nanos = format!("{:09}", time.nanosecond() % 1_000_000_000);
    let mut fraction = &nanos[..digits.min(nanos.len())];
    if trim {
        fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() && output.ends_with('.') {
            output.pop();
        }
    }
    output.push_str(fraction);
}

fn push_literal(output: &mut String, c: char) {
    if c == '%' {
        output.push_str("%%");
    } else {
        output.push(c);
    }
}

// ===== Path normalisation =====

/// Make `path` absolute and fold `.` and `..` without touching the disk
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if normalized.parent().is_some() {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2023, 4, 5, 6, 7, 8).unwrap()
    }

    #[test]
    fn test_filename_token() {
        let root = std::env::temp_dir();
        let template = format!("{}/photos/{{filename}}", root.display());
        let path = expand_with(&template, "IMG_0001.JPG", &sample_time()).unwrap();
        assert_eq!(path, root.join("photos").join("IMG_0001.JPG"));
    }

    #[test]
    fn test_dotnet_date_tokens() {
        let time = sample_time();
        assert_eq!(format_timestamp("yyyy", &time), "2023");
        assert_eq!(format_timestamp("yyyy-MM-dd", &time), "2023-04-05");
        assert_eq!(format_timestamp("yy", &time), "23");
        assert_eq!(format_timestamp("HH.mm.ss", &time), "06.07.08");
        assert_eq!(format_timestamp("MMM", &time), "Apr");
        assert_eq!(format_timestamp("MMMM", &time), "April");
        assert_eq!(format_timestamp("dddd", &time), "Wednesday");
        assert_eq!(format_timestamp("M", &time), "4");
    }

    #[test]
    fn test_strftime_tokens() {
        let time = sample_time();
        assert_eq!(format_timestamp("%Y/%m", &time), "2023/04");
        assert_eq!(format_timestamp("%d", &time), "05");
    }

    #[test]
    fn test_quoted_and_escaped_literals() {
        let time = sample_time();
        assert_eq!(format_timestamp("'Year 'yyyy", &time), "Year 2023");
        assert_eq!(format_timestamp("\\yyyyy", &time), "y2023");
        assert_eq!(format_timestamp("'100%'", &time), "100%");
    }

    #[test]
    fn test_unknown_letters_are_literal() {
        assert_eq!(format_timestamp("ROOT", &sample_time()), "ROOT");
    }

    #[test]
    fn test_invalid_strftime_passes_through() {
        assert_eq!(format_timestamp("%Q", &sample_time()), "%Q");
    }

    #[test]
    fn test_translation() {
        let time = sample_time();
        assert_eq!(dotnet_to_strftime("yyyy-MM-dd", &time), "%Y-%m-%d");
        assert_eq!(dotnet_to_strftime("HH:mm:ss.fff", &time), "%H:%M:%S.000");
        assert_eq!(dotnet_to_strftime("hh tt", &time), "%I %p");
    }

    #[test]
    fn test_fractional_seconds_use_exact_digit_count() {
        let time = sample_time().with_nanosecond(123_456_789).unwrap();
        assert_eq!(format_timestamp("ss.f", &time), "08.1");
        assert_eq!(format_timestamp("ss.fff", &time), "08.123");
        assert_eq!(format_timestamp("ss.fffffff", &time), "08.1234567");
        assert_eq!(format_timestamp("ss.FFFF", &time), "08.1234");

        let round = sample_time().with_nanosecond(120_000_000).unwrap();
        assert_eq!(format_timestamp("ss.FFF", &round), "08.12");
        assert_eq!(format_timestamp("ss.FFF", &sample_time()), "08");
        assert_eq!(format_timestamp("ss.fff", &sample_time()), "08.000");
    }

    #[test]
    fn test_single_letter_designator() {
        let morning = sample_time();
        let evening = Local.with_ymd_and_hms(2023, 4, 5, 18, 7, 8).unwrap();
        assert_eq!(format_timestamp("h t", &morning), "6 A");
        assert_eq!(format_timestamp("h t", &evening), "6 P");
        assert_eq!(format_timestamp("h tt", &evening), "6 PM");
    }

    #[test]
    fn test_full_template() {
        let root = std::env::temp_dir();
        let template = format!("{}/{{yyyy}}/{{yyyy-MM-dd}}/{{filename}}", root.display());
        let path = expand_with(&template, "a.jpg", &sample_time()).unwrap();
        assert_eq!(path, root.join("2023").join("2023-04-05").join("a.jpg"));
    }

    #[test]
    fn test_unterminated_and_empty_braces_are_literal() {
        let time = sample_time();
        let root = std::env::temp_dir();

        let path = expand_with(&format!("{}/a{{yyyy", root.display()), "x", &time).unwrap();
        assert_eq!(path, root.join("a{yyyy"));

        let path = expand_with(&format!("{}/b{{}}", root.display()), "x", &time).unwrap();
        assert_eq!(path, root.join("b{}"));
    }

    #[test]
    fn test_expand_uses_file_time() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        fs::write(&file, b"data").unwrap();

        let template = format!("{}/{{yyyy}}/{{filename}}", dir.path().display());
        let path = expand(&template, &file).unwrap();

        let year = DateTime::<Local>::from(fs::metadata(&file).unwrap().modified().unwrap())
            .format("%Y")
            .to_string();
        assert_eq!(path.file_name().unwrap(), "clip.mp4");
        assert_eq!(
            path.parent().unwrap().file_name().unwrap().to_string_lossy(),
            year
        );
    }

    #[test]
    fn test_expand_missing_file_needing_date_fails() {
        let result = expand("/x/{yyyy}/{filename}", Path::new("/definitely/missing.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_filename_only_needs_no_metadata() {
        let path = expand("/x/{filename}", Path::new("/definitely/missing.jpg")).unwrap();
        assert!(path.ends_with("missing.jpg"));
    }

    #[test]
    fn test_normalize_folds_dots() {
        let base = std::env::temp_dir();
        let input = base.join("a").join(".").join("b").join("..").join("c");
        assert_eq!(normalize_path(&input).unwrap(), base.join("a").join("c"));
    }

    #[test]
    fn test_normalize_relative_is_absolute() {
        let path = normalize_path(Path::new("photos/a.jpg")).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("photos/a.jpg"));
    }

    #[test]
    fn test_substitute_root() {
        assert_eq!(
            substitute_root("{ROOT}/DCIM", "/media/card"),
            "/media/card/DCIM"
        );
    }
}
