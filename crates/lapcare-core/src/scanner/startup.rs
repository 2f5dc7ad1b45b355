/// Startup (login) item discovery.
///
/// Linux reads XDG autostart `.desktop` files; Windows queries
/// `Win32_StartupCommand` through PowerShell and parses its CSV export.
use crate::command;
use crate::error::ScanError;
use crate::model::StartupItem;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

pub const DESKTOP_SUFFIX: &str = ".desktop";
pub const AUTOSTART_ENABLED_KEY: &str = "X-GNOME-Autostart-enabled";
pub const DESKTOP_ENTRY_GROUP: &str = "[Desktop Entry]";

const WINDOWS_STARTUP_QUERY: &str = "Get-CimInstance Win32_StartupCommand | \
     Select-Object Name, Command, Location | ConvertTo-Csv -NoTypeInformation";

/// Parse a `.desktop` entry. Returns `None` for entries marked `Hidden=true`.
///
/// `fallback_name` (the file stem) is used when the entry has no `Name=`.
pub fn parse_desktop_entry(content: &str, fallback_name: &str, location: &str) -> Option<StartupItem> {
    let mut name = None;
    let mut command = None;
    let mut enabled = true;

    for line in entry_group_lines(content) {
        if let Some(value) = line.strip_prefix("Name=") {
            name = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("Exec=") {
            command = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("Hidden=") {
            if value.trim().eq_ignore_ascii_case("true") {
                return None;
            }
        } else if let Some(value) = line
            .strip_prefix(AUTOSTART_ENABLED_KEY)
            .and_then(|rest| rest.strip_prefix('='))
        {
            enabled = value.trim().eq_ignore_ascii_case("true");
        }
    }

    Some(StartupItem {
        name: name.unwrap_or_else(|| fallback_name.to_string()),
        command: command.unwrap_or_default(),
        enabled,
        location: location.to_string(),
    })
}

/// Lines of the `[Desktop Entry]` group, plus any lines before the first
/// group header. `[Desktop Action …]` and other groups are skipped.
pub(crate) fn entry_group_lines(content: &str) -> impl Iterator<Item = &str> + '_ {
    let mut in_entry = true;
    content.lines().filter(move |line| {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_entry = trimmed == DESKTOP_ENTRY_GROUP;
            return false;
        }
        in_entry
    })
}

/// Collect autostart entries from each directory in order. Missing
/// directories are ignored; unreadable files are logged and skipped.
pub fn list_desktop_entries<P: AsRef<Path>>(dirs: &[P]) -> Vec<StartupItem> {
    let mut items = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref();
        let Ok(read_dir) = std::fs::read_dir(dir) else {
            debug!("Autostart dir {} not readable; skipping", dir.display());
            continue;
        };

        let mut paths: Vec<_> = read_dir
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(DESKTOP_SUFFIX))
            })
            .collect();
        paths.sort();

        let location = dir.to_string_lossy();
        for path in paths {
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(err) => {
                    warn!("Failed to read {}: {err}", path.display());
                    continue;
                }
            };
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some(item) = parse_desktop_entry(&content, &stem, &location) {
                items.push(item);
            }
        }
    }
    items
}

#[derive(Deserialize)]
struct StartupRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Command", default)]
    command: String,
    #[serde(rename = "Location", default)]
    location: String,
}

/// Parse the CSV export of `Win32_StartupCommand` (header row included).
pub fn parse_startup_csv(output: &str) -> Result<Vec<StartupItem>, ScanError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(output.trim_start().as_bytes());

    reader
        .deserialize::<StartupRow>()
        .map(|row| {
            let row = row.map_err(|e| ScanError::Parse(format!("startup CSV: {e}")))?;
            Ok(StartupItem {
                name: row.name,
                command: row.command,
                enabled: true,
                location: row.location,
            })
        })
        .collect()
}

/// Query startup commands on Windows.
pub fn list_windows_startup_items() -> Result<Vec<StartupItem>, ScanError> {
    let out = command::powershell(WINDOWS_STARTUP_QUERY)?;
    parse_startup_csv(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn desktop_entry_fields() {
        let item = parse_desktop_entry(
            "[Desktop Entry]\nName=Syncer\nExec=/usr/bin/syncer --tray\nX-GNOME-Autostart-enabled=false\n",
            "syncer",
            "/etc/xdg/autostart",
        )
        .unwrap();
        assert_eq!(item.name, "Syncer");
        assert_eq!(item.command, "/usr/bin/syncer --tray");
        assert!(!item.enabled);
        assert_eq!(item.location, "/etc/xdg/autostart");
    }

    #[test]
    fn hidden_entry_is_dropped_and_name_falls_back() {
        assert!(parse_desktop_entry("Name=X\nHidden=true\n", "x", "/a").is_none());
        let item = parse_desktop_entry("Exec=foo\n", "foo-autostart", "/a").unwrap();
        assert_eq!(item.name, "foo-autostart");
        assert!(item.enabled);
    }

    #[test]
    fn lists_only_desktop_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.desktop"), "Name=Bee\nExec=bee\n").unwrap();
        fs::write(tmp.path().join("a.desktop"), "Name=Ay\nExec=ay\n").unwrap();
        fs::write(tmp.path().join("notes.txt"), "Name=Nope\n").unwrap();
        let missing = tmp.path().join("missing");

        let items = list_desktop_entries(&[tmp.path().to_path_buf(), missing]);
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Ay", "Bee"]);
    }

    #[test]
    fn parses_windows_csv_export() {
        let out = "\r\n\"Name\",\"Command\",\"Location\"\r\n\
                   \"OneDrive\",\"\"\"C:\\Program Files\\OneDrive.exe\"\" /background\",\"HKU\\S-1-5-21\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Run\"\r\n\
                   \"Tool\",\"tool.exe\",\"Startup\"\r\n";
        let items = parse_startup_csv(out).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "OneDrive");
        assert_eq!(items[0].command, "\"C:\\Program Files\\OneDrive.exe\" /background");
        assert_eq!(items[1].location, "Startup");
        assert!(items.iter().all(|i| i.enabled));
    }
}
