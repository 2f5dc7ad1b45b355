/// Disabling startup entries.
use crate::command;
use crate::error::ActionError;
use crate::platform::Platform;
use crate::scanner::startup::{
    entry_group_lines, AUTOSTART_ENABLED_KEY, DESKTOP_ENTRY_GROUP, DESKTOP_SUFFIX,
};
use std::path::Path;
use tracing::info;

const RUN_KEY_SUFFIX: &str = "\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Run";

/// Disable the startup entry called `name` found at `location`.
///
/// Linux rewrites the matching `.desktop` file in the `location` directory
/// with `X-GNOME-Autostart-enabled=false`. Windows deletes the value from the
/// per-user or machine-wide `Run` key; other locations (startup folders,
/// other users' hives) are not supported.
pub fn disable_startup_item(name: &str, location: &str, platform: Platform) -> Result<(), ActionError> {
    match platform {
        Platform::Linux => disable_desktop_entry(name, Path::new(location)),
        Platform::Windows => {
            let key = run_key_for(location).ok_or(ActionError::Unsupported(
                "startup entries outside the HKCU/HKLM Run keys",
            ))?;
            command::run("reg", &["delete", &key, "/v", name, "/f"])?;
            info!(%name, %key, "Removed startup registry value");
            Ok(())
        }
        Platform::MacOs | Platform::Unknown => Err(ActionError::Unsupported("startup items")),
    }
}

/// Registry key path for a `Win32_StartupCommand` location, when it is one
/// of the two `Run` keys this tool can edit.
pub fn run_key_for(location: &str) -> Option<String> {
    let (hive, rest) = location.split_once('\\')?;
    let hive = hive.to_ascii_uppercase();
    if !matches!(hive.as_str(), "HKCU" | "HKLM") {
        return None;
    }
    let suffix = format!("\\{rest}");
    suffix
        .eq_ignore_ascii_case(RUN_KEY_SUFFIX)
        .then(|| format!("{hive}{RUN_KEY_SUFFIX}"))
}

fn disable_desktop_entry(name: &str, dir: &Path) -> Result<(), ActionError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ActionError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let wanted = format!("Name={name}");

    let mut candidates: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(DESKTOP_SUFFIX))
        .collect();
    candidates.sort();

    for path in candidates {
        let content = std::fs::read_to_string(&path).map_err(|source| ActionError::Io {
            path: path.clone(),
            source,
        })?;
        if !entry_group_lines(&content).any(|l| l == wanted) {
            continue;
        }

        let rewritten = with_autostart_disabled(&content);
        std::fs::write(&path, rewritten).map_err(|source| match source.kind() {
            std::io::ErrorKind::PermissionDenied => {
                ActionError::PermissionDenied(path.display().to_string())
            }
            _ => ActionError::Io {
                path: path.clone(),
                source,
            },
        })?;
        info!(%name, path = %path.display(), "Disabled autostart entry");
        return Ok(());
    }

    Err(ActionError::NotFound(format!(
        "startup item '{name}' in {}",
        dir.display()
    )))
}

/// Set the GNOME autostart switch to `false` in the `[Desktop Entry]` group,
/// adding it after that group's last non-blank line when absent.
fn with_autostart_disabled(content: &str) -> String {
    let prefix = format!("{AUTOSTART_ENABLED_KEY}=");
    let disabled = format!("{prefix}false");
    let mut lines: Vec<String> = Vec::new();
    let mut in_entry = true;
    let mut replaced = false;
    let mut insert_at = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_entry = trimmed == DESKTOP_ENTRY_GROUP;
        }
        if in_entry && line.starts_with(&prefix) {
            lines.push(disabled.clone());
            replaced = true;
        } else {
            lines.push(line.to_string());
        }
        if in_entry && !trimmed.is_empty() {
            insert_at = Some(lines.len());
        }
    }

    if !replaced {
        match insert_at {
            Some(at) => lines.insert(at, disabled),
            None => lines.push(disabled),
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
