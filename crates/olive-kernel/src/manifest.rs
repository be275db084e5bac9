//! Parser for `.oman` app manifests.
//!
//! The format is INI-like:
//!
//! ```text
//! # comment
//! // also a comment
//! @#[app]
//! id = "olive.terminal.ox"
//! name = Terminal
//!
//! @#[ui]
//! width = 640
//! invisible = false
//! ```
//!
//! Parsing is a single pass over lines with the current section as the only
//! state. Recognized sections are `app`, `runtime`, `ui` and `sources`.
//! Unknown sections and keys are kept as warnings; lines that are neither
//! headers, comments nor `key = value` pairs are errors, as are values of
//! the wrong type.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors produced while parsing a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("line {line}: expected `key = value`, found {text:?}")]
    MalformedLine { line: usize, text: String },

    #[error("line {line}: malformed section header {text:?}")]
    MalformedSection { line: usize, text: String },

    #[error("line {line}: `{key}` appears before any section header")]
    KeyOutsideSection { line: usize, key: String },

    #[error("line {line}: invalid value {value:?} for {section}.{key}: expected {expected}")]
    InvalidValue {
        line: usize,
        section: String,
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Non-fatal findings while parsing a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestWarning {
    UnknownSection { line: usize, name: String },
    UnknownKey { line: usize, section: String, key: String },
}

impl fmt::Display for ManifestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSection { line, name } => {
                write!(f, "line {line}: unknown section [{name}] ignored")
            }
            Self::UnknownKey { line, section, key } => {
                write!(f, "line {line}: unknown key {section}.{key} ignored")
            }
        }
    }
}

/// A window dimension: a pixel count or any other CSS length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Dimension {
    Pixels(u32),
    Css(String),
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pixels(px) => write!(f, "{px}px"),
            Self::Css(css) => f.write_str(css),
        }
    }
}

/// How the desktop presents an app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    #[default]
    Windowed,
    /// Runs without a taskbar icon.
    Background,
}

/// `[app]`: identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSection {
    pub id: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

/// `[runtime]`: where the app's files live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSection {
    pub working_directory: Option<String>,
}

/// `[ui]`: window geometry and behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiSection {
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub min_width: Option<Dimension>,
    pub min_height: Option<Dimension>,
    pub max_width: Option<Dimension>,
    pub max_height: Option<Dimension>,
    pub resizable: Option<bool>,
    pub fullscreen: Option<bool>,
    pub window_type: Option<WindowType>,
    pub invisible: bool,
}

/// `[sources]`: named app files, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSources {
    pub entries: Vec<(String, String)>,
}

impl AppSources {
    /// The first source that is an HTML document.
    pub fn first_html(&self) -> Option<&str> {
        self.entries
            .iter()
            .map(|(_, v)| v.as_str())
            .find(|v| v.to_ascii_lowercase().ends_with(".html"))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A parsed manifest (`@manifest.oman` or `@app.oman`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppManifest {
    pub app: AppSection,
    pub runtime: RuntimeSection,
    pub ui: UiSection,
    pub sources: AppSources,
    pub warnings: Vec<ManifestWarning>,
}

impl AppManifest {
    /// Parse manifest text.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut manifest = AppManifest::default();
        let mut section: Option<Section> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
                continue;
            }

            if trimmed.starts_with("@#[") {
                let name = parse_header(line, trimmed)?;
                section = Some(match Section::from_name(&name) {
                    Some(s) => s,
                    None => {
                        manifest
                            .warnings
                            .push(ManifestWarning::UnknownSection { line, name: name.clone() });
                        Section::Unknown(name)
                    }
                });
                continue;
            }

            let content = strip_inline_comment(trimmed);
            if content.is_empty() {
                continue;
            }
            let Some((key, value)) = content.split_once('=') else {
                return Err(ManifestError::MalformedLine {
                    line,
                    text: trimmed.to_string(),
                });
            };
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                return Err(ManifestError::MalformedLine {
                    line,
                    text: trimmed.to_string(),
                });
            }
            let value = unquote(value.trim());

            let Some(current) = &section else {
                return Err(ManifestError::KeyOutsideSection { line, key });
            };
            let entry = Entry {
                line,
                section: current.name(),
                key: &key,
                value,
            };
            match current {
                Section::App => manifest.apply_app(entry),
                Section::Runtime => manifest.apply_runtime(entry),
                Section::Ui => manifest.apply_ui(entry)?,
                Section::Sources => manifest
                    .sources
                    .entries
                    .push((key.clone(), value.to_string())),
                Section::Unknown(_) => {}
            }
        }

        Ok(manifest)
    }

    fn warn_unknown_key(&mut self, entry: &Entry<'_>) {
        self.warnings.push(ManifestWarning::UnknownKey {
            line: entry.line,
            section: entry.section.to_string(),
            key: entry.key.to_string(),
        });
    }

    fn apply_app(&mut self, entry: Entry<'_>) {
        let value = Some(entry.value.to_string());
        match entry.key {
            "id" => self.app.id = value,
            "name" => self.app.name = value,
            "icon" => self.app.icon = value,
            "version" => self.app.version = value,
            "description" => self.app.description = value,
            _ => self.warn_unknown_key(&entry),
        }
    }

    fn apply_runtime(&mut self, entry: Entry<'_>) {
        match entry.key {
            "working_directory" => {
                self.runtime.working_directory = Some(entry.value.to_string());
            }
            _ => self.warn_unknown_key(&entry),
        }
    }

    fn apply_ui(&mut self, entry: Entry<'_>) -> Result<(), ManifestError> {
        let ui = &mut self.ui;
        match entry.key {
            "width" => ui.width = Some(entry.dimension()?),
            "height" => ui.height = Some(entry.dimension()?),
            "min_width" => ui.min_width = Some(entry.dimension()?),
            "min_height" => ui.min_height = Some(entry.dimension()?),
            "max_width" => ui.max_width = Some(entry.dimension()?),
            "max_height" => ui.max_height = Some(entry.dimension()?),
            "resizable" => ui.resizable = Some(entry.boolean()?),
            "fullscreen" => ui.fullscreen = Some(entry.boolean()?),
            "invisible" => ui.invisible = entry.boolean()?,
            "type" => {
                ui.window_type = Some(match entry.value.to_ascii_lowercase().as_str() {
                    "windowed" => WindowType::Windowed,
                    "background" => WindowType::Background,
                    _ => return Err(entry.invalid("`windowed` or `background`")),
                })
            }
            _ => self.warn_unknown_key(&entry),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    App,
    Runtime,
    Ui,
    Sources,
    Unknown(String),
}

impl Section {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "app" => Some(Self::App),
            "runtime" => Some(Self::Runtime),
            "ui" => Some(Self::Ui),
            "sources" => Some(Self::Sources),
            _ => None,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::App => "app",
            Self::Runtime => "runtime",
            Self::Ui => "ui",
            Self::Sources => "sources",
            Self::Unknown(name) => name,
        }
    }
}

struct Entry<'a> {
    line: usize,
    section: &'a str,
    key: &'a str,
    value: &'a str,
}

impl Entry<'_> {
    fn invalid(&self, expected: &'static str) -> ManifestError {
        ManifestError::InvalidValue {
            line: self.line,
            section: self.section.to_string(),
            key: self.key.to_string(),
            value: self.value.to_string(),
            expected,
        }
    }

    fn boolean(&self) -> Result<bool, ManifestError> {
        match self.value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(self.invalid("true, false, 1 or 0")),
        }
    }

    fn dimension(&self) -> Result<Dimension, ManifestError> {
        let value = self.value;
        if let Ok(px) = value.parse::<u32>() {
            return Ok(Dimension::Pixels(px));
        }
        let number_end = value
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(value.len());
        let (number, unit) = value.split_at(number_end);
        let known_unit = matches!(unit, "px" | "%" | "vw" | "vh" | "em" | "rem");
        if known_unit && number.parse::<f64>().is_ok() {
            return Ok(Dimension::Css(value.to_string()));
        }
        Err(self.invalid("a pixel count or a CSS length"))
    }
}

fn parse_header(line: usize, text: &str) -> Result<String, ManifestError> {
    text.strip_prefix("@#[")
        .and_then(|rest| rest.split_once(']'))
        .map(|(name, _)| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ManifestError::MalformedSection {
            line,
            text: text.to_string(),
        })
}

/// Drop a trailing ` # comment`. A `#` glued to a value (`#fff`) is kept.
fn strip_inline_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'#') if i > 0 && bytes[i - 1].is_ascii_whitespace() => {
                return line[..i].trim_end();
            }
            _ => {}
        }
    }
    line
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2
            && let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TERMINAL: &str = r#"
# Terminal manifest
@#[app]
id = "olive.terminal.ox"
name = Terminal   # shown in the taskbar
icon = /source/assets/term.png

@#[runtime]
working_directory = /source/app/

// geometry
@#[UI]
width = 640
height = 80%
min_width = 300
resizable = true
type = windowed
"#;

    #[test]
    fn test_parse_full_manifest() {
        let m = AppManifest::parse(TERMINAL).unwrap();
        assert_eq!(m.app.id.as_deref(), Some("olive.terminal.ox"));
        assert_eq!(m.app.name.as_deref(), Some("Terminal"));
        assert_eq!(m.app.icon.as_deref(), Some("/source/assets/term.png"));
        assert_eq!(m.runtime.working_directory.as_deref(), Some("/source/app/"));
        assert_eq!(m.ui.width, Some(Dimension::Pixels(640)));
        assert_eq!(m.ui.height, Some(Dimension::Css("80%".to_string())));
        assert_eq!(m.ui.min_width, Some(Dimension::Pixels(300)));
        assert_eq!(m.ui.resizable, Some(true));
        assert_eq!(m.ui.window_type, Some(WindowType::Windowed));
        assert!(!m.ui.invisible);
        assert!(m.warnings.is_empty());
    }

    #[rstest]
    #[case("true", true)]
    #[case("1", true)]
    #[case("\"TRUE\"", true)]
    #[case("false", false)]
    #[case("0", false)]
    fn test_invisible_values(#[case] value: &str, #[case] expected: bool) {
        let m = AppManifest::parse(&format!("@#[ui]\ninvisible = {value}")).unwrap();
        assert_eq!(m.ui.invisible, expected);
    }

    #[test]
    fn test_unknown_sections_and_keys_warn() {
        let m = AppManifest::parse("@#[app]\ncolour = red\n@#[extras]\nfoo = bar\n").unwrap();
        assert_eq!(
            m.warnings,
            vec![
                ManifestWarning::UnknownKey {
                    line: 2,
                    section: "app".to_string(),
                    key: "colour".to_string()
                },
                ManifestWarning::UnknownSection {
                    line: 3,
                    name: "extras".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let err = AppManifest::parse("@#[app]\nthis is not a pair\n").unwrap_err();
        assert_eq!(
            err,
            ManifestError::MalformedLine {
                line: 2,
                text: "this is not a pair".to_string()
            }
        );
    }

    #[test]
    fn test_key_before_section_is_an_error() {
        let err = AppManifest::parse("name = x\n").unwrap_err();
        assert!(matches!(err, ManifestError::KeyOutsideSection { line: 1, .. }));
    }

    #[rstest]
    #[case("@#[]")]
    #[case("@#[app")]
    fn test_malformed_headers(#[case] header: &str) {
        let err = AppManifest::parse(header).unwrap_err();
        assert!(matches!(err, ManifestError::MalformedSection { .. }));
    }

    #[rstest]
    #[case("width = wide")]
    #[case("width = 10furlongs")]
    #[case("resizable = maybe")]
    #[case("type = floating")]
    fn test_invalid_values(#[case] line: &str) {
        let err = AppManifest::parse(&format!("@#[ui]\n{line}")).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidValue { line: 2, .. }));
    }

    #[test]
    fn test_sources_keep_order() {
        let m = AppManifest::parse(
            "@#[sources]\nscript = /index.js\npage = /index.html\nother = /about.html\n",
        )
        .unwrap();
        assert_eq!(m.sources.first_html(), Some("/index.html"));
        assert_eq!(m.sources.get("script"), Some("/index.js"));
    }

    #[test]
    fn test_hash_inside_value_is_kept() {
        let m = AppManifest::parse("@#[app]\ndescription = \"colour #fff\" # trailing\n").unwrap();
        assert_eq!(m.app.description.as_deref(), Some("colour #fff"));
    }

    #[test]
    fn test_crlf_lines() {
        let m = AppManifest::parse("@#[app]\r\nname = Notes\r\n").unwrap();
        assert_eq!(m.app.name.as_deref(), Some("Notes"));
    }
}
