use std::borrow::Cow;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use compio::{fs::File, io::AsyncReadExt, io::BufReader};
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::ext::PathDisplayExt;
use crate::filesystem::IgnoreFilter;
use crate::render::DisplayOrder;
use crate::scm::ScmKind;

const SETTINGS_FILE_NAME: &str = "scmtree.yaml";

type YamlMap<'a> = LinkedHashMap<Yaml<'a>, Yaml<'a>>;

fn get_settings_file_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE_NAME)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTreeSettings {
    pub ignore_suffixes: Vec<String>,
    pub ignore_directories: Vec<String>,
    pub display_order: DisplayOrder,
    pub hide_dot_files: bool,
    pub use_unicode: bool,
}

impl Default for SourceTreeSettings {
    fn default() -> Self {
        Self {
            ignore_suffixes: ["swp", "swn", "swo", "pyc", "o"].map(String::from).to_vec(),
            ignore_directories: [".git", ".scmtree"].map(String::from).to_vec(),
            display_order: DisplayOrder::Alphabetic,
            hide_dot_files: true,
            use_unicode: true,
        }
    }
}

impl SourceTreeSettings {
    pub fn ignore_filter(&self) -> IgnoreFilter {
        IgnoreFilter::new(
            self.ignore_suffixes.iter().cloned(),
            self.ignore_directories.iter().cloned(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScmSettings {
    /// Empty means every supported engine.
    pub enabled_scms: Vec<ScmKind>,
    pub preferred_scm: Option<ScmKind>,
    pub poll_period: Duration,
    /// `None` turns remote checks off.
    pub remote_poll_period: Option<Duration>,
    pub number_history_items: usize,
}

impl Default for ScmSettings {
    fn default() -> Self {
        Self {
            enabled_scms: vec![ScmKind::Git],
            preferred_scm: Some(ScmKind::Git),
            poll_period: Duration::from_secs(36),
            remote_poll_period: Some(Duration::from_secs(300)),
            number_history_items: 10,
        }
    }
}

impl ScmSettings {
    pub fn is_enabled(&self, kind: ScmKind) -> bool {
        self.enabled_scms.is_empty() || self.enabled_scms.contains(&kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSettings {
    pub render_period: Duration,
    pub rescan_period: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            render_period: Duration::from_millis(500),
            rescan_period: Duration::from_secs(30),
            shutdown_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub source_tree: SourceTreeSettings,
    pub scm: ScmSettings,
    pub ui: UiSettings,
}

impl Settings {
    /// Reads `scmtree.yaml` from `root`, falling back to defaults when the
    /// project has none.
    pub async fn read(root: &Path) -> Result<Self, SettingsCreationError> {
        let path = get_settings_file_path(root);
        if !path.exists() {
            info!(
                "No {} in {}, using default settings",
                SETTINGS_FILE_NAME,
                root.best_effort_display()
            );
            return Ok(Self::default());
        }
        Self::from_path(path).await
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, SettingsCreationError> {
        debug!("Opening settings file: {}", path.best_effort_display());
        let file = File::open(&path).await.context(ReadSnafu {
            file_path: path.best_effort_display(),
        })?;

        let cursor = Cursor::new(file);
        let mut reader = BufReader::new(cursor);
        let res = reader.read_to_string(String::new()).await;
        match res.0 {
            Ok(n) => debug!("Successfully read settings file: {n} bytes"),
            Err(source) => {
                return Err(source).context(ReadSnafu {
                    file_path: path.best_effort_display(),
                });
            }
        }
        res.1.as_str().try_into()
    }

    fn parse_source_tree(section: &YamlMap<'_>) -> SourceTreeSettings {
        let defaults = SourceTreeSettings::default();
        note_unknown_keys(
            section,
            "source_tree",
            &[
                "ignore_suffixes",
                "ignore_directories",
                "display_order",
                "hide_dot_files",
                "use_unicode",
            ],
        );

        SourceTreeSettings {
            ignore_suffixes: read_value(
                section,
                "source_tree",
                "ignore_suffixes",
                defaults.ignore_suffixes,
                string_list,
            ),
            ignore_directories: read_value(
                section,
                "source_tree",
                "ignore_directories",
                defaults.ignore_directories,
                string_list,
            ),
            display_order: read_value(
                section,
                "source_tree",
                "display_order",
                defaults.display_order,
                |value| value.as_str().and_then(DisplayOrder::from_name),
            ),
            hide_dot_files: read_value(
                section,
                "source_tree",
                "hide_dot_files",
                defaults.hide_dot_files,
                Yaml::as_bool,
            ),
            use_unicode: read_value(
                section,
                "source_tree",
                "use_unicode",
                defaults.use_unicode,
                Yaml::as_bool,
            ),
        }
    }

    fn parse_scm(section: &YamlMap<'_>) -> ScmSettings {
        let defaults = ScmSettings::default();
        note_unknown_keys(
            section,
            "scm",
            &[
                "enabled_scms",
                "preferred_scm",
                "poll_period",
                "remote_poll_period",
                "number_history_items",
            ],
        );

        ScmSettings {
            enabled_scms: read_value(
                section,
                "scm",
                "enabled_scms",
                defaults.enabled_scms,
                |value| {
                    string_list(value).map(|names| {
                        names
                            .iter()
                            .filter_map(|name| {
                                let kind = ScmKind::from_name(name);
                                if kind.is_none() {
                                    warn!("Ignoring unsupported SCM '{}'", name);
                                }
                                kind
                            })
                            .collect()
                    })
                },
            ),
            preferred_scm: read_value(
                section,
                "scm",
                "preferred_scm",
                defaults.preferred_scm,
                |value| value.as_str().and_then(ScmKind::from_name).map(Some),
            ),
            poll_period: read_value(
                section,
                "scm",
                "poll_period",
                defaults.poll_period,
                |value| seconds(value).filter(|period| !period.is_zero()),
            ),
            remote_poll_period: read_value(
                section,
                "scm",
                "remote_poll_period",
                defaults.remote_poll_period,
                |value| seconds(value).map(|period| Some(period).filter(|p| !p.is_zero())),
            ),
            number_history_items: read_value(
                section,
                "scm",
                "number_history_items",
                defaults.number_history_items,
                |value| {
                    value
                        .as_integer()
                        .and_then(|count| usize::try_from(count).ok())
                        .filter(|count| *count > 0)
                },
            ),
        }
    }

    fn parse_ui(section: &YamlMap<'_>) -> UiSettings {
        let defaults = UiSettings::default();
        note_unknown_keys(
            section,
            "ui",
            &["render_period_ms", "rescan_period", "shutdown_timeout_ms"],
        );

        UiSettings {
            render_period: read_value(
                section,
                "ui",
                "render_period_ms",
                defaults.render_period,
                |value| milliseconds(value).filter(|period| !period.is_zero()),
            ),
            rescan_period: read_value(
                section,
                "ui",
                "rescan_period",
                defaults.rescan_period,
                |value| seconds(value).filter(|period| !period.is_zero()),
            ),
            shutdown_timeout: read_value(
                section,
                "ui",
                "shutdown_timeout_ms",
                defaults.shutdown_timeout,
                milliseconds,
            ),
        }
    }
}

impl TryFrom<&str> for Settings {
    type Error = SettingsCreationError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents)
            .map_err(|e| SettingsCreationError::ParseError { source: e })?;
        let Some(document) = documents.first() else {
            return Ok(Settings::default());
        };
        if document.is_null() {
            return Ok(Settings::default());
        }

        let top_level = document
            .as_mapping()
            .ok_or(SettingsCreationError::TopLevelNotMap)?;
        note_unknown_keys(top_level, "top level", &["source_tree", "scm", "ui"]);

        let empty = YamlMap::new();
        Ok(Settings {
            source_tree: Self::parse_source_tree(
                section(top_level, "source_tree")?.unwrap_or(&empty),
            ),
            scm: Self::parse_scm(section(top_level, "scm")?.unwrap_or(&empty)),
            ui: Self::parse_ui(section(top_level, "ui")?.unwrap_or(&empty)),
        })
    }
}

fn key(name: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

fn section<'m, 'a>(
    top_level: &'m YamlMap<'a>,
    name: &'static str,
) -> Result<Option<&'m YamlMap<'a>>, SettingsCreationError> {
    match top_level.get(&key(name)) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(value) => value
            .as_mapping()
            .map(Some)
            .context(SectionNotMapSnafu { section: name }),
    }
}

fn read_value<'a, T>(
    section: &YamlMap<'a>,
    section_name: &'static str,
    name: &'static str,
    default: T,
    convert: impl FnOnce(&Yaml<'a>) -> Option<T>,
) -> T {
    match section.get(&key(name)) {
        None => default,
        Some(value) => match convert(value) {
            Some(parsed) => parsed,
            None => {
                warn!(
                    "Invalid value for '{}.{}': {:?}, using the default",
                    section_name, name, value
                );
                default
            }
        },
    }
}

fn note_unknown_keys(section: &YamlMap<'_>, section_name: &str, known: &[&str]) {
    for name in section.keys() {
        match name.as_str() {
            Some(name) if known.contains(&name) => {}
            _ => debug!("Ignoring unknown key {:?} in {}", name, section_name),
        }
    }
}

fn string_list(value: &Yaml<'_>) -> Option<Vec<String>> {
    value
        .as_sequence()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn seconds(value: &Yaml<'_>) -> Option<Duration> {
    let seconds = u64::try_from(value.as_integer()?).ok()?;
    Some(Duration::from_secs(seconds))
}

fn milliseconds(value: &Yaml<'_>) -> Option<Duration> {
    let millis = u64::try_from(value.as_integer()?).ok()?;
    Some(Duration::from_millis(millis))
}

#[derive(Debug, Snafu)]
pub enum SettingsCreationError {
    #[snafu(display("Failed to read the settings file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the settings file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of the settings file should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Section '{}' should be a map", section))]
    SectionNotMap { section: String },
}
