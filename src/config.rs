//! Configuration handling for tuginspect

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tuginspect_core::error::{InspectError, InspectResult};

use crate::render::RendererKind;

/// Directory holding project-local settings.
pub const CONFIG_DIR: &str = ".tuginspect";

/// tuginspect configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Inspection settings
    #[serde(default)]
    pub inspection: InspectionConfig,
}

/// Core inspection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionConfig {
    /// Language ids whose documents are inspected and rendered
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Quiet period before derivative UI is rebuilt after an edit
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Renderer switches
    #[serde(default)]
    pub renderer: RendererSettings,
}

/// One switch per renderer kind.
///
/// A kind is enabled when its switch is `true`. When no switch is `true`
/// the default set is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guttericons: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codelenses: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rulerhighlights: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<bool>,
}

fn default_languages() -> Vec<String> {
    vec!["java".to_string()]
}

fn default_debounce_ms() -> u64 {
    150
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            debounce_ms: default_debounce_ms(),
            renderer: RendererSettings::default(),
        }
    }
}

impl InspectionConfig {
    /// Whether documents of `language_id` are handled at all.
    pub fn accepts(&self, language_id: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(language_id))
    }
}

impl RendererSettings {
    /// Renderers used when nothing is switched on.
    pub const DEFAULT_KINDS: [RendererKind; 3] = [
        RendererKind::Diagnostics,
        RendererKind::CodeLenses,
        RendererKind::RulerHighlights,
    ];

    fn flag(&self, kind: RendererKind) -> Option<bool> {
        match kind {
            RendererKind::Diagnostics => self.diagnostics,
            RendererKind::GutterIcons => self.guttericons,
            RendererKind::CodeLenses => self.codelenses,
            RendererKind::RulerHighlights => self.rulerhighlights,
            RendererKind::Comments => self.comments,
        }
    }

    /// Settings with exactly `kinds` switched on.
    pub fn only(kinds: &[RendererKind]) -> Self {
        let on = |kind| kinds.contains(&kind).then_some(true);
        RendererSettings {
            diagnostics: on(RendererKind::Diagnostics),
            guttericons: on(RendererKind::GutterIcons),
            codelenses: on(RendererKind::CodeLenses),
            rulerhighlights: on(RendererKind::RulerHighlights),
            comments: on(RendererKind::Comments),
        }
    }

    /// The enabled renderer kinds, in fixed kind order.
    pub fn enabled_kinds(&self) -> Vec<RendererKind> {
        let enabled: Vec<RendererKind> = RendererKind::ALL
            .into_iter()
            .filter(|kind| self.flag(*kind) == Some(true))
            .collect();
        if enabled.is_empty() {
            return Self::DEFAULT_KINDS.to_vec();
        }
        enabled
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> InspectResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| InspectError::Config(format!("failed to read config file: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> InspectResult<Self> {
        toml::from_str(content)
            .map_err(|e| InspectError::Config(format!("failed to parse config file: {}", e)))
    }

    /// Load configuration from .tuginspect/config.toml in the given project root
    pub fn load_from_project(project_root: &Path) -> InspectResult<Self> {
        let config_path = Self::project_path(project_root);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn project_path(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_DIR).join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    mod defaults {
        use super::*;

        #[test]
        fn default_config_targets_java() {
            let config = Config::default();
            assert_eq!(config.inspection.languages, ["java"]);
            assert_eq!(config.inspection.debounce_ms, 150);
            assert!(config.inspection.accepts("java"));
            assert!(!config.inspection.accepts("python"));
        }

        #[test]
        fn no_switches_enable_default_renderers() {
            let kinds = RendererSettings::default().enabled_kinds();
            assert_eq!(
                kinds,
                [
                    RendererKind::Diagnostics,
                    RendererKind::CodeLenses,
                    RendererKind::RulerHighlights
                ]
            );
        }

        #[test]
        fn switches_all_off_also_fall_back() {
            let settings = RendererSettings {
                diagnostics: Some(false),
                comments: Some(false),
                ..Default::default()
            };
            assert_eq!(settings.enabled_kinds(), RendererSettings::DEFAULT_KINDS);
        }

        #[test]
        fn explicit_switches_replace_defaults() {
            let settings = RendererSettings {
                comments: Some(true),
                guttericons: Some(true),
                diagnostics: Some(false),
                ..Default::default()
            };
            assert_eq!(
                settings.enabled_kinds(),
                [RendererKind::GutterIcons, RendererKind::Comments]
            );
        }

        #[test]
        fn only_round_trips_through_enabled_kinds() {
            let kinds = [RendererKind::Comments, RendererKind::RulerHighlights];
            assert_eq!(
                RendererSettings::only(&kinds).enabled_kinds(),
                [RendererKind::RulerHighlights, RendererKind::Comments]
            );
        }
    }

    mod loading {
        use super::*;

        #[test]
        fn missing_project_config_uses_defaults() {
            let dir = TempDir::new().unwrap();
            let config = Config::load_from_project(dir.path()).unwrap();
            assert_eq!(config.inspection.debounce_ms, 150);
        }

        #[test]
        fn project_config_is_read() {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
            fs::write(
                Config::project_path(dir.path()),
                r#"
[inspection]
languages = ["java", "kotlin"]
debounce_ms = 40

[inspection.renderer]
comments = true
rulerhighlights = true
"#,
            )
            .unwrap();

            let config = Config::load_from_project(dir.path()).unwrap();
            assert!(config.inspection.accepts("kotlin"));
            assert_eq!(config.inspection.debounce_ms, 40);
            assert_eq!(
                config.inspection.renderer.enabled_kinds(),
                [RendererKind::RulerHighlights, RendererKind::Comments]
            );
        }

        #[test]
        fn partial_config_fills_defaults() {
            let config = Config::parse("[inspection]\ndebounce_ms = 5\n").unwrap();
            assert_eq!(config.inspection.languages, ["java"]);
            assert_eq!(config.inspection.renderer, RendererSettings::default());
        }

        #[test]
        fn malformed_config_is_a_config_error() {
            let err = Config::parse("[inspection\n").unwrap_err();
            assert!(matches!(err, InspectError::Config(_)));
        }
    }
}
