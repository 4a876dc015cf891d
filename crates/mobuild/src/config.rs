//! Configuration file support for mobuild.
//!
//! `mobuild.toml` persists project paths and tool locations so they do not
//! have to be passed on every invocation.
//!
//! ## Configuration File Location
//!
//! The file is searched for in the current working directory and then in
//! each parent directory, stopping at the repository root (a directory
//! containing `.git`) or the filesystem root.
//!
//! ## Precedence
//!
//! CLI flag, then config file, then the task's built-in default.
//!
//! ## Example Configuration
//!
//! ```toml
//! [tools]
//! msbuild = "/Library/Frameworks/Mono.framework/Commands/msbuild"
//!
//! [ios]
//! project = "App.iOS/App.iOS.csproj"
//! configuration = "Release"
//! platform = "iPhone"
//! build_ipa = true
//!
//! [[ios.properties]]
//! name = "CodesignKey"
//! value = "iPhone Distribution"
//!
//! [android]
//! project = "App.Droid/App.Droid.csproj"
//! output_path = "App.Droid/bin/Release"
//!
//! [signing]
//! keystore = "release.keystore"
//! alias = "release"
//! password_env = "MOBUILD_KEYSTORE_PASSWORD"
//!
//! [archive]
//! solution = "App.sln"
//! project_name = "App.iOS"
//! configuration = "Release|iPhone"
//! ```

use anyhow::{Context, Result};
use mobuild_sdk::Property;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "mobuild.toml";

/// Environment variable holding the keystore password unless configured
/// otherwise.
pub const DEFAULT_PASSWORD_ENV: &str = "MOBUILD_KEYSTORE_PASSWORD";

/// Root configuration structure for `mobuild.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MobuildConfig {
    /// Locations of external tools.
    pub tools: ToolsConfig,

    /// iOS build defaults.
    pub ios: IosConfig,

    /// Android packaging defaults.
    pub android: AndroidConfig,

    /// APK signing settings.
    pub signing: SigningConfig,

    /// iOS archive defaults.
    pub archive: ArchiveConfig,
}

/// Tool locations. Unset entries fall back to the task defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// MSBuild-compatible tool (`msbuild` or `xbuild` on PATH if unset).
    pub msbuild: Option<PathBuf>,
    /// Xamarin component tool.
    pub component: Option<PathBuf>,
    pub jarsigner: Option<String>,
    pub zipalign: Option<String>,
    pub mdtool: Option<PathBuf>,
}

/// One extra build property.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PropertyEntry {
    pub name: String,
    pub value: String,
}

impl From<&PropertyEntry> for Property {
    fn from(entry: &PropertyEntry) -> Self {
        Property::new(&entry.name, &entry.value)
    }
}

/// iOS build configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IosConfig {
    pub project: Option<PathBuf>,
    pub target: Option<String>,
    pub configuration: Option<String>,
    pub platform: Option<String>,
    pub output_path: Option<PathBuf>,
    pub build_ipa: Option<bool>,
    /// Extra properties, in order.
    pub properties: Vec<PropertyEntry>,
}

/// Android packaging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AndroidConfig {
    pub project: Option<PathBuf>,
    pub configuration: Option<String>,
    pub output_path: Option<PathBuf>,
    /// Extra properties, in order.
    pub properties: Vec<PropertyEntry>,
}

/// APK signing configuration.
///
/// The password itself is never stored in the file; `password_env` names
/// the environment variable it is read from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub keystore: Option<PathBuf>,
    pub alias: Option<String>,
    pub password_env: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            keystore: None,
            alias: None,
            password_env: DEFAULT_PASSWORD_ENV.to_string(),
        }
    }
}

/// iOS archive configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub solution: Option<PathBuf>,
    pub project_name: Option<String>,
    pub configuration: Option<String>,
}

impl MobuildConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: MobuildConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Finds and loads `mobuild.toml` from the current directory or a parent.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Like [`discover`](Self::discover), starting from `start_dir`.
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Generates a commented starter configuration for a solution.
    ///
    /// Project paths are derived from the solution name following the usual
    /// Xamarin layout (`<Name>.iOS/<Name>.iOS.csproj`,
    /// `<Name>.Droid/<Name>.Droid.csproj`).
    pub fn generate_starter_toml(solution_name: &str) -> String {
        format!(
            r#"# mobuild configuration file
# CLI flags override these settings when provided.

[tools]
# MSBuild-compatible tool (default: msbuild, then xbuild, on PATH)
# msbuild = "/Library/Frameworks/Mono.framework/Commands/msbuild"

# Xamarin component tool (default: tools/xpkg/**/xamarin-component.exe, then PATH)
# component = "tools/xpkg/xamarin-component.exe"

# jarsigner = "jarsigner"
# zipalign = "zipalign"
# mdtool = "/Applications/Xamarin Studio.app/Contents/MacOS/mdtool"

[ios]
project = "{name}.iOS/{name}.iOS.csproj"
# target = "Build"
configuration = "Debug"
platform = "iPhoneSimulator"
build_ipa = false
# output_path = "{name}.iOS/bin/iPhoneSimulator/Debug"

# Extra MSBuild properties, passed after Configuration/Platform/BuildIpa
# [[ios.properties]]
# name = "CodesignKey"
# value = "iPhone Distribution"

[android]
project = "{name}.Droid/{name}.Droid.csproj"
configuration = "Release"
output_path = "{name}.Droid/bin/Release"

[signing]
# keystore = "release.keystore"
# alias = "release"

# Environment variable holding the keystore password (also read from .env)
password_env = "{password_env}"

[archive]
solution = "{name}.sln"
# project_name = "{name}.iOS"
configuration = "Debug|iPhoneSimulator"
"#,
            name = solution_name,
            password_env = DEFAULT_PASSWORD_ENV,
        )
    }
}

/// Merges config file values with CLI arguments.
///
/// CLI arguments always take precedence over config file values; when
/// neither is set the caller keeps the task default.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration, if any.
    pub config: Option<MobuildConfig>,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Loads `explicit` if given, otherwise discovers `mobuild.toml`.
    pub fn new(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self {
                config: Some(MobuildConfig::load_from_file(path)?),
                config_path: Some(path.to_path_buf()),
            });
        }

        match MobuildConfig::discover()? {
            Some((config, path)) => Ok(Self {
                config: Some(config),
                config_path: Some(path),
            }),
            None => Ok(Self::default()),
        }
    }

    /// Picks the CLI value, else the config value.
    pub fn resolve<T>(
        &self,
        cli: Option<T>,
        from_config: impl FnOnce(&MobuildConfig) -> Option<T>,
    ) -> Option<T> {
        cli.or_else(|| self.config.as_ref().and_then(from_config))
    }

    /// Returns the loaded configuration or the defaults.
    pub fn config(&self) -> MobuildConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Environment variable the keystore password is read from.
    pub fn password_env(&self) -> String {
        self.config
            .as_ref()
            .map(|c| c.signing.password_env.clone())
            .unwrap_or_else(|| DEFAULT_PASSWORD_ENV.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MobuildConfig::default();
        assert!(config.tools.msbuild.is_none());
        assert!(config.ios.properties.is_empty());
        assert_eq!(config.signing.password_env, DEFAULT_PASSWORD_ENV);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

        let toml_content = r#"
[tools]
msbuild = "/usr/bin/xbuild"
zipalign = "/opt/android/build-tools/zipalign"

[ios]
project = "App.iOS/App.iOS.csproj"
configuration = "Release"
build_ipa = true

[[ios.properties]]
name = "CodesignKey"
value = "iPhone Distribution"

[[ios.properties]]
name = "MtouchUseLlvm"
value = "true"

[android]
project = "App.Droid/App.Droid.csproj"

[signing]
keystore = "release.keystore"
alias = "release"
password_env = "RELEASE_PW"
"#;
        std::fs::write(&config_path, toml_content).unwrap();

        let config = MobuildConfig::load_from_file(&config_path).unwrap();

        assert_eq!(config.tools.msbuild, Some(PathBuf::from("/usr/bin/xbuild")));
        assert_eq!(
            config.tools.zipalign.as_deref(),
            Some("/opt/android/build-tools/zipalign")
        );
        assert_eq!(config.ios.configuration.as_deref(), Some("Release"));
        assert_eq!(config.ios.build_ipa, Some(true));
        let names: Vec<_> = config.ios.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["CodesignKey", "MtouchUseLlvm"]);
        assert_eq!(
            config.android.project,
            Some(PathBuf::from("App.Droid/App.Droid.csproj"))
        );
        assert_eq!(config.signing.alias.as_deref(), Some("release"));
        assert_eq!(config.signing.password_env, "RELEASE_PW");
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[ios\nproject = ").unwrap();

        let err = MobuildConfig::load_from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[archive]\nsolution = \"App.sln\"\n",
        )
        .unwrap();
        let nested = temp_dir.path().join("App.iOS/Resources");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = MobuildConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.archive.solution, Some(PathBuf::from("App.sln")));
        assert_eq!(path, temp_dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_discover_no_config() {
        let temp_dir = TempDir::new().unwrap();
        // Create a .git directory to stop the search
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let result = MobuildConfig::discover_from(temp_dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_config_resolver_precedence() {
        let mut config = MobuildConfig::default();
        config.ios.configuration = Some("Release".to_string());
        let resolver = ConfigResolver {
            config: Some(config),
            config_path: None,
        };

        // CLI value takes precedence
        let result = resolver.resolve(Some("AppStore".to_string()), |c| c.ios.configuration.clone());
        assert_eq!(result.as_deref(), Some("AppStore"));

        // Config value used when CLI is None
        let result = resolver.resolve(None, |c| c.ios.configuration.clone());
        assert_eq!(result.as_deref(), Some("Release"));

        // Neither: caller keeps the task default
        let result = resolver.resolve(None, |c| c.ios.platform.clone());
        assert_eq!(result, None);
    }

    #[test]
    fn test_generate_starter_toml_parses() {
        let toml = MobuildConfig::generate_starter_toml("Weather");
        assert!(toml.contains("project = \"Weather.iOS/Weather.iOS.csproj\""));
        assert!(toml.contains("solution = \"Weather.sln\""));

        let config: MobuildConfig = toml::from_str(&toml).unwrap();
        assert_eq!(
            config.android.output_path,
            Some(PathBuf::from("Weather.Droid/bin/Release"))
        );
        assert_eq!(config.ios.build_ipa, Some(false));
        assert_eq!(config.signing.password_env, DEFAULT_PASSWORD_ENV);
    }
}
