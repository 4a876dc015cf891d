//! Command-line driver for the `mobuild-sdk` build tasks.
//!
//! Each subcommand runs one task. Values come from CLI flags first, then
//! `mobuild.toml`, then the task's own defaults; the merge happens inside
//! the override function handed to [`run_task`].

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use mobuild_sdk::builders::{
    AndroidPackage, AndroidPackageParams, IosArchive, IosArchiveParams, IosBuild, IosBuildParams,
    RestoreComponents, RestoreParams, SignAndAlign, SignAndAlignParams,
};
use mobuild_sdk::msbuild::MSBUILD_CANDIDATES;
use mobuild_sdk::{FileHandle, MsBuild, Property, SystemInvoker, TaskContext, run_task};

pub mod config;
pub mod logging;

use config::{CONFIG_FILE_NAME, ConfigResolver, MobuildConfig};
use logging::LoggingConfig;

/// Drives Xamarin restore, build, package, sign and archive tools.
#[derive(Parser, Debug)]
#[command(name = "mobuild", author, version, about = "Xamarin mobile build tasks", long_about = None)]
struct Cli {
    /// Print verbose output including all commands
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Log level for mobuild's own events (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to mobuild.toml (default: discovered from the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore the Xamarin components referenced by a project or solution.
    Restore {
        /// Project or solution file
        project: PathBuf,
        #[arg(long, help = "Path to xamarin-component(.exe)")]
        tool: Option<PathBuf>,
    },
    /// Build a Xamarin.iOS project.
    IosBuild(IosBuildArgs),
    /// Package a Xamarin.Android project and report the newest APK.
    AndroidPackage(AndroidPackageArgs),
    /// Sign an APK with jarsigner and align it with zipalign.
    AndroidSign(AndroidSignArgs),
    /// Archive an iOS solution with mdtool.
    IosArchive(IosArchiveArgs),
    /// Write a starter mobuild.toml.
    Init {
        #[arg(long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,
        #[arg(long, help = "Solution name used to derive project paths")]
        name: Option<String>,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct IosBuildArgs {
    #[arg(long, help = "Project file to build")]
    project: Option<PathBuf>,
    #[arg(long, help = "Build target (default: Build)")]
    target: Option<String>,
    #[arg(long, help = "Build configuration (default: Debug)")]
    configuration: Option<String>,
    #[arg(long, help = "Build platform (default: iPhoneSimulator)")]
    platform: Option<String>,
    #[arg(long, help = "Output directory")]
    output_path: Option<PathBuf>,
    #[arg(long, help = "Produce an IPA package")]
    ipa: bool,
    #[arg(long, conflicts_with = "ipa", help = "Do not produce an IPA package")]
    no_ipa: bool,
    #[arg(long = "property", value_name = "NAME=VALUE", value_parser = parse_property)]
    properties: Vec<Property>,
    #[arg(long, help = "Path to msbuild or xbuild")]
    msbuild: Option<PathBuf>,
}

impl IosBuildArgs {
    /// `--ipa` / `--no-ipa`, if either was given.
    fn build_ipa(&self) -> Option<bool> {
        match (self.ipa, self.no_ipa) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Default)]
struct AndroidPackageArgs {
    #[arg(long, help = "Project file to package")]
    project: Option<PathBuf>,
    #[arg(long, help = "Build configuration (default: Release)")]
    configuration: Option<String>,
    #[arg(long, help = "Directory the APK is written to (default: bin/Release)")]
    output_path: Option<PathBuf>,
    #[arg(long = "property", value_name = "NAME=VALUE", value_parser = parse_property)]
    properties: Vec<Property>,
    #[arg(long, help = "Path to msbuild or xbuild")]
    msbuild: Option<PathBuf>,
    #[arg(long, help = "Print the artifact as JSON")]
    json: bool,
}

#[derive(Args, Debug, Default)]
struct AndroidSignArgs {
    /// Unsigned APK to sign
    apk: PathBuf,
    #[arg(long)]
    keystore: Option<PathBuf>,
    #[arg(long)]
    alias: Option<String>,
    #[arg(long, help = "Environment variable holding the keystore password")]
    password_env: Option<String>,
    #[arg(long)]
    jarsigner: Option<String>,
    #[arg(long)]
    zipalign: Option<String>,
    #[arg(long, help = "Print the artifact as JSON")]
    json: bool,
}

#[derive(Args, Debug, Default)]
struct IosArchiveArgs {
    #[arg(long, help = "Solution file to archive")]
    solution: Option<PathBuf>,
    #[arg(long, help = "Project inside the solution")]
    project_name: Option<String>,
    #[arg(long, help = "Configuration|Platform pair (default: Debug|iPhoneSimulator)")]
    configuration: Option<String>,
    #[arg(long)]
    mdtool: Option<PathBuf>,
}

/// Artifact as printed by `android-package` and `android-sign`.
#[derive(Debug, Serialize)]
struct ArtifactReport {
    path: PathBuf,
    modified: Option<String>,
}

impl ArtifactReport {
    fn from_handle(handle: &FileHandle) -> Result<Self> {
        let modified = handle
            .modified()
            .map(|t| OffsetDateTime::from(t).format(&Rfc3339))
            .transpose()
            .context("formatting artifact modification time")?;
        Ok(Self {
            path: handle.path().to_path_buf(),
            modified,
        })
    }

    fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
        } else {
            match &self.modified {
                Some(modified) => println!("{} (modified {})", self.path.display(), modified),
                None => println!("{}", self.path.display()),
            }
        }
        Ok(())
    }
}

pub fn run() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    logging::init_logging(LoggingConfig::from_flags(
        cli.verbose,
        cli.log_level.as_deref(),
        cli.log_json,
    ));

    let config_path = cli.config;
    let load_config = || -> Result<ConfigResolver> {
        let resolver = ConfigResolver::new(config_path.as_deref())?;
        if let Some(path) = &resolver.config_path {
            tracing::debug!(path = %path.display(), "loaded configuration");
        }
        Ok(resolver)
    };
    let invoker = SystemInvoker;

    match cli.command {
        Command::Restore { project, tool } => {
            let resolver = load_config()?;
            let tool = resolver.resolve(tool, |c| c.tools.component.clone());
            let unused = idle_builder(&invoker);
            let ctx = TaskContext::new(&invoker, &unused);
            run_task(
                &RestoreComponents::new(&project),
                |p| RestoreParams {
                    tool_path: tool.or(p.tool_path),
                },
                &ctx,
            )
            .with_context(|| format!("restoring components for {:?}", project))?;
            println!("Restored components for {}", project.display());
        }
        Command::IosBuild(args) => {
            let resolver = load_config()?;
            let msbuild = locate_msbuild(&resolver, args.msbuild.as_deref(), &invoker)?;
            let ctx = TaskContext::new(&invoker, &msbuild);
            let config = resolver.config();
            run_task(&IosBuild, |p| ios_build_params(args, &config, p), &ctx)
                .context("iOS build failed")?;
            println!("iOS build succeeded");
        }
        Command::AndroidPackage(args) => {
            let resolver = load_config()?;
            let msbuild = locate_msbuild(&resolver, args.msbuild.as_deref(), &invoker)?;
            let ctx = TaskContext::new(&invoker, &msbuild);
            let config = resolver.config();
            let json = args.json;
            let apk = run_task(
                &AndroidPackage,
                |p| android_package_params(args, &config, p),
                &ctx,
            )
            .context("Android packaging failed")?;
            ArtifactReport::from_handle(&apk)?.print(json)?;
        }
        Command::AndroidSign(args) => {
            let resolver = load_config()?;
            let unused = idle_builder(&invoker);
            let ctx = TaskContext::new(&invoker, &unused);
            let config = resolver.config();
            let password_env = args
                .password_env
                .clone()
                .unwrap_or_else(|| resolver.password_env());
            let password = std::env::var(&password_env).unwrap_or_default();
            if password.is_empty() {
                tracing::warn!(var = %password_env, "keystore password variable is not set");
            }
            let task = SignAndAlign::new(FileHandle::new(&args.apk));
            let json = args.json;
            let aligned = run_task(
                &task,
                |p| sign_params(args, &config, password, p),
                &ctx,
            )
            .with_context(|| format!("signing {:?}", task.apk().path()))?;
            ArtifactReport::from_handle(&aligned)?.print(json)?;
        }
        Command::IosArchive(args) => {
            let resolver = load_config()?;
            let unused = idle_builder(&invoker);
            let ctx = TaskContext::new(&invoker, &unused);
            let config = resolver.config();
            run_task(&IosArchive, |p| ios_archive_params(args, &config, p), &ctx)
                .context("iOS archive failed")?;
            println!("iOS archive succeeded");
        }
        Command::Init {
            output,
            name,
            force,
        } => cmd_init(&output, name.as_deref(), force)?,
    }

    Ok(())
}

/// Project builder for tasks that never build projects; nothing is located
/// and it is never invoked.
fn idle_builder(invoker: &SystemInvoker) -> MsBuild<'_> {
    MsBuild::new(MSBUILD_CANDIDATES[0], invoker)
}

fn locate_msbuild<'a>(
    resolver: &ConfigResolver,
    cli: Option<&Path>,
    invoker: &'a SystemInvoker,
) -> Result<MsBuild<'a>> {
    let explicit = resolver.resolve(cli.map(Path::to_path_buf), |c| c.tools.msbuild.clone());
    let msbuild = MsBuild::locate(explicit.as_deref(), invoker)?;
    tracing::debug!(tool = msbuild.tool(), "using project builder");
    Ok(msbuild)
}

/// Config-file properties first, then the ones given on the command line.
fn merged_properties(from_config: &[config::PropertyEntry], cli: Vec<Property>) -> Vec<Property> {
    from_config.iter().map(Property::from).chain(cli).collect()
}

fn ios_build_params(args: IosBuildArgs, config: &MobuildConfig, p: IosBuildParams) -> IosBuildParams {
    let ios = &config.ios;
    let build_ipa = args.build_ipa();
    IosBuildParams {
        project_path: args.project.or_else(|| ios.project.clone()).unwrap_or(p.project_path),
        target: args.target.or_else(|| ios.target.clone()).unwrap_or(p.target),
        configuration: args
            .configuration
            .or_else(|| ios.configuration.clone())
            .unwrap_or(p.configuration),
        platform: args.platform.or_else(|| ios.platform.clone()).unwrap_or(p.platform),
        output_path: args.output_path.or_else(|| ios.output_path.clone()).or(p.output_path),
        build_ipa: build_ipa.or(ios.build_ipa).unwrap_or(p.build_ipa),
        properties: merged_properties(&ios.properties, args.properties),
    }
}

fn android_package_params(
    args: AndroidPackageArgs,
    config: &MobuildConfig,
    p: AndroidPackageParams,
) -> AndroidPackageParams {
    let android = &config.android;
    AndroidPackageParams {
        project_path: args
            .project
            .or_else(|| android.project.clone())
            .unwrap_or(p.project_path),
        configuration: args
            .configuration
            .or_else(|| android.configuration.clone())
            .unwrap_or(p.configuration),
        output_path: args
            .output_path
            .or_else(|| android.output_path.clone())
            .unwrap_or(p.output_path),
        properties: merged_properties(&android.properties, args.properties),
    }
}

fn sign_params(
    args: AndroidSignArgs,
    config: &MobuildConfig,
    password: String,
    p: SignAndAlignParams,
) -> SignAndAlignParams {
    SignAndAlignParams {
        keystore_path: args
            .keystore
            .or_else(|| config.signing.keystore.clone())
            .unwrap_or(p.keystore_path),
        keystore_password: password,
        keystore_alias: args
            .alias
            .or_else(|| config.signing.alias.clone())
            .unwrap_or(p.keystore_alias),
        jarsigner_path: args
            .jarsigner
            .or_else(|| config.tools.jarsigner.clone())
            .unwrap_or(p.jarsigner_path),
        zipalign_path: args
            .zipalign
            .or_else(|| config.tools.zipalign.clone())
            .unwrap_or(p.zipalign_path),
        ..p
    }
}

fn ios_archive_params(
    args: IosArchiveArgs,
    config: &MobuildConfig,
    p: IosArchiveParams,
) -> IosArchiveParams {
    let archive = &config.archive;
    IosArchiveParams {
        solution_path: args
            .solution
            .or_else(|| archive.solution.clone())
            .unwrap_or(p.solution_path),
        project_name: args
            .project_name
            .or_else(|| archive.project_name.clone())
            .unwrap_or(p.project_name),
        configuration: args
            .configuration
            .or_else(|| archive.configuration.clone())
            .unwrap_or(p.configuration),
        mdtool_path: args
            .mdtool
            .or_else(|| config.tools.mdtool.clone())
            .unwrap_or(p.mdtool_path),
        ..p
    }
}

/// Parses a `NAME=VALUE` build property. The value may be empty or contain
/// further `=` characters.
fn parse_property(raw: &str) -> Result<Property> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("property name is empty in {:?}", raw);
    }
    Ok(Property::new(name, value))
}

fn cmd_init(output: &Path, name: Option<&str>, force: bool) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => default_solution_name()?,
    };
    if !force {
        ensure_can_write(output)?;
    } else if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory {:?}", parent))?;
    }
    write_file(output, MobuildConfig::generate_starter_toml(&name).as_bytes())?;
    println!("Wrote {}", output.display());
    Ok(())
}

/// Name of the current directory, used when `init` is not given one.
fn default_solution_name() -> Result<String> {
    let cwd = std::env::current_dir().context("resolving current directory")?;
    Ok(cwd
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("App")
        .to_string())
}

/// Loads `.env.local` then `.env` from the current directory or a parent.
/// Variables already set in the environment are kept.
fn load_dotenv() {
    for name in [".env.local", ".env"] {
        let _ = dotenvy::from_filename(name);
    }
}

fn ensure_can_write(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("refusing to overwrite existing file: {:?}", path);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory {:?}", parent))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("writing file {:?}", path))
}
