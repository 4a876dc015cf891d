//! Android build automation
//!
//! [`AndroidPackage`] packages a Xamarin.Android project into an APK and
//! returns the newest one it finds; [`SignAndAlign`] signs that APK with
//! `jarsigner` and aligns it with `zipalign`.

use std::path::{Path, PathBuf};

use super::common::{Task, TaskContext, Validated, reject_dedicated, require};
use crate::artifact::{FileHandle, latest_artifact};
use crate::msbuild::ProjectBuild;
use crate::process::{CommandLine, QuoteStyle, run_checked};
use crate::types::{BuildError, Property};

/// Build target that produces the APK.
pub const PACKAGE_TARGET: &str = "PackageForAndroid";
/// Pattern of the files [`AndroidPackage`] looks for.
pub const APK_PATTERN: &str = "*.apk";

pub const UNSIGNED_SUFFIX: &str = ".apk";
pub const SIGNED_SUFFIX: &str = "-Signed.apk";
pub const ALIGNED_SUFFIX: &str = "-SignedAndAligned.apk";

/// Properties owned by dedicated [`AndroidPackageParams`] fields.
pub const ANDROID_DEDICATED_PROPERTIES: &[&str] = &["Configuration"];

/// Parameters for [`AndroidPackage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidPackageParams {
    /// Project to package. Required.
    pub project_path: PathBuf,
    /// Build configuration (default: `Release`).
    pub configuration: String,
    /// Where the APK is written and then looked for (default: `bin/Release`).
    pub output_path: PathBuf,
    /// Extra properties, passed after `Configuration`.
    pub properties: Vec<Property>,
}

/// Packages a Xamarin.Android project and returns the produced APK.
#[derive(Debug, Clone, Copy, Default)]
pub struct AndroidPackage;

impl Task for AndroidPackage {
    type Params = AndroidPackageParams;
    type Output = FileHandle;
    const NAME: &'static str = "android-package";

    fn defaults(&self) -> AndroidPackageParams {
        AndroidPackageParams {
            project_path: PathBuf::new(),
            configuration: "Release".to_string(),
            output_path: PathBuf::from("bin/Release"),
            properties: Vec::new(),
        }
    }

    fn validate(
        &self,
        params: AndroidPackageParams,
    ) -> Result<Validated<AndroidPackageParams>, BuildError> {
        require(Self::NAME, "project_path", &params.project_path.to_string_lossy())?;
        reject_dedicated(Self::NAME, &params.properties, ANDROID_DEDICATED_PROPERTIES)?;
        Ok(Validated::new(params))
    }

    fn execute(
        &self,
        params: &Validated<AndroidPackageParams>,
        ctx: &TaskContext<'_>,
    ) -> Result<FileHandle, BuildError> {
        let mut properties = vec![Property::new("Configuration", &params.configuration)];
        properties.extend(params.properties.iter().cloned());

        ctx.projects.build_projects(&ProjectBuild {
            output_path: Some(params.output_path.clone()),
            target: PACKAGE_TARGET.to_string(),
            properties,
            projects: vec![params.project_path.clone()],
        })?;

        latest_artifact(&params.output_path, APK_PATTERN)
    }
}

/// Parameters for [`SignAndAlign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignAndAlignParams {
    pub keystore_path: PathBuf,
    pub keystore_password: String,
    pub keystore_alias: String,
    /// Signing tool (default: `jarsigner` on `PATH`).
    pub jarsigner_path: String,
    /// Alignment tool (default: `zipalign` on `PATH`).
    pub zipalign_path: String,
    /// Quote character around path arguments (default: host convention).
    pub quote_style: QuoteStyle,
}

/// Signs an APK and zip-aligns the signed copy.
///
/// `foo.apk` is signed into `foo-Signed.apk`, which is aligned into
/// `foo-SignedAndAligned.apk`. Nothing is cleaned up on failure: if
/// alignment fails, `foo-Signed.apk` stays on disk.
#[derive(Debug, Clone)]
pub struct SignAndAlign {
    apk: FileHandle,
}

impl SignAndAlign {
    pub fn new(apk: FileHandle) -> Self {
        Self { apk }
    }

    pub fn apk(&self) -> &FileHandle {
        &self.apk
    }

    fn signed_path(&self) -> Result<PathBuf, BuildError> {
        self.apk
            .with_suffix_replaced(UNSIGNED_SUFFIX, SIGNED_SUFFIX)
            .ok_or_else(|| BuildError::UnexpectedArtifact {
                path: self.apk.path().to_path_buf(),
                expected: UNSIGNED_SUFFIX,
            })
    }

    pub fn sign_command(
        params: &SignAndAlignParams,
        input: &FileHandle,
        signed: &Path,
    ) -> CommandLine {
        CommandLine::new(&params.jarsigner_path)
            .quote_style(params.quote_style)
            .args(["-sigalg", "SHA1withRSA", "-digestalg", "SHA1"])
            .arg("-keystore")
            .path(&params.keystore_path)
            .arg("-storepass")
            .secret(&params.keystore_password)
            .arg("-signedjar")
            .path(signed)
            .path(input.path())
            .quoted(&params.keystore_alias)
    }

    pub fn align_command(params: &SignAndAlignParams, signed: &Path, aligned: &Path) -> CommandLine {
        CommandLine::new(&params.zipalign_path)
            .quote_style(params.quote_style)
            .args(["-f", "-v", "4"])
            .path(signed)
            .path(aligned)
    }
}

impl Task for SignAndAlign {
    type Params = SignAndAlignParams;
    type Output = FileHandle;
    const NAME: &'static str = "android-sign-and-align";

    fn defaults(&self) -> SignAndAlignParams {
        SignAndAlignParams {
            keystore_path: PathBuf::new(),
            keystore_password: String::new(),
            keystore_alias: String::new(),
            jarsigner_path: "jarsigner".to_string(),
            zipalign_path: "zipalign".to_string(),
            quote_style: QuoteStyle::host(),
        }
    }

    fn validate(
        &self,
        params: SignAndAlignParams,
    ) -> Result<Validated<SignAndAlignParams>, BuildError> {
        require(Self::NAME, "keystore_path", &params.keystore_path.to_string_lossy())?;
        require(Self::NAME, "keystore_password", &params.keystore_password)?;
        require(Self::NAME, "keystore_alias", &params.keystore_alias)?;
        self.signed_path()?;
        Ok(Validated::new(params))
    }

    fn execute(
        &self,
        params: &Validated<SignAndAlignParams>,
        ctx: &TaskContext<'_>,
    ) -> Result<FileHandle, BuildError> {
        let signed = self.signed_path()?;
        run_checked(ctx.process, &Self::sign_command(params, &self.apk, &signed))?;

        let aligned = FileHandle::new(&signed)
            .with_suffix_replaced(SIGNED_SUFFIX, ALIGNED_SUFFIX)
            .ok_or_else(|| BuildError::UnexpectedArtifact {
                path: signed.clone(),
                expected: SIGNED_SUFFIX,
            })?;

        if let Err(e) = run_checked(ctx.process, &Self::align_command(params, &signed, &aligned)) {
            tracing::warn!(
                signed = %signed.display(),
                "alignment failed; signed intermediate left in place"
            );
            return Err(e);
        }

        Ok(FileHandle::new(aligned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::common::run_task;
    use crate::msbuild::testing::RecordingBuilder;
    use crate::process::split_args;
    use crate::process::testing::RecordingInvoker;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn keystore(p: SignAndAlignParams) -> SignAndAlignParams {
        SignAndAlignParams {
            keystore_path: PathBuf::from("/keys/release.keystore"),
            keystore_password: "s3cret".to_string(),
            keystore_alias: "release".to_string(),
            quote_style: QuoteStyle::Single,
            ..p
        }
    }

    fn touch(path: &Path, age_secs: u64) {
        let file = File::create(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_android_package_returns_newest_apk() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bin/Release");
        std::fs::create_dir_all(&out).unwrap();
        touch(&out.join("a.apk"), 100);
        touch(&out.join("b.apk"), 5);

        let invoker = RecordingInvoker::succeeding();
        let builder = RecordingBuilder::default();
        let ctx = TaskContext::new(&invoker, &builder);

        let apk = run_task(
            &AndroidPackage,
            |p| AndroidPackageParams {
                project_path: PathBuf::from("App.Droid.csproj"),
                output_path: out.clone(),
                properties: vec![Property::new("AndroidKeyStore", "false")],
                ..p
            },
            &ctx,
        )
        .unwrap();

        assert_eq!(apk.file_name(), Some("b.apk"));
        let request = &builder.requests()[0];
        assert_eq!(request.target, PACKAGE_TARGET);
        assert_eq!(request.output_path, Some(out));
        assert_eq!(
            request.properties,
            vec![
                Property::new("Configuration", "Release"),
                Property::new("AndroidKeyStore", "false"),
            ]
        );
    }

    #[test]
    fn test_android_package_without_output_fails() {
        let dir = TempDir::new().unwrap();
        let invoker = RecordingInvoker::succeeding();
        let builder = RecordingBuilder::default();
        let ctx = TaskContext::new(&invoker, &builder);

        let err = run_task(
            &AndroidPackage,
            |p| AndroidPackageParams {
                project_path: PathBuf::from("App.Droid.csproj"),
                output_path: dir.path().to_path_buf(),
                ..p
            },
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::NoArtifact { .. }));
    }

    #[test]
    fn test_android_package_validation() {
        let invoker = RecordingInvoker::succeeding();
        let builder = RecordingBuilder::default();
        let ctx = TaskContext::new(&invoker, &builder);

        let err = run_task(&AndroidPackage, |p| p, &ctx).unwrap_err();
        assert!(matches!(err, BuildError::MissingField { field: "project_path", .. }));

        let err = run_task(
            &AndroidPackage,
            |p| AndroidPackageParams {
                project_path: PathBuf::from("App.Droid.csproj"),
                properties: vec![Property::new("CONFIGURATION", "Debug")],
                ..p
            },
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BuildError::PropertyCollision {
                field: "Configuration",
                ..
            }
        ));
        assert!(builder.requests().is_empty());
    }

    #[test]
    fn test_android_package_builder_failure_skips_discovery() {
        let invoker = RecordingInvoker::succeeding();
        let builder = RecordingBuilder {
            fail_with: Some(1),
            ..Default::default()
        };
        let ctx = TaskContext::new(&invoker, &builder);

        let err = run_task(
            &AndroidPackage,
            |p| AndroidPackageParams {
                project_path: PathBuf::from("App.Droid.csproj"),
                output_path: PathBuf::from("/nonexistent/out"),
                ..p
            },
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Process { .. }));
    }

    #[test]
    fn test_sign_and_align_chain() {
        let invoker = RecordingInvoker::succeeding();
        let builder = RecordingBuilder::default();
        let ctx = TaskContext::new(&invoker, &builder);
        let task = SignAndAlign::new(FileHandle::new("/out/foo.apk"));

        let result = run_task(&task, keystore, &ctx).unwrap();

        assert_eq!(result.path(), Path::new("/out/foo-SignedAndAligned.apk"));
        let calls = invoker.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "jarsigner");
        assert_eq!(
            calls[0].1,
            "-sigalg SHA1withRSA -digestalg SHA1 -keystore '/keys/release.keystore' \
             -storepass 's3cret' -signedjar '/out/foo-Signed.apk' '/out/foo.apk' 'release'"
        );
        assert_eq!(calls[1].0, "zipalign");
        assert_eq!(
            calls[1].1,
            "-f -v 4 '/out/foo-Signed.apk' '/out/foo-SignedAndAligned.apk'"
        );
    }

    #[test]
    fn test_sign_and_align_double_quotes() {
        let invoker = RecordingInvoker::succeeding();
        let builder = RecordingBuilder::default();
        let ctx = TaskContext::new(&invoker, &builder);
        let task = SignAndAlign::new(FileHandle::new("/my out/foo.apk"));

        run_task(
            &task,
            |p| SignAndAlignParams {
                quote_style: QuoteStyle::Double,
                ..keystore(p)
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(
            invoker.calls()[1].1,
            "-f -v 4 \"/my out/foo-Signed.apk\" \"/my out/foo-SignedAndAligned.apk\""
        );
    }

    #[test]
    fn test_sign_and_align_requires_keystore_fields() {
        let cases: [(&str, fn(SignAndAlignParams) -> SignAndAlignParams); 3] = [
            ("keystore_path", |p| SignAndAlignParams {
                keystore_path: PathBuf::new(),
                ..keystore(p)
            }),
            ("keystore_password", |p| SignAndAlignParams {
                keystore_password: String::new(),
                ..keystore(p)
            }),
            ("keystore_alias", |p| SignAndAlignParams {
                keystore_alias: String::new(),
                ..keystore(p)
            }),
        ];

        for (expected, overrides) in cases {
            let invoker = RecordingInvoker::succeeding();
            let builder = RecordingBuilder::default();
            let ctx = TaskContext::new(&invoker, &builder);
            let task = SignAndAlign::new(FileHandle::new("/out/foo.apk"));

            let err = run_task(&task, overrides, &ctx).unwrap_err();
            match err {
                BuildError::MissingField { field, .. } => assert_eq!(field, expected),
                other => panic!("unexpected error: {other}"),
            }
            assert!(invoker.calls().is_empty());
        }
    }

    #[test]
    fn test_sign_and_align_rejects_non_apk_input() {
        let invoker = RecordingInvoker::succeeding();
        let builder = RecordingBuilder::default();
        let ctx = TaskContext::new(&invoker, &builder);
        let task = SignAndAlign::new(FileHandle::new("/out/foo.zip"));

        let err = run_task(&task, keystore, &ctx).unwrap_err();
        assert!(matches!(err, BuildError::UnexpectedArtifact { .. }));
        assert!(invoker.calls().is_empty());
    }

    #[test]
    fn test_sign_failure_stops_before_align() {
        let invoker = RecordingInvoker::failing(1);
        let builder = RecordingBuilder::default();
        let ctx = TaskContext::new(&invoker, &builder);
        let task = SignAndAlign::new(FileHandle::new("/out/foo.apk"));

        let err = run_task(&task, keystore, &ctx).unwrap_err();
        match err {
            BuildError::Process { program, status } => {
                assert_eq!(program, "jarsigner");
                assert_eq!(status, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(invoker.calls().len(), 1);
    }

    #[test]
    fn test_align_failure_reports_zipalign() {
        let invoker = RecordingInvoker::scripted(&[0, 2]);
        let builder = RecordingBuilder::default();
        let ctx = TaskContext::new(&invoker, &builder);
        let task = SignAndAlign::new(FileHandle::new("/out/foo.apk"));

        let err = run_task(&task, keystore, &ctx).unwrap_err();
        match err {
            BuildError::Process { program, status } => {
                assert_eq!(program, "zipalign");
                assert_eq!(status, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(invoker.calls().len(), 2);
    }

    #[test]
    fn test_sign_keeps_spaced_password_and_alias_whole() {
        for style in [QuoteStyle::Single, QuoteStyle::Double] {
            let invoker = RecordingInvoker::succeeding();
            let builder = RecordingBuilder::default();
            let ctx = TaskContext::new(&invoker, &builder);
            let task = SignAndAlign::new(FileHandle::new("/out/foo.apk"));

            run_task(
                &task,
                |p| SignAndAlignParams {
                    keystore_password: "correct horse".to_string(),
                    keystore_alias: "release key".to_string(),
                    quote_style: style,
                    ..keystore(p)
                },
                &ctx,
            )
            .unwrap();

            assert_eq!(
                split_args(&invoker.calls()[0].1),
                vec![
                    "-sigalg",
                    "SHA1withRSA",
                    "-digestalg",
                    "SHA1",
                    "-keystore",
                    "/keys/release.keystore",
                    "-storepass",
                    "correct horse",
                    "-signedjar",
                    "/out/foo-Signed.apk",
                    "/out/foo.apk",
                    "release key",
                ]
            );
        }
    }

    #[test]
    fn test_sign_and_align_path_with_apostrophe() {
        let invoker = RecordingInvoker::succeeding();
        let builder = RecordingBuilder::default();
        let ctx = TaskContext::new(&invoker, &builder);
        let task = SignAndAlign::new(FileHandle::new("/home/o'brien/foo.apk"));

        let result = run_task(&task, keystore, &ctx).unwrap();
        assert_eq!(
            result.path(),
            Path::new("/home/o'brien/foo-SignedAndAligned.apk")
        );

        let calls = invoker.calls();
        let sign_argv = split_args(&calls[0].1);
        assert_eq!(
            &sign_argv[sign_argv.len() - 3..],
            ["/home/o'brien/foo-Signed.apk", "/home/o'brien/foo.apk", "release"]
        );
        assert_eq!(
            split_args(&calls[1].1),
            vec![
                "-f",
                "-v",
                "4",
                "/home/o'brien/foo-Signed.apk",
                "/home/o'brien/foo-SignedAndAligned.apk",
            ]
        );
    }
}
