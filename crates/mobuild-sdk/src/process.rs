//! The process boundary.
//!
//! Every external tool is reached through [`ProcessInvoker`]: a program path
//! plus one flat argument string in, an exit status out. Tasks build their
//! arguments as a structured [`CommandLine`] and only serialize it to that
//! flat string at the boundary, so quoting happens in exactly one place.
//!
//! ## Quoting
//!
//! Path arguments are wrapped in quotes chosen by [`QuoteStyle`]. The host
//! default is single quotes on Unix-like systems and double quotes on
//! Windows. The style is an explicit parameter of the tasks that need it so
//! that a command line rendered on one platform family can be reproduced
//! on the other.

use std::path::Path;
use std::process::Command;

use crate::types::BuildError;

/// Runs an external program and reports its exit status.
///
/// Implementations run the program synchronously, inheriting the caller's
/// working directory, environment and standard streams. `Err` is reserved
/// for programs that could not be started; a program that runs and fails
/// is reported through the returned status.
pub trait ProcessInvoker {
    fn invoke(&self, program: &str, args: &str) -> Result<i32, BuildError>;
}

impl<T: ProcessInvoker + ?Sized> ProcessInvoker for &T {
    fn invoke(&self, program: &str, args: &str) -> Result<i32, BuildError> {
        (**self).invoke(program, args)
    }
}

/// [`ProcessInvoker`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInvoker;

impl ProcessInvoker for SystemInvoker {
    fn invoke(&self, program: &str, args: &str) -> Result<i32, BuildError> {
        let mut cmd = Command::new(program);
        append_flat_args(&mut cmd, args);

        let status = cmd.status().map_err(|source| BuildError::Spawn {
            program: program.to_string(),
            source,
        })?;

        // Killed by a signal: no code to report
        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(windows)]
fn append_flat_args(cmd: &mut Command, args: &str) {
    use std::os::windows::process::CommandExt;
    if !args.is_empty() {
        cmd.raw_arg(args);
    }
}

#[cfg(not(windows))]
fn append_flat_args(cmd: &mut Command, args: &str) {
    cmd.args(split_args(args));
}

/// Splits a flat argument string into argv entries.
///
/// Whitespace separates arguments except inside a `'...'` or `"..."` group;
/// the quote characters themselves are removed. Adjacent quoted and bare
/// text join into one argument (`-c:"Debug|iPhone"` → `-c:Debug|iPhone`).
/// No escapes or expansions are interpreted.
pub fn split_args(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in args.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    out.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        out.push(current);
    }
    out
}

/// Quote character used for path arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `'path'`, the convention on Unix-like hosts.
    Single,
    /// `"path"`, the convention on Windows hosts.
    Double,
}

impl Default for QuoteStyle {
    fn default() -> Self {
        if cfg!(windows) {
            QuoteStyle::Double
        } else {
            QuoteStyle::Single
        }
    }
}

impl QuoteStyle {
    /// The quoting convention of the host this binary was built for.
    pub fn host() -> Self {
        Self::default()
    }

    /// Wraps `value` in this style's quote character.
    ///
    /// An embedded quote character closes the group, appears inside the
    /// other kind of quote, and the group reopens: `o'brien` becomes
    /// `'o'"'"'brien'`. [`split_args`] turns that back into `o'brien`.
    pub fn quote(&self, value: &str) -> String {
        let (q, escaped) = match self {
            QuoteStyle::Single => ('\'', "'\"'\"'"),
            QuoteStyle::Double => ('"', "\"'\"'\""),
        };
        let mut out = String::with_capacity(value.len() + 2);
        out.push(q);
        for c in value.chars() {
            if c == q {
                out.push_str(escaped);
            } else {
                out.push(c);
            }
        }
        out.push(q);
        out
    }
}

/// One argument of a [`CommandLine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Rendered verbatim.
    Plain(String),
    /// Wrapped in the command line's quote character.
    Quoted(String),
    /// Quoted like [`Arg::Quoted`], shown as `****` in logs.
    Secret(String),
}

/// A program plus structured arguments, serialized only when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<Arg>,
    quote_style: QuoteStyle,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            quote_style: QuoteStyle::host(),
        }
    }

    /// Sets the quote character used for [`Arg::Quoted`] arguments.
    pub fn quote_style(mut self, style: QuoteStyle) -> Self {
        self.quote_style = style;
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    pub fn quoted(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Quoted(arg.into()));
        self
    }

    /// Adds a path argument, quoted.
    pub fn path(self, path: impl AsRef<Path>) -> Self {
        let rendered = path.as_ref().display().to_string();
        self.quoted(rendered)
    }

    pub fn secret(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Secret(arg.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[Arg] {
        &self.args
    }

    /// Renders the flat argument string handed to the invoker.
    pub fn render_args(&self) -> String {
        self.render_with(|arg| match arg {
            Arg::Plain(s) => s.clone(),
            Arg::Quoted(s) | Arg::Secret(s) => self.quote_style.quote(s),
        })
    }

    /// Renders the full command with secrets masked, for logging.
    pub fn redacted(&self) -> String {
        let args = self.render_with(|arg| match arg {
            Arg::Plain(s) => s.clone(),
            Arg::Secret(_) => "****".to_string(),
            Arg::Quoted(s) => self.quote_style.quote(s),
        });
        if args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, args)
        }
    }

    fn render_with(&self, render: impl Fn(&Arg) -> String) -> String {
        self.args.iter().map(render).collect::<Vec<_>>().join(" ")
    }
}

/// Invokes `cmd` and fails on a non-zero exit status.
///
/// This is the single place where an exit status is interpreted: anything
/// other than zero becomes [`BuildError::Process`] carrying the program
/// name and status.
pub fn run_checked(invoker: &dyn ProcessInvoker, cmd: &CommandLine) -> Result<(), BuildError> {
    tracing::debug!(command = %cmd.redacted(), "running");

    let status = invoker.invoke(cmd.program(), &cmd.render_args())?;
    if status != 0 {
        return Err(BuildError::Process {
            program: cmd.program().to_string(),
            status,
        });
    }
    Ok(())
}
