//! Flags accepted in the SSH command line. Users type Go-style single-dash
//! long flags (`-private`, `-ttl 1h`); those are rewritten to `--` form
//! before clap sees them.

use std::time::Duration;

use clap::Parser;

use crate::actions::normalize_extension;
use crate::error::{Error, Result};
use crate::timeutil;

fn parse_ttl(value: &str) -> std::result::Result<Duration, String> {
    timeutil::parse_duration(value).map_err(|e| e.to_string())
}

/// Rewrites `-name` and `-name=value` to `--name` forms. Single-letter
/// flags and anything already in `--` form pass through.
fn normalize(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let name = arg.split('=').next().unwrap_or_default();
            if arg.starts_with('-') && !arg.starts_with("--") && name.len() > 2 {
                format!("-{arg}")
            } else {
                arg.clone()
            }
        })
        .collect()
}

fn parse<T: Parser>(args: &[String]) -> Result<T> {
    T::try_parse_from(normalize(args)).map_err(|e| {
        let rendered = e.render().to_string();
        let message = rendered
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("error: ")
            .to_string();
        Error::FlagParse(message)
    })
}

#[derive(Debug, Default, Parser)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct UploadFlags {
    /// Only the owner, or holders of a signed link, may view the file.
    #[arg(long)]
    pub private: bool,

    /// Extension used to pick the file type, e.g. `go` or `.md`.
    #[arg(long, default_value = "")]
    pub ext: String,

    /// Lifetime of the signed link printed for a private upload.
    #[arg(long, value_parser = parse_ttl)]
    pub ttl: Option<Duration>,
}

impl UploadFlags {
    pub fn parse_args(args: &[String]) -> Result<Self> {
        let mut flags: Self = parse(args)?;
        if flags.ttl.is_some() && !flags.private {
            return Err(Error::FlagRequired("-private".to_string()));
        }
        flags.ext = normalize_extension(&flags.ext);
        Ok(flags)
    }
}

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct SignFlags {
    #[arg(long, value_parser = parse_ttl)]
    ttl: Option<Duration>,
}

impl SignFlags {
    /// The requested link lifetime. `-ttl` is mandatory.
    pub fn parse_ttl(args: &[String]) -> Result<Duration> {
        let flags: Self = parse(args)?;
        flags.ttl.ok_or_else(|| Error::FlagRequired("-ttl".to_string()))
    }
}

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct DeleteFlags {
    /// Skip the confirmation prompt.
    #[arg(short = 'f', long)]
    pub force: bool,
}

impl DeleteFlags {
    pub fn parse_args(args: &[String]) -> Result<Self> {
        parse(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(&args("-private -ext=go --ttl 1h -f x")),
            args("--private --ext=go --ttl 1h -f x")
        );
    }

    #[test]
    fn test_upload_flags() {
        let flags = UploadFlags::parse_args(&args("-private -ext .MD -ttl 2d")).unwrap();
        assert!(flags.private);
        assert_eq!(flags.ext, "md");
        assert_eq!(flags.ttl, Some(Duration::from_secs(2 * 86_400)));

        let flags = UploadFlags::parse_args(&[]).unwrap();
        assert!(!flags.private);
        assert!(flags.ext.is_empty());
        assert!(flags.ttl.is_none());
    }

    #[test]
    fn test_ttl_requires_private() {
        assert!(matches!(
            UploadFlags::parse_args(&args("-ttl 5m")),
            Err(Error::FlagRequired(flag)) if flag == "-private"
        ));
    }

    #[test]
    fn test_bad_flags() {
        assert!(matches!(
            UploadFlags::parse_args(&args("-nope")),
            Err(Error::FlagParse(_))
        ));
        assert!(matches!(
            UploadFlags::parse_args(&args("-private -ttl forever")),
            Err(Error::FlagParse(_))
        ));
    }

    #[test]
    fn test_sign_flags() {
        assert_eq!(
            SignFlags::parse_ttl(&args("-ttl 1w")).unwrap(),
            Duration::from_secs(7 * 86_400)
        );
        assert!(matches!(
            SignFlags::parse_ttl(&[]),
            Err(Error::FlagRequired(flag)) if flag == "-ttl"
        ));
    }

    #[test]
    fn test_delete_flags() {
        assert!(DeleteFlags::parse_args(&args("-f")).unwrap().force);
        assert!(!DeleteFlags::parse_args(&[]).unwrap().force);
    }
}
