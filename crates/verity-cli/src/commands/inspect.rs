//! Offline hashing helpers

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use verity_core::{
    content_digest, fingerprint_parts, normalize_tag_ids, IssuingContext, VersionNumber,
};

/// Letter body given inline or read from a file
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ContentArgs {
    /// Letter body
    #[arg(long)]
    content: Option<String>,

    /// Read the letter body from a file
    #[arg(long)]
    content_file: Option<PathBuf>,
}

impl ContentArgs {
    fn read(&self) -> Result<String> {
        match (&self.content, &self.content_file) {
            (Some(content), _) => Ok(content.clone()),
            (None, Some(path)) => read_file(path),
            (None, None) => anyhow::bail!("either --content or --content-file is required"),
        }
    }
}

/// Arguments of `verity fingerprint`
#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Letter id
    #[arg(long)]
    letter_id: String,

    /// Version number being fingerprinted
    #[arg(long)]
    version: u32,

    /// Issuing context (COMPANY or BCBA)
    #[arg(long, default_value = "COMPANY")]
    context: String,

    /// Department id
    #[arg(long)]
    department_id: String,

    /// Tag payload as JSON; normalized before hashing
    #[arg(long, default_value = "[]")]
    tags: String,

    #[command(flatten)]
    body: ContentArgs,
}

/// Arguments of `verity digest`
#[derive(Args, Debug)]
pub struct DigestArgs {
    #[command(flatten)]
    body: ContentArgs,
}

/// Arguments of `verity normalize-tags`
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Tag payload as JSON
    payload: String,
}

/// Print the fingerprint of one letter version
pub fn fingerprint(args: FingerprintArgs) -> Result<()> {
    let context: IssuingContext = args.context.parse()?;
    let tags = normalize_tag_ids(&parse_json(&args.tags)?);
    let content = args.body.read()?;
    let fp = fingerprint_parts(
        &args.letter_id,
        VersionNumber::new(args.version),
        context,
        &args.department_id,
        &tags,
        &content,
    )?;
    println!("{fp}");
    Ok(())
}

/// Print the content digest
pub fn digest(args: DigestArgs) -> Result<()> {
    println!("{}", content_digest(&args.body.read()?));
    Ok(())
}

/// Print the normalized tag list as JSON
pub fn normalize(args: NormalizeArgs) -> Result<()> {
    let tags = normalize_tag_ids(&parse_json(&args.payload)?);
    println!("{}", serde_json::to_string(&tags.to_value())?);
    Ok(())
}

fn parse_json(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).with_context(|| format!("tag payload is not JSON: {raw}"))
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_content_file_is_read_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "some content").unwrap();
        let body = ContentArgs {
            content: None,
            content_file: Some(file.path().to_path_buf()),
        };
        assert_eq!(body.read().unwrap(), "some content");
    }

    #[test]
    fn test_rejects_non_json_tags() {
        assert!(parse_json("alpha,beta").is_err());
        assert!(parse_json(r#"["alpha"]"#).is_ok());
    }
}
