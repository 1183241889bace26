use anyhow::{Context, Result};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "assets/"]
struct BundledAssets;

pub fn text(name: &str) -> Result<String> {
    let file = BundledAssets::get(name).with_context(|| format!("Missing embedded asset: {}", name))?;
    String::from_utf8(file.data.into_owned())
        .with_context(|| format!("Embedded asset is not UTF-8: {}", name))
}
