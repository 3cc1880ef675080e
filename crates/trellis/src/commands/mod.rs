//! CLI command implementations.

pub(crate) mod render;
pub(crate) mod resolve;
pub(crate) mod tree;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use trellis_config::{CliSettings, Config, Mode};
use trellis_site::{ResolveMode, Site, SiteConfig, SiteLoader};
use trellis_storage::{MemoryStorage, Storage};

use crate::error::CliError;

pub(crate) use render::RenderArgs;
pub(crate) use resolve::ResolveArgs;
pub(crate) use tree::TreeArgs;

/// Options shared by every command that loads a page tree.
#[derive(Args, Debug, Default)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover trellis.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page tree file.
    #[arg(short, long, env = "TRELLIS_TREE")]
    tree: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// A loaded site and the resolution mode configured for it.
pub(crate) struct LoadedSite {
    pub site: Site,
    pub mode: ResolveMode,
}

impl SiteArgs {
    /// Load configuration and the page tree it points at.
    ///
    /// `preview` forces preview mode; otherwise the configured mode applies.
    pub(crate) fn load(&self, preview: bool, inherit_parts: bool) -> Result<LoadedSite, CliError> {
        let cli_settings = CliSettings {
            tree: self.tree.clone(),
            mode: preview.then_some(Mode::Preview),
            inherit_parts: inherit_parts.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        load_site(&config)
    }
}

/// Build a [`Site`] from configuration and load its tree into memory.
pub(crate) fn load_site(config: &Config) -> Result<LoadedSite, CliError> {
    let site_config = SiteConfig {
        max_depth: config.resolver.max_depth,
        normalize: config.resolver.normalize,
        inherit_parts: config.render.inherit_parts,
        default_headers: config.render.headers.clone(),
    };
    let storage = Arc::new(MemoryStorage::new());
    let site = Site::with_config(Arc::clone(&storage) as Arc<dyn Storage>, site_config);

    SiteLoader::new(storage.as_ref(), site.statuses(), site.kinds())
        .load_file(&config.site_resolved.tree)?;
    tracing::debug!(
        config = ?config.config_path,
        tree = %config.site_resolved.tree.display(),
        "Site ready"
    );

    let mode = match config.site_resolved.mode {
        Mode::Live => ResolveMode::Live,
        Mode::Preview => ResolveMode::Preview,
    };
    Ok(LoadedSite { site, mode })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::Path;

    use super::SiteArgs;

    pub(crate) const TREE: &str = r"
title: Home
slug: /
parts:
  - name: body
    content: Welcome!
children:
  - title: About
    slug: about
    parts:
      - name: body
        content: About us
  - title: Drafts
    slug: drafts
    status: draft
  - title: Not Found
    slug: missing
    kind: FileNotFoundPage
    parts:
      - name: body
        content: Nothing here
";

    /// Write the tree and a config pointing at it; return args for that config.
    pub(crate) fn site_args(dir: &Path, config: &str) -> SiteArgs {
        fs::write(dir.join("site.yaml"), TREE).unwrap();
        let config_path = dir.join("trellis.toml");
        fs::write(&config_path, config).unwrap();
        SiteArgs {
            config: Some(config_path),
            tree: None,
            verbose: false,
        }
    }
}
