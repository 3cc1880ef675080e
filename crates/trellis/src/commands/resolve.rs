//! Resolve command implementation.

use clap::Args;
use serde_json::json;
use trellis_site::{Page, Site};

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the resolve command.
#[derive(Args)]
pub(crate) struct ResolveArgs {
    /// Request path to resolve.
    path: String,

    /// Resolve in preview mode (unpublished pages are visible).
    #[arg(long)]
    preview: bool,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    pub site: SiteArgs,
}

impl ResolveArgs {
    /// Execute the resolve command.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree fails to load or nothing answers the path.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let loaded = self.site.load(self.preview, false)?;
        let page = loaded.site.resolve_path(&self.path, loaded.mode)?;
        let summary = summarize(&loaded.site, &page)?;

        if self.json {
            output.result(&serde_json::to_string_pretty(&summary)?);
        } else {
            output.highlight(page.title());
            for line in describe(&summary) {
                output.result(&line);
            }
        }
        Ok(())
    }
}

/// Collect the facts printed about a resolved page.
fn summarize(site: &Site, page: &Page) -> Result<serde_json::Value, CliError> {
    let status = page
        .status(site.statuses())
        .map_or_else(|| page.status_id().to_string(), |s| s.symbol().to_owned());
    let breadcrumbs = site.breadcrumbs(page)?;
    let path = page.path(site.storage())?;
    let parts: Vec<_> = page.parts().iter().map(|part| part.name()).collect();

    Ok(json!({
        "key": page.key().to_string(),
        "title": page.title(),
        "path": path,
        "status": status,
        "kind": page.kind(),
        "parts": parts,
        "breadcrumbs": breadcrumbs,
    }))
}

fn describe(summary: &serde_json::Value) -> Vec<String> {
    let field = |name: &str| summary[name].as_str().unwrap_or("-").to_owned();
    let crumbs: Vec<_> = summary["breadcrumbs"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["title"].as_str())
                .collect()
        })
        .unwrap_or_default();
    let parts: Vec<_> = summary["parts"]
        .as_array()
        .map(|items| items.iter().filter_map(|item| item.as_str()).collect())
        .unwrap_or_default();

    vec![
        format!("  path:   {}", field("path")),
        format!("  status: {}", field("status")),
        format!("  kind:   {}", field("kind")),
        format!("  parts:  {}", parts.join(", ")),
        format!("  trail:  {}", crumbs.join(" > ")),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_site::ResolveMode;

    use super::super::test_support::site_args;
    use super::*;

    #[test]
    fn test_summarize_resolved_page() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = site_args(dir.path(), "").load(false, false).unwrap();
        let page = loaded.site.resolve_path("/about", ResolveMode::Live).unwrap();

        let summary = summarize(&loaded.site, &page).unwrap();

        assert_eq!(summary["title"], "About");
        assert_eq!(summary["path"], "/about/");
        assert_eq!(summary["status"], "published");
        assert_eq!(summary["kind"], serde_json::Value::Null);
        assert_eq!(summary["parts"], json!(["body"]));
        assert_eq!(summary["breadcrumbs"][0]["path"], "/");
        assert_eq!(summary["breadcrumbs"][1]["title"], "About");
    }

    #[test]
    fn test_describe_lines() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = site_args(dir.path(), "").load(false, false).unwrap();
        let page = loaded.site.resolve_path("/about/", ResolveMode::Live).unwrap();
        let summary = summarize(&loaded.site, &page).unwrap();

        let lines = describe(&summary);

        assert_eq!(lines[0], "  path:   /about/");
        assert_eq!(lines[2], "  kind:   -");
        assert_eq!(lines[4], "  trail:  Home > About");
    }

    #[test]
    fn test_unknown_path_falls_back_to_not_found_page() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = site_args(dir.path(), "").load(false, false).unwrap();

        let page = loaded.site.resolve_path("/nope/", ResolveMode::Live).unwrap();

        assert_eq!(page.title(), "Not Found");
    }

    #[test]
    fn test_draft_only_visible_in_preview() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = site_args(dir.path(), "").load(true, false).unwrap();

        let page = loaded.site.resolve_path("/drafts/", loaded.mode).unwrap();

        assert_eq!(page.title(), "Drafts");
    }
}
