//! Tree command implementation.

use clap::Args;
use trellis_site::OutlineItem;

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the tree command.
#[derive(Args)]
pub(crate) struct TreeArgs {
    /// Print the outline as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    pub site: SiteArgs,
}

impl TreeArgs {
    /// Execute the tree command.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree fails to load or contains a cycle.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let loaded = self.site.load(false, false)?;
        let outline = loaded.site.outline()?;

        if self.json {
            output.result(&serde_json::to_string_pretty(&outline)?);
            return Ok(());
        }

        let mut lines = Vec::new();
        outline_lines(&outline, 0, &mut lines);
        for (line, note) in lines {
            if note.is_empty() {
                output.result(&line);
            } else {
                output.result(&format!("{line}  {}", output.dim(&note)));
            }
        }
        Ok(())
    }
}

/// Flatten the outline into indented lines, each with a note of
/// non-default attributes.
fn outline_lines(item: &OutlineItem, depth: usize, lines: &mut Vec<(String, String)>) {
    let mut notes = Vec::new();
    if item.status != "published" {
        notes.push(item.status.clone());
    }
    if let Some(kind) = &item.kind {
        notes.push(kind.clone());
    }
    if item.is_virtual {
        notes.push("virtual".to_owned());
    }
    lines.push((
        format!("{}{} ({})", "  ".repeat(depth), item.path, item.title),
        notes.join(", "),
    ));
    for child in &item.children {
        outline_lines(child, depth + 1, lines);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::test_support::site_args;
    use super::*;

    #[test]
    fn test_outline_lines() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = site_args(dir.path(), "").load(false, false).unwrap();
        let outline = loaded.site.outline().unwrap();

        let mut lines = Vec::new();
        outline_lines(&outline, 0, &mut lines);

        assert_eq!(
            lines,
            vec![
                ("/ (Home)".to_owned(), String::new()),
                ("  /about/ (About)".to_owned(), String::new()),
                ("  /drafts/ (Drafts)".to_owned(), "draft".to_owned()),
                (
                    "  /missing/ (Not Found)".to_owned(),
                    "FileNotFoundPage, virtual".to_owned()
                ),
            ]
        );
    }
}
