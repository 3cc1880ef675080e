//! Render command implementation.

use clap::Args;
use trellis_site::{RequestContext, Response};

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Request path to render.
    path: String,

    /// Resolve in preview mode (unpublished pages are visible).
    #[arg(long)]
    preview: bool,

    /// Render parts inherited from ancestors when a page lacks its own.
    #[arg(long)]
    inherit_parts: bool,

    /// Request header as NAME=VALUE (repeatable).
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Print the full response (status, headers, body) as JSON.
    #[arg(long)]
    json: bool,

    /// Print status line and headers before the body.
    #[arg(short, long)]
    include: bool,

    #[command(flatten)]
    pub site: SiteArgs,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree fails to load or nothing answers the path.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let loaded = self.site.load(self.preview, self.inherit_parts)?;

        let request = self
            .headers
            .into_iter()
            .fold(
                RequestContext::new(&self.path).with_mode(loaded.mode),
                |request, (name, value)| request.with_header(name, value),
            );
        let response = loaded.site.serve(&request)?;

        if !(200..300).contains(&response.status_code) {
            output.warning(&format!("{} answered {}", self.path, response.status_code));
        }
        if self.json {
            output.result(&serde_json::to_string_pretty(&response)?);
        } else {
            if self.include {
                for line in head_lines(&response) {
                    output.result(&line);
                }
                output.result("");
            }
            output.result(&response.body);
        }
        Ok(())
    }
}

/// Status line and headers, one per line.
fn head_lines(response: &Response) -> Vec<String> {
    let mut lines = vec![format!("status: {}", response.status_code)];
    lines.extend(
        response
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}")),
    );
    lines
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name must not be empty".to_owned());
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}
