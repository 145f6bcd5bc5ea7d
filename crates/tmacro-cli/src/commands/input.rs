//! Template text given inline or from a file.

use std::fs::read_to_string;
use std::path::PathBuf;

use miette::miette;

/// Where a command reads its template from.
#[derive(Debug, clap::Args)]
pub struct TemplateInput {
    /// Template text
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub template: Option<String>,

    /// Read the template from a file instead
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl TemplateInput {
    /// Display name and content of the template.
    pub fn read(&self) -> miette::Result<(String, String)> {
        match (&self.template, &self.file) {
            (Some(template), _) => Ok(("<template>".to_string(), template.clone())),
            (None, Some(path)) => {
                let content = read_to_string(path)
                    .map_err(|e| miette!("Cannot read template file {}: {}", path.display(), e))?;
                Ok((path.display().to_string(), content))
            }
            (None, None) => Err(miette!("No template given")),
        }
    }
}
