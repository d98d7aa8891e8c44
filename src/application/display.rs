use std::io::{self, Write};

use colored::Colorize;
use supports_color::Stream;

use crate::render::{LineTone, RenderedLine, RenderedTree};
use crate::scm::{ScmMount, ScmStatus};

const BRANCHES_HEADER: &str = "[ Current Branches ]";

/// Writes rendered lines to stdout, colored when the terminal supports it.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn detect() -> Self {
        Self {
            color: supports_color::on(Stream::Stdout).is_some(),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn paint(&self, line: &RenderedLine) -> String {
        if !self.color {
            return line.text.clone();
        }
        let text = line.text.as_str();
        match line.tone {
            LineTone::Plain => text.normal(),
            LineTone::Status(ScmStatus::Added) => text.green(),
            LineTone::Status(ScmStatus::Modified) => text.yellow(),
            LineTone::Status(ScmStatus::Deleted) => text.red(),
            LineTone::Status(ScmStatus::Unknown | ScmStatus::OutOfDate) => text.magenta(),
            LineTone::Status(ScmStatus::Cleared) => text.normal(),
            LineTone::Mount => text.cyan(),
            LineTone::History => text.dimmed(),
        }
        .to_string()
    }

    /// The tree, a marker in front of the cursor line when there is one, and
    /// the branch of every mount.
    pub fn tree_text(
        &self,
        rendered: &RenderedTree,
        mounts: &[ScmMount],
        cursor: Option<usize>,
    ) -> Vec<String> {
        let mut lines: Vec<String> = rendered
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let pointer = match cursor {
                    Some(cursor) if cursor == index + 1 => '>',
                    Some(_) => ' ',
                    None => return self.paint(line),
                };
                format!("{pointer}{:>4} {}", index + 1, self.paint(line))
            })
            .collect();

        if !mounts.is_empty() {
            lines.push(String::new());
            lines.push(BRANCHES_HEADER.to_string());
            lines.extend(mounts.iter().map(|mount| {
                format!(
                    "  {} [{}] {}",
                    mount.root.display(),
                    mount.tag(),
                    mount.branch.as_deref().unwrap_or("unknown")
                )
            }));
        }
        lines
    }

    pub fn print(&self, lines: &[String]) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        for line in lines {
            writeln!(stdout, "{line}")?;
        }
        stdout.flush()
    }
}
