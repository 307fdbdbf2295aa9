//! Finding catalog listing

use colored::Colorize;

use crate::catalog;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::models::display::{CatalogDisplay, colored_severity};
use crate::output::Formattable;

pub fn run(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Pretty => {
            for (i, entry) in catalog::entries().iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!(
                    "{} {}",
                    entry.title.bold(),
                    format!("({})", entry.category).dimmed()
                );
                println!(
                    "  Severity:    {} (CVSS {:.1})",
                    colored_severity(entry.default_severity),
                    entry.cvss
                );
                println!("  CWE:         {}", entry.cwe.join(", "));
                println!("  {}", entry.description);
                println!("  {} {}", "Fix:".green(), entry.remediation);
            }
            Ok(())
        }
        _ => {
            let rows: Vec<CatalogDisplay> =
                catalog::entries().iter().map(CatalogDisplay::from).collect();
            rows.print(format)
        }
    }
}
