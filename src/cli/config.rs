//! Configuration file commands

use colored::Colorize;
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::config::Config;
use crate::error::{ConfigError, Result};

/// Write a config file holding the default values
pub fn init(opts: &GlobalOptions, force: bool) -> Result<()> {
    let path = Config::resolve_path(opts.config_ref())?;

    if path.exists() && !force {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{} exists. Overwrite it with defaults?", path.display()))
            .default(false)
            .interact()?;

        if !overwrite {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    Config::default().save_to(&path)?;

    println!(
        "{} Configuration saved to: {}",
        "✓".green(),
        path.display()
    );
    println!("\n{}", "Next steps:".bold());
    println!("  {} - Review the effective settings", "vulnscope config show".cyan());
    println!(
        "  {} - Run an offline demo scan",
        "vulnscope scan https://example.com --simulate".cyan()
    );

    Ok(())
}

/// Print the effective configuration
pub fn show(ctx: &CommandContext) -> Result<()> {
    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ctx.config)?),
        _ => {
            let yaml = serde_yaml::to_string(&ctx.config)
                .map_err(|e| ConfigError::SaveError(e.to_string()))?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

/// Print the config file location
pub fn path(opts: &GlobalOptions) -> Result<()> {
    let path = Config::resolve_path(opts.config_ref())?;
    if opts.format == OutputFormat::Json {
        let json = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", path.display());
    }
    Ok(())
}
