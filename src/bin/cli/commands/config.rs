//! Configuration management commands.

use owo_colors::OwoColorize;

use crate::cli::args::{InitConfigArgs, ValidateConfigArgs};
use crate::cli::config_layer::load_config_file;
use crate::cli::output::display_config_summary;
use claimaudit_rs::core::config::AuditConfig;

/// Print default configuration in YAML format
pub async fn print_default_config() -> anyhow::Result<()> {
    println!("# Default claimaudit configuration");
    println!("# Save this to .claimaudit.yml and customize as needed");
    println!("# Usage: claimaudit audit --config your-config.yml --claims claims.json");
    println!();

    let yaml_output = serde_yaml::to_string(&AuditConfig::default())?;
    println!("{yaml_output}");

    Ok(())
}

/// Initialize a configuration file with defaults
pub async fn init_config(args: InitConfigArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "Configuration file already exists: {}. Use --force to overwrite or choose a different name with --output",
            args.output.display()
        );
    }

    let yaml_content = serde_yaml::to_string(&AuditConfig::default())?;
    tokio::fs::write(&args.output, yaml_content).await?;

    eprintln!(
        "{} {}",
        "Configuration saved to:".bright_green().bold(),
        args.output.display().to_string().cyan()
    );
    Ok(())
}

/// Validate a claimaudit configuration file
pub async fn validate_config(args: ValidateConfigArgs) -> anyhow::Result<()> {
    let config = load_config_file(&args.config)?;
    if let Err(err) = config.validate() {
        eprintln!("{} {}", "Configuration validation failed:".red(), err);
        eprintln!("   Use 'claimaudit print-default-config' to see the valid format");
        return Err(err.into());
    }

    println!(
        "{} {}",
        "Configuration file is valid:".bright_green().bold(),
        args.config.display()
    );
    display_config_summary(&config);
    Ok(())
}
