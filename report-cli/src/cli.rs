use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;
use inquire::{Text, validator::Validation};
use report_core::{
    CityDirectory, MongoReportStore, OpenWeatherClient, ReportFormatter, ReportPipeline, Settings,
    SmtpNotifier, notify::validate_recipient,
};
use tracing::{info, warn};

use crate::logging;

/// Top-level CLI struct. Everything else is asked for interactively.
#[derive(Debug, Parser)]
#[command(
    name = "weather-report",
    version,
    about = "Email the current weather report for a Turkish province"
)]
pub struct Cli {}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let settings = Settings::load().context("Failed to load configuration")?;
        let _log_guard = logging::init(&settings.log_dir, &settings.log_level)?;
        info!(?settings, "Configuration loaded");

        let directory = CityDirectory::load(&settings.cities_file_path)
            .context("Failed to load the city list")?;
        let formatter = ReportFormatter::with_offset_hours(settings.report_utc_offset_hours)
            .ok_or_else(|| anyhow!("Invalid report UTC offset"))?;
        let weather = Arc::new(OpenWeatherClient::new(
            settings.openweather_api_key.clone(),
            settings.weather_lang.clone(),
        ));
        let store = Arc::new(MongoReportStore::new(settings.mongo_uri.clone()));
        let notifier = Arc::new(
            SmtpNotifier::relay(&settings.smtp, &settings.from_email)
                .context("Failed to configure the mail relay")?,
        );

        println!("=== Türkiye Provinces Weather Report ===");
        println!("{}", city_menu(&directory));

        let city = prompt_city(&directory)?;
        let recipient = prompt_email()?;

        let pipeline = ReportPipeline::new(directory, weather, store, formatter, notifier);
        let outcome = pipeline.run(&city, &recipient).await?;

        println!("\nReport for {} sent to {}.", outcome.city.name, outcome.message.recipient);
        if outcome.persistence_degraded {
            println!("Note: the report could not be saved to the database. See the log for details.");
        }

        Ok(())
    }
}

/// Province list laid out in three columns.
fn city_menu(directory: &CityDirectory) -> String {
    directory
        .cities()
        .chunks(3)
        .map(|row| {
            row.iter()
                .map(|c| format!("{:>2} - {:<18}", c.id, c.name))
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask until the input names a known city; returns its canonical name.
fn prompt_city(directory: &CityDirectory) -> anyhow::Result<String> {
    loop {
        let input = Text::new("City (number or name):")
            .with_help_message("e.g. 34 or Istanbul, Esc to quit")
            .prompt()
            .context("City selection cancelled")?;

        match directory.resolve(&input) {
            Ok(city) => return Ok(city.name.clone()),
            Err(e) => {
                warn!("{}", e);
                println!("{e}. Please try again.");
            }
        }
    }
}

fn prompt_email() -> anyhow::Result<String> {
    let address = Text::new("Email address to send the report to:")
        .with_validator(|input: &str| {
            Ok(match validate_recipient(input.trim()) {
                Ok(_) => Validation::Valid,
                Err(e) => Validation::Invalid(e.to_string().into()),
            })
        })
        .prompt()
        .context("Email entry cancelled")?;

    Ok(address.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_no_operational_flags() {
        assert!(Cli::try_parse_from(["weather-report"]).is_ok());
        assert!(Cli::try_parse_from(["weather-report", "--city", "Ankara"]).is_err());
    }

    #[test]
    fn menu_lists_every_province() {
        let directory = CityDirectory::bundled().unwrap();
        let menu = city_menu(&directory);

        assert_eq!(menu.lines().count(), 27);
        assert!(menu.contains("34 - İstanbul"));
        assert!(menu.contains(" 1 - Adana"));
        assert!(menu.contains("81 - Düzce"));
        assert!(menu.lines().all(|l| l == l.trim_end()));
    }
}
