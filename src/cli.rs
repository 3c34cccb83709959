//! Command-line driver: stage image files, submit once, report.

use crate::config::ServiceConfig;
use crate::intake::{ImageSource, PreviewState};
use crate::pipeline::{SubmitOutcome, UploadOrchestrator};
use crate::session::{self, Session};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "allergy-lens", version, about = "Classify a food photo against your allergies")]
pub struct Cli {
    /// User id sent with the classification request.
    #[arg(long, env = "ALLERGY_LENS_USER_ID")]
    pub user_id: String,

    /// Bearer token for the history store.
    #[arg(long, env = "ALLERGY_LENS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Known allergen (repeatable).
    #[arg(long = "allergen", short = 'a')]
    pub allergens: Vec<String>,

    /// Also pull allergens from the `/me` profile.
    #[arg(long)]
    pub from_profile: bool,

    /// Override the backend base URL.
    #[arg(long)]
    pub api_url: Option<String>,

    /// Image files to stage (PNG, JPEG, SVG). Only the first accepted one
    /// is classified.
    #[arg(required = true)]
    pub images: Vec<PathBuf>,
}

pub async fn run(cli: Cli) -> ExitCode {
    let mut config = ServiceConfig::resolve();
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    let orchestrator = UploadOrchestrator::from_config(&config);
    let identity = Session::new(cli.user_id, cli.token);

    let mut allergens = cli.allergens;
    if cli.from_profile {
        match session::fetch_me(&reqwest::Client::new(), &config, &identity.token).await {
            Ok(profile) => {
                for allergen in profile.allergens() {
                    if !allergens.contains(&allergen) {
                        allergens.push(allergen);
                    }
                }
            }
            Err(e) => log::warn!("[CLI] Profile lookup failed, using explicit allergens only: {}", e),
        }
    }

    let selection = orchestrator.selection();
    let mut staged = Vec::new();
    for path in cli.images {
        match selection.add(ImageSource::from_path(&path)) {
            Ok(id) => staged.push(id),
            Err(e) => eprintln!("skipped: {}", e),
        }
    }

    // A terminal has no re-render loop, so let previews settle first.
    for id in staged {
        if let Some(PreviewState::Failed(e)) = selection.wait_for_preview(id).await {
            eprintln!("preview failed: {}", e);
        }
    }

    let outcome = orchestrator.submit(&identity, &allergens).await;
    match &outcome {
        SubmitOutcome::Success { result, record_id } => {
            println!("food:     {}", result.food_name);
            println!("allergy:  {}", result.allergy_info_joined());
            println!("warning:  {}", result.warning);
            println!("recorded: {}", record_id);
        }
        SubmitOutcome::ClassificationFailed(reason) => eprintln!("upload failed: {}", reason),
        SubmitOutcome::RecordFailed { result, error, .. } => {
            println!("food:     {}", result.food_name);
            eprintln!("classified, but saving to history failed: {}", error);
        }
        SubmitOutcome::NoSelection => eprintln!("nothing to upload"),
        SubmitOutcome::AlreadyBusy => eprintln!("an upload is already running"),
    }

    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_allergens() {
        let cli = Cli::try_parse_from([
            "allergy-lens",
            "--user-id",
            "u-1",
            "--token",
            "t",
            "-a",
            "fish",
            "--allergen",
            "peanut",
            "lunch.jpg",
        ])
        .unwrap();
        assert_eq!(cli.allergens, vec!["fish", "peanut"]);
        assert_eq!(cli.images, vec![PathBuf::from("lunch.jpg")]);
        assert!(!cli.from_profile);
    }

    #[test]
    fn requires_an_image() {
        let parsed = Cli::try_parse_from(["allergy-lens", "--user-id", "u", "--token", "t"]);
        assert!(parsed.is_err());
    }
}
