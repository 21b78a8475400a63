//! Interactive Questionnaire
//!
//! Asks the questionnaire in the terminal and prints the predicted
//! personality with its probability breakdown.

use anyhow::Result;
use personality_predictor::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    form::{FormField, QuestionnaireForm},
    logging,
    models::{BundleCache, BundleLoader, InferencePipeline},
    render_report,
    types::InputRecord,
};
use std::io::{self, BufRead, Write};
use tracing::{error, info};

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load_or_default(&config_path)?;
    logging::init(&config.logging, &["personality_predictor", "questionnaire"])?;

    let loader = BundleLoader::new(config.artifacts.clone());
    let bundle = match BundleCache::global().get_or_load(|| loader.load()) {
        Ok(bundle) => bundle,
        Err(e) => {
            error!(artifact = %e.artifact(), error = %e, "Model bundle could not be loaded");
            return Err(e.into());
        }
    };
    info!(classifier = bundle.classifier().name(), "Model bundle ready");

    let form = QuestionnaireForm::from_bundle(&bundle)?;
    let pipeline = InferencePipeline::new(bundle);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Personality Questionnaire");
    println!("Press Enter to accept the default shown for a question.");

    loop {
        println!();
        let Some(record) = ask_all(form.fields(), &mut lines)? else {
            break;
        };

        println!();
        println!("Your answers:");
        for line in form.summary(&record) {
            println!("  {}: {}", line.label, line.value);
        }
        println!();

        match pipeline.predict(&record) {
            Ok(result) => print!("{}", render_report(&result)),
            Err(e) => println!("Prediction failed: {e}"),
        }

        println!();
        let again = ask_line("Another prediction? [y/N]", &mut lines)?;
        if !matches!(again.as_deref().map(str::trim), Some("y" | "Y" | "yes" | "Yes")) {
            break;
        }
    }

    Ok(())
}

/// Ask every field in order. `None` when input ends.
fn ask_all<I>(fields: &[FormField], lines: &mut I) -> Result<Option<InputRecord>>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut record = InputRecord::new();
    for field in fields {
        loop {
            let Some(input) = ask_line(&field.prompt(), lines)? else {
                return Ok(None);
            };
            match field.parse_answer(&input) {
                Ok(answer) => {
                    record.insert(field.feature.clone(), answer);
                    break;
                }
                Err(reason) => println!("  {reason}, please try again"),
            }
        }
    }
    Ok(Some(record))
}

fn ask_line<I>(prompt: &str, lines: &mut I) -> Result<Option<String>>
where
    I: Iterator<Item = io::Result<String>>,
{
    print!("{prompt}: ");
    io::stdout().flush()?;
    lines.next().transpose().map_err(Into::into)
}
