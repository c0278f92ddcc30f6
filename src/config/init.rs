use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::auth::sha256_hex;
use crate::config::{get_config_path, AdminConfig, Config};
use crate::scoring::{
    validate_scoring, validate_weights, ContractBucket, Effect, RangeOp, ScoringConfig,
    ScoringWeights,
};

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    let input = input.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

/// Print text with a typewriter effect, one character at a time.
fn typewriter(text: &str) {
    use std::thread;
    use std::time::Duration;
    for c in text.chars() {
        print!("{}", c);
        std::io::stdout().flush().ok();
        thread::sleep(Duration::from_millis(18));
    }
    println!();
}

fn prompt_f64(message: &str, default: f64) -> Result<f64> {
    loop {
        let input = prompt_with_default(message, &default.to_string())?;
        match input.parse::<f64>() {
            Ok(v) if v.is_finite() => return Ok(v),
            _ => println!("  Invalid: must be a number. Try again."),
        }
    }
}

/// Parse "0.4 0.3 0.2 0.1" (spaces or commas) into weights.
pub fn parse_weights(input: &str) -> Result<ScoringWeights, String> {
    let parts: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 4 {
        return Err(format!("expected 4 numbers, got {}", parts.len()));
    }
    let mut values = [0.0; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", part))?;
    }
    let weights = ScoringWeights {
        credibility: values[0],
        fit: values[1],
        value: values[2],
        momentum: values[3],
    };
    validate_weights(&weights).map_err(|errors| errors.join("; "))?;
    Ok(weights)
}

fn prompt_effect(message: &str, default: &str) -> Result<String> {
    loop {
        let input = prompt_with_default(message, default)?;
        match Effect::parse(&input) {
            Ok(_) => return Ok(input),
            Err(e) => println!("  Invalid: {}. Try again.", e),
        }
    }
}

fn prompt_contract_buckets() -> Result<Vec<ContractBucket>> {
    typewriter("Let's define your contract buckets. Each maps months left on the deal to an effect on the expected fee.");
    println!();
    let mut buckets: Vec<ContractBucket> = Vec::new();
    loop {
        let months = loop {
            let r = prompt("  Months left (e.g., '<6', '6-11', '>36'): ")?;
            if r.is_empty() {
                println!("  Range is required.");
                continue;
            }
            match RangeOp::parse(&r) {
                Ok(_) => break r,
                Err(e) => println!("  Invalid range: {}. Try again.", e),
            }
        };
        let effect = loop {
            let e = prompt("  Fee effect (e.g., 'x0.3', 'x1.2'): ")?;
            match Effect::parse(&e) {
                Ok(Effect::Multiply(n)) if n >= 0.0 => break e,
                Ok(_) => println!(
                    "  Contract effects must be a flat multiplier like 'x0.6'. Try again."
                ),
                Err(err) => println!("  Invalid effect: {}. Try again.", err),
            }
        };
        buckets.push(ContractBucket { months, effect });
        if !prompt_yes_no("  Add another contract bucket?", false)? {
            break;
        }
    }
    Ok(buckets)
}

fn prompt_scoring() -> Result<ScoringConfig> {
    let mut scoring = ScoringConfig::default();

    println!();
    typewriter("The overall score is a weighted sum of credibility, fit, value and momentum.");
    typewriter("Enter four weights in that order. They must add up to 1.0.");
    scoring.weights = loop {
        let input = prompt_with_default("Weights", "0.4 0.3 0.2 0.1")?;
        match parse_weights(&input) {
            Ok(w) => break w,
            Err(e) => println!("  Invalid: {}. Try again.", e),
        }
    };

    println!();
    typewriter("Credibility starts from the source's reputation tier.");
    scoring.credibility.trusted = prompt_f64("Trusted source base", scoring.credibility.trusted)?;
    scoring.credibility.neutral = prompt_f64("Neutral source base", scoring.credibility.neutral)?;
    scoring.credibility.unreliable =
        prompt_f64("Unreliable source base", scoring.credibility.unreliable)?;

    println!();
    typewriter("Momentum fades once a rumour goes quiet.");
    typewriter("Format: 'xN per DURATION' (e.g., 'x0.95 per 1d' loses 5% a day).");
    scoring.momentum.decay = loop {
        let input = prompt_effect("Decay", &scoring.momentum.decay)?;
        let decays = matches!(
            Effect::parse(&input),
            Ok(Effect::MultiplyPerUnit(n, _)) if (0.0..=1.0).contains(&n)
        );
        if decays {
            break input;
        }
        println!("  Decay must look like 'x0.95 per 1d' with a factor between 0 and 1. Try again.");
    };
    scoring.momentum.grace = loop {
        let input = prompt_with_default("Grace period before decay", &scoring.momentum.grace)?;
        match humantime::parse_duration(&input) {
            Ok(_) => break input,
            Err(e) => println!("  Invalid: {}. Try again.", e),
        }
    };
    scoring.momentum.contradiction =
        prompt_effect("Effect of a contradiction", &scoring.momentum.contradiction)?;

    println!();
    typewriter("Expected fees shrink as a contract runs down.");
    let use_default_contract = prompt_yes_no(
        "Contract buckets - use defaults? (<6 months: x0.3, 6-11: x0.6, >36: x1.2)",
        true,
    )?;
    if !use_default_contract {
        scoring.value.contract = prompt_contract_buckets()?;
    }

    Ok(scoring)
}

/// Run the interactive init wizard to create a config file.
///
/// If `default_path` is Some, uses that as the config file path.
/// Otherwise, prompts the user with the default config path.
pub fn run_init_wizard(default_path: Option<PathBuf>) -> Result<()> {
    println!();
    typewriter("Transfer Rank Configuration Wizard");
    println!("==================================");

    println!();
    let configure_scoring = prompt_yes_no("Configure scoring? (n accepts defaults)", false)?;
    let scoring = if configure_scoring {
        let scoring = prompt_scoring()?;
        if let Err(errors) = validate_scoring(&scoring) {
            println!("Scoring settings are inconsistent, keeping defaults:");
            for error in errors {
                println!("  - {}", error);
            }
            None
        } else {
            Some(scoring)
        }
    } else {
        None
    };

    println!();
    typewriter("Administrative commands (weights, reputations, resolving rumours) need a password.");
    let admin = if prompt_yes_no("Set an admin password now?", true)? {
        let password = rpassword::prompt_password("Admin password: ")
            .context("Failed to read password")?;
        if password.is_empty() {
            println!("  Empty password, leaving it unset.");
            AdminConfig::default()
        } else {
            AdminConfig {
                password_sha256: Some(sha256_hex(&password)),
            }
        }
    } else {
        AdminConfig::default()
    };

    println!();
    let data_file = prompt("Database file (leave empty for the default location): ")?;
    let data_file = if data_file.is_empty() {
        None
    } else {
        Some(PathBuf::from(data_file))
    };

    let default_config_path = default_path.unwrap_or_else(get_config_path);
    println!();
    let path_str = prompt_with_default(
        "Where should the config be saved?",
        &default_config_path.display().to_string(),
    )?;
    let config_path = PathBuf::from(&path_str);

    if config_path.exists() {
        let overwrite = prompt_yes_no(
            &format!(
                "Config already exists at {}. Overwrite?",
                config_path.display()
            ),
            false,
        )?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    let config = Config {
        data_file,
        admin,
        scoring,
    };

    let yaml = serde_saphyr::to_string(&config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(&config_path, &yaml)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!();
    println!("Config written to {}", config_path.display());
    typewriter("Weights in the config seed a new database. After that, change them with `transfer-rank weights set`.");
    println!("Run `transfer-rank add` or `transfer-rank import` to get started.");

    Ok(())
}
