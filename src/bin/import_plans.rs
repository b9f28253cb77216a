//! One-off bulk import of fitness plans from a text document.
//!
//! Usage: `import_plans <file>` or `PLAN_FILE=<file> import_plans`.
//! Every parsed plan is inserted as a draft; plans that already exist are
//! skipped.

use anyhow::{Context, Result, bail};
use fitness_hub::config::AppConfig;
use fitness_hub::error::AppError;
use fitness_hub::models::PlanStatus;
use fitness_hub::{db, env, plan_parser, telemetry};
use tracing::{info, warn};
use validator::Validate;

#[derive(Debug, Default)]
struct ImportSummary {
    parsed: usize,
    inserted: usize,
    duplicates: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_result = env::load_environment();
    let _telemetry = telemetry::init_tracing();
    env_result?;

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => match dotenvy::var("PLAN_FILE") {
            Ok(path) if !path.trim().is_empty() => path,
            _ => bail!("Usage: import_plans <file> (or set PLAN_FILE)"),
        },
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read plan file {}", path))?;

    let plans = plan_parser::parse_plans(&text);
    info!(path = %path, plans = plans.len(), "Parsed plan file");

    let config = AppConfig::from_env()?;
    let pool = db::connect(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let mut summary = ImportSummary {
        parsed: plans.len(),
        ..Default::default()
    };

    for mut plan in plans {
        plan.status = PlanStatus::Draft;

        if let Err(errors) = plan.validate() {
            warn!(title = %plan.title, errors = %errors, "Parsed plan failed validation");
            summary.failed += 1;
            continue;
        }

        match db::create_fitness_plan(&pool, &plan, None).await {
            Ok(created) => {
                info!(id = created.id, title = %created.title, "Imported plan");
                summary.inserted += 1;
            }
            Err(AppError::Conflict(_)) => {
                warn!(
                    title = %plan.title,
                    category = %plan.category,
                    level = %plan.level,
                    "Plan already exists, skipping"
                );
                summary.duplicates += 1;
            }
            Err(err) => {
                err.log_and_record("Plan import");
                summary.failed += 1;
            }
        }
    }

    println!(
        "Import finished: {} parsed, {} inserted, {} duplicates skipped, {} failed",
        summary.parsed, summary.inserted, summary.duplicates, summary.failed
    );

    Ok(())
}
