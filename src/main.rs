use anyhow::Context;
use colored::Colorize;
use pr_orchestrator::{AnalyzePrOptions, Orchestrator, OrchestratorConfig, RunStatus};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env when present.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let pr_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PR_AUDIT_PR_URL").ok())
        .context("usage: pr-audit-backend <github pull request url>")?;

    let config = OrchestratorConfig::from_env();
    info!(work_dir = %config.work_dir.display(), "starting pr analysis");

    let orchestrator = Orchestrator::new(config).await;
    let report = orchestrator.run(&pr_url, &AnalyzePrOptions::default()).await;

    match report.status {
        RunStatus::Success => println!("{} {}", "analysis complete:".green(), report.repo),
        RunStatus::Partial => println!(
            "{} {} ({} tool failures)",
            "analysis partial:".yellow(),
            report.repo,
            report.errors.len()
        ),
        RunStatus::Failure => {
            println!("{} {}", "analysis failed:".red(), report.errors.join("; "));
            std::process::exit(1);
        }
    }

    if let Some(comparison) = &report.comparison {
        let m = &comparison.metrics;
        println!(
            "  new: {}  fixed: {}  unchanged: {}",
            comparison.new_issues.len().to_string().red(),
            comparison.fixed_issues.len().to_string().green(),
            comparison.unchanged_issues.len()
        );
        println!(
            "  scores: security {:.0}, quality {:.0}, performance {:.0}, overall {:.0}",
            m.security_score, m.quality_score, m.performance_score, m.overall_score
        );
        println!(
            "  risk: {:?}  impact: {:.1}  improvement: {:.2}",
            m.risk_level, report.impact_score, m.improvement_rate
        );
    }

    let stats = orchestrator.cache().stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        errors = stats.errors,
        "cache statistics"
    );

    Ok(())
}
