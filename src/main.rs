use clap::Parser;

mod cli;
mod config;
mod error;
mod es;
mod provision;

use es::templates::{all_templates, sample_params, QueryTemplate};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("places_search_init=info".parse()?),
        )
        .init();

    let cli = cli::Cli::parse();

    // Load configuration (env vars override TOML, flags override both)
    let mut config = config::AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let templates = all_templates();
    for template in &templates {
        template.validate()?;
    }

    if cli.dry_run {
        tracing::info!("Running in DRY RUN mode - nothing will be sent to Elasticsearch");
        return print_payloads(&config.elasticsearch.index_name, &templates);
    }

    tracing::info!("Elasticsearch URL: {}", config.elasticsearch.url);
    tracing::info!(
        "Index: {}, failure mode: {:?}",
        config.elasticsearch.index_name,
        config.provision.failure_mode
    );

    let client = es::client::create_client(&config.elasticsearch)?;
    let provisioner = provision::Provisioner::new(
        es::client::EsEngine::new(client),
        config.elasticsearch.index_name,
        templates,
        config.readiness,
        config.provision,
    );

    let report = provisioner.run().await?;
    tracing::info!("Health checks issued: {}", report.health_checks);
    for outcome in &report.outcomes {
        tracing::info!("  - {}: {:?}", outcome.step, outcome.status);
    }

    if !report.is_success() {
        let failed: Vec<&str> = report.failures().map(|o| o.step.as_str()).collect();
        anyhow::bail!("Provisioning incomplete, failed steps: {}", failed.join(", "));
    }

    tracing::info!("Elasticsearch initialization finished successfully.");
    Ok(())
}

fn print_payloads(index_name: &str, templates: &[QueryTemplate]) -> anyhow::Result<()> {
    let index = es::mapping::index_settings_and_mappings();
    println!("PUT /{index_name}");
    println!("{}", serde_json::to_string_pretty(&index)?);

    let params = sample_params();
    for template in templates {
        println!("\nPUT /_scripts/{}", template.name);
        println!("{}", serde_json::to_string_pretty(&template.stored_script()?)?);
        println!(
            "# rendered with {}:\n{}",
            serde_json::Value::Object(params.clone()),
            serde_json::to_string_pretty(&template.render(&params)?)?
        );
    }
    Ok(())
}
