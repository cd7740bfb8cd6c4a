use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use microbiome_portal::api::{ApiResolver, ReportKind, Resolved};
use microbiome_portal::app::Portal;
use microbiome_portal::config::{Config, LaunchContext};
use microbiome_portal::domain::HealthDomain;
use microbiome_portal::logging::{self, obj, v_str, Area, Level};
use microbiome_portal::model::TrialFilters;
use microbiome_portal::store::MockPatientStore;

fn print_usage() {
    eprintln!("Usage: microbiome-portal [--launch <url-or-query>] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  dashboard                 Load the dashboard for the launch customer");
    eprintln!("  modal <content>           Open a modal (domain, overall, or raw payload)");
    eprintln!("  recommendations <domain>  Recommendations for one domain");
    eprintln!("  trials [domain]           Clinical trials (eligible only when a domain is given)");
    eprintln!("  report full               Generate the full report");
    eprintln!("  report <domain>...        Generate a report for the given domains");
    eprintln!("  customers                 List the built-in test customers");
    eprintln!("  health                    Probe the backend");
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn emit_resolved<T: Serialize>(resolved: Resolved<T>) -> Result<()> {
    let error = resolved.error_message();
    let data = match resolved.outcome {
        Ok(v) => serde_json::to_value(v)?,
        Err(_) => serde_json::Value::Null,
    };
    emit(&json!({
        "source": resolved.source,
        "error": error,
        "data": data,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let launch = match args.iter().position(|a| a == "--launch") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--launch needs a value");
            }
            let raw = args.remove(i + 1);
            args.remove(i);
            LaunchContext::parse(&raw)
        }
        None => LaunchContext::default(),
    };
    if args.is_empty() {
        print_usage();
        std::process::exit(1);
    }

    let cfg = Config::from_env();
    let store = Arc::new(MockPatientStore::load_with_default(cfg.default_customer_id).context("loading embedded dataset")?);
    logging::log(
        Level::Info,
        Area::System,
        "startup",
        obj(&[
            ("api_base", v_str(&cfg.api_base)),
            ("command", v_str(&args[0])),
        ]),
    );

    if args[0] == "customers" {
        return emit(&json!({
            "customers": store.available_customers(),
            "differences": store.customer_differences(),
        }));
    }

    let backend = Arc::new(ApiResolver::new(&cfg, Arc::clone(&store)));
    let portal = Portal::new(backend, store, cfg);
    // pre-warm runs detached; the process does not wait for it
    let _prewarm = portal.initialize(&launch).await;

    match args[0].as_str() {
        "dashboard" => {
            let state = portal.state();
            emit(&json!({
                "customer_id": state.customer_id,
                "api_connected": state.api_connected,
                "error": state.error,
                "user": state.user,
                "health_data": state.health_data,
                "performance": portal.domain_performance(),
                "analysis": portal.analysis_cards(),
            }))
        }
        "modal" => {
            let Some(content) = args.get(1) else {
                bail!("modal needs <content>");
            };
            portal.open_modal(content, "Details").await;
            match portal.modal_view() {
                Some(view) => emit(&view),
                None => emit(&portal.state().modal),
            }
        }
        "recommendations" => {
            let domain = args.get(1).map(String::as_str).unwrap_or("gut");
            emit_resolved(portal.recommendations(domain).await)
        }
        "trials" => match args.get(1) {
            Some(domain) => emit_resolved(portal.domain_trials(domain).await),
            None => emit_resolved(portal.trials(&TrialFilters::default()).await),
        },
        "report" => {
            let kind = match args.get(1).map(String::as_str) {
                None => bail!("report needs 'full' or one or more domains"),
                Some("full") => ReportKind::Full,
                Some(_) => {
                    let mut domains = Vec::new();
                    for raw in &args[1..] {
                        match HealthDomain::parse(raw) {
                            Some(d) => domains.push(d),
                            None => bail!("unknown domain: {}", raw),
                        }
                    }
                    ReportKind::Domains(domains)
                }
            };
            match portal.download_report(&kind).await {
                Ok(saved) => emit(&saved),
                Err(err) => bail!("{}", err),
            }
        }
        "health" => emit(&json!({ "connected": portal.check_connection().await })),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }
}
