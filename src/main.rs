// Main entry point - Dependency injection and a thin command-line driver
use anyhow::{Context, bail};
use sgs_timeseries::{SeriesRequest, SeriesService, load_settings};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  sgs-timeseries fetch <series> [start] [end]
  sgs-timeseries last <series> <n>
  sgs-timeseries info <code>
  sgs-timeseries search <term>
  sgs-timeseries purge-cache
  sgs-timeseries clear-cache";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Create service
    let service = SeriesService::from_settings(&settings)?;
    if settings.cache.enabled {
        if let Err(e) = service.enable_cache(settings.cache_path()).await {
            tracing::warn!("Continuing without cache: {}", e);
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["fetch", series, rest @ ..] if rest.len() <= 2 => {
            let start = rest.first().copied();
            let end = rest.get(1).copied();
            let request = SeriesRequest::parse(*series, start, end, None)?;
            print_points(&service, &request).await?;
        }
        ["last", series, n] => {
            let n = n.parse().with_context(|| format!("invalid count '{n}'"))?;
            let request = SeriesRequest::parse(*series, None, None, Some(n))?;
            print_points(&service, &request).await?;
        }
        ["info", code] => {
            let code: u32 = code.parse().with_context(|| format!("invalid code '{code}'"))?;
            match service.metadata(code) {
                Some(entry) => println!("{}", serde_json::to_string_pretty(entry)?),
                None => bail!("series {code} is not in the catalog"),
            }
        }
        ["search", term] => {
            for entry in service.search_catalog(term) {
                println!("{:>6}  {:<32} {}", entry.code, entry.canonical_name, entry.periodicity);
            }
        }
        ["purge-cache"] => {
            let removed = service.purge_expired().await?;
            println!("{removed} expired entries removed");
        }
        ["clear-cache"] => {
            let removed = service.clear_cache().await?;
            println!("{removed} entries removed");
        }
        _ => bail!("{USAGE}"),
    }

    Ok(())
}

async fn print_points(service: &SeriesService, request: &SeriesRequest) -> anyhow::Result<()> {
    let points = service.fetch(request).await?;
    for point in &points {
        println!("{}\t{}", point.date, point.value);
    }
    tracing::info!("{} points for '{}'", points.len(), request.identifier);
    Ok(())
}
