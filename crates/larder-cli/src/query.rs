use std::sync::Arc;

use clap::Args;

use larder_catalog::{
    CatalogService, DayFilter, Page, PositionError, PositionPolicy, PositionProvider, Presenter,
    QuickFilter, ServiceFilter, SortKey, SystemClock, UserPosition,
};
use larder_source::ConfiguredSource;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Region slug (see `larder-cli regions`)
    pub region: String,

    /// Free-text search across name, address, postcode, borough, and area
    #[arg(long)]
    pub search: Option<String>,

    /// Borough filter ("all" passes everything)
    #[arg(long)]
    pub borough: Option<String>,

    /// Day filter: today, tomorrow, weekday, weekend
    #[arg(long)]
    pub day: Option<String>,

    /// Service filter: foodbank, meals, delivery, clothing, furniture, utilities
    #[arg(long)]
    pub service: Option<String>,

    /// Quick filter: open-now, free-only, walk-in, delivery
    #[arg(long)]
    pub quick: Option<String>,

    /// Sort key: distance, name, opening-soon, borough
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort by distance from "LAT,LNG"
    #[arg(long)]
    pub near: Option<String>,

    /// Show every match instead of the first page
    #[arg(long)]
    pub all: bool,
}

/// Position provider backed by a coordinate given on the command line.
struct CliPositionProvider(Option<UserPosition>);

impl PositionProvider for CliPositionProvider {
    async fn request(&self) -> Result<UserPosition, PositionError> {
        self.0.ok_or(PositionError::Unavailable)
    }
}

/// Presenter that keeps the latest page quiet until the command prints its
/// final result, while surfacing errors as they happen.
#[derive(Default)]
struct TermPresenter;

impl Presenter for TermPresenter {
    fn render(&mut self, _page: &Page) {}

    fn show_transient_error(&mut self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn show_load_error(&mut self, region: &str, message: &str) {
        eprintln!("error: failed to load '{region}': {message}");
    }
}

pub async fn run(args: QueryArgs) -> anyhow::Result<()> {
    let config = larder_core::load_app_config()?;
    let regions = larder_core::load_regions(&config.regions_path)?;
    let source = ConfiguredSource::from_regions(
        &regions,
        config.source_request_timeout_secs,
        &config.source_user_agent,
    )?;

    let near = args.near.as_deref().map(parse_near).transpose()?;

    let mut service = CatalogService::new(
        source,
        CliPositionProvider(near),
        TermPresenter,
        Arc::new(SystemClock),
        PositionPolicy::default(),
    );

    service.switch_region(&args.region).await?;

    if let Some(search) = &args.search {
        service.set_search(search);
    }
    if let Some(borough) = &args.borough {
        service.set_borough_filter(borough);
    }
    if let Some(day) = &args.day {
        service.set_day_filter(DayFilter::parse(day));
    }
    if let Some(kind) = &args.service {
        service.set_service_filter(ServiceFilter::parse(kind));
    }
    if let Some(quick) = &args.quick {
        service.set_quick_filter(QuickFilter::parse(quick));
    }
    if let Some(sort) = &args.sort {
        service.set_sort(SortKey::parse(sort));
    }
    if near.is_some() {
        service.request_position().await;
    }

    if args.all {
        while service.catalog().is_some_and(|c| c.has_more()) {
            service.load_more();
        }
    }

    let catalog = service
        .catalog()
        .ok_or_else(|| anyhow::anyhow!("no dataset loaded"))?;
    let page = catalog.page_view();

    for item in &page.items {
        let distance = item
            .distance_miles
            .map(|d| format!("  {d:.1} mi"))
            .unwrap_or_default();
        let place = if item.borough.is_empty() {
            String::new()
        } else {
            format!("  ({})", item.borough)
        };
        println!("{:<12} {}{place}{distance}", item.status_label, item.name);
        if let Some(next) = &item.next_opening {
            println!("{:<12}   {next}", "");
        }
    }

    println!(
        "\nShowing {} of {} matching locations ({} in region, {} open now)",
        page.items.len(),
        page.total_count,
        catalog.total_records(),
        catalog.open_now()
    );
    Ok(())
}

/// Parse a `"LAT,LNG"` pair.
fn parse_near(raw: &str) -> anyhow::Result<UserPosition> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("--near expects \"LAT,LNG\", got: {raw}"))?;
    let latitude: f64 = lat.trim().parse()?;
    let longitude: f64 = lng.trim().parse()?;
    anyhow::ensure!(
        latitude.is_finite() && longitude.is_finite(),
        "--near coordinates must be finite"
    );
    Ok(UserPosition {
        latitude,
        longitude,
    })
}
