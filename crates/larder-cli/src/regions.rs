/// Print the configured regions with their slugs and sources.
pub fn run() -> anyhow::Result<()> {
    let config = larder_core::load_app_config()?;
    let regions = larder_core::load_regions(&config.regions_path)?;

    for region in &regions.regions {
        let kind = if region.is_remote() { "remote" } else { "local" };
        println!("{:<24} {:<24} [{kind}] {}", region.slug(), region.name, region.source);
    }
    Ok(())
}
