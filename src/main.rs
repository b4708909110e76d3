use anyhow::{bail, Context};
use earthdata::io::{DatasetAccessor, RestClient, RestClientOptions};
use earthdata::viz::{render_matrix, BarChartParams, RenderParams};
use earthdata::Settings;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("failed to load settings")?;
    if settings.service.access_token.is_empty() {
        bail!("no access token configured, set EARTHDATA__SERVICE__ACCESS_TOKEN");
    }

    let client = RestClient::new(
        &settings.service.project,
        &settings.service.access_token,
        RestClientOptions {
            endpoint: settings.service.endpoint.clone(),
            timeout: Duration::from_secs(settings.service.timeout_secs),
            ..RestClientOptions::default()
        },
    )?;

    let mut accessor = DatasetAccessor::new(client).with_scale(settings.region.scale);
    accessor.select_dataset(
        &settings.dataset.name,
        settings.dataset.start_date,
        settings.dataset.end_date,
        &settings.dataset.band,
    );

    let region = &settings.region;
    let series = match accessor.fetch_series(region.lat, region.lon, region.width, region.height)? {
        Some(series) => series,
        None => {
            log::warn!("The service returned no observations for this region");
            return Ok(());
        }
    };

    std::fs::create_dir_all(&settings.output.directory).with_context(|| {
        format!(
            "failed to create output directory {}",
            settings.output.directory.display()
        )
    })?;

    let render_params = RenderParams {
        pixel_scale: settings.output.pixel_scale,
        ..RenderParams::default()
    };
    if let Some(first) = series.entries.first() {
        let path = settings
            .output
            .directory
            .join(format!("{}_{}.png", settings.dataset.band, first.id));
        render_matrix(&first.data, series.rows, series.cols, &path, &render_params)?;
    }

    let delta = series.delta_series()?;
    for (year, percentage) in delta.iter() {
        log::info!("{}: {:+.2}%", year, percentage);
    }

    let chart = settings.output.directory.join("area_increment.svg");
    delta.render(&chart, &BarChartParams::default())?;

    Ok(())
}
