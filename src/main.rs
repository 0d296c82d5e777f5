use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use layerbox::config::Config;
use layerbox::filetree::human_size;
use layerbox::image::Image;

fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let archive_path = args.next().context("usage: layerbox <image-archive.tar> [layer-index]")?;
    let layer_index: Option<usize> =
        args.next().map(|raw| raw.parse().context("layer index must be a number")).transpose()?;

    tracing::info!(archive = %archive_path, "loading image archive");
    let image = Image::open(&archive_path)
        .with_context(|| format!("unable to read image archive '{archive_path}'"))?;

    if image.layer_count() == 0 {
        anyhow::bail!("image archive '{archive_path}' contains no layers");
    }

    let tag = image.repo_tags.first().map(String::as_str).unwrap_or("<untagged>");
    println!("{tag} ({} layers)", image.layer_count());
    for layer in &image.layers {
        println!("  [{}] {:>10}  {}", layer.index, human_size(layer.size), layer.command);
    }

    let index = layer_index.unwrap_or(image.layer_count() - 1);
    let (mut view, failed) = image.layer_view(index)?;
    for failure in &failed {
        tracing::warn!(%failure, "path could not be applied");
    }

    view.set_sort_order(config.render.resolved_sort_order());
    println!();
    println!("layer {index} filesystem:");
    print!("{}", view.render_all(config.render.show_attributes));

    Ok(())
}
