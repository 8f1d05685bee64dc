//! Subcommands.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use tracing::info;

use kiwi_client::{KiwiClient, DEFAULT_MAX_SIZE};
use kiwi_geometry::{FilterOptions, ThresholdMode};

use crate::output::{print_json, write_png};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List projects as JSON
    Projects,

    /// List the annotations of a project that overlap a tile
    Annotations {
        #[arg(long)]
        project: i64,

        /// Tile id as z/x/y
        #[arg(long)]
        tile: String,

        /// Minimum fraction of each annotation inside the tile
        #[arg(long, default_value_t = 0.2)]
        threshold: f64,

        /// Keep annotations exactly at the threshold
        #[arg(long)]
        inclusive: bool,
    },

    /// Stitch a padded super-tile and write it as PNG
    SuperTile {
        #[arg(long)]
        imagery: i64,

        /// Tile id as z/x/y
        #[arg(long)]
        tile: String,

        /// Zoom of the tiles to stitch
        #[arg(long)]
        max_zoom: u32,

        /// Border in pixels taken from neighbouring tiles
        #[arg(long, default_value_t = 0)]
        padding: u32,

        #[arg(long)]
        out: PathBuf,
    },

    /// Extract the image of a labeling task and write it as PNG
    TaskImage {
        #[arg(long)]
        project: i64,

        #[arg(long)]
        queue: i64,

        #[arg(long)]
        task: i64,

        #[arg(long)]
        imagery: i64,

        #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
        max_size: u32,

        #[arg(long)]
        out: PathBuf,
    },
}

pub async fn run(client: &KiwiClient, command: Command) -> Result<()> {
    match command {
        Command::Projects => {
            let projects = client.get_projects().await?;
            print_json(&projects)
        }

        Command::Annotations {
            project,
            tile,
            threshold,
            inclusive,
        } => {
            let mode = if inclusive {
                ThresholdMode::Inclusive
            } else {
                ThresholdMode::Exclusive
            };
            let options = FilterOptions::new(threshold).with_mode(mode);
            let annotations = client
                .get_annotations_for_tile_with(project, &tile, &options)
                .await
                .with_context(|| format!("Failed to list annotations for tile {}", tile))?;
            info!(count = annotations.len(), tile = %tile, "Selected annotations");
            print_json(&annotations)
        }

        Command::SuperTile {
            imagery,
            tile,
            max_zoom,
            padding,
            out,
        } => {
            let raster = client
                .get_super_tile(&tile, imagery, max_zoom, padding)
                .await
                .with_context(|| format!("Failed to build super-tile {}", tile))?;
            write_png(&raster, &out)?;
            info!(path = %out.display(), width = raster.width(), "Wrote super-tile");
            Ok(())
        }

        Command::TaskImage {
            project,
            queue,
            task,
            imagery,
            max_size,
            out,
        } => {
            let queues = client.get_labeling_queues(project).await?;
            let queue = queues
                .iter()
                .find(|q| q.id == queue)
                .ok_or_else(|| anyhow!("Labeling queue {} not found in project {}", queue, project))?;
            let task = queue
                .task(task)
                .ok_or_else(|| anyhow!("Task {} not found in queue {}", task, queue.id))?;

            let layers = client.get_imagery(project).await?;
            let layer = layers
                .iter()
                .find(|l| l.id == imagery)
                .ok_or_else(|| anyhow!("Imagery {} not found in project {}", imagery, project))?;

            let raster = client
                .get_image_for_task(layer, &task.coordinates, max_size)
                .await
                .with_context(|| format!("Failed to extract image for task {}", task.id))?;
            write_png(&raster, &out)?;
            info!(path = %out.display(), task = task.id, "Wrote task image");
            Ok(())
        }
    }
}
