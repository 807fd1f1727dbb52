//! Text reports written during a run
//!
//! Layout under `output_dir/results{seed}/`:
//! - `RI_{seed}.txt`: `tick index category population death_rate` per category per sample
//! - `cells_position/cells_position_{tick}.txt`: `category x y z` per soma
//! - `migration_distance_{seed}.txt`: `category distance` per soma
//! - `swc_files/cell_{id}.swc`: one morphology per soma
//! - `summary.json`

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::core::config::OutputConfig;
use crate::core::error::Result;
use crate::core::types::{CategoryId, Tick};
use crate::ecs::world::World;
use crate::entity::SomaAgent;
use crate::output::morphology::{soma_morphology, write_swc};
use crate::output::summary::RunSummary;
use crate::simulation::regularity::RegularitySample;

pub fn write_positions<'a, W: Write>(
    out: &mut W,
    somas: impl IntoIterator<Item = &'a SomaAgent>,
) -> io::Result<()> {
    for soma in somas {
        writeln!(
            out,
            "{} {} {} {}",
            CategoryId::export_value(soma.category),
            soma.position.x,
            soma.position.y,
            soma.position.z
        )?;
    }
    Ok(())
}

pub fn write_regularity<W: Write>(
    out: &mut W,
    tick: Tick,
    samples: &[RegularitySample],
    death_rate: f64,
) -> io::Result<()> {
    for sample in samples {
        writeln!(
            out,
            "{} {} {} {} {}",
            tick, sample.index, sample.category, sample.population, death_rate
        )?;
    }
    Ok(())
}

pub fn write_distances<'a, W: Write>(
    out: &mut W,
    somas: impl IntoIterator<Item = &'a SomaAgent>,
) -> io::Result<()> {
    for soma in somas {
        writeln!(
            out,
            "{} {}",
            CategoryId::export_value(soma.category),
            soma.distance_travelled
        )?;
    }
    Ok(())
}

/// Owns the result directory of one run
pub struct ReportWriter {
    dir: PathBuf,
    seed: u64,
    output: OutputConfig,
    ri: Option<BufWriter<File>>,
}

impl ReportWriter {
    pub fn create(output: &OutputConfig, seed: u64) -> Result<Self> {
        let dir = output.output_dir.join(format!("results{}", seed));
        fs::create_dir_all(&dir)?;
        if output.write_positions {
            fs::create_dir_all(dir.join("cells_position"))?;
        }
        if output.write_swc {
            fs::create_dir_all(dir.join("swc_files"))?;
        }

        let ri = if output.write_ri {
            Some(BufWriter::new(File::create(dir.join(format!("RI_{}.txt", seed)))?))
        } else {
            None
        };
        tracing::info!("Writing results to {:?}", dir);

        Ok(Self {
            dir,
            seed,
            output: output.clone(),
            ri,
        })
    }

    pub fn record_sample(
        &mut self,
        tick: Tick,
        samples: &[RegularitySample],
        death_rate: f64,
        world: &World,
    ) -> Result<()> {
        if let Some(ri) = self.ri.as_mut() {
            write_regularity(ri, tick, samples, death_rate)?;
        }
        self.write_positions_at(tick, world)
    }

    pub fn write_positions_at(&self, tick: Tick, world: &World) -> Result<()> {
        if !self.output.write_positions {
            return Ok(());
        }
        let path = self
            .dir
            .join("cells_position")
            .join(format!("cells_position_{}.txt", tick));
        let mut out = BufWriter::new(File::create(path)?);
        write_positions(&mut out, world.somas())?;
        out.flush()?;
        Ok(())
    }

    fn write_morphologies(&self, world: &World) -> Result<usize> {
        let mut written = 0;
        for soma in world.somas() {
            let Some(nodes) = soma_morphology(world, soma.id) else {
                continue;
            };
            let path = self.dir.join("swc_files").join(format!("cell_{}.swc", soma.id.0));
            let mut out = BufWriter::new(File::create(path)?);
            write_swc(&mut out, &nodes)?;
            out.flush()?;
            written += 1;
        }
        Ok(written)
    }

    /// Write the end-of-run files and flush everything
    pub fn finish(mut self, world: &World, summary: &RunSummary) -> Result<()> {
        if let Some(mut ri) = self.ri.take() {
            ri.flush()?;
        }
        if self.output.write_distance {
            let path = self.dir.join(format!("migration_distance_{}.txt", self.seed));
            let mut out = BufWriter::new(File::create(path)?);
            write_distances(&mut out, world.somas())?;
            out.flush()?;
            tracing::info!("Migration distance exported");
        }
        if self.output.write_swc {
            let count = self.write_morphologies(world)?;
            tracing::info!("Morphologies exported ({} swc files)", count);
        }
        self.write_positions_at(world.current_tick, world)?;
        if self.output.write_summary {
            fs::write(self.dir.join("summary.json"), summary.to_json())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentId;
    use glam::DVec3;

    #[test]
    fn test_positions_use_minus_one_for_undetermined() {
        let somas = vec![
            SomaAgent::new(AgentId(1), DVec3::new(1.5, 2.0, 3.0), 7.0, None),
            SomaAgent::new(AgentId(2), DVec3::new(4.0, 5.0, 6.0), 7.0, Some(CategoryId(202))),
        ];
        let mut buffer = Vec::new();
        write_positions(&mut buffer, &somas).expect("write");
        assert_eq!(String::from_utf8(buffer).expect("utf8"), "-1 1.5 2 3\n202 4 5 6\n");
    }

    #[test]
    fn test_regularity_line_format() {
        let samples = [RegularitySample {
            category: CategoryId(203),
            index: 4.5,
            population: 120,
        }];
        let mut buffer = Vec::new();
        write_regularity(&mut buffer, 320, &samples, 12.5).expect("write");
        assert_eq!(String::from_utf8(buffer).expect("utf8"), "320 4.5 203 120 12.5\n");
    }

    #[test]
    fn test_distance_lines() {
        let mut soma = SomaAgent::new(AgentId(1), DVec3::ZERO, 7.0, Some(CategoryId(100)));
        soma.distance_travelled = 2.25;
        let mut buffer = Vec::new();
        write_distances(&mut buffer, [&soma]).expect("write");
        assert_eq!(String::from_utf8(buffer).expect("utf8"), "100 2.25\n");
    }
}
