//! Write out the per-pointing coordinates of stack points.

use std::{
    fs::{create_dir_all, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, trace};

use crate::coords::{Coords, PointingStack};

const HEADER: &str =
    "# source_index x[deg] y[deg] weight dx[deg] dy[deg] omega_x omega_y omega_z";

/// The file that [`write_coords`] uses for a pointing.
pub fn pointing_file(dir: &Path, pointing: usize) -> PathBuf {
    dir.join(format!("pointing_{pointing}.txt"))
}

/// Write a text table for each pointing in `coords` into `dir`, creating `dir`
/// if necessary. Angles are written in degrees.
///
/// # Returns
///
/// * The files that were written, in pointing order.
pub fn write_coords(coords: &Coords, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    create_dir_all(dir)?;
    let mut files = Vec::with_capacity(coords.num_pointings());
    for (i_pointing, stack) in coords.pointings().iter().enumerate() {
        let file = pointing_file(dir, i_pointing);
        debug!("Writing pointing {i_pointing} to {}", file.display());
        let mut writer = BufWriter::new(File::create(&file)?);
        write_pointing(&mut writer, stack)?;
        writer.flush()?;
        files.push(file);
    }
    Ok(files)
}

fn write_pointing<W: Write>(writer: &mut W, stack: &PointingStack) -> std::io::Result<()> {
    writeln!(
        writer,
        "# phase centre: RA {} deg, Dec {} deg",
        stack.phase_centre.ra.to_degrees(),
        stack.phase_centre.dec.to_degrees()
    )?;
    writeln!(writer, "{HEADER}")?;
    for p in &stack.points {
        writeln!(
            writer,
            "{} {} {} {} {} {} {} {} {}",
            p.source_index,
            p.x.to_degrees(),
            p.y.to_degrees(),
            p.weight,
            p.dx.to_degrees(),
            p.dy.to_degrees(),
            p.lmn.l,
            p.lmn.m,
            p.lmn.n
        )?;
    }
    trace!("Wrote {} rows", stack.len());
    Ok(())
}
