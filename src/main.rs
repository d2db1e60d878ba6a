use std::path::PathBuf;

use clap::{AppSettings, Parser};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use thiserror::Error;

use stacker::{
    beam::{BeamError, BoxBeam, FitsBeam, GaussianBeam, PrimaryBeam},
    catalog::CoordUnit,
    coords::{Coords, CoordsError},
    read::{ms::MsReader, uvfits::UvfitsReader, PointingRead, ReadError},
    write::write_coords,
    ObsContext,
};

#[derive(Parser)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    /// The catalogue of positions to stack. Each line is "x y weight".
    catalogue: PathBuf,

    /// The visibilities (measurement set or uvfits) whose pointings are used.
    data: PathBuf,

    /// Write each pointing's stack points to this directory.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Catalogue positions are in radians rather than degrees.
    #[clap(long)]
    radians: bool,

    /// Use a primary beam image (FITS) for all pointings. Takes precedence
    /// over the other beam options.
    #[clap(long)]
    beam_fits: Option<PathBuf>,

    /// Use a box-shaped beam with this half width [degrees]. Takes precedence
    /// over --beam-fwhm.
    #[clap(long)]
    beam_radius: Option<f64>,

    /// Use a Gaussian beam with this FWHM [degrees].
    #[clap(long)]
    beam_fwhm: Option<f64>,

    /// The dish diameter used to derive a Gaussian beam [metres]. Overrides
    /// the value in the visibilities.
    #[clap(long)]
    dish_diameter: Option<f64>,

    /// Beam gains at or below this are outside the beam. Not used by box
    /// beams.
    #[clap(long)]
    beam_cutoff: Option<f64>,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Disable progress bars.
    #[clap(long)]
    no_progress_bars: bool,
}

#[derive(Error, Debug)]
enum StackerError {
    #[error("Don't know how to read '{0}'; expected a .ms or .uvfits")]
    UnknownInputType(PathBuf),

    #[error("--beam-cutoff can't be used with a box beam (--beam-radius)")]
    CutoffWithBoxBeam,

    #[error("No beam was specified and the dish diameter is unknown; use --dish-diameter")]
    NoDishDiameter,

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Beam(#[from] BeamError),

    #[error(transparent)]
    Coords(#[from] CoordsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), StackerError> {
    let args = Args::parse();
    setup_logging(args.verbosity);

    let (reader, obs_context): (Box<dyn PointingRead>, ObsContext) =
        match args.data.extension().and_then(|os_str| os_str.to_str()) {
            Some("uvfits" | "uvf") => {
                let r = UvfitsReader::new(&args.data)?;
                let o = r.get_obs_context().clone();
                (Box::new(r) as Box<dyn PointingRead>, o)
            }
            Some("ms") => {
                let r = MsReader::new(&args.data)?;
                let o = r.get_obs_context().clone();
                (Box::new(r) as Box<dyn PointingRead>, o)
            }
            _ => return Err(StackerError::UnknownInputType(args.data.clone())),
        };
    info!("Input type: {:?}", reader.get_input_data_type());
    info!("Number of pointings: {}", reader.num_pointings());

    let beam = make_beam(&args, &obs_context)?;

    let unit = if args.radians {
        CoordUnit::Radians
    } else {
        CoordUnit::Degrees
    };
    let mut coords = Coords::from_file(&args.catalogue, unit)?;
    info!("Catalogue sources: {}", coords.raw().len());

    let progress = ProgressBar::with_draw_target(
        Some(reader.num_pointings() as _),
        if args.no_progress_bars {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stdout()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} pointings ({elapsed_precise}<{eta_precise})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    )
    .with_message("Selecting sources");
    coords.compute_coords_with_progress(reader.as_ref(), beam.as_ref(), Some(progress.clone()))?;
    progress.abandon_with_message("Finished selecting sources");

    for (i_pointing, stack) in coords.pointings().iter().enumerate() {
        info!(
            "Pointing {i_pointing} (RA {:.4} deg, Dec {:.4} deg): {} sources",
            stack.phase_centre.ra.to_degrees(),
            stack.phase_centre.dec.to_degrees(),
            stack.len()
        );
    }
    info!(
        "Sources visible in at least one pointing: {}/{}",
        coords.num_stack_points_visible(),
        coords.raw().len()
    );

    if let Some(output) = args.output.as_ref() {
        let files = write_coords(&coords, output)?;
        info!("Wrote {} files to {}", files.len(), output.display());
    }

    Ok(())
}

/// Pick a beam from the command-line arguments, falling back on a Gaussian
/// derived from the dish size and the mean observing frequency.
fn make_beam(args: &Args, obs_context: &ObsContext) -> Result<Box<dyn PrimaryBeam>, StackerError> {
    let beam: Box<dyn PrimaryBeam> = if let Some(file) = args.beam_fits.as_ref() {
        let beam = FitsBeam::new(file)?;
        match args.beam_cutoff {
            Some(c) => Box::new(beam.with_cutoff(c)),
            None => Box::new(beam),
        }
    } else if let Some(radius) = args.beam_radius {
        if args.beam_cutoff.is_some() {
            return Err(StackerError::CutoffWithBoxBeam);
        }
        info!("Using a box beam with a half width of {radius} deg");
        Box::new(BoxBeam::from_degrees(radius))
    } else {
        let beam = match args.beam_fwhm {
            Some(fwhm) => GaussianBeam::new(fwhm.to_radians())?,
            None => {
                let dish_diameter = args
                    .dish_diameter
                    .or(obs_context.dish_diameter)
                    .ok_or(StackerError::NoDishDiameter)?;
                GaussianBeam::from_dish(obs_context.mean_freq(), dish_diameter)?
            }
        };
        info!("Using a Gaussian beam with a FWHM of {:.4} deg", beam.fwhm.to_degrees());
        match args.beam_cutoff {
            Some(c) => Box::new(beam.with_cutoff(c)),
            None => Box::new(beam),
        }
    };
    Ok(beam)
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();
}

#[cfg(test)]
mod tests {
    use marlu::RADec;
    use vec1::vec1;

    use super::*;

    fn obs_context(dish_diameter: Option<f64>) -> ObsContext {
        ObsContext {
            phase_centres: vec1![RADec::from_degrees(0.0, -27.0)],
            fine_chan_freqs: vec1![100e6, 200e6],
            dish_diameter,
        }
    }

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["stacker", "cat.txt", "data.ms"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_box_beam_rejects_cutoff() {
        let result = make_beam(
            &args(&["--beam-radius", "2", "--beam-cutoff", "0.1"]),
            &obs_context(None),
        );
        assert!(matches!(result, Err(StackerError::CutoffWithBoxBeam)));
    }

    #[test]
    fn test_box_beam() {
        let beam = make_beam(&args(&["--beam-radius", "2"]), &obs_context(None)).unwrap();
        assert!(beam.is_inside_beam(1.9_f64.to_radians(), 0.0));
        assert!(!beam.is_inside_beam(2.1_f64.to_radians(), 0.0));
    }

    #[test]
    fn test_gaussian_beam_cutoff() {
        let beam = make_beam(
            &args(&["--beam-fwhm", "10", "--beam-cutoff", "0.5"]),
            &obs_context(None),
        )
        .unwrap();
        assert_eq!(beam.cutoff(), 0.5);
        // Half power at half the FWHM.
        assert!(beam.is_inside_beam(4.9_f64.to_radians(), 0.0));
        assert!(!beam.is_inside_beam(5.1_f64.to_radians(), 0.0));
    }

    #[test]
    fn test_beam_needs_dish_diameter() {
        let result = make_beam(&args(&[]), &obs_context(None));
        assert!(matches!(result, Err(StackerError::NoDishDiameter)));
        assert!(make_beam(&args(&[]), &obs_context(Some(15.0))).is_ok());
        assert!(make_beam(&args(&["--dish-diameter", "15"]), &obs_context(None)).is_ok());
    }
}
