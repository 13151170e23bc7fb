use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use shapetrace::{Bitmap, ImageJob, JobPreferences};

/// Approximate an image with geometric shapes and write the result.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Target image path.
    input: PathBuf,

    /// Where to write the approximated image.
    #[arg(short, long, default_value = "shapetrace.png")]
    output: PathBuf,

    /// Where to write the committed shapes as JSON.
    #[arg(long)]
    shapes: Option<PathBuf>,

    /// Number of shapes to add.
    #[arg(short = 'n', long, default_value_t = 200)]
    steps: usize,

    /// JSON preferences file; flags below override it.
    #[arg(short, long)]
    preferences: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Search threads per step (0 = one per core).
    #[arg(long)]
    threads: Option<u32>,

    /// Opacity of every shape (0-255).
    #[arg(long)]
    alpha: Option<u8>,

    /// Hill-climbing chains per step.
    #[arg(long)]
    candidates: Option<u32>,

    /// Mutations tried per chain.
    #[arg(long)]
    mutations: Option<u32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut prefs = match &args.preferences {
        Some(path) => JobPreferences::load(path)?,
        None => JobPreferences::default(),
    };
    if let Some(seed) = args.seed {
        prefs.set_seed(seed);
    }
    if let Some(threads) = args.threads {
        prefs.set_max_threads(threads);
    }
    if let Some(alpha) = args.alpha {
        prefs.set_shape_alpha(alpha);
    }
    if let Some(candidates) = args.candidates {
        prefs.set_candidate_shape_count(candidates);
    }
    if let Some(mutations) = args.mutations {
        prefs.set_max_shape_mutations(mutations);
    }

    println!("reading {}", args.input.display());
    let target = Bitmap::open(&args.input)?;
    println!("target {}x{}", target.width(), target.height());

    let mut job = ImageJob::new(target, None)?;
    job.apply_preferences(&prefs)?;
    println!("{}: initial score {:.6}", job.display_name(), job.score());

    let started = Instant::now();
    if args.steps > 0 {
        job.start()?;
    }
    while job.is_stepping() {
        // let the step in flight be the last one
        if job.shapes().len() + 1 >= args.steps {
            job.stop();
        }
        job.wait()?;

        let n = job.shapes().len();
        if n % 10 == 0 || n == args.steps {
            let m = job.metrics();
            println!(
                "shape {n:>5}  score {:.6}  psnr {:.2} dB  similarity {:.2}%  ({:.1}s)",
                m.rms,
                m.psnr,
                m.similarity,
                started.elapsed().as_secs_f64()
            );
        }
    }

    job.current().save(&args.output)?;
    println!("wrote {}", args.output.display());

    if let Some(path) = &args.shapes {
        std::fs::write(path, serde_json::to_string_pretty(job.shapes())?)?;
        println!("wrote {} shapes to {}", job.shapes().len(), path.display());
    }
    Ok(())
}
