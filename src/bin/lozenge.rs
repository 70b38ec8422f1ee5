use anyhow::Result;
use argh::FromArgs;
use log::*;
use lozenge_tiling::*;
use simple_stopwatch::Stopwatch;

#[derive(FromArgs)]
/// toplevel
struct TopLevel {
    #[argh(subcommand)]
    nested: SubCommandEnum,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum SubCommandEnum {
    Grow(SubCommandGrow),
    Markov(SubCommandMarkov),
    Bench(SubCommandBench),
}

#[derive(FromArgs, PartialEq, Debug)]
/// grow a random stack by adding boxes only, export voxels
#[argh(subcommand, name = "grow")]
struct SubCommandGrow {
    /// toml config file
    #[argh(option)]
    config: Option<String>,

    /// period shift along x
    #[argh(option)]
    x_shift: Option<i32>,

    /// period shift along y
    #[argh(option)]
    y_shift: Option<i32>,

    /// period height along z
    #[argh(option)]
    z_height: Option<i32>,

    /// draw distance along x
    #[argh(option)]
    draw_x: Option<i32>,

    /// draw distance along y
    #[argh(option)]
    draw_y: Option<i32>,

    /// draw distance along z
    #[argh(option)]
    draw_z: Option<i32>,

    /// number of boxes to add
    #[argh(option)]
    iterations: Option<usize>,

    /// rng seed
    #[argh(option)]
    seed: Option<u64>,

    /// output directory
    #[argh(option)]
    outdir: String,
}

#[derive(FromArgs, PartialEq, Debug)]
/// sample a stack with the birth/death chain, export voxels
#[argh(subcommand, name = "markov")]
struct SubCommandMarkov {
    /// toml config file
    #[argh(option)]
    config: Option<String>,

    /// period shift along x
    #[argh(option)]
    x_shift: Option<i32>,

    /// period shift along y
    #[argh(option)]
    y_shift: Option<i32>,

    /// period height along z
    #[argh(option)]
    z_height: Option<i32>,

    /// draw distance along x
    #[argh(option)]
    draw_x: Option<i32>,

    /// draw distance along y
    #[argh(option)]
    draw_y: Option<i32>,

    /// draw distance along z
    #[argh(option)]
    draw_z: Option<i32>,

    /// number of chain steps
    #[argh(option)]
    iterations: Option<usize>,

    /// growth bias in [0, 1]
    #[argh(option)]
    q: Option<f64>,

    /// rng seed
    #[argh(option)]
    seed: Option<u64>,

    /// output directory
    #[argh(option)]
    outdir: String,
}

#[derive(FromArgs, PartialEq, Debug)]
/// time the birth/death chain
#[argh(subcommand, name = "bench")]
struct SubCommandBench {
    /// number of chain steps
    #[argh(option, default = "10000")]
    iterations: usize,

    /// growth bias in [0, 1]
    #[argh(option, default = "0.9")]
    q: f64,
}

#[derive(Default)]
struct Overrides {
    periods: [Option<i32>; 3],
    draw_distance: [Option<i32>; 3],
    iterations: Option<usize>,
    q: Option<f64>,
    seed: Option<u64>,
}

fn load_config(path: Option<&str>, overrides: Overrides) -> Result<TilingConfig> {
    let mut config = match path {
        Some(path) => TilingConfig::load(path)?,
        None => TilingConfig::default(),
    };

    let [x_shift, y_shift, z_height] = overrides.periods;
    config.periods.x_shift = x_shift.unwrap_or(config.periods.x_shift);
    config.periods.y_shift = y_shift.unwrap_or(config.periods.y_shift);
    config.periods.z_height = z_height.unwrap_or(config.periods.z_height);

    let [x, y, z] = overrides.draw_distance;
    config.draw_distance.x = x.unwrap_or(config.draw_distance.x);
    config.draw_distance.y = y.unwrap_or(config.draw_distance.y);
    config.draw_distance.z = z.unwrap_or(config.draw_distance.z);

    config.iterations = overrides.iterations.unwrap_or(config.iterations);
    config.q = overrides.q.unwrap_or(config.q);
    config.seed = overrides.seed.or(config.seed);

    config.validate()?;
    Ok(config)
}

fn build_tiling(config: &TilingConfig) -> Result<PeriodicLozengeTiling> {
    let tiling = match config.seed {
        Some(seed) => PeriodicLozengeTiling::with_seed(config.periods, config.draw_distance, seed)?,
        None => PeriodicLozengeTiling::new(config.periods, config.draw_distance)?,
    };
    Ok(tiling)
}

fn export(tiling: &PeriodicLozengeTiling, outdir: &str) -> Result<()> {
    let sw = Stopwatch::start_new();
    let boxes = tiling.visible_box_voxels();
    let walls = tiling.visible_wall_voxels();
    info!(
        "export: took={:.2}ms, boxes={}, walls={}, window={:?}",
        sw.ms(),
        boxes.len(),
        walls.len(),
        tiling.voxel_window()
    );

    let sw = Stopwatch::start_new();
    std::fs::create_dir_all(outdir)?;
    let boxes_filename = format!("{}/boxes.txt", outdir);
    let walls_filename = format!("{}/walls.txt", outdir);
    save_voxels(&boxes_filename, &boxes)?;
    save_voxels(&walls_filename, &walls)?;
    info!(
        "save_voxels: took={:.2}ms, filename={}, {}",
        sw.ms(),
        boxes_filename,
        walls_filename
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let opt: TopLevel = argh::from_env();

    match opt.nested {
        SubCommandEnum::Grow(opt) => {
            let config = load_config(
                opt.config.as_deref(),
                Overrides {
                    periods: [opt.x_shift, opt.y_shift, opt.z_height],
                    draw_distance: [opt.draw_x, opt.draw_y, opt.draw_z],
                    iterations: opt.iterations,
                    seed: opt.seed,
                    ..Default::default()
                },
            )?;
            let mut tiling = build_tiling(&config)?;

            let sw = Stopwatch::start_new();
            tiling.generate_by_adding_only(config.iterations);
            info!(
                "generate_by_adding_only: took={:.2}ms, boxes={}, periods={:?}",
                sw.ms(),
                tiling.period_box_count(),
                config.periods
            );

            export(&tiling, &opt.outdir)
        }

        SubCommandEnum::Markov(opt) => {
            let config = load_config(
                opt.config.as_deref(),
                Overrides {
                    periods: [opt.x_shift, opt.y_shift, opt.z_height],
                    draw_distance: [opt.draw_x, opt.draw_y, opt.draw_z],
                    iterations: opt.iterations,
                    q: opt.q,
                    seed: opt.seed,
                },
            )?;
            let mut tiling = build_tiling(&config)?;

            let sw = Stopwatch::start_new();
            tiling.generate_with_markov_chain(config.iterations, config.q)?;
            info!(
                "generate_with_markov_chain: took={:.2}ms, boxes={}, addable={}, removable={}, q={}",
                sw.ms(),
                tiling.period_box_count(),
                tiling.addable_box_count(),
                tiling.removable_box_count(),
                config.q
            );

            export(&tiling, &opt.outdir)
        }

        SubCommandEnum::Bench(opt) => {
            let config = TilingConfig::default();
            let mut tiling = build_tiling(&config)?;

            let sw = Stopwatch::start_new();
            tiling.generate_with_markov_chain(opt.iterations, opt.q)?;
            println!("Duration: {:.2}ms", sw.ms());
            info!(
                "bench: iterations={}, q={}, boxes={}",
                opt.iterations,
                opt.q,
                tiling.period_box_count()
            );
            Ok(())
        }
    }
}
