use std::num::NonZeroUsize;
use std::time::Instant;
use clap::Parser;
use glam::{Mat4, Vec3};
use animrt_3l14::character::Character;
use animrt_3l14::millipede::{JointBoxes, Millipede, MAX_SLICES};
use anim_3l14::skeleton_utils::{compute_posture_bounds, compute_skeleton_bounds};
use nab_3l14::app::{AppRun, ExitReason};
use nab_3l14::timing::{Clock, FSeconds};

const GRID_WIDTH: usize = 16;
const GRID_SPACING: f32 = 2.0;

#[derive(Debug, Parser)]
struct CliArgs
{
    /// Number of independently animated characters
    #[arg(long, default_value_t = 256)]
    characters: usize,

    #[arg(long, default_value_t = 240)]
    frames: usize,

    /// Worker threads, defaults to all but one of the available cores
    #[arg(long)]
    threads: Option<NonZeroUsize>,

    /// Millipede body slices, 7 joints each
    #[arg(long, default_value_t = 26)]
    slices: usize,

    /// Fixed simulation step in seconds, otherwise real time
    #[arg(long)]
    frame_delta: Option<f32>,
}

fn main() -> ExitReason
{
    let app_run = AppRun::<CliArgs>::startup("Anim demo", env!("CARGO_PKG_VERSION"));
    let args = &app_run.args;

    if args.slices > MAX_SLICES
    {
        log::error!("At most {MAX_SLICES} slices are supported, got {}", args.slices);
        app_run.set_exit_reason(ExitReason::InvalidInput);
        return app_run.get_exit_reason();
    }

    let millipede = match Millipede::build(args.slices)
    {
        Ok(m) => m,
        Err(err) =>
        {
            log::error!("Failed to build the millipede: {err}");
            app_run.set_exit_reason(ExitReason::JobFailed);
            return app_run.get_exit_reason();
        }
    };
    let mesh = JointBoxes::new(&millipede.skeleton);
    log::info!("Millipede has {} joints, {} vertices, bind pose bounds {:?}",
        millipede.skeleton.num_joints(),
        mesh.vertex_count,
        compute_skeleton_bounds(&millipede.skeleton));

    let mut characters: Vec<_> = (0..args.characters).map(|c|
    {
        let mut character = Character::new(&millipede, &mesh);
        let position = Vec3::new(
            ((c % GRID_WIDTH) as f32 - (GRID_WIDTH / 2) as f32) * GRID_SPACING,
            0.0,
            (c / GRID_WIDTH) as f32 * GRID_SPACING);
        character.root = Mat4::from_translation(position);
        // spread the characters out over the cycle
        character.controller.time = FSeconds(c as f32 * 0.1);
        character.controller.speed = 0.5 + (c % 3) as f32 * 0.25;
        character
    }).collect();

    let num_threads = args.threads.map_or_else(
        || std::thread::available_parallelism().map_or(1, |n| n.get().saturating_sub(1).max(1)),
        NonZeroUsize::get);
    let chunk_size = args.characters.div_ceil(num_threads).max(1);
    log::info!("Animating {} characters on {num_threads} threads for {} frames", args.characters, args.frames);

    let clock = Clock::new();
    let start = Instant::now();
    for frame in 0..args.frames
    {
        let time = clock.tick();
        let delta_time = args.frame_delta.map_or_else(|| time.delta_secs(), FSeconds);

        let failures = crossbeam::scope(|scope|
        {
            let workers: Vec<_> = characters.chunks_mut(chunk_size).map(|chunk|
            {
                let (millipede, mesh) = (&millipede, &mesh);
                scope.spawn(move |_|
                {
                    chunk.iter_mut()
                        .filter_map(|character| character.update(millipede, mesh, delta_time).err())
                        .inspect(|err| log::warn!("Character update failed: {err}"))
                        .count()
                })
            }).collect();
            workers.into_iter().map(|w| w.join().unwrap_or(chunk_size)).sum::<usize>()
        });

        match failures
        {
            Ok(0) => { },
            Ok(failed) =>
            {
                log::error!("{failed} character(s) failed on frame {frame}");
                app_run.set_exit_reason(ExitReason::JobFailed);
                break;
            },
            Err(_) =>
            {
                log::error!("A worker panicked on frame {frame}");
                app_run.set_exit_reason(ExitReason::Panic);
                break;
            },
        }

        if frame % 60 == 0
        {
            if let Some(first) = characters.first()
            {
                log::debug!("Frame {frame}: first character at t={:.2}s, bounds {:?}",
                    first.controller.time.0,
                    compute_posture_bounds(first.models()));
            }
        }
    }

    let elapsed = start.elapsed();
    let joints = args.characters * millipede.skeleton.num_joints() * args.frames;
    log::info!("Updated {joints} joints in {elapsed:.2?} ({:.1} ns/joint)",
        elapsed.as_nanos() as f64 / joints.max(1) as f64);

    app_run.get_exit_reason()
}
