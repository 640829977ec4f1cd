use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::eyre;
use num_bigint::BigUint;

use petri_bdd::bdd::{Bdd, BddConfig};
use petri_bdd::error::Error;
use petri_bdd::explicit::{ExplicitExplorer, DEFAULT_MAX_STATES};
use petri_bdd::io::read_net;
use petri_bdd::marking::Marking;
use petri_bdd::net::Net;
use petri_bdd::optimize::{optimize, Objective};
use petri_bdd::reachable::ReachableSet;
use petri_bdd::symbolic::{ImageMode, SymbolicConfig, SymbolicEngine, DEFAULT_MAX_ITERATIONS};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Task {
    All,
    Explicit,
    Symbolic,
    Deadlock,
    Optimize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Search {
    Bfs,
    Dfs,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Construction {
    /// Image fixed point over the transition relation.
    FixedPoint,
    /// Explicit breadth-first search, then one BDD for the whole set.
    Explicit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Image {
    Monolithic,
    Partitioned,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Net description (`.pnml`/`.xml` for PNML, JSON otherwise).
    #[arg(value_name = "FILE")]
    net: PathBuf,

    /// Analysis to run. With `all`, a failed explicit search is reported and skipped.
    #[arg(long, value_enum, default_value = "all")]
    task: Task,

    /// Comma-separated objective weights, one per place (in id order).
    #[arg(long, value_name = "FLOAT,...", value_delimiter = ',', allow_negative_numbers = true)]
    weights: Option<Vec<f64>>,

    /// Minimize the objective instead of maximizing it.
    #[arg(long)]
    minimize: bool,

    /// Ceiling on the number of markings of the explicit search.
    #[arg(long, value_name = "INT", default_value_t = DEFAULT_MAX_STATES)]
    max_states: usize,

    /// Ceiling on the number of fixed-point iterations of the symbolic search.
    #[arg(long, value_name = "INT", default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Explicit search order.
    #[arg(long, value_enum, default_value = "bfs")]
    search: Search,

    /// Image computation of the symbolic search.
    #[arg(long, value_enum, default_value = "monolithic")]
    image: Image,

    /// How the symbolic reachable set is built.
    #[arg(long, value_enum, default_value = "fixed-point")]
    construction: Construction,

    /// BDD size (in bits, so the initial storage is `2^size` nodes).
    #[arg(long, value_name = "INT", default_value = "16", value_parser = clap::value_parser!(u8).range(1..=24))]
    size: u8,

    /// Computed table size (in bits, so the table has `2^cache-size` slots).
    #[arg(long, value_name = "INT", default_value = "14", value_parser = clap::value_parser!(u8).range(1..=24))]
    cache_size: u8,
}

fn print_header(title: &str) {
    println!();
    println!("{}", "=".repeat(70));
    println!("  {}", title);
    println!("{}", "=".repeat(70));
}

fn print_markings(net: &Net, markings: impl Iterator<Item = Marking>, limit: usize) {
    for (i, m) in markings.enumerate() {
        if i >= limit {
            println!("  ...");
            break;
        }
        println!("  {} {}", m, net.display_marking(&m));
    }
}

fn run_explicit(net: &Net, args: &Cli) -> Result<BTreeSet<Marking>, Error> {
    print_header("Explicit reachability");
    let time = Instant::now();
    let explorer = ExplicitExplorer::new(net).with_max_states(args.max_states);
    let states = match args.search {
        Search::Bfs => explorer.bfs()?,
        Search::Dfs => explorer.dfs()?,
    };
    println!("Reachable markings: {}", states.len());
    println!("Search: {:?}, done in {:.4} s", args.search, time.elapsed().as_secs_f64());
    if states.len() <= 50 {
        print_markings(net, states.iter().cloned(), 20);
    }
    Ok(states)
}

/// Explicit phase of `--task all`: a failure is reported and the run goes on.
fn explicit_phase(net: &Net, args: &Cli) -> Option<Duration> {
    let time = Instant::now();
    match run_explicit(net, args) {
        Ok(_) => Some(time.elapsed()),
        Err(e) => {
            println!("Skipping explicit search: {}", e);
            None
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let net = read_net(&args.net)?;
    print_header("Petri net");
    println!("Places: {}", net.num_places());
    println!("Transitions: {}", net.num_transitions());
    println!("Arcs: {}", net.arcs().len());
    println!("Initial marking: {}", net.initial_marking());

    let objective = if args.minimize {
        Objective::Minimize
    } else {
        Objective::Maximize
    };
    if args.task == Task::Optimize && args.weights.is_none() {
        return Err(eyre!("--weights is required for the optimize task"));
    }
    if let Some(weights) = &args.weights {
        if weights.len() != net.num_places() {
            return Err(Error::WeightLength {
                expected: net.num_places(),
                actual: weights.len(),
            }
            .into());
        }
    }

    let mut explicit_time = None;
    match args.task {
        Task::Explicit => {
            run_explicit(&net, &args)?;
            return Ok(());
        }
        Task::All => explicit_time = explicit_phase(&net, &args),
        _ => {}
    }

    print_header("Symbolic reachability");
    let bdd = Bdd::with_config(BddConfig {
        storage_bits: args.size as usize,
        cache_bits: args.cache_size as usize,
    });
    let config = SymbolicConfig {
        max_iterations: args.max_iterations,
        image: match args.image {
            Image::Monolithic => ImageMode::Monolithic,
            Image::Partitioned => ImageMode::Partitioned,
        },
    };
    let time = Instant::now();
    let engine = SymbolicEngine::new(&bdd, &net, config);
    let states = match args.construction {
        Construction::FixedPoint => engine.reachable()?,
        Construction::Explicit => {
            let explicit = ExplicitExplorer::new(&net).with_max_states(args.max_states).bfs()?;
            engine.encode_set(&explicit)?
        }
    };
    let symbolic_time = time.elapsed();
    let count = states.count();
    println!("Reachable markings: {}", count);
    println!("Iterations: {}", states.iterations());
    println!("BDD size: {} nodes", states.node_count());
    println!("Done in {:.4} s", symbolic_time.as_secs_f64());
    if let Some(explicit_time) = explicit_time {
        if symbolic_time.as_secs_f64() > 0.0 {
            println!(
                "Speedup over explicit: {:.2}x",
                explicit_time.as_secs_f64() / symbolic_time.as_secs_f64()
            );
        }
    }
    if args.task == Task::Symbolic && count <= BigUint::from(50u32) {
        print_markings(&net, states.markings(), 20);
    }
    println!("bdd = {:?}", bdd);

    if matches!(args.task, Task::All | Task::Deadlock) {
        print_header("Deadlock detection");
        let time = Instant::now();
        match engine.find_deadlock(&states) {
            Some(m) => println!("Deadlock: {} {}", m, net.display_marking(&m)),
            None => println!("No deadlock (every reachable marking enables a transition)"),
        }
        println!("Done in {:.4} s", time.elapsed().as_secs_f64());
    }

    if let Some(weights) = &args.weights {
        if matches!(args.task, Task::All | Task::Optimize) {
            print_header("Optimization");
            let time = Instant::now();
            match optimize(&net, &states, weights, objective)? {
                Some(optimum) => {
                    println!("{:?}: {} at {}", objective, optimum.value, optimum.marking);
                    for p in optimum.marking.marked_places() {
                        println!(
                            "  {}: weight={}, contrib={}",
                            net.place(p).id(),
                            weights[p],
                            weights[p] * optimum.marking[p] as f64
                        );
                    }
                }
                None => println!("Empty reachable set"),
            }
            println!("Done in {:.4} s", time.elapsed().as_secs_f64());
        }
    }

    println!("cache entries: {} / {}", bdd.cache().len(), bdd.cache().capacity());
    println!("cache hits: {}", bdd.cache().hits());
    println!("cache misses: {}", bdd.cache().misses());

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
