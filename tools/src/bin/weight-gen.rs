use std::env;
use std::fs;
use std::io;
use std::io::Write as _;

use anyhow::Context as _;
use anyhow::Result;
use rand::Rng as _;
use rand::SeedableRng as _;

const USAGE: &str = "Usage: weight-gen [options] <in.grf >out.grf";

fn main() -> Result<()> {
    let mut options = getopts::Options::new();
    options.optflag("h", "help", "print this help menu");
    options.optopt("g", "graph", "input graph file (.grf)", "FILE");
    options.optopt("o", "output", "output graph file (default: stdout)", "FILE");
    options.optopt("", "inf", "minimum vertex weight (default: 1)", "N");
    options.optopt("", "sup", "maximum vertex weight (default: 100)", "N");
    options.optopt("c", "criteria", "number of weights per vertex (default: 1)", "N");
    options.optopt("s", "seed", "seed of the generator (default: 1)", "N");

    let matches = options.parse(env::args().skip(1))?;

    if matches.opt_present("h") {
        eprintln!("{}", options.usage(USAGE));
        return Ok(());
    }

    let inf: i64 = matches.opt_get_default("inf", 1)?;
    let sup: i64 = matches.opt_get_default("sup", 100)?;
    let criterion_count: usize = matches.opt_get_default("c", 1)?;
    let seed: u64 = matches.opt_get_default("s", 1)?;
    if inf < 0 || sup < inf {
        anyhow::bail!("invalid weight range {inf}..={sup}");
    }

    let mut graph = {
        let graph_file = matches
            .opt_str("g")
            .context("missing required option 'graph'")?;
        let graph_file = fs::File::open(graph_file).context("failed to open graph file")?;
        topo_io::grf::read(io::BufReader::new(graph_file)).context("failed to read graph file")?
    };

    let mut rng = rand_pcg::Pcg64::seed_from_u64(seed);
    graph.vertex_weights = Some(
        (0..graph.vertex_count)
            .map(|_| (0..criterion_count).map(|_| rng.gen_range(inf..=sup)).collect())
            .collect(),
    );

    match matches.opt_str("o") {
        Some(output) => {
            let file = fs::File::create(output).context("failed to create output file")?;
            topo_io::grf::write(io::BufWriter::new(file), &graph)?;
        }
        None => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();
            topo_io::grf::write(&mut stdout, &graph)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
