use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;

use scission::Partition;

const USAGE: &str = "Usage: part-info [options]";

fn main() -> Result<()> {
    let mut options = getopts::Options::new();
    options.optflag("h", "help", "print this help menu");
    options.optopt("g", "graph", "graph file (.grf or .mtx)", "FILE");
    options.optopt("m", "mesh", "mesh file, analyzed through its dual graph", "FILE");
    options.optopt("p", "partition", "partition file (.map or one part per line)", "FILE");
    options.optflag("", "parts", "also print per-part weights");

    let matches = options.parse(env::args().skip(1))?;

    if matches.opt_present("h") {
        eprintln!("{}", options.usage(USAGE));
        return Ok(());
    }

    let models = match (matches.opt_str("g"), matches.opt_str("m")) {
        (Some(graph_file), None) => scission_tools::read_graph(&PathBuf::from(graph_file))?,
        (None, Some(mesh_file)) => {
            let mesh_file = fs::File::open(mesh_file).context("failed to open mesh file")?;
            let mesh = topo_io::medit::read(io::BufReader::new(mesh_file))
                .context("failed to read mesh file")?;
            scission_tools::dual(&mesh)?
        }
        _ => anyhow::bail!("exactly one of --graph and --mesh is required\n\n{USAGE}"),
    };

    let partition_file = matches
        .opt_str("p")
        .context("missing required option 'partition'")?;
    let parts = scission_tools::read_partition(&PathBuf::from(partition_file))?;
    let partition = Partition::from_parts(None, parts)?;

    println!("Number of vertices: {}", models.vertex_count());
    println!("Number of edges: {}", models.topology().edge_count());
    println!("Number of parts: {}", partition.part_count());
    println!(
        "Cut: {}",
        scission::analysis::edge_cut(&models, &partition)?,
    );
    println!(
        "Imbalance: {:.3}",
        scission::analysis::aggregate_imbalance(&models, &partition)?,
    );
    if matches.opt_present("parts") {
        for (part, weights) in scission::analysis::part_weights(&models, &partition) {
            println!("Part {part}: weights {weights:?}");
        }
    }
    Ok(())
}
