use std::env;
use std::fs;
use std::io;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;

use scission::runner::Runner;

const USAGE: &str = "Usage: part [options] >out.map";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut options = getopts::Options::new();
    options.optflag("h", "help", "print this help menu");
    options.optmulti(
        "a",
        "algorithm",
        "a phase to run, of the form name,key=value,... See ALGORITHMS",
        "SPEC",
    );
    options.optopt("g", "graph", "graph file (.grf or .mtx)", "FILE");
    options.optopt("m", "mesh", "mesh file, partitioned through its dual graph", "FILE");
    options.optopt("o", "output", "partition output file (default: stdout)", "FILE");

    let matches = options.parse(env::args().skip(1))?;

    if matches.opt_present("h") {
        eprintln!("{}", options.usage(USAGE));
        eprint!("{}", ALGORITHMS);
        return Ok(());
    }

    let models = match (matches.opt_str("g"), matches.opt_str("m")) {
        (Some(graph_file), None) => scission_tools::read_graph(&PathBuf::from(graph_file))?,
        (None, Some(mesh_file)) => {
            let mesh_file =
                fs::File::open(mesh_file).context("failed to open mesh file")?;
            let mesh = topo_io::medit::read(io::BufReader::new(mesh_file))
                .context("failed to read mesh file")?;
            scission_tools::dual(&mesh)?
        }
        _ => anyhow::bail!("exactly one of --graph and --mesh is required\n\n{USAGE}"),
    };

    let phases = matches
        .opt_strs("a")
        .iter()
        .map(|spec| {
            scission_tools::parse_algorithm(spec)
                .with_context(|| format!("invalid algorithm {spec:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if phases.is_empty() {
        anyhow::bail!("no algorithm given\n\n{USAGE}");
    }

    let mut runner = Runner::new(models);
    runner.run(&phases).context("partitioning failed")?;

    let models = runner.stack().finest().clone();
    let partition = runner.into_partition()?;
    if partition.len() != models.vertex_count() {
        anyhow::bail!(
            "the run left a partition of {} vertices for a graph of {}; missing prolong phases?",
            partition.len(),
            models.vertex_count(),
        );
    }

    let cut = scission::analysis::edge_cut(&models, &partition)?;
    let imbalance = scission::analysis::aggregate_imbalance(&models, &partition)?;
    eprintln!(" -> Number of parts: {}", partition.part_count());
    eprintln!(" -> Cut: {cut}");
    eprintln!(" -> Imbalance: {imbalance:.3}");

    match matches.opt_str("o") {
        Some(output) => {
            let file = fs::File::create(output).context("failed to create output file")?;
            topo_io::partition::write_map(io::BufWriter::new(file), partition.parts())?;
        }
        None => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();
            topo_io::partition::write_map(&mut stdout, partition.parts())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

const ALGORITHMS: &str = "\
ALGORITHMS
    random,parts=K
        Random initial partition in K parts.
    all-in-one,parts=K[,part=P]
        Every vertex in part P (default 0).
    fm[,tol=T]...[,ties=first|last|random][,neg=N|cneg=N][,passes=N][,crit=C]
        Fiduccia-Mattheyses cut refinement under imbalance tolerance T
        (one value per criterion, or one broadcast value).
    vn-first[,order=cycle|random][,stop-after=N]
        First-improvement balance refinement.
    vn-best
        Best-gain balance refinement.
    coarsen[,matcher=hem|hem-unit|first|random][,order=identity|random][,wmax=F[,forbid=above-any|above-all|under-any|under-all]]
        Match and coarsen one level.
    coarsen-until,threshold=N[,...]
        Coarsen until at most N vertices remain.
    prolong
        Map the partition one level down.
    seed[,value=N|random|increasing]
        Reseed the random stream.
    pass
        Do nothing.
";
