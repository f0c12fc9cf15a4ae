use clap::Parser;
use itertools::Itertools;
use lognoise::multiline::MultiLineAggregator;
use lognoise::pipeline::{self, ClusterOpts, NoiseReport};
use lognoise::table::{LogTable, DEFAULT_TEXT_COLUMN};
use lognoise::vectorizer::StopWords;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

fn init_parallelism() {
    static START: Once = Once::new();
    START.call_once(|| {
        let n = num_cpus::get();
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    });
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(name = "lognoise", version, about = "Cluster log lines and report repeated patterns")]
struct Cli {
    /// Input files (`-` for stdin). Plain lines or JSON objects, one record per line.
    #[arg(required = false)]
    input: Vec<String>,

    /// Target number of clusters (clamped to the number of records)
    #[arg(long = "clusters", short = 'k', default_value_t = 5)]
    clusters: usize,

    /// Field holding the log text
    #[arg(long = "text-field", default_value = DEFAULT_TEXT_COLUMN)]
    text_field: String,

    /// Fix the clustering seed for reproducible labels
    #[arg(long = "seed")]
    seed: Option<u64>,

    #[arg(long = "max-iter", default_value_t = 100)]
    max_iter: usize,

    /// Keep English stop words in the vocabulary
    #[arg(long = "no-stop-words", default_value_t = false)]
    no_stop_words: bool,

    /// Use all cores for normalization and cluster assignment
    #[arg(long = "parallel", default_value_t = false)]
    parallel: bool,

    /// Use the built-in demo corpus instead of reading input
    #[arg(long = "sample", default_value_t = false)]
    sample: bool,

    /// Print only one artifact: annotated | noise | summary
    #[arg(long = "only")]
    only: Option<String>,

    /// Output format: json | table | csv
    #[arg(long = "format", default_value = "json")]
    format: String,

    #[arg(long = "top")]
    top: Option<usize>,
    #[arg(long = "min-count")]
    min_count: Option<usize>,
}

fn read_all_records(paths: &[String]) -> io::Result<Vec<String>> {
    let mut out = Vec::new();
    for p in paths {
        let reader: Box<dyn BufRead> = if p == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            Box::new(BufReader::with_capacity(1 << 20, File::open(p)?))
        };
        // One aggregator per source so records never span files
        let mut agg = MultiLineAggregator::default();
        for line in reader.lines() {
            if let Some(e) = agg.push(&line?) {
                out.push(e);
            }
        }
        if let Some(e) = agg.finish() {
            out.push(e);
        }
    }
    Ok(out)
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    check_format(&cli.format)?;
    if cli.parallel {
        init_parallelism();
    }

    let table = if cli.sample {
        lognoise::sample::sample_table()
    } else {
        let inputs = if cli.input.is_empty() { vec!["-".to_string()] } else { cli.input.clone() };
        let records = read_all_records(&inputs)?;
        LogTable::from_json_lines(&records)
    };
    tracing::debug!(rows = table.len(), columns = %table.columns().iter().join(", "), "input loaded");

    let opts = ClusterOpts {
        cluster_count: cli.clusters,
        text_column: cli.text_field.clone(),
        seed: cli.seed,
        max_iter: cli.max_iter,
        stop_words: if cli.no_stop_words { StopWords::None } else { StopWords::English },
        parallel: cli.parallel,
        ..Default::default()
    };

    let analysis = pipeline::run(&table, &opts)?;
    let mut report = analysis.report;
    if let Some(min) = cli.min_count {
        report = report.min_count(min);
    }
    if let Some(top) = cli.top {
        report = report.top(top);
    }

    match cli.only.as_deref() {
        Some("annotated") => print_table(&analysis.annotated, &cli.format)?,
        Some("noise") => print_table(&report.to_table(), &cli.format)?,
        Some("summary") => println!("{}", serde_json::to_string_pretty(&report.summary)?),
        Some(other) => anyhow::bail!("unknown --only value '{other}' (expected annotated | noise | summary)"),
        None => match cli.format.as_str() {
            "table" => print_report_table(&report),
            "csv" => print_table(&report.to_table(), "csv")?,
            _ => println!("{}", serde_json::to_string_pretty(&report)?),
        },
    }
    Ok(())
}

fn print_table(table: &LogTable, format: &str) -> anyhow::Result<()> {
    match format {
        "csv" => lognoise::export::write_csv(table, io::stdout().lock())?,
        "table" => {
            println!("{}", table.columns().iter().join(" | "));
            for row in table.rows() {
                println!("{}", row.iter().map(lognoise::normalizer::value_to_text).join(" | "));
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(table)?),
    }
    Ok(())
}

const FORMATS: [&str; 3] = ["json", "table", "csv"];

fn check_format(format: &str) -> anyhow::Result<()> {
    if !FORMATS.contains(&format) {
        anyhow::bail!("unknown --format value '{format}' (expected json | table | csv)");
    }
    Ok(())
}

fn print_report_table(report: &NoiseReport) {
    let s = &report.summary;
    println!(
        "# {} lines, {} patterns, {} clusters, ratio {:.4}",
        s.total_lines, s.unique_patterns, s.clusters, s.compression_ratio
    );
    println!("{:<6} {:<8} {:<50} {}", "Count", "Cluster", "Pattern", "Example");
    for g in &report.groups {
        println!("{:<6} {:<8} {:<50} {}", g.count, g.cluster, g.normalized, g.representative);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_rejected() {
        assert!(check_format("json").is_ok());
        assert!(check_format("csv").is_ok());
        let err = check_format("yaml").unwrap_err();
        assert!(err.to_string().contains("yaml"));
    }

    #[test]
    fn cli_parses_format_and_clusters() {
        let cli = Cli::try_parse_from(["lognoise", "--format", "xml", "-k", "3", "--sample"]).unwrap();
        assert_eq!(cli.clusters, 3);
        assert!(check_format(&cli.format).is_err());
    }
}
