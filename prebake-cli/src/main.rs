//! prebake CLI.
//!
//! Walks a directory tree of multi-stage build files and writes a
//! docker-bake configuration whose groups encode the batched build
//! order: targets within a group build in parallel, groups build in
//! series. All diagnostics go to stderr; only the bake file is written.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;
use prebake_core::{bake, NodeKind, Plan, PrebakeError};

#[derive(Parser)]
#[command(name = "prebake")]
#[command(
    about = "Group the stages of a Dockerfile tree into parallel-safe docker-bake batches",
    long_about = None
)]
struct Cli {
    /// Root directory to search for build files
    directory: PathBuf,

    /// Output path for the bake configuration
    #[arg(short, long, default_value = "docker-bake.hcl")]
    output: PathBuf,

    /// List every stage, edge, and batch while planning
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    // Initialize tracing if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let start = Instant::now();

    match run(&cli) {
        Ok(()) => {
            eprintln!(
                "{}",
                style(format!("time taken: {}", format_elapsed(start.elapsed().as_secs_f64())))
                    .dim()
            );
        }
        Err(err) => {
            eprintln!("{} {err:#}", style("error:").red().bold());
            let code = err
                .downcast_ref::<PrebakeError>()
                .map(PrebakeError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let plan = prebake_core::plan(&cli.directory)?;

    print_diagnostics(&plan, cli.verbose);
    bake::write_atomic(&cli.output, &plan.hcl)?;

    let target_count = plan.graph.target_nodes().count();
    let group_count = plan
        .schedule
        .batches
        .iter()
        .filter(|b| b.iter().any(|a| plan.graph.nodes.get(a).is_some_and(|n| !n.synthetic)))
        .count();
    eprintln!(
        "{} {} stages in {} groups -> {}",
        style("✓").green().bold(),
        target_count,
        group_count,
        style(cli.output.display()).cyan()
    );
    Ok(())
}

fn print_diagnostics(plan: &Plan, verbose: bool) {
    for issue in &plan.report.parse_issues {
        eprintln!(
            "{} {}:{}: {}",
            style("warning:").yellow().bold(),
            issue.file.display(),
            issue.line,
            issue.message
        );
    }

    for collision in &plan.report.collisions {
        eprintln!(
            "{} alias {} declared in {} and {}",
            style("warning:").yellow().bold(),
            style(&collision.alias).bold(),
            collision.first.display(),
            collision
                .later
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    for tag in &plan.report.ignored_tags {
        eprintln!(
            "{} stage {} references local stage {} with tag {}; tag ignored",
            style("warning:").yellow().bold(),
            style(&tag.referenced_by).bold(),
            style(&tag.stage).bold(),
            tag.tag
        );
    }

    let externals: Vec<_> = plan.graph.external_nodes().collect();
    if !externals.is_empty() {
        eprintln!("{}", style("external references").cyan().bold());
        for node in externals {
            let kind = match node.kind {
                NodeKind::ExternalBase => "base",
                _ => "dep",
            };
            let shown = if node.tags.is_empty() {
                node.name.clone()
            } else {
                node.tags
                    .iter()
                    .map(|tag| format!("{}:{}", node.name, tag))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let dependents: Vec<_> = node.dependents.iter().cloned().collect();
            eprintln!(
                "  {} {} ({kind}) {} {}",
                style("│").dim(),
                shown,
                style("used by").dim(),
                dependents.join(", ")
            );
        }
    }

    if !plan.graph.crossover.is_empty() {
        eprintln!("{}", style("crossover stages (referenced outside their file)").cyan().bold());
        for name in &plan.graph.crossover {
            eprintln!("  {} {}", style("│").dim(), name);
        }
    }

    if verbose {
        if !plan.graph.registries.is_empty() {
            eprintln!("{}", style("registries").cyan().bold());
            for registry in &plan.graph.registries {
                eprintln!("  {} {}", style("│").dim(), registry);
            }
        }
        if !plan.graph.tags.is_empty() {
            eprintln!("{}", style("tags").cyan().bold());
            for tag in &plan.graph.tags {
                eprintln!("  {} {}", style("│").dim(), tag);
            }
        }

        eprintln!("{}", style("stages").cyan().bold());
        for node in plan.graph.internal_nodes() {
            let origin = node
                .origin_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            let preds: Vec<_> = plan
                .graph
                .preds
                .get(&node.name)
                .map(|p| p.iter().cloned().collect())
                .unwrap_or_default();
            eprintln!(
                "  {} {} ({}) {} [{}]",
                style("│").dim(),
                style(&node.name).bold(),
                origin,
                style("needs").dim(),
                preds.join(", ")
            );
        }

        eprintln!("{}", style("batches").cyan().bold());
        for (idx, members) in plan.schedule.batches.iter().enumerate() {
            eprintln!("  {} {}: {}", style("│").dim(), idx + 1, members.join(", "));
        }
    }
}

/// Formats elapsed seconds for the closing summary line.
fn format_elapsed(secs: f64) -> String {
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        format!("{:.0}m{:.0}s", mins, secs - mins * 60.0)
    }
}
