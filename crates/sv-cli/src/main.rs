//! Sieve CLI
//!
//! CLI tool for checking filter lists, testing requests against them and
//! inspecting the persistence records of compiled filters.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use sv_compiler::{parse_filter_list, FilterRegistry, ListStats, OptionPolicy};
use sv_core::{
    ContentType, ElemHideSet, Filter, FilterMatcher, FilterRecord, MatchDecision, RequestContext, RestoreOptions,
    FORMAT_VERSION,
};

#[derive(Parser)]
#[command(name = "sieve")]
#[command(about = "Sieve filter list tools")]
struct Cli {
    /// Show library debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile filter lists and report invalid lines
    Check {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Treat unknown $options as errors
        #[arg(long)]
        strict: bool,
    },

    /// Decide whether a request is blocked
    Match {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// Request type (script, image, main_frame, ...)
        #[arg(short = 't', long = "type", default_value = "other")]
        request_type: String,

        /// URL of the document making the request
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Print the element hiding selectors for a domain
    Hide {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Document domain
        #[arg(short, long)]
        domain: String,

        /// Print a stylesheet instead of one selector per line
        #[arg(long)]
        css: bool,
    },

    /// Print the persistence records of every compiled filter
    Dump {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// JSON array instead of [Filter] blocks
        #[arg(long)]
        json: bool,
    },

    /// Rebuild filters from dumped records and print them again
    Restore {
        /// Dump file written by `dump`
        #[arg(short, long)]
        input: String,

        /// Input is a JSON array
        #[arg(long)]
        json: bool,

        /// Format version the dump was written with
        #[arg(long, default_value_t = FORMAT_VERSION)]
        stored_version: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Check { input, strict } => cmd_check(&input, strict),
        Commands::Match {
            input,
            url,
            request_type,
            document,
        } => cmd_match(&input, &url, &request_type, document.as_deref()),
        Commands::Hide { input, domain, css } => cmd_hide(&input, &domain, css),
        Commands::Dump { input, json } => cmd_dump(&input, json),
        Commands::Restore {
            input,
            json,
            stored_version,
        } => cmd_restore(&input, json, stored_version),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))
}

/// Compile every input list, tagging filters with the list path as subscription id.
fn load_lists(registry: &FilterRegistry, inputs: &[String]) -> Result<Vec<Arc<Filter>>, String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let mut all_filters = Vec::new();
    for path in inputs {
        let content = read_file(path)?;
        let filters = parse_filter_list(registry, &content);
        for filter in &filters {
            filter.add_subscription(path);
        }
        log::debug!("{}: {} filters", path, filters.len());
        all_filters.extend(filters);
    }

    Ok(all_filters)
}

/// Drop repeated filters, keeping first occurrences.
fn distinct(filters: Vec<Arc<Filter>>) -> Vec<Arc<Filter>> {
    let mut seen = HashSet::new();
    filters
        .into_iter()
        .filter(|filter| seen.insert(filter.text().to_string()))
        .collect()
}

fn cmd_check(inputs: &[String], strict: bool) -> Result<(), String> {
    let policy = if strict { OptionPolicy::Strict } else { OptionPolicy::Lenient };
    let start = Instant::now();
    let mut invalid_total = 0usize;

    for path in inputs {
        let registry = FilterRegistry::with_policy(policy);
        let filters = load_lists(&registry, std::slice::from_ref(path))?;
        let stats = ListStats::from_filters(&filters);

        println!(
            "{}: {} lines compiled",
            Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
            stats.total()
        );
        println!("  Blocking:   {}", stats.blocking);
        println!("  Exceptions: {}", stats.whitelist);
        println!("  Hiding:     {}", stats.elemhide);
        println!("  Comments:   {}", stats.comments);
        println!("  Invalid:    {}", stats.invalid);

        for filter in &filters {
            if let Some(reason) = filter.invalid_reason() {
                println!("    {} ({})", filter.text(), reason);
            }
        }

        invalid_total += stats.invalid;
    }

    println!("Checked {} lists in {:.1}ms", inputs.len(), start.elapsed().as_secs_f64() * 1000.0);

    if invalid_total > 0 {
        return Err(format!("{} invalid filters", invalid_total));
    }
    Ok(())
}

fn cmd_match(inputs: &[String], url: &str, request_type: &str, document: Option<&str>) -> Result<(), String> {
    let registry = FilterRegistry::new();
    let mut matcher = FilterMatcher::new();
    for filter in load_lists(&registry, inputs)? {
        matcher.add(filter);
    }

    let content_type = ContentType::from_request_type(request_type);
    let ctx = RequestContext::from_urls(url, content_type, document);
    log::debug!(
        "Request {} type={:?} domain={:?} third_party={}",
        ctx.location,
        ctx.content_type,
        ctx.doc_domain,
        ctx.third_party
    );

    let decision = matcher.match_request(&ctx);
    if let Some(state) = decision.filter().and_then(|filter| filter.active()) {
        state.record_hit_now();
    }

    match decision {
        MatchDecision::Block(filter) => println!("BLOCK  {}", filter.text()),
        MatchDecision::Allow(filter) => println!("ALLOW  {}", filter.text()),
        MatchDecision::NoMatch => println!("NO MATCH"),
    }

    Ok(())
}

fn cmd_hide(inputs: &[String], domain: &str, css: bool) -> Result<(), String> {
    let registry = FilterRegistry::new();
    let mut set = ElemHideSet::new();
    for filter in load_lists(&registry, inputs)? {
        set.add(filter);
    }

    if css {
        println!("{}", set.stylesheet_for_domain(domain));
    } else {
        for selector in set.selectors_for_domain(domain) {
            println!("{}", selector);
        }
    }

    Ok(())
}

fn cmd_dump(inputs: &[String], json: bool) -> Result<(), String> {
    let registry = FilterRegistry::new();
    let filters = distinct(load_lists(&registry, inputs)?);
    let records: Vec<FilterRecord> = filters.iter().map(|filter| filter.serialize()).collect();
    print_records(&records, json)
}

fn cmd_restore(input: &str, json: bool, stored_version: u32) -> Result<(), String> {
    let content = read_file(input)?;
    let records = if json {
        serde_json::from_str::<Vec<FilterRecord>>(&content)
            .map_err(|e| format!("Failed to parse '{}': {}", input, e))?
    } else {
        FilterRecord::parse_blocks(&content)
    };

    let registry = FilterRegistry::new();
    let options = RestoreOptions { stored_version };

    let mut restored = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for record in &records {
        match registry.from_object(record, &options) {
            Some(filter) => restored.push(filter.serialize()),
            None => skipped += 1,
        }
    }

    eprintln!(
        "Restored {} of {} records ({} skipped, trusted: {})",
        restored.len(),
        records.len(),
        skipped,
        options.is_trusted()
    );

    print_records(&restored, json)
}

fn print_records(records: &[FilterRecord], json: bool) -> Result<(), String> {
    if json {
        let out = serde_json::to_string_pretty(records).map_err(|e| format!("Failed to encode JSON: {}", e))?;
        println!("{}", out);
    } else {
        for record in records {
            println!("{}\n", record);
        }
    }
    Ok(())
}
