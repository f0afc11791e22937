//! fieldgrid CLI
//!
//! Command-line interface for resolving table declarations against
//! JSON rows.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fieldgrid::{
    load_table_auto, resources, SchemaError, SortState, Table,
};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "fieldgrid")]
#[command(about = "Resolve declarative table fields against JSON rows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a table declaration against a file of rows
    Render {
        /// Table declaration: file path or URL (http:// or https://)
        table: String,

        /// JSON file containing an array of row objects
        #[arg(long)]
        rows: PathBuf,

        /// Attribute of the active sort column
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending (requires --sort)
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a table declaration file
    Check {
        /// Table declaration: file path or URL
        table: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            table,
            rows,
            sort,
            desc,
            output,
            pretty,
        } => run_render(&table, &rows, sort, desc, output, pretty),

        Commands::Check { table, json } => run_check(&table, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_render(
    table_source: &str,
    rows_path: &PathBuf,
    sort: Option<String>,
    desc: bool,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let table = load_table_auto(table_source).map_err(|e| {
        eprintln!("Error: {}", e);
        report_violations(&e);
        e.exit_code() as u8
    })?;

    let content = std::fs::read_to_string(rows_path).map_err(|e| {
        eprintln!("Error reading {}: {}", rows_path.display(), e);
        3u8
    })?;

    let rows: Value = serde_json::from_str(&content).map_err(|e| {
        eprintln!("Error: rows file is not valid JSON: {}", e);
        1u8
    })?;

    let Some(rows) = rows.as_array() else {
        eprintln!("Error: rows file must contain a JSON array of row objects");
        return Err(1);
    };

    let sort_state = match (&sort, desc) {
        (Some(column), false) => SortState::asc(column.clone()),
        (Some(column), true) => SortState::desc(column.clone()),
        (None, _) => SortState::unsorted(),
    };

    let wrapped = resources(&table, rows).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let columns: Vec<Value> = table
        .fields()
        .without_listable()
        .iter()
        .filter(|field| !field.is_never_shown())
        .map(|field| {
            json!({
                "name": field.name,
                "attribute": field.attribute,
                "sortable": field.sortable,
                "asc_sorted": field.asc_sorted(&sort_state),
                "desc_sorted": field.desc_sorted(&sort_state),
            })
        })
        .collect();

    let document = json!({
        "table": {
            "name": table.name(),
            "label": table.label(),
            "style": table.style(),
        },
        "columns": columns,
        "rows": wrapped
            .iter()
            .map(|resource| serde_json::to_value(resource.fields()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                eprintln!("Error serializing output: {}", e);
                2u8
            })?,
    });

    let rendered = if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered);
        }
    }

    Ok(())
}

fn run_check(table_source: &str, json_output: bool) -> Result<(), u8> {
    match load_table_auto(table_source) {
        Ok(table) => {
            if json_output {
                println!(
                    "{}",
                    json!({"valid": true, "name": table.name(), "fields": table.fields().len()})
                );
            } else {
                println!(
                    "Valid: {} ({} fields)",
                    table.name(),
                    table.fields().len()
                );
            }
            Ok(())
        }
        Err(SchemaError::InvalidDeclaration { violations }) => {
            if json_output {
                println!("{}", json!({"valid": false, "violations": violations}));
            } else {
                eprintln!("Invalid declaration:");
                for violation in &violations {
                    eprintln!("  {}", violation);
                }
            }
            Err(2)
        }
        Err(e) => {
            if json_output {
                println!("{}", json!({"valid": false, "error": e.to_string()}));
            } else {
                eprintln!("Error: {}", e);
            }
            Err(e.exit_code() as u8)
        }
    }
}

/// Print individual violations under a declaration error.
fn report_violations(error: &SchemaError) {
    if let SchemaError::InvalidDeclaration { violations } = error {
        for violation in violations {
            eprintln!("  {}", violation);
        }
    }
}
