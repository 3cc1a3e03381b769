//! `ccm-backup`: ingest a legacy CM backup dump into a relational image,
//! then inspect it — print an attribute, emit a revision's raw bytes,
//! show the four-part-name delimiter, or run a CM query expression.

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod error;

use error::Error;

#[derive(Parser)]
#[command(name = "ccm-backup", version, about = "Reads a legacy CM backup")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a dump file into a fresh relational image.
    Ingest(IngestArgs),
    /// Print one attribute of an object.
    Attr(AttrArgs),
    /// Emit a file or directory revision's raw content to stdout.
    Cat(ObjectArgs),
    /// Print the four-part-name delimiter.
    Delim(StoreArgs),
    /// Compile and run a CM query expression, printing matching objects.
    Query(QueryArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Path to the dump file (optionally .Z/.z compressed).
    dump: PathBuf,
    /// Path to create the relational image at; must not already exist.
    store: PathBuf,
}

#[derive(Args)]
struct StoreArgs {
    /// Path to an existing relational image.
    store: PathBuf,
    /// Path to the backup's extracted file tree (containing `st_root`).
    backup_root: PathBuf,
}

#[derive(Args)]
struct AttrArgs {
    #[command(flatten)]
    common: StoreArgs,
    /// Four-part name of the object (`name<delim>version:cvtype:subsystem`).
    fpn: String,
    /// Attribute name to print.
    attribute: String,
}

#[derive(Args)]
struct ObjectArgs {
    #[command(flatten)]
    common: StoreArgs,
    fpn: String,
}

#[derive(Args)]
struct QueryArgs {
    #[command(flatten)]
    common: StoreArgs,
    /// CM query expression, e.g. `status='released' and type='project'`.
    expr: String,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Error> {
    match command {
        Command::Ingest(args) => ingest(args),
        Command::Attr(args) => attr(args),
        Command::Cat(args) => cat(args),
        Command::Delim(args) => delim(args),
        Command::Query(args) => query(args),
    }
}

fn ingest(args: IngestArgs) -> Result<(), Error> {
    let store = ccm_store::Store::create(&args.store)?;
    let mut conn = store.connection()?;
    let parser = ccm_dump::DumpParser::open(&args.dump)?;
    conn.ingest(parser)?;
    log::info!("ingested {} into {}", args.dump.display(), args.store.display());
    Ok(())
}

fn open_context(args: &StoreArgs) -> Result<ccm_model::LookupContext, Error> {
    let store = ccm_store::Store::open(&args.store)?;
    let conn = store.connection()?;
    Ok(ccm_model::LookupContext::open(conn, args.backup_root.clone()))
}

fn attr(args: AttrArgs) -> Result<(), Error> {
    let ctx = open_context(&args.common)?;
    let object = ctx
        .object_by_fpn(&args.fpn)?
        .ok_or_else(|| Error::ObjectNotFound(args.fpn.clone()))?;
    match object.attribute(&args.attribute)? {
        Some(value) => println!("{}", format_attribute(&value)),
        None => println!(""),
    }
    Ok(())
}

fn format_attribute(value: &ccm_model::AttributeValue) -> String {
    match value {
        ccm_model::AttributeValue::Text(s) => s.clone(),
        ccm_model::AttributeValue::Int(n) => n.to_string(),
        ccm_model::AttributeValue::Bool(b) => b.to_string(),
        ccm_model::AttributeValue::Null => String::new(),
    }
}

fn cat(args: ObjectArgs) -> Result<(), Error> {
    let ctx = open_context(&args.common)?;
    let object = ctx
        .object_by_fpn(&args.fpn)?
        .ok_or_else(|| Error::ObjectNotFound(args.fpn.clone()))?;
    let data = object.data(&ccm_model::SystemRcs)?;
    std::io::stdout().write_all(&data)?;
    Ok(())
}

fn delim(args: StoreArgs) -> Result<(), Error> {
    let ctx = open_context(&args)?;
    println!("{}", ctx.delim()?);
    Ok(())
}

fn query(args: QueryArgs) -> Result<(), Error> {
    let ctx = open_context(&args.common)?;
    let sql = ccm_query::compile(ctx.delim()?, &args.expr)?;
    log::debug!("compiled query: {sql}");

    let rows = ctx.store().query(&sql, &[])?;

    for row in &rows {
        let formatted: Vec<String> = (0..row.len())
            .map(|i| format_cell(row.get(i)))
            .collect();
        println!("{}", formatted.join("\t"));
    }
    Ok(())
}

fn format_cell(cell: &ccm_store::Cell) -> String {
    match cell {
        ccm_store::Cell::Null => String::new(),
        ccm_store::Cell::Integer(n) => n.to_string(),
        ccm_store::Cell::Real(f) => f.to_string(),
        ccm_store::Cell::Text(s) => s.clone(),
    }
}
