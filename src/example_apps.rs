use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum, error::ErrorKind};
use serde_json::Value as JsonValue;

use crate::atlas::{Atlas, DatasetRecord};
use crate::config::AtlasConfig;
use crate::constants::resources::RESOURCES_DIR_ENV;
use crate::filter::{Filter, Operator};
use crate::record::{Fields, Record};
use crate::value::Value;
use crate::{AtlasError, Country, Currency, Language, Region, SubRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Country,
    Language,
    Currency,
    Region,
    SubRegion,
}

#[derive(Debug, Parser)]
#[command(
    name = "query_demo",
    disable_help_subcommand = true,
    about = "Query the bundled reference dataset",
    long_about = "Filter countries, languages, currencies, regions, or sub-regions and print the matching rows as JSON.",
    after_help = "Filter values are parsed as JSON when possible and as plain strings otherwise; quote numeric codes (e.g. '\"208\"') to compare them as strings.\nThe resource directory is resolved in order by explicit arg, then GEOATLAS_RESOURCES_DIR, then the bundled copies."
)]
/// CLI for `query_demo`.
///
/// Common usage:
/// - All countries in Northern Europe: `--filter subRegionCode:eq:154`
/// - Landlocked countries by name: `--filter isLandLocked:eq:true --select shortName`
/// - One record by any identifier: `--kind currency --find DKK`
struct QueryDemoCli {
    #[arg(
        long,
        value_enum,
        default_value = "country",
        help = "Entity kind to query"
    )]
    kind: KindArg,
    #[arg(
        long = "filter",
        value_name = "FIELD:OP[:VALUE]",
        value_parser = parse_filter_arg,
        help = "Filter condition, repeat as needed; conditions are combined with AND"
    )]
    filters: Vec<Filter>,
    #[arg(
        long,
        value_name = "IDENTIFIER",
        help = "Print the first record matching this identifier instead of a list"
    )]
    find: Option<String>,
    #[arg(
        long = "select",
        value_name = "FIELD",
        help = "Mapped field to print, repeat as needed (default: all fields)"
    )]
    select: Vec<String>,
    #[arg(
        long = "resources-dir",
        value_name = "DIR",
        help = "Optional directory holding country.json, language.json, currency.json, and region.json"
    )]
    resources_dir: Option<PathBuf>,
    #[arg(long = "no-cache", help = "Disable memoization of loaded record sets")]
    no_cache: bool,
}

/// Run the query demo with `args_iter` (program name excluded) and print JSON to stdout.
pub fn run_query_demo<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) =
        parse_cli::<QueryDemoCli, _>(std::iter::once("query_demo".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let atlas = Atlas::with_config(build_config(&cli));
    let output = run_query(&atlas, &cli)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_config(cli: &QueryDemoCli) -> AtlasConfig {
    let config = AtlasConfig::default().with_cache_enabled(!cli.no_cache);
    match cli
        .resources_dir
        .clone()
        .or_else(|| std::env::var_os(RESOURCES_DIR_ENV).map(PathBuf::from))
    {
        Some(dir) => config.with_resources_dir(dir),
        None => config,
    }
}

fn run_query(atlas: &Atlas, cli: &QueryDemoCli) -> Result<JsonValue, AtlasError> {
    match cli.kind {
        KindArg::Country => query_kind::<Country>(atlas, cli),
        KindArg::Language => query_kind::<Language>(atlas, cli),
        KindArg::Currency => query_kind::<Currency>(atlas, cli),
        KindArg::Region => query_kind::<Region>(atlas, cli),
        KindArg::SubRegion => query_kind::<SubRegion>(atlas, cli),
    }
}

fn query_kind<R: DatasetRecord>(atlas: &Atlas, cli: &QueryDemoCli) -> Result<JsonValue, AtlasError> {
    let fields = || Fields::Many(cli.select.iter().map(String::as_str).collect());
    let matches = atlas.query::<R>(&cli.filters)?;
    if let Some(identifier) = &cli.find {
        return match matches.find(identifier) {
            Some(record) => Ok(serde_json::to_value(record.select(fields())?)?),
            None => Ok(JsonValue::Null),
        };
    }
    Ok(serde_json::to_value(matches.select(fields())?)?)
}

fn parse_filter_arg(raw: &str) -> Result<Filter, String> {
    let mut parts = raw.splitn(3, ':');
    let field = parts.next().unwrap_or_default().trim();
    if field.is_empty() {
        return Err(format!("--filter '{}' is missing a field name", raw));
    }
    let operator = parts
        .next()
        .ok_or_else(|| format!("--filter '{}' expects FIELD:OP[:VALUE]", raw))
        .and_then(|name| Operator::from_str(name.trim()).map_err(|err| err.to_string()))?;
    let value = match parts.next() {
        Some(raw_value) => parse_filter_value(raw_value),
        None if operator.takes_argument() => {
            return Err(format!(
                "--filter '{}': operator '{}' needs a value",
                raw, operator
            ));
        }
        None => Value::Null,
    };
    Ok(Filter::new(field, value, operator))
}

fn parse_filter_value(raw: &str) -> Value {
    serde_json::from_str::<JsonValue>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
