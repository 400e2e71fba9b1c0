//! ldap-batch - look up a list of identifiers in an LDAP directory
//!
//! Reads server properties from an INI file and identifiers from a file (one
//! per line), runs one search per identifier and writes a `;`-delimited table
//! whose first column is the matched identifier.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use ldap_batch::{
    BatchLookup, CancellationToken, LdapSessionFactory, LookupError, ResultTable, SearchSpec,
};
use tracing::{info, warn};

mod error;
mod input;
mod logging;
mod output;
mod settings;

use error::{CliError, CliResult};
use output::OutputFormat;
use settings::ServerProperties;

/// Batch LDAP lookup
#[derive(Parser, Debug)]
#[command(name = "ldap-batch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// INI file with [server] and [credentials] sections
    #[arg(short = 's', long, env = "LDAP_BATCH_SERVER_CONFIG")]
    server_config: PathBuf,

    /// Attribute the identifiers are matched against (e.g. uid)
    #[arg(short, long)]
    field: String,

    /// Search base DN (e.g. dc=example,dc=com)
    #[arg(short, long)]
    base: String,

    /// Comma-separated attributes to return (e.g. "cn, mail")
    #[arg(short, long)]
    attributes: String,

    /// File with one identifier per line (stdin when omitted or "-")
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write results to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Column separator for delimited output
    #[arg(long, default_value_t = ';')]
    separator: char,

    /// Separator placed between the values of a multi-valued attribute
    #[arg(long, default_value = "|")]
    multi_value_separator: String,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log connection and search details to stderr
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.debug);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = ServerProperties::load(&cli.server_config)?.into_directory_config();
    let spec = SearchSpec::new(
        cli.field.as_str(),
        cli.base.as_str(),
        SearchSpec::parse_attributes(&cli.attributes),
    )
    .with_multi_value_separator(cli.multi_value_separator.as_str());
    let identifiers = input::read_identifiers(cli.input.as_deref())?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current identifier");
            ctrl_c.cancel();
        }
    });

    let engine = BatchLookup::new(LdapSessionFactory::new());
    let (table, cancelled) = match engine
        .run_with_cancellation(&config, &spec, &identifiers, &cancel)
        .await
    {
        Ok(table) => (table, false),
        Err(LookupError::Cancelled { partial }) => (*partial, true),
        Err(e) => return Err(e.into()),
    };

    match &cli.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            output::write_table(&mut writer, &table, cli.format, cli.separator)?;
            writer.flush()?;
            info!(path = %path.display(), rows = table.rows().len(), "Results written");
        }
        None => {
            let stdout = std::io::stdout();
            output::write_table(stdout.lock(), &table, cli.format, cli.separator)?;
        }
    }

    report_outcome(&table, cancelled, &mut std::io::stderr().lock())
}

/// Report failed identifiers and turn the run outcome into an exit status.
fn report_outcome<W: Write>(table: &ResultTable, cancelled: bool, warnings: &mut W) -> CliResult<()> {
    for failure in table.failures() {
        writeln!(
            warnings,
            "warning: line {}: {}: {}",
            failure.index + 1,
            failure.identifier,
            failure.message
        )?;
    }

    if cancelled {
        return Err(CliError::Cancelled {
            rows: table.rows().len(),
        });
    }
    if table.has_failures() {
        return Err(CliError::PartialFailure {
            count: table.failures().len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ldap_batch::LookupFailure;

    fn table_with_failure() -> ResultTable {
        let mut table = ResultTable::new(vec!["uid".into(), "cn".into()]);
        table.push_row(vec!["jdoe".into(), "John Doe".into()]);
        table.push_failure(LookupFailure::new(
            1,
            "ghost",
            &LookupError::Timeout { timeout_secs: 5 },
        ));
        table
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from([
            "ldap-batch",
            "--server-config",
            "server.ini",
            "--field",
            "uid",
            "--base",
            "dc=example,dc=com",
            "--attributes",
            "cn, mail",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Csv);
        assert_eq!(cli.separator, ';');
        assert_eq!(cli.multi_value_separator, "|");
        assert!(cli.input.is_none());
    }

    #[test]
    fn test_cancelled_run_still_reports_failures() {
        let mut warnings = Vec::new();
        let err = report_outcome(&table_with_failure(), true, &mut warnings).unwrap_err();

        assert!(matches!(err, CliError::Cancelled { rows: 1 }));
        assert_eq!(
            String::from_utf8(warnings).unwrap(),
            "warning: line 2: ghost: search timed out after 5 seconds\n"
        );
    }

    #[test]
    fn test_failures_give_partial_failure() {
        let mut warnings = Vec::new();
        let err = report_outcome(&table_with_failure(), false, &mut warnings).unwrap_err();

        assert!(matches!(err, CliError::PartialFailure { count: 1 }));
        assert!(!warnings.is_empty());
    }

    #[test]
    fn test_clean_run_is_ok() {
        let mut table = ResultTable::new(vec!["uid".into()]);
        table.push_row(vec!["jdoe".into()]);

        let mut warnings = Vec::new();
        assert!(report_outcome(&table, false, &mut warnings).is_ok());
        assert!(warnings.is_empty());
    }
}
