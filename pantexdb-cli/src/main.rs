use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use pantexdb::config::parse_config;
use pantexdb::{Config, Database, Document, Query};
use std::path::PathBuf;
use std::process;

/// pantexdb CLI — work with a pantexdb database from the command line
#[derive(Parser)]
#[command(name = "pantexdb", version, about)]
struct Cli {
    /// Root directory; the database lives in <root>/db/<db>
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Database name
    #[arg(long, default_value = "default")]
    db: String,

    /// YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    /// Log every collection operation
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Save a document (insert, or replace when --id names an existing one)
    Save {
        /// Collection name
        collection: String,
        /// Field values (e.g. --field name=Tim --field age=22)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
        /// Explicit document ID
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        id: Option<String>,
    },

    /// Get a single document by ID
    Get {
        /// Collection name
        collection: String,
        /// Document ID
        id: String,
    },

    /// Find documents matching all --where conditions
    Find {
        /// Collection name
        collection: String,
        /// Conditions (e.g. --where name=Elmar)
        #[arg(long = "where", value_parser = parse_key_value)]
        conditions: Vec<(String, String)>,
        /// Only return the first match
        #[arg(long)]
        one: bool,
    },

    /// Merge fields into an existing document
    Update {
        /// Collection name
        collection: String,
        /// Document ID
        id: String,
        /// Field values to set (e.g. --field age=24)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Delete one document by ID, or every document matching --where
    Delete {
        /// Collection name
        collection: String,
        /// Document ID
        #[arg(
            long,
            conflicts_with = "conditions",
            required_unless_present = "conditions",
            value_parser = NonEmptyStringValueParser::new()
        )]
        id: Option<String>,
        /// Conditions (e.g. --where name=Elmar)
        #[arg(long = "where", value_parser = parse_key_value)]
        conditions: Vec<(String, String)>,
    },

    /// Report malformed or misnamed document files
    Check {
        /// Collection name
        collection: String,
    },

    /// Remove the whole database directory
    Teardown {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

impl Command {
    fn collection(&self) -> Option<&str> {
        match self {
            Command::Save { collection, .. }
            | Command::Get { collection, .. }
            | Command::Find { collection, .. }
            | Command::Update { collection, .. }
            | Command::Delete { collection, .. }
            | Command::Check { collection } => Some(collection),
            Command::Teardown { .. } => None,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| {
        format!("Invalid key=value pair: no '=' found in '{s}'")
    })?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => parse_config(path)?,
        None => Config::default(),
    };
    if cli.verbose {
        config = config.verbose(true);
    }

    // Refuse before opening, which would create the directory
    if let Command::Teardown { yes: false } = cli.command {
        return Err(format!(
            "Refusing to delete {} without --yes",
            cli.root.join("db").join(&cli.db).display()
        )
        .into());
    }

    let collections: Vec<String> = cli.command.collection().map(str::to_string).into_iter().collect();
    let db = Database::open(&cli.root, &cli.db, &collections, config)?;
    log::info!("Opened database {} at {}", db.name(), db.path().display());

    match cli.command {
        Command::Save {
            collection,
            fields,
            id,
        } => {
            let mut doc = fields_to_document(&fields);
            if let Some(id) = id {
                doc.set_id(id);
            }
            let saved = db.collection(&collection)?.save(doc)?;
            print_output(&saved.into(), &cli.format)?;
        }

        Command::Get { collection, id } => {
            let doc = db.collection(&collection)?.find_one(&Query::by_id(id))?;
            print_output(&doc.into(), &cli.format)?;
        }

        Command::Find {
            collection,
            conditions,
            one,
        } => {
            let query = Query::from(fields_to_document(&conditions));
            let col = db.collection(&collection)?;
            if one {
                print_output(&col.find_one(&query)?.into(), &cli.format)?;
            } else {
                let docs: Vec<serde_json::Value> =
                    col.find(&query)?.into_iter().map(Into::into).collect();
                print_output(&serde_json::Value::Array(docs), &cli.format)?;
            }
        }

        Command::Update {
            collection,
            id,
            fields,
        } => {
            let patch = fields_to_document(&fields);
            let updated = db.collection(&collection)?.update(&id, &patch)?;
            print_output(&updated.into(), &cli.format)?;
        }

        Command::Delete {
            collection,
            id,
            conditions,
        } => {
            let query = match id {
                Some(id) => Query::by_id(id),
                None => Query::from(fields_to_document(&conditions)),
            };
            let deleted = db.collection(&collection)?.delete(&query)?;
            print_output(&serde_json::json!({ "deleted": deleted }), &cli.format)?;
        }

        Command::Check { collection } => {
            let report = db.collection(&collection)?.check()?;
            print_output(&serde_json::to_value(&report)?, &cli.format)?;
        }

        Command::Teardown { .. } => {
            let path = db.path().display().to_string();
            db.teardown()?;
            print_output(&serde_json::json!({ "ok": true, "deleted": path }), &cli.format)?;
        }
    }

    Ok(())
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn fields_to_document(fields: &[(String, String)]) -> Document {
    let mut doc = Document::new();
    for (key, val) in fields {
        // Try to parse as JSON value (for numbers, booleans, arrays, objects)
        let json_val = serde_json::from_str(val).unwrap_or(serde_json::Value::String(val.clone()));
        doc.insert(key.clone(), json_val);
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("name=Tim").unwrap(),
            ("name".to_string(), "Tim".to_string())
        );
        assert_eq!(
            parse_key_value("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
    }

    #[test]
    fn test_fields_to_document_parses_json() {
        let doc = fields_to_document(&[
            ("name".into(), "Tim".into()),
            ("age".into(), "22".into()),
            ("admin".into(), "true".into()),
            ("tags".into(), "[\"a\"]".into()),
        ]);
        assert_eq!(
            serde_json::Value::from(doc),
            json!({ "name": "Tim", "age": 22, "admin": true, "tags": ["a"] })
        );
    }

    #[test]
    fn test_cli_parses_delete_by_where() {
        let cli = Cli::try_parse_from([
            "pantexdb", "--db", "test", "delete", "users", "--where", "age=24",
        ])
        .unwrap();
        match cli.command {
            Command::Delete { id, conditions, .. } => {
                assert!(id.is_none());
                assert_eq!(conditions, vec![("age".to_string(), "24".to_string())]);
            }
            _ => panic!("expected delete"),
        }
    }

    #[test]
    fn test_cli_delete_requires_target() {
        assert!(Cli::try_parse_from(["pantexdb", "delete", "users"]).is_err());
    }

    #[test]
    fn test_cli_rejects_empty_id() {
        assert!(Cli::try_parse_from(["pantexdb", "delete", "users", "--id", ""]).is_err());
        assert!(Cli::try_parse_from(["pantexdb", "save", "users", "--id", ""]).is_err());
        assert!(Cli::try_parse_from(["pantexdb", "delete", "users", "--id", "abc"]).is_ok());
    }

    #[test]
    fn test_teardown_without_yes_leaves_no_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["pantexdb", "--root", root, "--db", "t", "teardown"]).unwrap();

        let err = run(cli).unwrap_err();
        assert!(err.to_string().contains("without --yes"));
        assert!(!tmp.path().join("db").join("t").exists());
    }

    #[test]
    fn test_teardown_with_yes_removes_directory() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("db/t/users")).unwrap();
        let root = tmp.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["pantexdb", "--root", root, "--db", "t", "teardown", "--yes"])
            .unwrap();

        run(cli).unwrap();
        assert!(!tmp.path().join("db").join("t").exists());
    }
}
