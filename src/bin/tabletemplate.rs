use std::{
    io::{BufRead, Write, stdin, stdout},
    str::FromStr,
};

use miette::{IntoDiagnostic, Result, miette};
use strum::EnumString;
use tracing_subscriber::EnvFilter;

use tabletemplate::{
    Backend, CsvConnectInfo, CsvDataTable, DataTable, RdbConnectInfo, RdbDataTable, Row, Template,
    Value,
};

/// Shell commands, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
enum Command {
    Find,
    Key,
    Insert,
    Update,
    Delete,
    Remove,
    Save,
    Show,
    Help,
    Exit,
}

const USAGE: &str = "usage:
  tabletemplate csv <file.csv> <key,columns>
  tabletemplate sqlite <file.db> <table> <key,columns>";

const HELP: &str = "commands:
  find [col=val ...]                  rows matching the template
  key <v1> <v2> ...                   row with the given key values
  insert col=val ...                  add a row
  update [col=val ...] set col=val .. overlay values onto matching rows
  delete [col=val ...]                delete matching rows
  remove <v1> <v2> ...                delete the row with the given key
  save                                write a csv table back to its file
  show                                describe the table
  exit";

fn split_keys(keys: &str) -> Vec<String> {
    keys.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}

fn open_backend(args: &[String]) -> Result<Backend> {
    match args {
        [kind, path, keys] if kind == "csv" => {
            let path = std::path::Path::new(path);
            let directory = path.parent().unwrap_or(std::path::Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|f| f.to_str())
                .ok_or_else(|| miette!("invalid csv path {}", path.display()))?;
            let name = path
                .file_stem()
                .and_then(|f| f.to_str())
                .unwrap_or(file_name)
                .to_lowercase();

            let table = CsvDataTable::new(
                name,
                CsvConnectInfo::new(directory, file_name),
                split_keys(keys),
            )?;
            Ok(table.into())
        }
        [kind, path, table, keys] if kind == "sqlite" => {
            let info = RdbConnectInfo {
                database: path.clone(),
                ..RdbConnectInfo::from_env()
            };
            Ok(RdbDataTable::new(table.as_str(), info, split_keys(keys)).into())
        }
        _ => Err(miette!("{USAGE}")),
    }
}

/// Parses `col=val` pairs. A bare `NULL` value is SQL NULL.
fn parse_pairs<'a, T: FromIterator<(String, Value)>>(
    words: impl Iterator<Item = &'a str>,
) -> Result<T> {
    words
        .map(|word| {
            let (column, value) = word
                .split_once('=')
                .ok_or_else(|| miette!("expected column=value, got {word:?}"))?;
            let value = if value.eq_ignore_ascii_case("null") {
                Value::Null
            } else {
                Value::from(value)
            };
            Ok((column.to_owned(), value))
        })
        .collect()
}

fn print_rows(out: &mut impl Write, rows: &[Row]) -> Result<()> {
    let Some(first) = rows.first() else {
        writeln!(out, "(no rows)").into_diagnostic()?;
        return Ok(());
    };

    write!(out, "{: <8}", "Results").into_diagnostic()?;
    for column in first.columns() {
        write!(out, " | {: <8}", column).into_diagnostic()?;
    }
    writeln!(out).into_diagnostic()?;

    for (idx, row) in rows.iter().enumerate() {
        write!(out, "{: <8}", idx).into_diagnostic()?;
        for (_, value) in row.iter() {
            write!(out, " | {: <8}", value.to_string()).into_diagnostic()?;
        }
        writeln!(out).into_diagnostic()?;
    }

    Ok(())
}

/// Runs one shell line. Returns `false` when the shell should stop.
fn run_line(table: &mut Backend, line: &str, out: &mut impl Write) -> Result<bool> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(true);
    };
    let command = Command::from_str(word).map_err(|_| miette!("unknown command {word:?}, try help"))?;

    match command {
        Command::Find => {
            let template: Template = parse_pairs(words)?;
            print_rows(out, &table.find_by_template(&template, None)?)?;
        }
        Command::Key => {
            let key: Vec<Value> = words.map(Value::from).collect();
            match table.find_by_primary_key(&key, None)? {
                Some(row) => print_rows(out, &[row])?,
                None => writeln!(out, "(not found)").into_diagnostic()?,
            }
        }
        Command::Insert => {
            let row: Row = parse_pairs(words)?;
            table.insert(row)?;
            writeln!(out, "inserted 1 row").into_diagnostic()?;
        }
        Command::Update => {
            let words: Vec<&str> = words.collect();
            let split = words
                .iter()
                .position(|w| w.eq_ignore_ascii_case("set"))
                .ok_or_else(|| miette!("update needs a set clause"))?;
            let template: Template = parse_pairs(words[..split].iter().copied())?;
            let new_values: Row = parse_pairs(words[split + 1..].iter().copied())?;
            let updated = table.update_by_template(&template, &new_values)?;
            writeln!(out, "updated {updated} row(s)").into_diagnostic()?;
        }
        Command::Delete => {
            let template: Template = parse_pairs(words)?;
            let deleted = table.delete_by_template(&template)?;
            writeln!(out, "deleted {deleted} row(s)").into_diagnostic()?;
        }
        Command::Remove => {
            let key: Vec<Value> = words.map(Value::from).collect();
            let deleted = table.delete_by_key(&key)?;
            writeln!(out, "deleted {deleted} row(s)").into_diagnostic()?;
        }
        Command::Save => match table {
            Backend::Csv(csv) => {
                csv.save()?;
                writeln!(out, "saved {} row(s)", csv.len()).into_diagnostic()?;
            }
            Backend::Rdb(_) => writeln!(out, "sqlite tables are saved on every change").into_diagnostic()?,
        },
        Command::Show => match table {
            Backend::Csv(csv) => write!(out, "{csv}").into_diagnostic()?,
            Backend::Rdb(rdb) => writeln!(
                out,
                "RdbDataTable: {} in {} (key columns {:?})",
                rdb.name(),
                rdb.connect_info().database,
                rdb.key_columns()
            )
            .into_diagnostic()?,
        },
        Command::Help => writeln!(out, "{HELP}").into_diagnostic()?,
        Command::Exit => return Ok(false),
    }

    Ok(true)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(false)
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut table = open_backend(&args)?;

    let mut stdin = stdin().lock();
    let mut stdout = stdout().lock();
    let mut buf = String::new();

    loop {
        stdout.write_all(format!("{}> ", table.name()).as_bytes()).into_diagnostic()?;
        stdout.flush().into_diagnostic()?;

        buf.clear();
        let read = stdin.read_line(&mut buf).into_diagnostic()?;
        if read == 0 {
            break;
        }

        match run_line(&mut table, buf.trim(), &mut stdout) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => writeln!(stdout, "{err:?}").into_diagnostic()?,
        }
        stdout.flush().into_diagnostic()?;
    }

    Ok(())
}
