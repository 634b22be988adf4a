use std::io::{BufRead, Write, stdin, stdout};

use miette::{IntoDiagnostic, Result};

use rowbase::{ColumnDefault, ColumnSpec, Table, Value, parse_sort, parse_where};

const HELP: &str = "\
commands:
  insert <json>            insert a row, e.g. insert {\"name\": \"Alice\"}
  find <where> [; <sort>]  list matching rows, e.g. find {\"age\": {\"gte\": 21}} ; {\"name\": \"asc\"}
  first <where>            first matching row or nothing
  update <where> ; <patch> patch matching rows
  delete <where>           remove matching rows
  addcol <name> <json>     add a column with a default value
  dropcol <name>           remove a column
  rename <old> <new>       rename a column
  rows                     dump all rows
  save                     print the serialized payload
  exit";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

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

    let mut table = Table::new(vec![
        ColumnSpec::named("name"),
        ColumnSpec::named("email"),
        ColumnSpec::new("tags", ColumnDefault::EmptyList),
        ColumnSpec::new("active", ColumnDefault::True),
    ]);

    table
        .insert(serde_json::json!({"name": "Alice", "email": "alice@example.com", "tags": ["admin"]}))
        .into_diagnostic()?;
    table
        .insert(serde_json::json!({"name": "Bob", "email": "bob@example.com", "active": false}))
        .into_diagnostic()?;

    println!("{table}");
    println!("{HELP}");

    let mut buf = String::new();

    let mut stdin = stdin().lock();
    let mut stdout = stdout().lock();

    loop {
        stdout.write_all("DB: ".as_bytes()).into_diagnostic()?;
        stdout.flush().into_diagnostic()?;

        buf.clear();
        if stdin.read_line(&mut buf).into_diagnostic()? == 0 {
            break;
        }

        let input = buf.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" {
            break;
        }

        if let Err(report) = run_command(&mut table, input) {
            println!("{report:?}");
        }
    }

    println!("Exiting rowbase");

    Ok(())
}

fn run_command(table: &mut Table, input: &str) -> Result<()> {
    let (command, rest) = match input.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command {
        "help" => println!("{HELP}"),
        "rows" => {
            for (idx, row) in table.rows().iter().enumerate() {
                println!("{idx: <4} {}", serde_json::to_string(row).into_diagnostic()?);
            }
        }
        "save" => println!("{}", table.serialize()?),
        "insert" => {
            let raw = serde_json::from_str(rest).into_diagnostic()?;
            let row = table.insert(raw)?;
            println!("{}", serde_json::to_string(&row).into_diagnostic()?);
        }
        "find" => {
            let (where_part, sort_part) = split_clause(rest);
            let clauses = parse_where(&serde_json::from_str(where_part).into_diagnostic()?)?;
            let sort = match sort_part {
                Some(raw) => parse_sort(&serde_json::from_str(raw).into_diagnostic()?)?,
                None => Vec::new(),
            };
            for row in table.find(&clauses, &sort)? {
                println!("{}", serde_json::to_string(&row).into_diagnostic()?);
            }
        }
        "first" => {
            let clauses = parse_where(&serde_json::from_str(rest).into_diagnostic()?)?;
            match table.find_first(&clauses, &[])? {
                Some(row) => println!("{}", serde_json::to_string(&row).into_diagnostic()?),
                None => println!("no match"),
            }
        }
        "update" => {
            let (where_part, patch_part) = split_clause(rest);
            let patch_part =
                patch_part.ok_or_else(|| miette::miette!("usage: update <where> ; <patch>"))?;
            let clauses = parse_where(&serde_json::from_str(where_part).into_diagnostic()?)?;
            let patch = serde_json::from_str(patch_part).into_diagnostic()?;
            let result = table.update(&clauses, patch)?;
            println!("updated {}", result.updated_count);
        }
        "delete" => {
            let clauses = parse_where(&serde_json::from_str(rest).into_diagnostic()?)?;
            let result = table.delete(&clauses)?;
            println!("deleted {}", result.deleted_count);
        }
        "addcol" => {
            let (name, default) = rest
                .split_once(' ')
                .ok_or_else(|| miette::miette!("usage: addcol <name> <json default>"))?;
            let default: serde_json::Value = serde_json::from_str(default.trim()).into_diagnostic()?;
            table.add_column(name, Value::from(default));
            println!("{table}");
        }
        "dropcol" => {
            table.remove_column(rest);
            println!("{table}");
        }
        "rename" => {
            let (old, new) = rest
                .split_once(' ')
                .ok_or_else(|| miette::miette!("usage: rename <old> <new>"))?;
            table.rename_column(old, new.trim());
            println!("{table}");
        }
        unknown => println!("unknown command `{unknown}`, try help"),
    }

    Ok(())
}

/// Splits `<json> ; <json>` command bodies on the first `;`.
fn split_clause(rest: &str) -> (&str, Option<&str>) {
    match rest.split_once(';') {
        Some((left, right)) => (left.trim(), Some(right.trim())),
        None => (rest, None),
    }
}
