//! Connect, run a few statements, and print every row.
//!
//! ```text
//! RUST_LOG=pqbind=debug cargo run --example sample -- "host=localhost dbname=postgres"
//! ```
//!
//! The connection string comes from the first argument, then `DATABASE_URL`.

use pqbind::{Connection, Format, PqError, QueryResult, ResultSet, ToSql};
use tracing_subscriber::EnvFilter;

fn print_rows(set: &ResultSet) {
    let names: Vec<String> = (0..set.field_count())
        .filter_map(|column| set.field_name(column).ok().map(|name| name.into_owned()))
        .collect();
    println!("{}", names.join(" | "));

    for row in set.rows() {
        let cells: Vec<String> = (0..row.len())
            .map(|column| match row.value(column) {
                Ok(value) => value.to_string(),
                // Unregistered types still print in their text form
                Err(err) if err.is_unknown_type() => match row.cell(column) {
                    Ok(cell) => String::from_utf8_lossy(cell.bytes()).into_owned(),
                    Err(err) => err.to_string(),
                },
                Err(err) => err.to_string(),
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
    println!("({} rows)\n", set.row_count());
}

fn main() -> Result<(), PqError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let conninfo = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "host=localhost dbname=postgres connect_timeout=10".to_string());

    let mut conn = Connection::open(&conninfo)?;

    if let QueryResult::Tuples(set) = conn.execute("select 1", &[])? {
        let one: i32 = set.row(0)?.get(0)?;
        println!("select 1 -> {}\n", one);
    }

    let statements: [(&str, Format); 3] = [
        (
            "select current_database() as db, now()::timestamp as at, gen_random_uuid() as id",
            Format::Text,
        ),
        ("select $1::int8 * 2 as doubled, $2::text as label", Format::Binary),
        ("select '{\"a\": 1}'::json as payload, null::text as missing", Format::Text),
    ];

    let params: [&dyn ToSql; 2] = [&21i64, &"answer"];

    for (sql, format) in statements {
        println!("{}", sql);
        let bound = &params[..sql.matches('$').count()];
        match conn.execute_with(sql, bound, format) {
            Ok(QueryResult::Tuples(set)) => print_rows(&set),
            Ok(QueryResult::Ok) => println!("OK\n"),
            Err(err) => eprintln!("{}\n", err),
        }
    }

    // A failed statement leaves the connection usable
    if let Err(err) = conn.execute("selec 1", &[]) {
        eprintln!("{}", err);
    }
    let still_open = conn.execute("select 1", &[])?.into_tuples().is_some();
    println!("connection usable after error: {}", still_open);

    conn.close();
    Ok(())
}
