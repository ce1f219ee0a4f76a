use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use cashbook::{PasswordHash, ValidatedPassword, create_user_with_defaults, initialize_db};

/// A utility for creating a test database for the REST API server of cashbook.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The email address of the demo admin user.
    #[arg(long, default_value = "admin@example.com")]
    email: String,

    /// The password of the demo admin user.
    #[arg(long, default_value = "test")]
    password: String,
}

/// Create a database with a demo admin user for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path
        .extension()
        .is_none_or(|extension| extension.is_empty())
    {
        eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let connection = Connection::open(output_path)?;

    initialize_db(&connection)?;

    println!("Creating demo admin user {}...", args.email);

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(&args.password),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user_with_defaults(
        &args.email,
        "Demo Admin",
        password_hash,
        "Etc/UTC",
        &connection,
    )?;

    println!("Created user {} with role {}. Success!", user.id, user.role);

    Ok(())
}
