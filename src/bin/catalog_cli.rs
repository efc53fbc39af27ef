use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use catalog_db::mssql;
use catalog_db::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Book catalog database client")]
struct Cli {
    #[command(flatten)]
    conn: ConnArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConnArgs {
    #[arg(long, env = "CATALOG_DB_SERVER")]
    server: String,
    #[arg(long, env = "CATALOG_DB_DATABASE")]
    database: String,
    #[arg(long, env = "CATALOG_DB_USER")]
    user: String,
    #[arg(long, env = "CATALOG_DB_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, env = "CATALOG_DB_PORT")]
    port: Option<u16>,
    #[arg(long, env = "CATALOG_DB_INSTANCE")]
    instance: Option<String>,
    /// Require an encrypted connection.
    #[arg(long)]
    encrypt: bool,
}

impl ConnArgs {
    fn into_options(self) -> MssqlOptions {
        let mut opts = MssqlOptions::new(self.server, self.database, self.user, self.password)
            .with_port(self.port)
            .with_instance_name(self.instance);
        opts.encrypt = self.encrypt;
        opts
    }
}

#[derive(Args, Debug)]
struct BookArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    #[arg(long)]
    publisher: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    stock: Option<i32>,
}

impl From<BookArgs> for NewBook {
    fn from(args: BookArgs) -> Self {
        NewBook {
            title: args.title,
            author: args.author,
            publisher: args.publisher,
            year: args.year,
            isbn: args.isbn,
            price: args.price,
            stock: args.stock,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List active books by title.
    ListBooks,
    /// Check credentials against active accounts.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Match inactive accounts instead.
        #[arg(long)]
        inactive: bool,
    },
    /// Create an account.
    CreateUser {
        #[arg(long)]
        names: String,
        #[arg(long)]
        surname: String,
        #[arg(long)]
        phone: i64,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    AddBook(BookArgs),
    UpdateBook {
        #[arg(long)]
        id: i32,
        #[command(flatten)]
        book: BookArgs,
    },
    /// Deactivate a book.
    DeleteBook {
        #[arg(long)]
        id: i32,
    },
}

#[derive(Serialize)]
struct Response<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> Response<T> {
    fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CatalogDbError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CatalogDbError::ParameterError(format!("cannot render output: {e}")))?;
    println!("{text}");
    Ok(())
}

async fn run(db: &CatalogDb, command: Command) -> Result<(), CatalogDbError> {
    match command {
        Command::ListBooks => print_json(&Response::data(db.list_books().await?)),
        Command::Login {
            email,
            password,
            inactive,
        } => {
            let user = db.login_user(&email, &password, !inactive).await?;
            let found = user.is_some();
            print_json(&Response {
                success: found,
                message: (!found).then(|| "No account matches those credentials".to_string()),
                data: user,
            })
        }
        Command::CreateUser {
            names,
            surname,
            phone,
            email,
            password,
        } => {
            let user = NewUser {
                names,
                surname,
                phone,
                email,
                password,
            };
            print_json(&db.insert_user(&user).await?)
        }
        Command::AddBook(book) => print_json(&db.insert_book(&book.into()).await?),
        Command::UpdateBook { id, book } => print_json(&db.update_book(id, &book.into()).await?),
        Command::DeleteBook { id } => print_json(&db.delete_book(id).await?),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("catalog_db=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let handle = mssql::connect(&cli.conn.into_options()).await;
    let db = CatalogDb::new(handle.clone());

    let outcome = run(&db, cli.command).await;
    if let Err(err) = handle.close().await {
        tracing::warn!(error = %err, "closing the connection failed");
    }
    match outcome {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::error!(kind = ?err.kind(), "{err}");
            Err(err.into())
        }
    }
}
